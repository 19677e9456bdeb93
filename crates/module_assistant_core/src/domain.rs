//! crates/module_assistant_core/src/domain.rs
//!
//! Defines the pure, core data structures for the module generation pipeline.
//! These structs are independent of any database or HTTP representation.

use serde_json::Map;
use serde_json::Value;
use uuid::Uuid;

/// Maximum number of supporting documents accepted per generation request.
pub const MAX_SUPPORTING_FILES: usize = 5;

/// Maximum length of extracted supporting text, in characters.
pub const MAX_EXTRACTED_CHARS: usize = 100_000;

/// Marker appended to supporting text that was cut at [`MAX_EXTRACTED_CHARS`].
pub const TRUNCATION_MARKER: &str = "\n...[truncated]";

/// The requested top-level layout shape of the generated module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructureType {
    Weekly,
    Theme,
    Flexible,
}

impl StructureType {
    /// Parses the wire form used by the front end (`weekly`, `theme`, `flexible`).
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "weekly" => Some(Self::Weekly),
            "theme" => Some(Self::Theme),
            "flexible" => Some(Self::Flexible),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Weekly => "weekly",
            Self::Theme => "theme",
            Self::Flexible => "flexible",
        }
    }
}

/// Extracted text from one uploaded supporting document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupportingText {
    pub filename: String,
    pub mimetype: String,
    pub text: String,
    pub truncated: bool,
}

/// A single generation request as captured from the instructor.
///
/// Owned by one request/approval transaction; nothing here is shared
/// across requests.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub course_id: Uuid,
    pub freeform_prompt: String,
    pub structure_type: StructureType,
    pub include_activities: bool,
    pub keep_date_labels: bool,
    pub include_about_assessments: bool,
    pub include_about_learning: bool,
    pub template_ref: Option<String>,
    pub supporting_texts: Vec<SupportingText>,
}

impl GenerationRequest {
    /// Normalizes a raw request: the date-label option only applies to the
    /// weekly layout, and at most [`MAX_SUPPORTING_FILES`] supporting texts
    /// are kept, in input order.
    pub fn normalized(mut self) -> Self {
        if self.structure_type != StructureType::Weekly {
            self.keep_date_labels = false;
        }
        self.supporting_texts.truncate(MAX_SUPPORTING_FILES);
        self
    }
}

/// One planned activity inside a section, theme, or week.
///
/// Type-specific fields (for example `externalurl` for `url` activities)
/// ride in `extra` untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivityPlan {
    pub kind: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub extra: Map<String, Value>,
}

impl ActivityPlan {
    /// The name shown in result messages, falling back to the activity kind.
    pub fn display_name(&self) -> &str {
        match self.name.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => &self.kind,
        }
    }
}

/// One generated section in a weekly or flexible outline.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SectionPlan {
    pub title: Option<String>,
    pub summary: String,
    pub outline: Vec<String>,
    pub activities: Vec<ActivityPlan>,
}

/// One delivery week nested inside a theme.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WeekPlan {
    pub title: Option<String>,
    pub summary: String,
    pub activities: Vec<ActivityPlan>,
}

/// One generated theme, spanning a set of delivery weeks.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ThemePlan {
    pub title: Option<String>,
    pub summary: String,
    pub activities: Vec<ActivityPlan>,
    pub weeks: Vec<WeekPlan>,
}

/// The result report of one materialization pass.
///
/// Built fresh per approval submission and discarded after rendering;
/// never persisted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MaterializationReport {
    pub created: Vec<String>,
    pub warnings: Vec<String>,
}

/// A course section as seen through the persistence port.
#[derive(Debug, Clone, PartialEq)]
pub struct SectionRef {
    pub id: Uuid,
    pub number: i64,
    /// `None` means the host-assigned default name is in effect.
    pub name: Option<String>,
    pub summary_html: String,
}

/// An activity module as seen through the persistence port.
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleRef {
    pub id: Uuid,
    pub kind: String,
}

/// A lightweight description of an existing module, used when reading
/// curriculum templates.
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleDescriptor {
    pub kind: String,
    pub name: String,
    pub section_number: i64,
}

/// Field payload for creating a new activity module.
#[derive(Debug, Clone, Default)]
pub struct ModuleFields {
    pub name: String,
    pub intro_html: String,
    pub extra: Map<String, Value>,
}

/// One uploaded file read back from the draft file store.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub mimetype: String,
    pub bytes: Vec<u8>,
}

/// A section descriptor extracted from a curriculum template course.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateSection {
    pub title: String,
    pub summary_html: String,
}

/// An activity descriptor extracted from a curriculum template course.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateActivity {
    pub kind: String,
    pub name: String,
}

/// Everything read from a curriculum template, used to bias generation
/// toward a known shape. Read-only input to the prompt composer.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateData {
    pub label: String,
    pub structure: Vec<TemplateSection>,
    pub activities: Vec<TemplateActivity>,
    /// Raw HTML skeleton of the first non-empty template section.
    pub template_html: String,
    /// Derived container markers found in the skeleton (for style mimicry).
    pub bootstrap_structure: Vec<String>,
}
