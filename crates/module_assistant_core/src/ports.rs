//! crates/module_assistant_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the module generation pipeline.
//! These traits form the boundary of the hexagonal architecture, allowing the
//! core to be independent of the host LMS persistence layer, the AI backend,
//! and the file store.

use crate::domain::{
    ActivityPlan, ModuleDescriptor, ModuleFields, ModuleRef, SectionRef, UploadedFile,
};
use async_trait::async_trait;
use uuid::Uuid;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Unsupported operation: {0}")]
    Unsupported(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// Host-course section persistence. Sections are addressed by a running
/// number within one course; new content is always appended after the
/// highest existing number.
#[async_trait]
pub trait CoursePersistence: Send + Sync {
    async fn create_section(&self, course: Uuid, number: i64) -> PortResult<SectionRef>;

    /// Updates a section in place. `None` fields are left untouched, so a
    /// section keeps its host-assigned default name unless one is supplied.
    async fn update_section(
        &self,
        section: &SectionRef,
        name: Option<&str>,
        summary_html: Option<&str>,
    ) -> PortResult<()>;

    /// All sections of the course, ordered by section number.
    async fn get_sections(&self, course: Uuid) -> PortResult<Vec<SectionRef>>;

    async fn set_course_layout(&self, course: Uuid, layout: &str) -> PortResult<()>;

    /// Whether the host has the given course layout installed.
    async fn supports_layout(&self, layout: &str) -> bool;

    /// Forces the host to rebuild its cached view of the course structure.
    async fn rebuild_cache(&self, course: Uuid) -> PortResult<()>;
}

/// Host-course activity-module persistence.
#[async_trait]
pub trait ModulePersistence: Send + Sync {
    async fn create_module(
        &self,
        course: Uuid,
        section_number: i64,
        kind: &str,
        fields: ModuleFields,
    ) -> PortResult<ModuleRef>;

    /// For `subsection` modules: the nested section container the host
    /// created for the module, with its own section number.
    async fn delegated_section(&self, module: &ModuleRef) -> PortResult<Option<SectionRef>>;

    /// All modules of the course, used when reading curriculum templates.
    async fn list_modules(&self, course: Uuid) -> PortResult<Vec<ModuleDescriptor>>;
}

/// Outcome of creating a batch of planned activities in one section.
#[derive(Debug, Clone, Default)]
pub struct ActivityOutcome {
    pub created: Vec<String>,
    pub warnings: Vec<String>,
}

/// Maps activity-kind strings to creation handlers. One bad entry must not
/// block its siblings; failures surface as warnings in the outcome.
#[async_trait]
pub trait ActivityRegistry: Send + Sync {
    async fn create_for_section(
        &self,
        plans: &[ActivityPlan],
        course: Uuid,
        section_number: i64,
    ) -> ActivityOutcome;

    /// Direct handler lookup for workflows that target one known kind.
    fn handler(&self, kind: &str) -> Option<std::sync::Arc<dyn ActivityHandler>>;
}

/// Capability interface for one activity kind. Registering a new kind must
/// not require any materializer change.
#[async_trait]
pub trait ActivityHandler: Send + Sync {
    async fn create(
        &self,
        plan: &ActivityPlan,
        course: Uuid,
        section_number: i64,
    ) -> PortResult<ModuleRef>;
}

/// The external AI text-generation backend, consumed as a single call.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Sends the composed prompt and returns the backend's raw text output.
    async fn generate(&self, prompt: &str) -> PortResult<String>;
}

/// Draft storage for uploaded supporting documents. Each request reads its
/// own upload area once; no locking is required.
#[async_trait]
pub trait FileStore: Send + Sync {
    async fn read_uploaded(&self, area: Uuid) -> PortResult<Vec<UploadedFile>>;

    async fn store(&self, area: Uuid, file: UploadedFile) -> PortResult<()>;
}

/// Optional external PDF text-extraction tool. Its absence must never
/// propagate as a hard failure; callers fall back to a placeholder.
#[async_trait]
pub trait PdfTextTool: Send + Sync {
    /// Whether the tool is present on this host.
    fn available(&self) -> bool;

    async fn extract_text(&self, bytes: &[u8]) -> PortResult<String>;
}
