//! crates/module_assistant_core/src/template.rs
//!
//! Curriculum templates: a configured catalog of existing courses whose
//! structure can be read back and fed to the prompt composer to bias
//! generation toward a known shape.
//!
//! A template is a convenience bias, not a requirement: resolution
//! failures are reported so the caller can fall back to template-less
//! generation, never abort.

use crate::domain::{TemplateActivity, TemplateData, TemplateSection};
use crate::ports::{CoursePersistence, ModulePersistence, PortError};
use regex::Regex;
use tracing::warn;
use uuid::Uuid;

/// Container markers detected in template HTML skeletons.
const CONTAINER_MARKERS: &[&str] = &[
    "accordion",
    "card",
    "nav-tabs",
    "list-group",
    "collapse",
    "carousel",
];

#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    /// The configured reference no longer resolves (deleted course or
    /// section). Callers downgrade to template-less generation.
    #[error("Selected curriculum template not found or not accessible")]
    NotFound,
    #[error(transparent)]
    Port(#[from] PortError),
}

/// One configured template reference.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateEntry {
    pub label: String,
    pub course_id: Uuid,
    pub section: Option<i64>,
}

/// A selectable template, as listed to the front end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateOption {
    pub id: String,
    pub label: String,
}

/// The configured set of curriculum templates.
///
/// Parsed from newline-separated `Label|course-id|section-number?` entries;
/// malformed lines are skipped with a warning.
#[derive(Debug, Clone, Default)]
pub struct TemplateCatalog {
    entries: Vec<TemplateEntry>,
}

impl TemplateCatalog {
    pub fn parse(config: &str) -> Self {
        let mut entries = Vec::new();
        for line in config.lines().map(str::trim).filter(|l| !l.is_empty()) {
            let mut parts = line.split('|').map(str::trim);
            let label = parts.next().unwrap_or_default();
            let course = parts.next().and_then(|raw| Uuid::parse_str(raw).ok());
            let section = parts.next().and_then(|raw| raw.parse::<i64>().ok());
            match (label.is_empty(), course) {
                (false, Some(course_id)) => entries.push(TemplateEntry {
                    label: label.to_owned(),
                    course_id,
                    section,
                }),
                _ => warn!(line, "skipping malformed curriculum template entry"),
            }
        }
        Self { entries }
    }

    /// The selectable options, in configured order. Templates are selected
    /// by their configured label.
    pub fn list(&self) -> Vec<TemplateOption> {
        self.entries
            .iter()
            .map(|entry| TemplateOption {
                id: entry.label.clone(),
                label: entry.label.clone(),
            })
            .collect()
    }

    pub fn find(&self, template_ref: &str) -> Option<&TemplateEntry> {
        self.entries.iter().find(|entry| entry.label == template_ref)
    }
}

/// Resolves a template entry to its concrete structure: section titles and
/// summaries, the activities found within, and the raw HTML skeleton of
/// the first non-empty section for style mimicry.
pub async fn read_template(
    entry: &TemplateEntry,
    courses: &dyn CoursePersistence,
    modules: &dyn ModulePersistence,
) -> Result<TemplateData, TemplateError> {
    let mut sections = match courses.get_sections(entry.course_id).await {
        Ok(sections) => sections,
        Err(PortError::NotFound(_)) => return Err(TemplateError::NotFound),
        Err(error) => return Err(TemplateError::Port(error)),
    };
    if let Some(number) = entry.section {
        sections.retain(|section| section.number == number);
    }
    if sections.is_empty() {
        return Err(TemplateError::NotFound);
    }

    let mut activities: Vec<TemplateActivity> = Vec::new();
    match modules.list_modules(entry.course_id).await {
        Ok(descriptors) => {
            for descriptor in descriptors {
                if entry
                    .section
                    .is_some_and(|number| descriptor.section_number != number)
                {
                    continue;
                }
                activities.push(TemplateActivity {
                    kind: descriptor.kind,
                    name: descriptor.name,
                });
            }
        }
        // Activities enrich the bias; a listing failure does not sink the template.
        Err(error) => warn!(%error, "could not list template activities"),
    }

    let template_html = sections
        .iter()
        .map(|section| section.summary_html.trim())
        .find(|summary| !summary.is_empty())
        .unwrap_or_default()
        .to_owned();

    let structure = sections
        .into_iter()
        .map(|section| TemplateSection {
            title: section
                .name
                .unwrap_or_else(|| format!("Section {}", section.number)),
            summary_html: section.summary_html,
        })
        .collect();

    Ok(TemplateData {
        label: entry.label.clone(),
        bootstrap_structure: derive_bootstrap_structure(&template_html),
        structure,
        activities,
        template_html,
    })
}

/// Derives a coarse skeleton description from template HTML: which known
/// layout containers appear, and how often.
pub fn derive_bootstrap_structure(html: &str) -> Vec<String> {
    if html.is_empty() {
        return Vec::new();
    }
    let mut markers = Vec::new();
    for marker in CONTAINER_MARKERS {
        let pattern = format!(r#"class="[^"]*\b{marker}\b"#);
        let Ok(re) = Regex::new(&pattern) else {
            continue;
        };
        let count = re.find_iter(html).count();
        if count > 0 {
            markers.push(format!("{marker} x{count}"));
        }
    }
    markers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ModuleDescriptor, ModuleFields, ModuleRef, SectionRef};
    use crate::ports::{PortResult, ModulePersistence};
    use async_trait::async_trait;

    struct FakeCourse {
        sections: Vec<SectionRef>,
    }

    #[async_trait]
    impl CoursePersistence for FakeCourse {
        async fn create_section(&self, _course: Uuid, _number: i64) -> PortResult<SectionRef> {
            Err(PortError::Unsupported("read-only fake".into()))
        }
        async fn update_section(
            &self,
            _section: &SectionRef,
            _name: Option<&str>,
            _summary_html: Option<&str>,
        ) -> PortResult<()> {
            Err(PortError::Unsupported("read-only fake".into()))
        }
        async fn get_sections(&self, _course: Uuid) -> PortResult<Vec<SectionRef>> {
            if self.sections.is_empty() {
                return Err(PortError::NotFound("course".into()));
            }
            Ok(self.sections.clone())
        }
        async fn set_course_layout(&self, _course: Uuid, _layout: &str) -> PortResult<()> {
            Ok(())
        }
        async fn supports_layout(&self, _layout: &str) -> bool {
            true
        }
        async fn rebuild_cache(&self, _course: Uuid) -> PortResult<()> {
            Ok(())
        }
    }

    struct FakeModules {
        descriptors: Vec<ModuleDescriptor>,
    }

    #[async_trait]
    impl ModulePersistence for FakeModules {
        async fn create_module(
            &self,
            _course: Uuid,
            _section_number: i64,
            _kind: &str,
            _fields: ModuleFields,
        ) -> PortResult<ModuleRef> {
            Err(PortError::Unsupported("read-only fake".into()))
        }
        async fn delegated_section(&self, _module: &ModuleRef) -> PortResult<Option<SectionRef>> {
            Ok(None)
        }
        async fn list_modules(&self, _course: Uuid) -> PortResult<Vec<ModuleDescriptor>> {
            Ok(self.descriptors.clone())
        }
    }

    fn section(number: i64, name: &str, summary: &str) -> SectionRef {
        SectionRef {
            id: Uuid::new_v4(),
            number,
            name: Some(name.to_owned()),
            summary_html: summary.to_owned(),
        }
    }

    #[test]
    fn catalog_parses_labels_courses_and_sections() {
        let course = Uuid::new_v4();
        let config = format!("Basic Mathematics|{course}|2\nnot a template\n");
        let catalog = TemplateCatalog::parse(&config);
        let entry = catalog.find("Basic Mathematics").unwrap();
        assert_eq!(entry.course_id, course);
        assert_eq!(entry.section, Some(2));
        assert_eq!(catalog.list().len(), 1);
    }

    #[tokio::test]
    async fn read_collects_structure_skeleton_and_activities() {
        let courses = FakeCourse {
            sections: vec![
                section(0, "General", ""),
                section(1, "Week 1", r#"<div class="accordion" id="acc"></div>"#),
            ],
        };
        let modules = FakeModules {
            descriptors: vec![ModuleDescriptor {
                kind: "quiz".into(),
                name: "Check-in".into(),
                section_number: 1,
            }],
        };
        let entry = TemplateEntry {
            label: "Maths".into(),
            course_id: Uuid::new_v4(),
            section: None,
        };
        let data = read_template(&entry, &courses, &modules).await.unwrap();
        assert_eq!(data.structure.len(), 2);
        assert!(data.template_html.contains("accordion"));
        assert_eq!(data.activities[0].name, "Check-in");
        assert_eq!(data.bootstrap_structure, vec!["accordion x1".to_owned()]);
    }

    #[tokio::test]
    async fn section_scope_filters_structure_and_activities() {
        let courses = FakeCourse {
            sections: vec![section(1, "Week 1", ""), section(2, "Week 2", "")],
        };
        let modules = FakeModules {
            descriptors: vec![
                ModuleDescriptor {
                    kind: "quiz".into(),
                    name: "In scope".into(),
                    section_number: 2,
                },
                ModuleDescriptor {
                    kind: "forum".into(),
                    name: "Out of scope".into(),
                    section_number: 1,
                },
            ],
        };
        let entry = TemplateEntry {
            label: "Scoped".into(),
            course_id: Uuid::new_v4(),
            section: Some(2),
        };
        let data = read_template(&entry, &courses, &modules).await.unwrap();
        assert_eq!(data.structure.len(), 1);
        assert_eq!(data.activities.len(), 1);
        assert_eq!(data.activities[0].name, "In scope");
    }

    #[tokio::test]
    async fn missing_course_is_not_found() {
        let courses = FakeCourse { sections: vec![] };
        let modules = FakeModules {
            descriptors: vec![],
        };
        let entry = TemplateEntry {
            label: "Gone".into(),
            course_id: Uuid::new_v4(),
            section: None,
        };
        assert!(matches!(
            read_template(&entry, &courses, &modules).await,
            Err(TemplateError::NotFound)
        ));
    }
}
