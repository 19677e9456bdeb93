//! services/api/src/adapters/activities.rs
//!
//! The activity-handler registry: maps activity-kind strings from
//! generated plans to creation handlers, implementing the
//! `ActivityRegistry` port. New kinds register without touching the
//! materializer.

use async_trait::async_trait;
use module_assistant_core::domain::{ActivityPlan, ModuleFields, ModuleRef};
use module_assistant_core::ports::{
    ActivityHandler, ActivityOutcome, ActivityRegistry, ModulePersistence, PortError, PortResult,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

//=========================================================================================
// Registry
//=========================================================================================

/// Registry of activity handlers keyed by kind string.
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn ActivityHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// The default handler set for generated plans: quiz, book, forum,
    /// url, and assignment shells.
    pub fn with_defaults(modules: Arc<dyn ModulePersistence>) -> Self {
        let mut registry = Self::new();
        for kind in ["quiz", "book", "forum", "assignment"] {
            registry.register(kind, Arc::new(ShellActivityHandler::new(kind, modules.clone())));
        }
        registry.register("url", Arc::new(UrlActivityHandler::new(modules)));
        registry
    }

    pub fn register(&mut self, kind: &str, handler: Arc<dyn ActivityHandler>) {
        self.handlers.insert(kind.to_owned(), handler);
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ActivityRegistry for HandlerRegistry {
    async fn create_for_section(
        &self,
        plans: &[ActivityPlan],
        course: Uuid,
        section_number: i64,
    ) -> ActivityOutcome {
        let mut outcome = ActivityOutcome::default();
        for plan in plans {
            let kind = plan.kind.trim().to_ascii_lowercase();

            // Labels are content display containers, not learning
            // activities; generated plans never materialize them.
            if kind == "label" {
                outcome.warnings.push(
                    "Label activities are not created from generated content; use the section summary instead."
                        .to_string(),
                );
                continue;
            }

            let Some(handler) = self.handlers.get(&kind) else {
                outcome.warnings.push(format!(
                    "The generated activity type \"{kind}\" is not available on this site."
                ));
                continue;
            };

            match handler.create(plan, course, section_number).await {
                Ok(_) => outcome
                    .created
                    .push(format!("Activity created: {}", plan.display_name())),
                Err(error) => {
                    warn!(%error, kind, "activity creation failed");
                    outcome.warnings.push(format!(
                        "Unable to create the \"{kind}\" activity automatically. Please review the course."
                    ));
                }
            }
        }
        outcome
    }

    fn handler(&self, kind: &str) -> Option<Arc<dyn ActivityHandler>> {
        self.handlers.get(&kind.trim().to_ascii_lowercase()).cloned()
    }
}

//=========================================================================================
// Handlers
//=========================================================================================

fn module_fields(plan: &ActivityPlan, fallback_name: &str) -> ModuleFields {
    let name = match plan.name.as_deref() {
        Some(name) if !name.trim().is_empty() => name.to_owned(),
        _ => fallback_name.to_owned(),
    };
    ModuleFields {
        name,
        intro_html: plan.description.clone().unwrap_or_default(),
        extra: plan.extra.clone(),
    }
}

/// Creates an empty placeholder activity of a fixed kind: a shell for the
/// instructor to fill with their own materials.
pub struct ShellActivityHandler {
    kind: String,
    fallback_name: String,
    modules: Arc<dyn ModulePersistence>,
}

impl ShellActivityHandler {
    pub fn new(kind: &str, modules: Arc<dyn ModulePersistence>) -> Self {
        let mut label = kind.to_owned();
        if let Some(first) = label.get_mut(..1) {
            first.make_ascii_uppercase();
        }
        Self {
            kind: kind.to_owned(),
            fallback_name: format!("AI Generated {label}"),
            modules,
        }
    }
}

#[async_trait]
impl ActivityHandler for ShellActivityHandler {
    async fn create(
        &self,
        plan: &ActivityPlan,
        course: Uuid,
        section_number: i64,
    ) -> PortResult<ModuleRef> {
        let fields = module_fields(plan, &self.fallback_name);
        self.modules
            .create_module(course, section_number, &self.kind, fields)
            .await
    }
}

/// Creates an external-link activity; the plan must carry a non-empty
/// `externalurl` field.
pub struct UrlActivityHandler {
    modules: Arc<dyn ModulePersistence>,
}

impl UrlActivityHandler {
    pub fn new(modules: Arc<dyn ModulePersistence>) -> Self {
        Self { modules }
    }
}

#[async_trait]
impl ActivityHandler for UrlActivityHandler {
    async fn create(
        &self,
        plan: &ActivityPlan,
        course: Uuid,
        section_number: i64,
    ) -> PortResult<ModuleRef> {
        let has_url = plan
            .extra
            .get("externalurl")
            .and_then(serde_json::Value::as_str)
            .is_some_and(|url| !url.trim().is_empty());
        if !has_url {
            return Err(PortError::Unsupported(
                "url activity is missing its externalurl field".to_string(),
            ));
        }
        let fields = module_fields(plan, "AI Generated Link");
        self.modules
            .create_module(course, section_number, "url", fields)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use module_assistant_core::domain::{ModuleDescriptor, SectionRef};
    use serde_json::{json, Map};
    use std::sync::Mutex;

    /// Records module creations; fails any module named "boom".
    #[derive(Default)]
    struct RecordingModules {
        created: Mutex<Vec<(String, i64, String)>>,
    }

    #[async_trait]
    impl ModulePersistence for RecordingModules {
        async fn create_module(
            &self,
            _course: Uuid,
            section_number: i64,
            kind: &str,
            fields: ModuleFields,
        ) -> PortResult<ModuleRef> {
            if fields.name == "boom" {
                return Err(PortError::Unexpected("simulated failure".into()));
            }
            self.created
                .lock()
                .unwrap()
                .push((kind.to_owned(), section_number, fields.name));
            Ok(ModuleRef {
                id: Uuid::new_v4(),
                kind: kind.to_owned(),
            })
        }

        async fn delegated_section(&self, _module: &ModuleRef) -> PortResult<Option<SectionRef>> {
            Ok(None)
        }

        async fn list_modules(&self, _course: Uuid) -> PortResult<Vec<ModuleDescriptor>> {
            Ok(Vec::new())
        }
    }

    fn plan(kind: &str, name: Option<&str>) -> ActivityPlan {
        ActivityPlan {
            kind: kind.to_owned(),
            name: name.map(str::to_owned),
            description: None,
            extra: Map::new(),
        }
    }

    fn registry() -> (Arc<RecordingModules>, HandlerRegistry) {
        let modules = Arc::new(RecordingModules::default());
        let registry = HandlerRegistry::with_defaults(modules.clone());
        (modules, registry)
    }

    #[tokio::test]
    async fn known_kinds_create_modules_with_messages() {
        let (modules, registry) = registry();
        let outcome = registry
            .create_for_section(
                &[plan("quiz", Some("Quiz 1")), plan("forum", None)],
                Uuid::new_v4(),
                4,
            )
            .await;

        assert_eq!(
            outcome.created,
            vec![
                "Activity created: Quiz 1".to_owned(),
                "Activity created: forum".to_owned(),
            ]
        );
        assert!(outcome.warnings.is_empty());
        let created = modules.created.lock().unwrap();
        assert_eq!(created[0], ("quiz".to_owned(), 4, "Quiz 1".to_owned()));
        assert_eq!(created[1].2, "AI Generated Forum");
    }

    #[tokio::test]
    async fn labels_are_refused_with_a_warning() {
        let (modules, registry) = registry();
        let outcome = registry
            .create_for_section(&[plan("label", Some("Banner"))], Uuid::new_v4(), 1)
            .await;

        assert!(outcome.created.is_empty());
        assert_eq!(outcome.warnings.len(), 1);
        assert!(outcome.warnings[0].contains("Label activities"));
        assert!(modules.created.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_kinds_warn_without_blocking_siblings() {
        let (modules, registry) = registry();
        let outcome = registry
            .create_for_section(
                &[plan("hologram", Some("Future")), plan("quiz", Some("Q"))],
                Uuid::new_v4(),
                2,
            )
            .await;

        assert_eq!(
            outcome.warnings,
            vec![r#"The generated activity type "hologram" is not available on this site."#.to_owned()]
        );
        assert_eq!(outcome.created, vec!["Activity created: Q".to_owned()]);
        assert_eq!(modules.created.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn creation_failure_becomes_a_warning() {
        let (_, registry) = registry();
        let outcome = registry
            .create_for_section(
                &[plan("quiz", Some("boom")), plan("book", Some("Reader"))],
                Uuid::new_v4(),
                3,
            )
            .await;

        assert_eq!(outcome.warnings.len(), 1);
        assert!(outcome.warnings[0].contains("\"quiz\""));
        assert_eq!(outcome.created, vec!["Activity created: Reader".to_owned()]);
    }

    #[tokio::test]
    async fn url_activities_require_an_external_url() {
        let (modules, registry) = registry();
        let mut with_url = plan("url", Some("Reading"));
        with_url.extra = {
            let mut extra = Map::new();
            extra.insert("externalurl".into(), json!("https://example.com"));
            extra
        };
        let outcome = registry
            .create_for_section(
                &[plan("url", Some("No link")), with_url],
                Uuid::new_v4(),
                1,
            )
            .await;

        assert_eq!(outcome.warnings.len(), 1);
        assert_eq!(outcome.created, vec!["Activity created: Reading".to_owned()]);
        let created = modules.created.lock().unwrap();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].0, "url");
    }

    #[tokio::test]
    async fn kind_matching_is_case_insensitive() {
        let (_, registry) = registry();
        let outcome = registry
            .create_for_section(&[plan("Quiz", Some("Upper"))], Uuid::new_v4(), 1)
            .await;
        assert_eq!(outcome.created, vec!["Activity created: Upper".to_owned()]);
        assert!(registry.handler("QUIZ").is_some());
        assert!(registry.handler("hologram").is_none());
    }
}
