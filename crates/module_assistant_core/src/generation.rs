//! crates/module_assistant_core/src/generation.rs
//!
//! Drives the external generation backend: appends the JSON
//! response-shape contract for the requested structure type, performs the
//! single backend call, and decodes the raw output into a validated
//! [`ModuleOutline`].
//!
//! Malformed output is reported as a [`ValidationError`] value, never used
//! as a partial plan. There is no automatic retry: one backend call per
//! user submission, since a single call can already take minutes.

use crate::compose::FinalPrompt;
use crate::domain::StructureType;
use crate::outline::{ModuleOutline, ValidationError};
use crate::ports::{GenerationBackend, PortResult};
use serde_json::Value;

const SECTIONS_RESPONSE_SHAPE: &str = r#"RESPONSE FORMAT:
Respond with a single JSON object and no surrounding prose. Use exactly this shape:
{"summary": "one-paragraph overview", "sections": [{"title": "Section title", "summary": "HTML or plain text summary", "outline": ["bullet point"], "activities": [{"type": "quiz", "name": "Activity name", "description": "What the student does"}]}]}
Activity "type" must be one of: quiz, book, forum, url, assignment. For "url" activities include an "externalurl" field with the full address."#;

const THEMES_RESPONSE_SHAPE: &str = r#"RESPONSE FORMAT:
Respond with a single JSON object and no surrounding prose. Use exactly this shape:
{"summary": "one-paragraph overview", "themes": [{"title": "Theme title", "summary": "HTML or plain text summary", "activities": [{"type": "forum", "name": "Activity name", "description": "What the student does"}], "weeks": [{"title": "Week title", "summary": "HTML or plain text summary", "activities": []}]}]}
Activity "type" must be one of: quiz, book, forum, url, assignment. For "url" activities include an "externalurl" field with the full address."#;

/// What came back from one generation attempt.
#[derive(Debug)]
pub enum GenerationOutcome {
    Outline(ModuleOutline),
    /// The backend answered, but the answer failed validation. The caller
    /// must surface this and must not proceed to preview or approval.
    Invalid(ValidationError),
}

/// Performs the single generation call and validates the response.
///
/// Backend transport failures propagate as `PortError`; response-shape
/// problems come back as [`GenerationOutcome::Invalid`].
pub async fn run_generation(
    backend: &dyn GenerationBackend,
    prompt: &FinalPrompt,
    structure: StructureType,
) -> PortResult<GenerationOutcome> {
    let full_prompt = format!("{}\n\n{}", prompt.text, response_shape(structure));
    let raw = backend.generate(&full_prompt).await?;
    Ok(match decode_outline(&raw, structure) {
        Ok(outline) => GenerationOutcome::Outline(outline),
        Err(error) => GenerationOutcome::Invalid(error),
    })
}

fn response_shape(structure: StructureType) -> &'static str {
    match structure {
        StructureType::Theme => THEMES_RESPONSE_SHAPE,
        StructureType::Weekly | StructureType::Flexible => SECTIONS_RESPONSE_SHAPE,
    }
}

/// Decodes raw backend text into a validated outline.
///
/// Tolerates two known malformations: output wrapped in a Markdown code
/// fence, and double-encoded JSON where the backend returns its JSON
/// object as an outer quoted string. A second decode pass handles the
/// latter before declaring failure.
pub fn decode_outline(raw: &str, structure: StructureType) -> Result<ModuleOutline, ValidationError> {
    let trimmed = strip_code_fence(raw.trim());

    let mut value: Value = serde_json::from_str(trimmed).map_err(|error| ValidationError {
        message: format!("The AI response could not be decoded as JSON: {error}"),
    })?;

    if let Value::String(inner) = &value {
        value = serde_json::from_str(inner).map_err(|error| ValidationError {
            message: format!(
                "The AI response was double-encoded and the inner document could not be decoded: {error}"
            ),
        })?;
    }

    ModuleOutline::from_value(&value, structure)
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop the fence's info string ("json") up to the first newline.
    let body = rest.split_once('\n').map(|(_, body)| body).unwrap_or(rest);
    body.trim_end().trim_end_matches("```").trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{PortError, PortResult};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedBackend {
        response: String,
        calls: AtomicUsize,
    }

    impl FixedBackend {
        fn new(response: &str) -> Self {
            Self {
                response: response.to_owned(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl GenerationBackend for FixedBackend {
        async fn generate(&self, _prompt: &str) -> PortResult<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.response.clone())
        }
    }

    struct FailingBackend;

    #[async_trait]
    impl GenerationBackend for FailingBackend {
        async fn generate(&self, _prompt: &str) -> PortResult<String> {
            Err(PortError::Unexpected("backend unreachable".into()))
        }
    }

    fn prompt() -> FinalPrompt {
        FinalPrompt {
            text: "Intro to databases".into(),
            debug_echo: "Intro to databases".into(),
        }
    }

    #[test]
    fn plain_json_decodes() {
        let raw = r#"{"sections": [{"title": "Week 1", "summary": "Basics"}]}"#;
        let outline = decode_outline(raw, StructureType::Weekly).unwrap();
        assert!(matches!(outline, ModuleOutline::Sections { .. }));
    }

    #[test]
    fn double_encoded_json_decodes_to_the_same_outline() {
        let inner = json!({"sections": [{"title": "Week 1", "summary": "Basics"}]});
        let single = inner.to_string();
        let double = serde_json::to_string(&single).unwrap();
        assert_eq!(
            decode_outline(&single, StructureType::Weekly).unwrap(),
            decode_outline(&double, StructureType::Weekly).unwrap()
        );
    }

    #[test]
    fn fenced_output_is_accepted() {
        let raw = "```json\n{\"sections\": []}\n```";
        assert!(decode_outline(raw, StructureType::Weekly).is_ok());
    }

    #[test]
    fn non_json_output_is_a_validation_error() {
        let error = decode_outline("not json", StructureType::Weekly).unwrap_err();
        assert!(!error.message.is_empty());
    }

    #[test]
    fn wrong_top_level_key_is_a_validation_error() {
        let raw = r#"{"themes": []}"#;
        assert!(decode_outline(raw, StructureType::Weekly).is_err());
    }

    #[tokio::test]
    async fn backend_is_called_exactly_once() {
        let backend = FixedBackend::new(r#"{"sections": []}"#);
        let outcome = run_generation(&backend, &prompt(), StructureType::Weekly)
            .await
            .unwrap();
        assert!(matches!(outcome, GenerationOutcome::Outline(_)));
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn shape_contract_is_appended_to_the_prompt() {
        struct CapturingBackend(std::sync::Mutex<String>);

        #[async_trait]
        impl GenerationBackend for CapturingBackend {
            async fn generate(&self, prompt: &str) -> PortResult<String> {
                *self.0.lock().unwrap() = prompt.to_owned();
                Ok(r#"{"themes": []}"#.into())
            }
        }

        let backend = CapturingBackend(std::sync::Mutex::new(String::new()));
        run_generation(&backend, &prompt(), StructureType::Theme)
            .await
            .unwrap();
        let sent = backend.0.lock().unwrap();
        assert!(sent.starts_with("Intro to databases"));
        assert!(sent.contains("\"themes\""));
    }

    #[tokio::test]
    async fn backend_failure_propagates_as_port_error() {
        let result = run_generation(&FailingBackend, &prompt(), StructureType::Weekly).await;
        assert!(matches!(result, Err(PortError::Unexpected(_))));
    }

    #[tokio::test]
    async fn invalid_response_is_reported_not_raised() {
        let backend = FixedBackend::new("definitely not json");
        let outcome = run_generation(&backend, &prompt(), StructureType::Weekly)
            .await
            .unwrap();
        assert!(matches!(outcome, GenerationOutcome::Invalid(_)));
    }
}
