//! services/api/src/web/generation.rs
//!
//! Axum handlers for the two-phase generation flow: `generate` composes
//! the prompt, calls the AI backend, and returns a preview with an opaque
//! approval token; `approve` decodes and re-validates the token and
//! materializes the outline into the course.

use crate::web::state::AppState;
use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use base64::Engine;
use module_assistant_core::compose::compose;
use module_assistant_core::domain::{
    GenerationRequest, StructureType, TemplateData, MAX_SUPPORTING_FILES,
};
use module_assistant_core::extract::extract;
use module_assistant_core::generation::{run_generation, GenerationOutcome};
use module_assistant_core::materialize::{materialize, MaterializeContext, MaterializeOptions};
use module_assistant_core::outline::ModuleOutline;
use module_assistant_core::ports::PortError;
use module_assistant_core::summary::summarize;
use module_assistant_core::template::read_template;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

const VALIDATION_ERROR_HELP: &str = "The AI response was malformed and cannot be used to create \
content. This sometimes happens when the AI double-encodes the response or returns an incorrect \
structure. Please try generating again with the same or modified prompt.";

const TIMEOUT_MESSAGE: &str = "Your request is taking longer than expected. Please try with a \
shorter prompt or try again later.";

const RETURN_TO_COURSE_LABEL: &str = "Return to course home";

//=========================================================================================
// API Request and Response Payloads
//=========================================================================================

fn default_structure_type() -> String {
    "weekly".to_string()
}

fn default_true() -> bool {
    true
}

/// The instructor's generation request.
#[derive(Deserialize, ToSchema)]
pub struct GenerateModuleRequest {
    pub course_id: Uuid,
    pub prompt: String,
    #[serde(default = "default_structure_type")]
    pub structure_type: String,
    #[serde(default = "default_true")]
    pub include_activities: bool,
    #[serde(default)]
    pub keep_date_labels: bool,
    #[serde(default)]
    pub include_about_assessments: bool,
    #[serde(default)]
    pub include_about_learning: bool,
    /// Configured curriculum template label, if one was selected.
    #[serde(default)]
    pub template: Option<String>,
    /// Draft area holding up to five supporting documents.
    #[serde(default)]
    pub upload_area: Option<Uuid>,
}

/// The preview returned after a successful generation.
#[derive(Serialize, ToSchema)]
pub struct GeneratePreviewResponse {
    /// Short human summary of what the plan would create.
    pub summary: String,
    /// The full validated outline, for review.
    pub outline: serde_json::Value,
    /// Opaque token carrying the validated outline into `approve`.
    pub approval_token: String,
    /// The exact composed prompt sent to the AI backend.
    pub debug_prompt: String,
}

/// Returned when the AI response failed validation; approval is blocked.
#[derive(Serialize, ToSchema)]
pub struct ValidationErrorResponse {
    pub validation_error: String,
    pub help: String,
}

/// The approval submission, echoing the structural flags.
#[derive(Deserialize, ToSchema)]
pub struct ApproveModuleRequest {
    pub course_id: Uuid,
    pub approval_token: String,
    #[serde(default)]
    pub keep_date_labels: bool,
    #[serde(default)]
    pub include_about_assessments: bool,
    #[serde(default)]
    pub include_about_learning: bool,
    /// Echoed template label; switches on id-uniquification of generated HTML.
    #[serde(default)]
    pub template: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct ReturnTarget {
    pub label: String,
    pub url: String,
}

/// The materialization results report.
#[derive(Serialize, ToSchema)]
pub struct ApproveModuleResponse {
    pub created: Vec<String>,
    pub warnings: Vec<String>,
    pub return_target: ReturnTarget,
}

//=========================================================================================
// Approval Token
//=========================================================================================

/// Wire form of the opaque approval token: the validated outline plus the
/// structure type it was validated against.
#[derive(Serialize, Deserialize)]
struct ApprovalToken {
    structure_type: String,
    outline: serde_json::Value,
}

fn encode_approval_token(outline: &ModuleOutline, structure: StructureType) -> String {
    let token = ApprovalToken {
        structure_type: structure.as_str().to_owned(),
        outline: outline.to_value(),
    };
    // Serializing a Value plus a string cannot fail.
    let bytes = serde_json::to_vec(&token).unwrap_or_default();
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

enum TokenError {
    Malformed,
    Invalid(String),
}

fn decode_approval_token(token: &str) -> Result<(StructureType, ModuleOutline), TokenError> {
    let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(token.trim())
        .map_err(|_| TokenError::Malformed)?;
    let token: ApprovalToken =
        serde_json::from_slice(&bytes).map_err(|_| TokenError::Malformed)?;
    let structure = StructureType::parse(&token.structure_type).ok_or(TokenError::Malformed)?;
    let outline = ModuleOutline::from_value(&token.outline, structure)
        .map_err(|error| TokenError::Invalid(error.message))?;
    Ok((structure, outline))
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Generate a module outline preview from a prompt.
///
/// Runs the full composition/generation/validation pipeline and returns a
/// preview for approval. No course content is created by this step.
#[utoipa::path(
    post,
    path = "/modules/generate",
    request_body = GenerateModuleRequest,
    responses(
        (status = 200, description = "Preview of the generated outline", body = GeneratePreviewResponse),
        (status = 400, description = "Missing prompt or unknown structure type"),
        (status = 422, description = "The AI response failed validation", body = ValidationErrorResponse),
        (status = 502, description = "The AI backend failed"),
        (status = 504, description = "The AI backend timed out")
    )
)]
pub async fn generate_module_handler(
    State(state): State<AppState>,
    Json(body): Json<GenerateModuleRequest>,
) -> Result<Response, (StatusCode, String)> {
    if body.prompt.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "A prompt is required to generate module content.".to_string(),
        ));
    }
    let structure = StructureType::parse(&body.structure_type).ok_or_else(|| {
        (
            StatusCode::BAD_REQUEST,
            format!("Unknown structure type '{}'.", body.structure_type),
        )
    })?;

    // Extract text from any uploaded supporting documents, in upload order.
    let mut supporting_texts = Vec::new();
    if let Some(area) = body.upload_area {
        let uploaded = state.files.read_uploaded(area).await.map_err(|error| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Could not read uploaded files: {error}"),
            )
        })?;
        for file in uploaded.into_iter().take(MAX_SUPPORTING_FILES) {
            supporting_texts
                .push(extract(&file.bytes, &file.filename, &file.mimetype, &*state.pdf_tool).await);
        }
    }

    let request = GenerationRequest {
        course_id: body.course_id,
        freeform_prompt: body.prompt.clone(),
        structure_type: structure,
        include_activities: body.include_activities,
        keep_date_labels: body.keep_date_labels,
        include_about_assessments: body.include_about_assessments,
        include_about_learning: body.include_about_learning,
        template_ref: body.template.clone(),
        supporting_texts,
    }
    .normalized();

    let template = resolve_template(&state, request.template_ref.as_deref()).await;
    let final_prompt = compose(&request, template.as_ref());

    info!(course = %request.course_id, structure = structure.as_str(), "starting module generation");
    let outcome = tokio::time::timeout(
        state.config.generation_timeout,
        run_generation(&*state.backend, &final_prompt, structure),
    )
    .await;

    let outcome = match outcome {
        Err(_) => return Err((StatusCode::GATEWAY_TIMEOUT, TIMEOUT_MESSAGE.to_string())),
        Ok(Err(error)) => {
            return Err((StatusCode::BAD_GATEWAY, format!("AI error: {error}")));
        }
        Ok(Ok(outcome)) => outcome,
    };

    match outcome {
        GenerationOutcome::Invalid(error) => {
            warn!(course = %request.course_id, "generation response failed validation");
            Ok((
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(ValidationErrorResponse {
                    validation_error: error.message,
                    help: VALIDATION_ERROR_HELP.to_string(),
                }),
            )
                .into_response())
        }
        GenerationOutcome::Outline(outline) => {
            let preview = GeneratePreviewResponse {
                summary: summarize(&outline),
                outline: outline.to_value(),
                approval_token: encode_approval_token(&outline, structure),
                debug_prompt: final_prompt.debug_echo,
            };
            Ok((StatusCode::OK, Json(preview)).into_response())
        }
    }
}

/// Approve a generated outline and materialize it into the course.
#[utoipa::path(
    post,
    path = "/modules/approve",
    request_body = ApproveModuleRequest,
    responses(
        (status = 200, description = "Materialization report", body = ApproveModuleResponse),
        (status = 400, description = "Malformed approval token"),
        (status = 404, description = "Course not found"),
        (status = 422, description = "The token's outline failed validation", body = ValidationErrorResponse)
    )
)]
pub async fn approve_module_handler(
    State(state): State<AppState>,
    Json(body): Json<ApproveModuleRequest>,
) -> Result<Response, (StatusCode, String)> {
    let (structure, outline) = match decode_approval_token(&body.approval_token) {
        Ok(decoded) => decoded,
        Err(TokenError::Malformed) => {
            return Err((
                StatusCode::BAD_REQUEST,
                "The approval token could not be decoded.".to_string(),
            ));
        }
        Err(TokenError::Invalid(message)) => {
            return Ok((
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(ValidationErrorResponse {
                    validation_error: message,
                    help: VALIDATION_ERROR_HELP.to_string(),
                }),
            )
                .into_response());
        }
    };

    let options = MaterializeOptions {
        course_id: body.course_id,
        structure_type: structure,
        keep_date_labels: body.keep_date_labels,
        include_about_assessments: body.include_about_assessments,
        include_about_learning: body.include_about_learning,
    };
    let template_used = body
        .template
        .as_deref()
        .is_some_and(|label| !label.trim().is_empty());

    let ctx = MaterializeContext {
        courses: &*state.courses,
        modules: &*state.modules,
        activities: &*state.activities,
    };
    info!(course = %body.course_id, structure = structure.as_str(), "materializing approved outline");
    let report = materialize(&outline, &options, template_used, &ctx)
        .await
        .map_err(|error| match error {
            PortError::NotFound(message) => (StatusCode::NOT_FOUND, message),
            other => (StatusCode::INTERNAL_SERVER_ERROR, other.to_string()),
        })?;

    let response = ApproveModuleResponse {
        created: report.created,
        warnings: report.warnings,
        return_target: ReturnTarget {
            label: RETURN_TO_COURSE_LABEL.to_string(),
            url: format!(
                "{}/course/view.php?id={}",
                state.config.course_base_url.trim_end_matches('/'),
                body.course_id
            ),
        },
    };
    Ok((StatusCode::OK, Json(response)).into_response())
}

/// Resolves the selected curriculum template, downgrading every failure to
/// template-less generation: the template is a bias, not a requirement.
async fn resolve_template(state: &AppState, template_ref: Option<&str>) -> Option<TemplateData> {
    let label = template_ref?.trim();
    if label.is_empty() || !state.config.enable_templates {
        return None;
    }
    let Some(entry) = state.templates.find(label) else {
        warn!(label, "selected curriculum template is not configured");
        return None;
    };
    match read_template(entry, &*state.courses, &*state.modules).await {
        Ok(data) => Some(data),
        Err(error) => {
            warn!(%error, label, "curriculum template unavailable; generating without it");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn approval_token_round_trips() {
        let value = json!({"sections": [{"title": "Week 1", "summary": "Basics"}]});
        let outline = ModuleOutline::from_value(&value, StructureType::Weekly).unwrap();
        let token = encode_approval_token(&outline, StructureType::Weekly);

        let (structure, decoded) = match decode_approval_token(&token) {
            Ok(decoded) => decoded,
            Err(_) => panic!("token should decode"),
        };
        assert_eq!(structure, StructureType::Weekly);
        assert_eq!(decoded, outline);
    }

    #[test]
    fn garbage_tokens_are_rejected_as_malformed() {
        assert!(matches!(
            decode_approval_token("not-a-token!"),
            Err(TokenError::Malformed)
        ));
    }

    #[test]
    fn token_with_mismatched_shape_fails_validation() {
        // A token claiming "weekly" but carrying a themes payload must not
        // decode into a usable outline.
        let token = ApprovalToken {
            structure_type: "weekly".to_string(),
            outline: json!({"themes": []}),
        };
        let encoded = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .encode(serde_json::to_vec(&token).unwrap());
        assert!(matches!(
            decode_approval_token(&encoded),
            Err(TokenError::Invalid(_))
        ));
    }
}
