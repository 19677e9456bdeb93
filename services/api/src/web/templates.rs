//! services/api/src/web/templates.rs
//!
//! Lists the configured curriculum templates for the generator form.

use crate::web::state::AppState;
use axum::extract::{Json, State};
use serde::Serialize;
use utoipa::ToSchema;

/// One selectable curriculum template.
#[derive(Serialize, ToSchema)]
pub struct TemplateOptionResponse {
    pub id: String,
    pub label: String,
}

/// List the configured curriculum templates.
///
/// Returns an empty list when the template system is disabled, in which
/// case the front end omits the selector entirely.
#[utoipa::path(
    get,
    path = "/templates",
    responses(
        (status = 200, description = "Configured templates", body = [TemplateOptionResponse])
    )
)]
pub async fn list_templates_handler(
    State(state): State<AppState>,
) -> Json<Vec<TemplateOptionResponse>> {
    if !state.config.enable_templates {
        return Json(Vec::new());
    }
    Json(
        state
            .templates
            .list()
            .into_iter()
            .map(|option| TemplateOptionResponse {
                id: option.id,
                label: option.label,
            })
            .collect(),
    )
}
