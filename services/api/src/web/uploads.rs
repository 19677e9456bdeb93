//! services/api/src/web/uploads.rs
//!
//! Handlers for the upload workflows: staging supporting documents into a
//! draft area for generation, and turning one uploaded document straight
//! into a chapter-based book activity.

use crate::web::state::AppState;
use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use module_assistant_core::domain::{
    ActivityPlan, UploadedFile, MAX_SUPPORTING_FILES,
};
use module_assistant_core::extract::{extract, split_into_chapters};
use serde::Serialize;
use serde_json::json;
use tracing::warn;
use utoipa::ToSchema;
use uuid::Uuid;

/// Response after staging supporting documents.
#[derive(Serialize, ToSchema)]
pub struct UploadAreaResponse {
    /// Draft area id to pass to `/modules/generate`.
    pub area_id: Uuid,
    pub files: Vec<String>,
}

/// Response after creating a book activity from an uploaded document.
#[derive(Serialize, ToSchema)]
pub struct BookCreatedResponse {
    pub message: String,
    pub chapters: usize,
}

/// Stage supporting documents for a later generation request.
///
/// Accepts up to five files in one multipart request; extra files are
/// ignored with a warning in the logs.
#[utoipa::path(
    post,
    path = "/uploads",
    request_body(content_type = "multipart/form-data", description = "Up to five supporting documents."),
    responses(
        (status = 201, description = "Files staged", body = UploadAreaResponse),
        (status = 400, description = "No files in the request")
    )
)]
pub async fn upload_supporting_files_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let area = Uuid::new_v4();
    let mut stored = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to read multipart data: {}", e),
        )
    })? {
        let Some(filename) = field.file_name().map(str::to_owned) else {
            continue;
        };
        if stored.len() >= MAX_SUPPORTING_FILES {
            warn!(filename, "ignoring file beyond the supporting-document limit");
            continue;
        }
        let mimetype = field.content_type().unwrap_or_default().to_owned();
        let bytes = field.bytes().await.map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to read file bytes: {}", e),
            )
        })?;

        state
            .files
            .store(
                area,
                UploadedFile {
                    filename: filename.clone(),
                    mimetype,
                    bytes: bytes.to_vec(),
                },
            )
            .await
            .map_err(|e| {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Failed to store uploaded file: {}", e),
                )
            })?;
        stored.push(filename);
    }

    if stored.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "The request must include at least one file.".to_string(),
        ));
    }

    Ok((
        StatusCode::CREATED,
        Json(UploadAreaResponse {
            area_id: area,
            files: stored,
        }),
    ))
}

/// Create a book activity from an uploaded document.
///
/// Extracts the document text, splits it into chapters, and creates a
/// `book` module holding them. Unlike supporting-document extraction, an
/// empty result here is a hard error: there is nothing to build from.
#[utoipa::path(
    post,
    path = "/activities/from-document",
    request_body(content_type = "multipart/form-data", description = "The document, course id, activity name, and target section."),
    responses(
        (status = 201, description = "Book activity created", body = BookCreatedResponse),
        (status = 400, description = "Missing file, course id, or activity name"),
        (status = 404, description = "File upload workflow is disabled"),
        (status = 422, description = "No chapters could be extracted")
    )
)]
pub async fn create_book_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    if !state.config.enable_file_upload {
        return Err((
            StatusCode::NOT_FOUND,
            "The file upload workflow is not enabled on this site.".to_string(),
        ));
    }

    let mut file: Option<UploadedFile> = None;
    let mut course_id: Option<Uuid> = None;
    let mut activity_name: Option<String> = None;
    let mut intro: Option<String> = None;
    let mut section_number: i64 = 0;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to read multipart data: {}", e),
        )
    })? {
        let field_name = field.name().unwrap_or_default().to_owned();
        match field_name.as_str() {
            "file" => {
                let filename = field.file_name().unwrap_or("untitled.txt").to_owned();
                let mimetype = field.content_type().unwrap_or_default().to_owned();
                let bytes = field.bytes().await.map_err(|e| {
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        format!("Failed to read file bytes: {}", e),
                    )
                })?;
                file = Some(UploadedFile {
                    filename,
                    mimetype,
                    bytes: bytes.to_vec(),
                });
            }
            "course_id" => {
                let raw = field.text().await.unwrap_or_default();
                course_id = Uuid::parse_str(raw.trim()).ok();
            }
            "name" => activity_name = field.text().await.ok(),
            "intro" => intro = field.text().await.ok(),
            "section" => {
                section_number = field
                    .text()
                    .await
                    .ok()
                    .and_then(|raw| raw.trim().parse().ok())
                    .unwrap_or(0);
            }
            _ => {}
        }
    }

    let file = file.ok_or((
        StatusCode::BAD_REQUEST,
        "No file was uploaded. Please select a file to upload.".to_string(),
    ))?;
    let course_id = course_id.ok_or((
        StatusCode::BAD_REQUEST,
        "A course id is required.".to_string(),
    ))?;
    let activity_name = activity_name
        .filter(|name| !name.trim().is_empty())
        .ok_or((
            StatusCode::BAD_REQUEST,
            "An activity name is required.".to_string(),
        ))?;

    let extracted = extract(&file.bytes, &file.filename, &file.mimetype, &*state.pdf_tool).await;
    let chapters = split_into_chapters(&extracted.text);
    if chapters.is_empty() {
        return Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            "Could not extract chapters from the uploaded file. Ensure it is a valid document (.docx or .odt).".to_string(),
        ));
    }

    let handler = state.activities.handler("book").ok_or((
        StatusCode::INTERNAL_SERVER_ERROR,
        "Book activity handler not available.".to_string(),
    ))?;

    let chapter_count = chapters.len();
    let mut extra = serde_json::Map::new();
    extra.insert("chapters".to_string(), json!(chapters));
    let plan = ActivityPlan {
        kind: "book".to_string(),
        name: Some(activity_name.clone()),
        description: intro.clone(),
        extra,
    };
    handler
        .create(&plan, course_id, section_number)
        .await
        .map_err(|error| {
            warn!(%error, "book activity creation failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Unable to create the \"book\" activity automatically. Please review the course."
                    .to_string(),
            )
        })?;

    Ok((
        StatusCode::CREATED,
        Json(BookCreatedResponse {
            message: format!(
                "Book activity \"{activity_name}\" has been created successfully with imported chapters."
            ),
            chapters: chapter_count,
        }),
    ))
}
