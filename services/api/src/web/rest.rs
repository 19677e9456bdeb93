//! services/api/src/web/rest.rs
//!
//! Contains the master definition for the OpenAPI specification.

use crate::web::generation::{
    ApproveModuleRequest, ApproveModuleResponse, GenerateModuleRequest, GeneratePreviewResponse,
    ReturnTarget, ValidationErrorResponse,
};
use crate::web::templates::TemplateOptionResponse;
use crate::web::uploads::{BookCreatedResponse, UploadAreaResponse};
use utoipa::OpenApi;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::web::generation::generate_module_handler,
        crate::web::generation::approve_module_handler,
        crate::web::templates::list_templates_handler,
        crate::web::uploads::upload_supporting_files_handler,
        crate::web::uploads::create_book_handler,
    ),
    components(
        schemas(
            GenerateModuleRequest,
            GeneratePreviewResponse,
            ValidationErrorResponse,
            ApproveModuleRequest,
            ApproveModuleResponse,
            ReturnTarget,
            TemplateOptionResponse,
            UploadAreaResponse,
            BookCreatedResponse,
        )
    ),
    tags(
        (name = "Module Assistant API", description = "API endpoints for AI-assisted course module generation.")
    )
)]
pub struct ApiDoc;
