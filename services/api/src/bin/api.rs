//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{
        CourseDbAdapter, DraftFileStore, HandlerRegistry, OpenAiGenerationAdapter, PdftotextTool,
    },
    config::Config,
    error::ApiError,
    web::{
        approve_module_handler, create_book_handler, generate_module_handler,
        list_templates_handler, rest::ApiDoc, state::AppState, upload_supporting_files_handler,
    },
};
use async_openai::{config::OpenAIConfig, Client};
use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    routing::{get, post},
    Router,
};
use module_assistant_core::ports::{CoursePersistence, ModulePersistence};
use module_assistant_core::template::TemplateCatalog;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to Database & Run Migrations ---
    info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    let course_db = Arc::new(CourseDbAdapter::new(
        db_pool.clone(),
        config.installed_layouts.clone(),
    ));
    info!("Running database migrations...");
    course_db
        .run_migrations()
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    info!("Database migrations complete.");

    // --- 3. Initialize Service Adapters ---
    let openai_config = OpenAIConfig::new().with_api_key(
        config
            .openai_api_key
            .as_ref()
            .ok_or_else(|| ApiError::Internal("OPENAI_API_KEY is required".to_string()))?,
    );
    let openai_client = Client::with_config(openai_config);

    let backend = Arc::new(OpenAiGenerationAdapter::new(
        openai_client,
        config.generation_model.clone(),
    ));
    let files = Arc::new(DraftFileStore::new(db_pool));
    let pdf_tool = Arc::new(PdftotextTool::discover());

    let courses: Arc<dyn CoursePersistence> = course_db.clone();
    let modules: Arc<dyn ModulePersistence> = course_db;
    let activities = Arc::new(HandlerRegistry::with_defaults(modules.clone()));

    let templates = if config.enable_templates {
        TemplateCatalog::parse(&config.curriculum_templates)
    } else {
        TemplateCatalog::default()
    };

    // --- 4. Build the Shared AppState ---
    let app_state = AppState {
        config: config.clone(),
        courses,
        modules,
        activities,
        backend,
        files,
        pdf_tool,
        templates,
    };

    let cors = tower_http::cors::CorsLayer::new()
        .allow_origin(
            config
                .course_base_url
                .parse::<HeaderValue>()
                .map_err(|e| ApiError::Internal(e.to_string()))?,
        )
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    // --- 5. Create the Web Router ---
    let api_router = Router::new()
        .route("/modules/generate", post(generate_module_handler))
        .route("/modules/approve", post(approve_module_handler))
        .route("/templates", get(list_templates_handler))
        .route("/uploads", post(upload_supporting_files_handler))
        .route("/activities/from-document", post(create_book_handler))
        .layer(DefaultBodyLimit::max(10 * 1024 * 1024))
        .layer(cors)
        .with_state(app_state);

    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
