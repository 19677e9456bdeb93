//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use module_assistant_core::ports::{
    ActivityRegistry, CoursePersistence, FileStore, GenerationBackend, ModulePersistence,
    PdfTextTool,
};
use module_assistant_core::template::TemplateCatalog;
use std::sync::Arc;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub courses: Arc<dyn CoursePersistence>,
    pub modules: Arc<dyn ModulePersistence>,
    pub activities: Arc<dyn ActivityRegistry>,
    pub backend: Arc<dyn GenerationBackend>,
    pub files: Arc<dyn FileStore>,
    pub pdf_tool: Arc<dyn PdfTextTool>,
    /// Parsed once from configuration; empty when templates are disabled.
    pub templates: TemplateCatalog,
}
