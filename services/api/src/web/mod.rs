pub mod generation;
pub mod rest;
pub mod state;
pub mod templates;
pub mod uploads;

// Re-export the handlers to make them easily accessible to the binary
// that will build the web server router.
pub use generation::{approve_module_handler, generate_module_handler};
pub use templates::list_templates_handler;
pub use uploads::{create_book_handler, upload_supporting_files_handler};
