pub mod activities;
pub mod course_db;
pub mod file_store;
pub mod generation_llm;
pub mod pdf_tool;

pub use activities::HandlerRegistry;
pub use course_db::CourseDbAdapter;
pub use file_store::DraftFileStore;
pub use generation_llm::OpenAiGenerationAdapter;
pub use pdf_tool::PdftotextTool;
