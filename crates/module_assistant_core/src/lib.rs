pub mod compose;
pub mod domain;
pub mod extract;
pub mod generation;
pub mod markup;
pub mod materialize;
pub mod outline;
pub mod ports;
pub mod summary;
pub mod template;

pub use domain::{
    ActivityPlan, GenerationRequest, MaterializationReport, ModuleDescriptor, ModuleFields,
    ModuleRef, SectionPlan, SectionRef, StructureType, SupportingText, TemplateData, ThemePlan,
    UploadedFile, WeekPlan,
};
pub use outline::{ModuleOutline, ValidationError};
pub use ports::{
    ActivityHandler, ActivityOutcome, ActivityRegistry, CoursePersistence, FileStore,
    GenerationBackend, ModulePersistence, PdfTextTool, PortError, PortResult,
};
