pub mod orchestrator;
pub mod translate;

pub use orchestrator::{InferenceOrchestrator, Outcome};
pub use translate::TranslationTable;
