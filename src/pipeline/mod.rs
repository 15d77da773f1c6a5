pub mod keywords;
pub mod orchestrator;
pub mod sampling;

pub use orchestrator::{GenerationOutcome, Orchestrator, SearchSettings};
