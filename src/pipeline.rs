pub mod context;
pub mod orchestrator;
