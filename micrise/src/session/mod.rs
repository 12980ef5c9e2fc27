//! Rise sessions: orchestration and the per-session task

pub mod orchestrator;
mod runner;

pub use orchestrator::SessionOrchestrator;
