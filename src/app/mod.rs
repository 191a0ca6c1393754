mod orchestrator;
mod runtime;
mod shutdown;
mod startup;
mod types;

#[cfg(test)]
mod tests;

pub use orchestrator::PpeOrchestrator;
pub use types::{ComponentState, ShutdownReason};
