pub mod catalog;
pub mod config;
pub mod naming;
pub mod orchestrator;
pub mod pipeline;
pub mod prune;
pub mod report;
pub mod tools;

pub const VERSION: Option<&str> = option_env!("CUMULUS_VERSION");
