pub mod config;
pub mod orchestrator;

pub use config::{ConfigError, ImportConfig};
pub use orchestrator::{
    CommitSummary, ImportError, ImportOrchestrator, ImportProgress, ImportResult, ImportSource,
    ImportStatus, RecordError,
};
