//! Core orchestration engine for resource pack validation and repair.
//!
//! This crate ties the archive layer and the schema layer together into the
//! `Engine`: scan an archive, validate its manifest, rewrite the archive with
//! a synthesized manifest when validation fails, and project the result into
//! `PackInfo`. It also provides the TOML configuration file, the observer
//! seam used for logging, and the Ctrl-C cancellation flag.

pub mod concurrency;
pub mod config;
pub mod engine;
pub mod observer;

pub use concurrency::{install_signal_handler, shutdown_requested};
pub use config::{default_config_path, ConfigError, EngineConfig};
pub use engine::{validation_from_scan, Engine, LoadedPack, RepairOutcome, RepairReport};
pub use observer::{EventLevel, PackObserver, RecordedEvent, RecordingObserver, TracingObserver};

use packfix_schema::ManifestIssue;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("archive error: {0}")]
    Archive(#[from] packfix_archive::ArchiveError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("pack is still invalid after repair: {}", join_issues(.issues))]
    Unrepairable { issues: Vec<ManifestIssue> },
}

fn join_issues(issues: &[ManifestIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
