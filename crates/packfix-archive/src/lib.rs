//! Streaming zip access for resource pack archives.
//!
//! This crate provides the archive layer: a forward-only `ZipStreamReader`
//! that walks local file headers without seeking, a `ZipStreamWriter` that
//! emits a complete archive to any `Write`, `scan_archive` to locate the
//! manifest and pack icon in a single pass, and `rewrite_archive` to copy an
//! archive while replacing its manifest entry.

pub mod format;
pub mod reader;
pub mod rewrite;
pub mod scan;
pub mod source;
pub mod writer;

pub use format::{
    entry_matches, paths_equal_ignore_case, CompressionMethod, DosDateTime, EntryHeader,
};
pub use reader::ZipStreamReader;
pub use rewrite::{rewrite_archive, RewritePlan, RewriteSummary};
pub use scan::{scan_archive, ManifestEntry, ManifestText, ScanOptions, ScanReport};
pub use source::ArchiveSource;
pub use writer::{EntryStats, ZipStreamWriter};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("archive I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("not a zip archive")]
    NotAZip,
    #[error("archive is truncated")]
    Truncated,
    #[error("archive is corrupt: {0}")]
    Corrupt(String),
    #[error("unsupported archive feature: {0}")]
    Unsupported(String),
    #[error("operation cancelled")]
    Cancelled,
    #[error("no entry is positioned for reading")]
    NoCurrentEntry,
}

/// Classify an error raised while pulling bytes out of an archive stream.
pub(crate) fn read_error(e: std::io::Error) -> ArchiveError {
    match e.kind() {
        std::io::ErrorKind::UnexpectedEof => ArchiveError::Truncated,
        std::io::ErrorKind::InvalidData | std::io::ErrorKind::InvalidInput => {
            ArchiveError::Corrupt(e.to_string())
        }
        _ => ArchiveError::Io(e),
    }
}
