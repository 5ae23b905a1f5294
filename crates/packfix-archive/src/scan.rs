//! Single-pass search for the manifest and pack icon entries.

use crate::format::entry_matches;
use crate::reader::ZipStreamReader;
use crate::ArchiveError;
use std::io::{self, Read, Write};
use tracing::{debug, warn};

pub const DEFAULT_MAX_MANIFEST_BYTES: usize = 1024 * 1024;

#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Base file name of the manifest entry.
    pub manifest_name: String,
    /// Base file name of the pack icon entry.
    pub icon_name: String,
    /// Manifests larger than this are recorded but not decoded.
    pub max_manifest_bytes: usize,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            manifest_name: "manifest.json".to_owned(),
            icon_name: "pack_icon.png".to_owned(),
            max_manifest_bytes: DEFAULT_MAX_MANIFEST_BYTES,
        }
    }
}

/// Contents of the manifest entry, as far as they could be decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestText {
    Utf8(String),
    InvalidUtf8,
    TooLarge { limit: usize },
    /// Entry data cannot be read (encryption or an unknown compression method).
    Unsupported(String),
}

impl ManifestText {
    /// Human-readable reason the text is unavailable, if it is.
    pub fn unreadable_reason(&self) -> Option<String> {
        match self {
            Self::Utf8(_) => None,
            Self::InvalidUtf8 => Some("manifest is not valid UTF-8".to_owned()),
            Self::TooLarge { limit } => Some(format!("manifest exceeds {limit} bytes")),
            Self::Unsupported(reason) => Some(reason.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    /// Entry path exactly as stored in the archive.
    pub path: String,
    pub text: ManifestText,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanReport {
    pub manifest: Option<ManifestEntry>,
    pub has_pack_icon: bool,
    pub entry_count: usize,
    /// Later manifest entries ignored because an earlier one matched.
    pub shadowed_manifests: Vec<String>,
}

/// Keeps at most `limit` bytes and remembers whether more were offered.
struct BoundedBuffer {
    data: Vec<u8>,
    limit: usize,
    overflowed: bool,
}

impl Write for BoundedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let room = self.limit.saturating_sub(self.data.len());
        if buf.len() > room {
            self.overflowed = true;
        }
        self.data.extend_from_slice(&buf[..buf.len().min(room)]);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Walk every entry of `reader` once, recording the first manifest match and
/// whether a pack icon exists anywhere in the archive.
pub fn scan_archive<R: Read>(reader: R, options: &ScanOptions) -> Result<ScanReport, ArchiveError> {
    let mut zip = ZipStreamReader::new(reader);
    let mut report = ScanReport::default();

    while let Some(entry) = zip.next_entry()? {
        if entry.is_dir() {
            continue;
        }

        if entry_matches(&entry.name, &options.icon_name) {
            report.has_pack_icon = true;
            continue;
        }

        if !entry_matches(&entry.name, &options.manifest_name) {
            continue;
        }

        if report.manifest.is_some() {
            debug!("ignoring later manifest '{}'", entry.name);
            report.shadowed_manifests.push(entry.name);
            continue;
        }

        let text = read_manifest(&mut zip, options.max_manifest_bytes)?;
        debug!("manifest found at '{}'", entry.name);
        report.manifest = Some(ManifestEntry {
            path: entry.name,
            text,
        });
    }

    report.entry_count = zip.entries_seen();
    Ok(report)
}

fn read_manifest<R: Read>(
    zip: &mut ZipStreamReader<R>,
    limit: usize,
) -> Result<ManifestText, ArchiveError> {
    let mut buf = BoundedBuffer {
        data: Vec::new(),
        limit,
        overflowed: false,
    };
    match zip.read_data(&mut buf) {
        Ok(_) => {}
        Err(ArchiveError::Unsupported(reason)) => {
            warn!("manifest entry cannot be read: {reason}");
            return Ok(ManifestText::Unsupported(reason));
        }
        Err(e) => return Err(e),
    }
    if buf.overflowed {
        return Ok(ManifestText::TooLarge { limit });
    }
    Ok(match String::from_utf8(buf.data) {
        Ok(text) => ManifestText::Utf8(text),
        Err(_) => ManifestText::InvalidUtf8,
    })
}
