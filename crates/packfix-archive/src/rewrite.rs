//! Copy an archive entry by entry, dropping some entries and appending one.

use crate::format::DosDateTime;
use crate::reader::ZipStreamReader;
use crate::writer::ZipStreamWriter;
use crate::ArchiveError;
use std::io::{Read, Write};
use tracing::{debug, info};

pub struct RewritePlan<'a> {
    /// Entries for which this returns true are not copied.
    pub drop_entry: &'a dyn Fn(&str) -> bool,
    pub replacement_name: &'a str,
    pub replacement: &'a [u8],
    /// Polled before each entry; returning true aborts with `Cancelled`.
    pub abort: Option<&'a dyn Fn() -> bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RewriteSummary {
    /// Entries copied from the source, directories included.
    pub copied: usize,
    pub dropped: Vec<String>,
    /// Uncompressed payload bytes copied.
    pub bytes_copied: u64,
}

impl RewriteSummary {
    /// Entries in the output archive, replacement included.
    pub fn output_entries(&self) -> usize {
        self.copied + 1
    }
}

/// Stream every entry of `source` into `dest` except those `plan` drops, then
/// append the replacement entry last.
///
/// Names, payloads and timestamps of copied entries are preserved. On error
/// `dest` holds an incomplete archive and must be discarded.
pub fn rewrite_archive<R: Read, W: Write>(
    source: R,
    dest: W,
    plan: &RewritePlan<'_>,
) -> Result<(W, RewriteSummary), ArchiveError> {
    let mut reader = ZipStreamReader::new(source);
    let mut writer = ZipStreamWriter::new(dest);
    let mut summary = RewriteSummary::default();
    let cancelled = || plan.abort.is_some_and(|abort| abort());

    loop {
        if cancelled() {
            return Err(ArchiveError::Cancelled);
        }
        let Some(entry) = reader.next_entry()? else {
            break;
        };

        if (plan.drop_entry)(&entry.name) {
            debug!("dropping '{}'", entry.name);
            summary.dropped.push(entry.name);
            continue;
        }

        if entry.is_dir() {
            writer.add_directory(&entry.name, entry.modified)?;
        } else {
            let stats = writer.add_entry(&entry.name, entry.modified, |out| {
                reader.read_data(out).map(|_| ())
            })?;
            summary.bytes_copied += stats.uncompressed_size;
        }
        summary.copied += 1;
    }

    if cancelled() {
        return Err(ArchiveError::Cancelled);
    }
    writer.add_bytes(plan.replacement_name, DosDateTime::now(), plan.replacement)?;
    let written = writer.entry_count();
    let dest = writer.finish()?;

    info!(
        "rewrote archive: {written} entries written, {} dropped",
        summary.dropped.len()
    );
    Ok((dest, summary))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::paths_equal_ignore_case;
    use std::cell::Cell;
    use std::io::Cursor;

    fn source() -> Vec<u8> {
        let stamp = DosDateTime {
            time: 0x5000,
            date: 0x5821,
        };
        let mut writer = ZipStreamWriter::new(Vec::new());
        writer.add_directory("Pack/", stamp).unwrap();
        writer.add_bytes("Pack/manifest.json", stamp, b"{broken").unwrap();
        writer.add_bytes("Pack/pack_icon.png", stamp, b"icon").unwrap();
        writer
            .add_bytes("Pack/textures/a.png", stamp, &[9u8; 5000])
            .unwrap();
        writer.finish().unwrap()
    }

    fn entries(bytes: &[u8]) -> Vec<(String, Vec<u8>, DosDateTime)> {
        let mut reader = ZipStreamReader::new(Cursor::new(bytes));
        let mut out = Vec::new();
        while let Some(entry) = reader.next_entry().unwrap() {
            let mut data = Vec::new();
            if !entry.is_dir() {
                reader.read_data(&mut data).unwrap();
            }
            out.push((entry.name, data, entry.modified));
        }
        out
    }

    #[test]
    fn replaces_manifest_and_preserves_the_rest() {
        let src = source();
        let drop = |name: &str| paths_equal_ignore_case(name, "pack/MANIFEST.json");
        let plan = RewritePlan {
            drop_entry: &drop,
            replacement_name: "manifest.json",
            replacement: b"{\"fixed\": true}",
            abort: None,
        };
        let (out, summary) = rewrite_archive(Cursor::new(&src), Vec::new(), &plan).unwrap();
        assert_eq!(summary.copied, 3);
        assert_eq!(summary.dropped, ["Pack/manifest.json"]);
        assert_eq!(summary.bytes_copied, 5004);
        assert_eq!(summary.output_entries(), 4);

        let before = entries(&src);
        let after = entries(&out);
        assert_eq!(after.len(), before.len());
        for original in before.iter().filter(|e| e.0 != "Pack/manifest.json") {
            assert!(after.contains(original), "missing {}", original.0);
        }
        let last = after.last().unwrap();
        assert_eq!(last.0, "manifest.json");
        assert_eq!(last.1, b"{\"fixed\": true}");
    }

    #[test]
    fn abort_hook_cancels() {
        let src = source();
        let polls = Cell::new(0);
        let abort = || {
            polls.set(polls.get() + 1);
            polls.get() > 2
        };
        let keep = |_: &str| false;
        let plan = RewritePlan {
            drop_entry: &keep,
            replacement_name: "manifest.json",
            replacement: b"{}",
            abort: Some(&abort),
        };
        let err = rewrite_archive(Cursor::new(&src), Vec::new(), &plan).unwrap_err();
        assert!(matches!(err, ArchiveError::Cancelled));
    }

    #[test]
    fn non_zip_source_fails() {
        let keep = |_: &str| false;
        let plan = RewritePlan {
            drop_entry: &keep,
            replacement_name: "manifest.json",
            replacement: b"{}",
            abort: None,
        };
        let err = rewrite_archive(Cursor::new(b"nope"), Vec::new(), &plan).unwrap_err();
        assert!(matches!(err, ArchiveError::NotAZip));
    }
}
