//! Streaming zip writer.
//!
//! File entries are deflate-compressed and followed by a data descriptor, so
//! payloads can be streamed straight into the output without knowing their
//! size up front. The central directory is buffered in memory and emitted by
//! [`ZipStreamWriter::finish`].

use crate::format::{
    CompressionMethod, DosDateTime, DOS_DIRECTORY_ATTR, FLAG_DATA_DESCRIPTOR, FLAG_UTF8,
    SIG_CENTRAL_HEADER, SIG_DATA_DESCRIPTOR, SIG_END_OF_CENTRAL_DIR, SIG_LOCAL_HEADER,
    VERSION_NEEDED,
};
use crate::reader::Tally;
use crate::ArchiveError;
use flate2::write::DeflateEncoder;
use flate2::Compression;
use std::io::{self, Write};

const MAX_ENTRIES: usize = u16::MAX as usize;

/// Sizes and checksum of a written file entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryStats {
    pub crc32: u32,
    pub compressed_size: u64,
    pub uncompressed_size: u64,
}

struct CountingWriter<W> {
    inner: W,
    written: u64,
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

struct CentralRecord {
    name: String,
    flags: u16,
    method: CompressionMethod,
    modified: DosDateTime,
    crc32: u32,
    compressed_size: u32,
    uncompressed_size: u32,
    offset: u32,
    external_attrs: u32,
}

pub struct ZipStreamWriter<W: Write> {
    out: CountingWriter<W>,
    records: Vec<CentralRecord>,
}

impl<W: Write> ZipStreamWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            out: CountingWriter { inner, written: 0 },
            records: Vec::new(),
        }
    }

    pub fn entry_count(&self) -> usize {
        self.records.len()
    }

    /// Add an empty, stored directory entry. A trailing `/` is appended if missing.
    pub fn add_directory(&mut self, name: &str, modified: DosDateTime) -> Result<(), ArchiveError> {
        let name = if name.ends_with('/') {
            name.to_owned()
        } else {
            format!("{name}/")
        };
        let offset = self.begin_entry(&name)?;
        let flags = name_flags(&name);
        self.write_local_header(&name, flags, CompressionMethod::Stored, modified)?;
        self.records.push(CentralRecord {
            name,
            flags,
            method: CompressionMethod::Stored,
            modified,
            crc32: 0,
            compressed_size: 0,
            uncompressed_size: 0,
            offset,
            external_attrs: DOS_DIRECTORY_ATTR,
        });
        Ok(())
    }

    /// Add a deflated file entry whose payload is produced by `fill`.
    ///
    /// If `fill` fails the archive is left incomplete and must be discarded.
    pub fn add_entry<F>(
        &mut self,
        name: &str,
        modified: DosDateTime,
        fill: F,
    ) -> Result<EntryStats, ArchiveError>
    where
        F: FnOnce(&mut dyn Write) -> Result<(), ArchiveError>,
    {
        let offset = self.begin_entry(name)?;
        let flags = name_flags(name) | FLAG_DATA_DESCRIPTOR;
        self.write_local_header(name, flags, CompressionMethod::Deflated, modified)?;

        let data_start = self.out.written;
        let mut encoder = DeflateEncoder::new(&mut self.out, Compression::default());
        let (crc32, uncompressed) = {
            let mut tally = Tally::new(&mut encoder);
            fill(&mut tally)?;
            (tally.crc.sum(), tally.len)
        };
        encoder.finish()?;
        let compressed = self.out.written - data_start;

        let (Ok(compressed_size), Ok(uncompressed_size)) =
            (u32::try_from(compressed), u32::try_from(uncompressed))
        else {
            return Err(ArchiveError::Unsupported(format!(
                "entry '{name}' is larger than 4 GiB"
            )));
        };

        let mut descriptor = Vec::with_capacity(16);
        descriptor.extend_from_slice(&SIG_DATA_DESCRIPTOR.to_le_bytes());
        descriptor.extend_from_slice(&crc32.to_le_bytes());
        descriptor.extend_from_slice(&compressed_size.to_le_bytes());
        descriptor.extend_from_slice(&uncompressed_size.to_le_bytes());
        self.out.write_all(&descriptor)?;

        self.records.push(CentralRecord {
            name: name.to_owned(),
            flags,
            method: CompressionMethod::Deflated,
            modified,
            crc32,
            compressed_size,
            uncompressed_size,
            offset,
            external_attrs: 0,
        });
        Ok(EntryStats {
            crc32,
            compressed_size: compressed,
            uncompressed_size: uncompressed,
        })
    }

    pub fn add_bytes(
        &mut self,
        name: &str,
        modified: DosDateTime,
        data: &[u8],
    ) -> Result<EntryStats, ArchiveError> {
        self.add_entry(name, modified, |w| w.write_all(data).map_err(ArchiveError::from))
    }

    /// Write the central directory and end record, returning the inner writer.
    pub fn finish(mut self) -> Result<W, ArchiveError> {
        let dir_start = self.out.written;
        for record in &self.records {
            let mut buf = Vec::with_capacity(46 + record.name.len());
            buf.extend_from_slice(&SIG_CENTRAL_HEADER.to_le_bytes());
            buf.extend_from_slice(&VERSION_NEEDED.to_le_bytes()); // made by
            buf.extend_from_slice(&VERSION_NEEDED.to_le_bytes());
            buf.extend_from_slice(&record.flags.to_le_bytes());
            buf.extend_from_slice(&record.method.to_u16().to_le_bytes());
            buf.extend_from_slice(&record.modified.time.to_le_bytes());
            buf.extend_from_slice(&record.modified.date.to_le_bytes());
            buf.extend_from_slice(&record.crc32.to_le_bytes());
            buf.extend_from_slice(&record.compressed_size.to_le_bytes());
            buf.extend_from_slice(&record.uncompressed_size.to_le_bytes());
            buf.extend_from_slice(&(record.name.len() as u16).to_le_bytes());
            buf.extend_from_slice(&0u16.to_le_bytes()); // extra
            buf.extend_from_slice(&0u16.to_le_bytes()); // comment
            buf.extend_from_slice(&0u16.to_le_bytes()); // disk
            buf.extend_from_slice(&0u16.to_le_bytes()); // internal attrs
            buf.extend_from_slice(&record.external_attrs.to_le_bytes());
            buf.extend_from_slice(&record.offset.to_le_bytes());
            buf.extend_from_slice(record.name.as_bytes());
            self.out.write_all(&buf)?;
        }
        let dir_len = self.out.written - dir_start;

        let (Ok(dir_start), Ok(dir_len)) = (u32::try_from(dir_start), u32::try_from(dir_len))
        else {
            return Err(ArchiveError::Unsupported(
                "archive larger than 4 GiB".to_owned(),
            ));
        };
        let count = self.records.len() as u16;

        let mut end = Vec::with_capacity(22);
        end.extend_from_slice(&SIG_END_OF_CENTRAL_DIR.to_le_bytes());
        end.extend_from_slice(&0u16.to_le_bytes());
        end.extend_from_slice(&0u16.to_le_bytes());
        end.extend_from_slice(&count.to_le_bytes());
        end.extend_from_slice(&count.to_le_bytes());
        end.extend_from_slice(&dir_len.to_le_bytes());
        end.extend_from_slice(&dir_start.to_le_bytes());
        end.extend_from_slice(&0u16.to_le_bytes());
        self.out.write_all(&end)?;
        self.out.flush()?;
        Ok(self.out.inner)
    }

    /// Check limits for a new entry and return its local header offset.
    fn begin_entry(&self, name: &str) -> Result<u32, ArchiveError> {
        if self.records.len() >= MAX_ENTRIES {
            return Err(ArchiveError::Unsupported(format!(
                "more than {MAX_ENTRIES} entries"
            )));
        }
        if name.is_empty() || name.len() > usize::from(u16::MAX) {
            return Err(ArchiveError::Unsupported(format!(
                "entry name length {} out of range",
                name.len()
            )));
        }
        u32::try_from(self.out.written)
            .map_err(|_| ArchiveError::Unsupported("archive larger than 4 GiB".to_owned()))
    }

    /// Local header with zero crc/sizes: directories are empty and files
    /// carry their values in the trailing data descriptor.
    fn write_local_header(
        &mut self,
        name: &str,
        flags: u16,
        method: CompressionMethod,
        modified: DosDateTime,
    ) -> Result<(), ArchiveError> {
        let mut buf = Vec::with_capacity(30 + name.len());
        buf.extend_from_slice(&SIG_LOCAL_HEADER.to_le_bytes());
        buf.extend_from_slice(&VERSION_NEEDED.to_le_bytes());
        buf.extend_from_slice(&flags.to_le_bytes());
        buf.extend_from_slice(&method.to_u16().to_le_bytes());
        buf.extend_from_slice(&modified.time.to_le_bytes());
        buf.extend_from_slice(&modified.date.to_le_bytes());
        buf.extend_from_slice(&0u32.to_le_bytes());
        buf.extend_from_slice(&0u32.to_le_bytes());
        buf.extend_from_slice(&0u32.to_le_bytes());
        buf.extend_from_slice(&(name.len() as u16).to_le_bytes());
        buf.extend_from_slice(&0u16.to_le_bytes());
        buf.extend_from_slice(name.as_bytes());
        self.out.write_all(&buf)?;
        Ok(())
    }
}

fn name_flags(name: &str) -> u16 {
    if name.is_ascii() {
        0
    } else {
        FLAG_UTF8
    }
}
