//! Forward-only zip reader.
//!
//! Walks local file headers in stream order and never seeks, so it works on
//! pipes and other non-seekable sources. The central directory is not read;
//! the walk ends at the first central directory or end record.

use crate::format::{
    CompressionMethod, DosDateTime, EntryHeader, FLAG_UTF8, SIG_CENTRAL_HEADER,
    SIG_DATA_DESCRIPTOR, SIG_DIGITAL_SIGNATURE, SIG_END_OF_CENTRAL_DIR, SIG_LOCAL_HEADER,
    SIG_ZIP64_END_OF_CENTRAL_DIR, ZIP64_EXTRA_ID, ZIP64_SENTINEL,
};
use crate::{read_error, ArchiveError};
use flate2::bufread::DeflateDecoder;
use flate2::Crc;
use std::io::{self, BufRead, BufReader, Read, Write};
use tracing::{debug, trace};

const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Fixed-size part of a local file header, after the signature.
const LOCAL_HEADER_LEN: usize = 26;

#[inline]
fn le_u16(b: &[u8]) -> u16 {
    u16::from_le_bytes([b[0], b[1]])
}

#[inline]
fn le_u32(b: &[u8]) -> u32 {
    u32::from_le_bytes([b[0], b[1], b[2], b[3]])
}

#[inline]
fn le_u64(b: &[u8]) -> u64 {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&b[..8]);
    u64::from_le_bytes(raw)
}

/// Passes bytes through to `out` while tracking CRC-32 and length.
pub(crate) struct Tally<'a> {
    out: &'a mut dyn Write,
    pub(crate) crc: Crc,
    pub(crate) len: u64,
}

impl<'a> Tally<'a> {
    pub(crate) fn new(out: &'a mut dyn Write) -> Self {
        Self {
            out,
            crc: Crc::new(),
            len: 0,
        }
    }
}

impl Write for Tally<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.out.write(buf)?;
        self.crc.update(&buf[..n]);
        self.len += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}

pub struct ZipStreamReader<R: Read> {
    inner: BufReader<R>,
    /// Entry whose data has not been consumed yet.
    pending: Option<EntryHeader>,
    entries_seen: usize,
    finished: bool,
}

impl<R: Read> ZipStreamReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner: BufReader::with_capacity(READ_BUFFER_SIZE, inner),
            pending: None,
            entries_seen: 0,
            finished: false,
        }
    }

    /// Number of local headers read so far.
    pub fn entries_seen(&self) -> usize {
        self.entries_seen
    }

    /// Advance to the next entry, skipping any unread data of the current one.
    ///
    /// Returns `Ok(None)` once the central directory or end record is reached.
    pub fn next_entry(&mut self) -> Result<Option<EntryHeader>, ArchiveError> {
        self.skip_data()?;
        if self.finished {
            return Ok(None);
        }

        let mut sig = self.read_signature()?;
        if self.entries_seen == 0 && sig == Some(SIG_DATA_DESCRIPTOR) {
            trace!("skipping spanned archive marker");
            sig = self.read_signature()?;
        }

        match sig {
            Some(SIG_LOCAL_HEADER) => {
                let header = self.read_local_header()?;
                self.entries_seen += 1;
                trace!(
                    "entry '{}' method={:?} size={}",
                    header.name,
                    header.method,
                    header.compressed_size
                );
                self.pending = Some(header.clone());
                Ok(Some(header))
            }
            Some(
                SIG_CENTRAL_HEADER
                | SIG_END_OF_CENTRAL_DIR
                | SIG_ZIP64_END_OF_CENTRAL_DIR
                | SIG_DIGITAL_SIGNATURE,
            ) => {
                debug!("reached central directory after {} entries", self.entries_seen);
                self.finished = true;
                Ok(None)
            }
            None if self.entries_seen > 0 => {
                debug!(
                    "stream ended without central directory after {} entries",
                    self.entries_seen
                );
                self.finished = true;
                Ok(None)
            }
            None => Err(ArchiveError::NotAZip),
            Some(_) if self.entries_seen == 0 => Err(ArchiveError::NotAZip),
            Some(other) => Err(ArchiveError::Corrupt(format!(
                "unexpected record signature {other:#010x} after entry {}",
                self.entries_seen
            ))),
        }
    }

    /// Decompress the current entry into `out`, verifying its CRC-32.
    ///
    /// Returns the number of uncompressed bytes written.
    pub fn read_data(&mut self, out: &mut dyn Write) -> Result<u64, ArchiveError> {
        let header = self.pending.as_ref().ok_or(ArchiveError::NoCurrentEntry)?;
        if header.is_encrypted() {
            return Err(ArchiveError::Unsupported(format!(
                "entry '{}' is encrypted",
                header.name
            )));
        }
        match header.method {
            CompressionMethod::Stored if header.has_data_descriptor() => {
                return Err(ArchiveError::Unsupported(format!(
                    "stored entry '{}' uses a data descriptor",
                    header.name
                )));
            }
            CompressionMethod::Other(method) => {
                return Err(ArchiveError::Unsupported(format!(
                    "entry '{}' uses compression method {method}",
                    header.name
                )));
            }
            _ => {}
        }
        let Some(header) = self.pending.take() else {
            return Err(ArchiveError::NoCurrentEntry);
        };
        self.consume(&header, out)
    }

    /// Discard the current entry's data, if any is pending.
    pub fn skip_data(&mut self) -> Result<(), ArchiveError> {
        let Some(header) = self.pending.as_ref() else {
            return Ok(());
        };

        if !header.has_data_descriptor() {
            let size = header.compressed_size;
            self.pending = None;
            let copied = io::copy(&mut (&mut self.inner).take(size), &mut io::sink())
                .map_err(read_error)?;
            if copied < size {
                return Err(ArchiveError::Truncated);
            }
            return Ok(());
        }

        // The compressed length is unknown until the deflate stream ends.
        if header.method != CompressionMethod::Deflated || header.is_encrypted() {
            return Err(ArchiveError::Unsupported(format!(
                "cannot skip entry '{}': size is only known after its data",
                header.name
            )));
        }
        self.read_data(&mut io::sink()).map(|_| ())
    }

    fn consume(&mut self, header: &EntryHeader, out: &mut dyn Write) -> Result<u64, ArchiveError> {
        let mut tally = Tally::new(out);
        let compressed = match header.method {
            CompressionMethod::Stored => {
                let size = header.compressed_size;
                let copied =
                    io::copy(&mut (&mut self.inner).take(size), &mut tally).map_err(read_error)?;
                if copied < size {
                    return Err(ArchiveError::Truncated);
                }
                copied
            }
            _ => {
                let mut decoder = DeflateDecoder::new(&mut self.inner);
                io::copy(&mut decoder, &mut tally).map_err(read_error)?;
                decoder.total_in()
            }
        };
        let (crc, len) = (tally.crc.sum(), tally.len);

        let (expected_crc, expected_compressed, expected_len) = if header.has_data_descriptor() {
            self.read_data_descriptor(header.zip64)?
        } else {
            (header.crc32, header.compressed_size, header.uncompressed_size)
        };

        if compressed != expected_compressed {
            if self.at_eof()? {
                return Err(ArchiveError::Truncated);
            }
            return Err(ArchiveError::Corrupt(format!(
                "entry '{}': compressed size {compressed} does not match recorded {expected_compressed}",
                header.name
            )));
        }
        if len != expected_len {
            return Err(ArchiveError::Corrupt(format!(
                "entry '{}': size {len} does not match recorded {expected_len}",
                header.name
            )));
        }
        if crc != expected_crc {
            return Err(ArchiveError::Corrupt(format!(
                "entry '{}': crc {crc:08x} does not match recorded {expected_crc:08x}",
                header.name
            )));
        }
        Ok(len)
    }

    fn at_eof(&mut self) -> Result<bool, ArchiveError> {
        Ok(self.inner.fill_buf().map_err(read_error)?.is_empty())
    }

    /// Returns (crc32, compressed size, uncompressed size).
    fn read_data_descriptor(&mut self, zip64: bool) -> Result<(u32, u64, u64), ArchiveError> {
        let mut first = [0u8; 4];
        self.inner.read_exact(&mut first).map_err(read_error)?;
        let crc = if le_u32(&first) == SIG_DATA_DESCRIPTOR {
            self.inner.read_exact(&mut first).map_err(read_error)?;
            le_u32(&first)
        } else {
            le_u32(&first)
        };

        if zip64 {
            let mut sizes = [0u8; 16];
            self.inner.read_exact(&mut sizes).map_err(read_error)?;
            Ok((crc, le_u64(&sizes[..8]), le_u64(&sizes[8..])))
        } else {
            let mut sizes = [0u8; 8];
            self.inner.read_exact(&mut sizes).map_err(read_error)?;
            Ok((
                crc,
                u64::from(le_u32(&sizes[..4])),
                u64::from(le_u32(&sizes[4..])),
            ))
        }
    }

    fn read_signature(&mut self) -> Result<Option<u32>, ArchiveError> {
        let mut sig = [0u8; 4];
        let mut filled = 0;
        while filled < sig.len() {
            match self.inner.read(&mut sig[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(read_error(e)),
            }
        }
        match filled {
            0 => Ok(None),
            4 => Ok(Some(le_u32(&sig))),
            _ if self.entries_seen == 0 => Err(ArchiveError::NotAZip),
            _ => Err(ArchiveError::Truncated),
        }
    }

    fn read_local_header(&mut self) -> Result<EntryHeader, ArchiveError> {
        let mut fixed = [0u8; LOCAL_HEADER_LEN];
        self.inner.read_exact(&mut fixed).map_err(read_error)?;

        let flags = le_u16(&fixed[2..]);
        let method = CompressionMethod::from_u16(le_u16(&fixed[4..]));
        let modified = DosDateTime {
            time: le_u16(&fixed[6..]),
            date: le_u16(&fixed[8..]),
        };
        let crc32 = le_u32(&fixed[10..]);
        let raw_compressed = le_u32(&fixed[14..]);
        let raw_uncompressed = le_u32(&fixed[18..]);
        let name_len = usize::from(le_u16(&fixed[22..]));
        let extra_len = usize::from(le_u16(&fixed[24..]));

        let mut name_raw = vec![0u8; name_len];
        self.inner.read_exact(&mut name_raw).map_err(read_error)?;
        let mut extra = vec![0u8; extra_len];
        self.inner.read_exact(&mut extra).map_err(read_error)?;

        let name = decode_name(name_raw, flags);
        let mut compressed_size = u64::from(raw_compressed);
        let mut uncompressed_size = u64::from(raw_uncompressed);
        let mut zip64 = false;

        if let Some(field) = find_extra_field(&extra, ZIP64_EXTRA_ID) {
            zip64 = true;
            let mut cursor = field;
            if raw_uncompressed == ZIP64_SENTINEL {
                uncompressed_size = take_u64(&mut cursor).ok_or_else(|| zip64_short(&name))?;
            }
            if raw_compressed == ZIP64_SENTINEL {
                compressed_size = take_u64(&mut cursor).ok_or_else(|| zip64_short(&name))?;
            }
        } else if raw_compressed == ZIP64_SENTINEL || raw_uncompressed == ZIP64_SENTINEL {
            return Err(ArchiveError::Corrupt(format!(
                "entry '{name}' has 32-bit size sentinel but no zip64 field"
            )));
        }

        Ok(EntryHeader {
            name,
            flags,
            method,
            modified,
            crc32,
            compressed_size,
            uncompressed_size,
            zip64,
        })
    }
}

fn zip64_short(name: &str) -> ArchiveError {
    ArchiveError::Corrupt(format!("entry '{name}' has a short zip64 extra field"))
}

fn take_u64(cursor: &mut &[u8]) -> Option<u64> {
    if cursor.len() < 8 {
        return None;
    }
    let value = le_u64(cursor);
    *cursor = &cursor[8..];
    Some(value)
}

/// Locate the payload of the extra field block with id `wanted`.
fn find_extra_field(mut extra: &[u8], wanted: u16) -> Option<&[u8]> {
    while extra.len() >= 4 {
        let id = le_u16(extra);
        let size = usize::from(le_u16(&extra[2..]));
        let rest = &extra[4..];
        if rest.len() < size {
            return None;
        }
        if id == wanted {
            return Some(&rest[..size]);
        }
        extra = &rest[size..];
    }
    None
}

fn decode_name(raw: Vec<u8>, flags: u16) -> String {
    match String::from_utf8(raw) {
        Ok(name) => name,
        Err(e) => {
            if flags & FLAG_UTF8 != 0 {
                debug!("entry name flagged as UTF-8 is not valid UTF-8");
            }
            String::from_utf8_lossy(e.as_bytes()).into_owned()
        }
    }
}
