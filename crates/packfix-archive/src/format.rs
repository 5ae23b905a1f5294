//! Zip container constants, entry headers, and entry name matching.
//!
//! Only the parts of the format needed for a single forward pass are modeled:
//! local file headers, data descriptors, and the central directory written at
//! the end of a new archive.

use chrono::{Datelike, NaiveDateTime, Timelike};

pub(crate) const SIG_LOCAL_HEADER: u32 = 0x0403_4b50;
pub(crate) const SIG_CENTRAL_HEADER: u32 = 0x0201_4b50;
pub(crate) const SIG_END_OF_CENTRAL_DIR: u32 = 0x0605_4b50;
pub(crate) const SIG_ZIP64_END_OF_CENTRAL_DIR: u32 = 0x0606_4b50;
pub(crate) const SIG_DIGITAL_SIGNATURE: u32 = 0x0505_4b50;
/// Also used as the "spanned archive" marker some tools place at offset 0.
pub(crate) const SIG_DATA_DESCRIPTOR: u32 = 0x0807_4b50;

pub(crate) const FLAG_ENCRYPTED: u16 = 1;
pub(crate) const FLAG_DATA_DESCRIPTOR: u16 = 1 << 3;
pub(crate) const FLAG_UTF8: u16 = 1 << 11;

pub(crate) const ZIP64_EXTRA_ID: u16 = 0x0001;
pub(crate) const ZIP64_SENTINEL: u32 = u32::MAX;

/// "Version needed to extract": 2.0 covers deflate and directories.
pub(crate) const VERSION_NEEDED: u16 = 20;

/// MS-DOS directory attribute, used in the central directory.
pub(crate) const DOS_DIRECTORY_ATTR: u32 = 0x10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionMethod {
    Stored,
    Deflated,
    Other(u16),
}

impl CompressionMethod {
    pub fn from_u16(raw: u16) -> Self {
        match raw {
            0 => Self::Stored,
            8 => Self::Deflated,
            other => Self::Other(other),
        }
    }

    pub fn to_u16(self) -> u16 {
        match self {
            Self::Stored => 0,
            Self::Deflated => 8,
            Self::Other(raw) => raw,
        }
    }
}

/// Last-modified stamp in MS-DOS packed form, as stored in zip headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DosDateTime {
    pub time: u16,
    pub date: u16,
}

impl DosDateTime {
    /// 1980-01-01 00:00:00, the earliest representable instant.
    pub const EPOCH: Self = Self {
        time: 0,
        date: (1 << 5) | 1,
    };

    pub fn from_naive(dt: NaiveDateTime) -> Self {
        if dt.year() < 1980 {
            return Self::EPOCH;
        }
        let year = (dt.year().min(2107) - 1980) as u16;
        Self {
            time: ((dt.hour() as u16) << 11)
                | ((dt.minute() as u16) << 5)
                | (dt.second() as u16 / 2),
            date: (year << 9) | ((dt.month() as u16) << 5) | dt.day() as u16,
        }
    }

    /// Current local time; zip timestamps carry no zone.
    pub fn now() -> Self {
        Self::from_naive(chrono::Local::now().naive_local())
    }
}

impl Default for DosDateTime {
    fn default() -> Self {
        Self::EPOCH
    }
}

/// Metadata from one local file header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryHeader {
    pub name: String,
    pub flags: u16,
    pub method: CompressionMethod,
    pub modified: DosDateTime,
    /// Zero when the entry uses a data descriptor.
    pub crc32: u32,
    pub compressed_size: u64,
    pub uncompressed_size: u64,
    /// Header carried a zip64 extended information field.
    pub zip64: bool,
}

impl EntryHeader {
    pub fn is_dir(&self) -> bool {
        self.name.ends_with('/')
    }

    pub fn is_encrypted(&self) -> bool {
        self.flags & FLAG_ENCRYPTED != 0
    }

    pub fn has_data_descriptor(&self) -> bool {
        self.flags & FLAG_DATA_DESCRIPTOR != 0
    }
}

/// True if `name` is `base` itself or a path ending in `/` + `base`,
/// ignoring ASCII case.
pub fn entry_matches(name: &str, base: &str) -> bool {
    let (n, b) = (name.as_bytes(), base.as_bytes());
    if n.eq_ignore_ascii_case(b) {
        return true;
    }
    n.len() > b.len()
        && n[n.len() - b.len() - 1] == b'/'
        && n[n.len() - b.len()..].eq_ignore_ascii_case(b)
}

/// Case-insensitive comparison of two full entry paths.
pub fn paths_equal_ignore_case(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b) || a.to_lowercase() == b.to_lowercase()
}
