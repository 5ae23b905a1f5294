use std::fs::File;
use std::io::{self, Cursor, Read};
use std::path::{Path, PathBuf};

/// Something that can be opened, repeatedly, as a fresh byte stream
/// positioned at the start of an archive.
///
/// Validation and repair each take one pass, so a source must be reopenable.
pub trait ArchiveSource {
    fn open(&self) -> io::Result<Box<dyn Read + '_>>;

    /// Short label for log messages.
    fn describe(&self) -> String {
        "archive".to_owned()
    }
}

impl ArchiveSource for Path {
    fn open(&self) -> io::Result<Box<dyn Read + '_>> {
        Ok(Box::new(File::open(self)?))
    }

    fn describe(&self) -> String {
        self.display().to_string()
    }
}

impl ArchiveSource for PathBuf {
    fn open(&self) -> io::Result<Box<dyn Read + '_>> {
        self.as_path().open()
    }

    fn describe(&self) -> String {
        self.as_path().describe()
    }
}

impl ArchiveSource for [u8] {
    fn open(&self) -> io::Result<Box<dyn Read + '_>> {
        Ok(Box::new(Cursor::new(self)))
    }

    fn describe(&self) -> String {
        format!("in-memory archive ({} bytes)", self.len())
    }
}

impl ArchiveSource for Vec<u8> {
    fn open(&self) -> io::Result<Box<dyn Read + '_>> {
        self.as_slice().open()
    }

    fn describe(&self) -> String {
        self.as_slice().describe()
    }
}

impl<T: ArchiveSource + ?Sized> ArchiveSource for &T {
    fn open(&self) -> io::Result<Box<dyn Read + '_>> {
        (**self).open()
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}
