use serde::{Serialize, Serializer};
use std::fmt;

/// Part of the manifest an issue refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Header,
    Module,
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Header => f.write_str("header section"),
            Self::Module => f.write_str("module"),
        }
    }
}

/// One schema violation found while validating a pack.
///
/// Every variant renders to a single human-readable line. Issues are never
/// raised as errors: validation accumulates them and reports the full list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestIssue {
    ManifestNotFound,
    ManifestUnreadable { reason: String },
    InvalidJson { reason: String },
    MissingFormatVersion,
    MissingHeader,
    HeaderNotObject,
    MissingField {
        section: Section,
        field: &'static str,
    },
    InvalidUuid { section: Section },
    VersionNotArray,
    EmptyVersion,
    MissingModules,
    ModulesNotArray,
    EmptyModules,
    WrongModuleType { found: String },
}

impl fmt::Display for ManifestIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ManifestNotFound => write!(f, "manifest.json not found in pack"),
            Self::ManifestUnreadable { reason } => {
                write!(f, "manifest.json could not be read: {reason}")
            }
            Self::InvalidJson { reason } => write!(f, "Invalid manifest.json format: {reason}"),
            Self::MissingFormatVersion => write!(f, "Missing 'format_version' in manifest.json"),
            Self::MissingHeader => write!(f, "Missing 'header' section in manifest.json"),
            Self::HeaderNotObject => {
                write!(f, "'header' section in manifest.json must be an object")
            }
            Self::MissingField { section, field } => write!(f, "Missing '{field}' in {section}"),
            Self::InvalidUuid { section } => write!(f, "Invalid 'uuid' format in {section}"),
            Self::VersionNotArray => write!(f, "'version' in header section must be an array"),
            Self::EmptyVersion => write!(
                f,
                "'version' array in header section must contain at least one element"
            ),
            Self::MissingModules => write!(f, "Missing 'modules' section in manifest.json"),
            Self::ModulesNotArray => write!(f, "'modules' must be an array of module objects"),
            Self::EmptyModules => write!(f, "'modules' array must contain at least one module"),
            Self::WrongModuleType { found } => write!(
                f,
                "Module 'type' should be 'resources' for resource packs, found '{found}'"
            ),
        }
    }
}

impl Serialize for ManifestIssue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
