use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Entry name of the pack manifest inside the archive.
pub const MANIFEST_FILE_NAME: &str = "manifest.json";

/// Entry name of the optional pack icon inside the archive.
pub const PACK_ICON_FILE_NAME: &str = "pack_icon.png";

/// Manifest schema version written by repair.
pub const FORMAT_VERSION: u32 = 2;

/// Module type required for resource packs.
pub const RESOURCES_MODULE_TYPE: &str = "resources";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum VersionError {
    #[error("version string must not be empty")]
    Empty,
    #[error("invalid version component '{component}' in '{input}'")]
    InvalidComponent { input: String, component: String },
    #[error("expected 3 version components in '{input}', found {found}")]
    WrongArity { input: String, found: usize },
}

/// A schema version 2 pack manifest as emitted by repair.
///
/// Field order follows the on-disk layout so that serialized output reads
/// the same way hand-written manifests do.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PackManifest {
    pub format_version: u32,
    pub header: PackHeader,
    pub modules: Vec<PackModule>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PackHeader {
    pub name: String,
    pub description: String,
    pub uuid: String,
    pub version: Vec<u32>,
    pub min_engine_version: Vec<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PackModule {
    #[serde(rename = "type")]
    pub module_type: String,
    pub uuid: String,
    pub version: Vec<u32>,
    pub description: String,
}

impl PackManifest {
    /// Serialize with 4-space indentation.
    pub fn to_pretty_json(&self) -> Result<String, serde_json::Error> {
        let mut buf = Vec::with_capacity(512);
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.serialize(&mut ser)?;
        // serde_json only ever emits UTF-8.
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}

/// Parse a dotted `major.minor.patch` string into exactly three components.
pub fn parse_version_triple(input: &str) -> Result<[u32; 3], VersionError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(VersionError::Empty);
    }
    let mut out = Vec::with_capacity(3);
    for component in trimmed.split('.') {
        let value = component
            .trim()
            .parse::<u32>()
            .map_err(|_| VersionError::InvalidComponent {
                input: input.to_owned(),
                component: component.to_owned(),
            })?;
        out.push(value);
    }
    match out.as_slice() {
        [major, minor, patch] => Ok([*major, *minor, *patch]),
        _ => Err(VersionError::WrongArity {
            input: input.to_owned(),
            found: out.len(),
        }),
    }
}

/// Render a version sequence the way packs usually display it (`1.2.3`).
pub fn format_version(version: &[u32]) -> String {
    version
        .iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(".")
}
