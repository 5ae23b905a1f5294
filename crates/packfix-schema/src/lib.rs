//! Manifest validation, repair synthesis, and pack info projection for packfix.
//!
//! This crate defines the schema layer: the resource pack manifest format
//! (`PackManifest`), schema validation producing an accumulated issue list
//! (`validate_manifest_text`, `ValidationResult`), donor-preserving synthesis
//! of a corrected manifest (`synthesize_manifest`), and the `PackInfo`
//! projection handed to callers. Nothing here performs I/O.

pub mod ident;
pub mod info;
pub mod issue;
pub mod manifest;
pub mod repair;
pub mod validate;

pub use ident::{is_canonical_uuid, same_uuid, FixedUuids, RandomUuids, UuidSource};
pub use info::{PackInfo, ProjectionError};
pub use issue::{ManifestIssue, Section};
pub use manifest::{
    format_version, parse_version_triple, PackHeader, PackManifest, PackModule, VersionError,
    FORMAT_VERSION, MANIFEST_FILE_NAME, PACK_ICON_FILE_NAME, RESOURCES_MODULE_TYPE,
};
pub use repair::{
    synthesize_manifest, RepairDefaults, RepairNote, Synthesis, DEFAULT_MIN_ENGINE_VERSION,
    DEFAULT_MODULE_DESCRIPTION, DEFAULT_PACK_DESCRIPTION, DEFAULT_PACK_NAME,
};
pub use validate::{validate_document, validate_manifest_text, ManifestCheck, ValidationResult};
