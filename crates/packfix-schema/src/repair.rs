//! Donor-preserving manifest synthesis.
//!
//! Given whatever could be parsed from a broken manifest (possibly nothing),
//! build a fresh schema version 2 manifest. Every value the author wrote that
//! is still usable is carried over; everything else falls back to defaults.
//! The only source of nondeterminism is UUID generation, which is injected.

use crate::ident::{is_canonical_uuid, same_uuid, UuidSource};
use crate::manifest::{
    parse_version_triple, PackHeader, PackManifest, PackModule, FORMAT_VERSION,
    RESOURCES_MODULE_TYPE,
};
use crate::validate::{field, scalar_text};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

pub const DEFAULT_PACK_NAME: &str = "Fixed Resource Pack";
pub const DEFAULT_PACK_DESCRIPTION: &str = "Fixed resource pack";
pub const DEFAULT_MODULE_DESCRIPTION: &str = "Resource pack resources";
pub const DEFAULT_MIN_ENGINE_VERSION: &str = "1.20.0";

/// Used when the configured default engine version cannot be parsed.
const FALLBACK_MIN_ENGINE_VERSION: [u32; 3] = [1, 20, 0];
const DEFAULT_PACK_VERSION: [u32; 3] = [1, 0, 0];
/// Value substituted for version components that are not numbers.
const COERCE_FALLBACK: u32 = 1;

/// Placeholder values used when the donor has nothing usable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepairDefaults {
    pub pack_name: String,
    pub pack_description: String,
    pub module_description: String,
    /// Dotted `major.minor.patch`.
    pub min_engine_version: String,
}

impl Default for RepairDefaults {
    fn default() -> Self {
        Self {
            pack_name: DEFAULT_PACK_NAME.to_owned(),
            pack_description: DEFAULT_PACK_DESCRIPTION.to_owned(),
            module_description: DEFAULT_MODULE_DESCRIPTION.to_owned(),
            min_engine_version: DEFAULT_MIN_ENGINE_VERSION.to_owned(),
        }
    }
}

impl RepairDefaults {
    pub fn min_engine_triple(&self) -> [u32; 3] {
        parse_version_triple(&self.min_engine_version).unwrap_or(FALLBACK_MIN_ENGINE_VERSION)
    }
}

/// What synthesis had to invent instead of carrying over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepairNote {
    DefaultedName,
    DefaultedDescription,
    GeneratedHeaderUuid,
    DefaultedVersion,
    PaddedVersion { from: usize },
    DefaultedMinEngineVersion,
    ForcedModuleType { found: Option<String> },
    GeneratedModuleUuid,
    DefaultedModuleDescription,
    DroppedModules { count: usize },
}

impl fmt::Display for RepairNote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DefaultedName => f.write_str("header name missing, using placeholder"),
            Self::DefaultedDescription => {
                f.write_str("header description missing, using placeholder")
            }
            Self::GeneratedHeaderUuid => f.write_str("generated new header uuid"),
            Self::DefaultedVersion => f.write_str("header version missing, using 1.0.0"),
            Self::PaddedVersion { from } => {
                write!(f, "padded header version from {from} to 3 components")
            }
            Self::DefaultedMinEngineVersion => {
                f.write_str("min_engine_version missing or short, using default")
            }
            Self::ForcedModuleType { found: Some(t) } => {
                write!(f, "module type '{t}' replaced with 'resources'")
            }
            Self::ForcedModuleType { found: None } => {
                f.write_str("module type set to 'resources'")
            }
            Self::GeneratedModuleUuid => f.write_str("generated new module uuid"),
            Self::DefaultedModuleDescription => {
                f.write_str("module description missing, using placeholder")
            }
            Self::DroppedModules { count } => {
                write!(f, "dropped {count} module(s) after the first")
            }
        }
    }
}

/// A synthesized manifest plus a record of every substitution made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Synthesis {
    pub manifest: PackManifest,
    pub notes: Vec<RepairNote>,
}

/// Build a corrected manifest from an optional donor document.
pub fn synthesize_manifest(
    donor: Option<&Value>,
    defaults: &RepairDefaults,
    uuids: &mut dyn UuidSource,
) -> Synthesis {
    let mut notes = Vec::new();

    let root = donor.and_then(Value::as_object);
    let header = object_field(root, "header");
    let modules = root
        .and_then(|r| field(r, "modules"))
        .and_then(Value::as_array);
    let first_module = modules
        .and_then(|m| m.first())
        .and_then(Value::as_object);

    let name = string_field(header, "name").unwrap_or_else(|| {
        notes.push(RepairNote::DefaultedName);
        defaults.pack_name.clone()
    });
    let description = string_field(header, "description").unwrap_or_else(|| {
        notes.push(RepairNote::DefaultedDescription);
        defaults.pack_description.clone()
    });

    let header_uuid = match string_field(header, "uuid") {
        Some(uuid) if is_canonical_uuid(&uuid) => uuid,
        _ => {
            notes.push(RepairNote::GeneratedHeaderUuid);
            uuids.next_uuid()
        }
    };

    let version = match array_field(header, "version") {
        Some(parts) if !parts.is_empty() => {
            let mut version = coerce_all(parts);
            if version.len() < 3 {
                notes.push(RepairNote::PaddedVersion {
                    from: version.len(),
                });
                version.resize(3, 0);
            }
            version
        }
        _ => {
            notes.push(RepairNote::DefaultedVersion);
            DEFAULT_PACK_VERSION.to_vec()
        }
    };

    let min_engine_version = match array_field(header, "min_engine_version") {
        Some(parts) if parts.len() >= 3 => coerce_all(parts),
        _ => {
            notes.push(RepairNote::DefaultedMinEngineVersion);
            defaults.min_engine_triple().to_vec()
        }
    };

    match first_module.and_then(|m| field(m, "type")) {
        Some(Value::String(t)) if t == RESOURCES_MODULE_TYPE => {}
        Some(Value::String(t)) => notes.push(RepairNote::ForcedModuleType {
            found: Some(t.clone()),
        }),
        Some(other) => notes.push(RepairNote::ForcedModuleType {
            found: Some(other.to_string()),
        }),
        None => notes.push(RepairNote::ForcedModuleType { found: None }),
    }

    let module_uuid = match string_field(first_module, "uuid") {
        Some(uuid) if is_canonical_uuid(&uuid) && !same_uuid(&uuid, &header_uuid) => uuid,
        _ => {
            notes.push(RepairNote::GeneratedModuleUuid);
            loop {
                let candidate = uuids.next_uuid();
                if !same_uuid(&candidate, &header_uuid) {
                    break candidate;
                }
            }
        }
    };

    let module_version = match array_field(first_module, "version") {
        Some(parts) if !parts.is_empty() => coerce_all(parts),
        _ => version.clone(),
    };

    let module_description = string_field(first_module, "description").unwrap_or_else(|| {
        notes.push(RepairNote::DefaultedModuleDescription);
        defaults.module_description.clone()
    });

    if let Some(extra) = modules.map(|m| m.len().saturating_sub(1)).filter(|n| *n > 0) {
        notes.push(RepairNote::DroppedModules { count: extra });
    }

    Synthesis {
        manifest: PackManifest {
            format_version: FORMAT_VERSION,
            header: PackHeader {
                name,
                description,
                uuid: header_uuid,
                version,
                min_engine_version,
            },
            modules: vec![PackModule {
                module_type: RESOURCES_MODULE_TYPE.to_owned(),
                uuid: module_uuid,
                version: module_version,
                description: module_description,
            }],
        },
        notes,
    }
}

fn object_field<'a>(
    obj: Option<&'a Map<String, Value>>,
    key: &str,
) -> Option<&'a Map<String, Value>> {
    obj.and_then(|o| field(o, key)).and_then(Value::as_object)
}

fn array_field<'a>(obj: Option<&'a Map<String, Value>>, key: &str) -> Option<&'a Vec<Value>> {
    obj.and_then(|o| field(o, key)).and_then(Value::as_array)
}

/// Donor text for `key`; numbers and bools count as their rendered text.
fn string_field(obj: Option<&Map<String, Value>>, key: &str) -> Option<String> {
    obj.and_then(|o| field(o, key)).and_then(scalar_text)
}

fn coerce_all(parts: &[Value]) -> Vec<u32> {
    parts.iter().map(coerce_component).collect()
}

fn coerce_component(value: &Value) -> u32 {
    version_component(value).unwrap_or(COERCE_FALLBACK)
}

/// Read one version component as a non-negative integer.
///
/// Integers are taken as-is, floats are truncated and numeric strings are
/// parsed. Anything else, or a value outside `u32`, yields `None`.
pub(crate) fn version_component(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .and_then(|v| u32::try_from(v).ok())
            .or_else(|| n.as_f64().and_then(truncate_float)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<u32>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(truncate_float))
        }
        _ => None,
    }
}

fn truncate_float(f: f64) -> Option<u32> {
    (f.is_finite() && f >= 0.0 && f <= f64::from(u32::MAX)).then(|| f.trunc() as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ident::FixedUuids;
    use crate::validate::validate_manifest_text;
    use serde_json::json;

    const H: &str = "5f1a8c3e-2b7d-4e9f-a0c1-d2e3f4a5b6c7";
    const M: &str = "9a8b7c6d-5e4f-4a3b-8c2d-1e0f9a8b7c6d";
    const G1: &str = "11111111-1111-4111-8111-111111111111";
    const G2: &str = "22222222-2222-4222-8222-222222222222";

    fn synth(donor: Option<&Value>) -> Synthesis {
        synthesize_manifest(donor, &RepairDefaults::default(), &mut FixedUuids::new([G1, G2]))
    }

    #[test]
    fn no_donor_yields_full_defaults() {
        let out = synth(None);
        let m = &out.manifest;
        assert_eq!(m.format_version, 2);
        assert_eq!(m.header.name, DEFAULT_PACK_NAME);
        assert_eq!(m.header.description, DEFAULT_PACK_DESCRIPTION);
        assert_eq!(m.header.uuid, G1);
        assert_eq!(m.header.version, vec![1, 0, 0]);
        assert_eq!(m.header.min_engine_version, vec![1, 20, 0]);
        assert_eq!(m.modules.len(), 1);
        assert_eq!(m.modules[0].module_type, "resources");
        assert_eq!(m.modules[0].uuid, G2);
        assert_eq!(m.modules[0].version, vec![1, 0, 0]);
        assert_eq!(m.modules[0].description, DEFAULT_MODULE_DESCRIPTION);
    }

    #[test]
    fn synthesized_manifest_passes_validation() {
        let json = synth(None).manifest.to_pretty_json().unwrap();
        let check = validate_manifest_text(&json);
        assert!(check.issues.is_empty(), "{:?}", check.issues);
    }

    #[test]
    fn donor_values_are_preserved() {
        let donor = json!({
            "format_version": 1,
            "header": {
                "name": "Crisp",
                "description": "Sharp",
                "uuid": H,
                "version": [2, 4, 6],
                "min_engine_version": [1, 19, 80]
            },
            "modules": [{
                "type": "resources",
                "uuid": M,
                "version": [2, 4, 6],
                "description": "Crisp textures"
            }]
        });
        let out = synth(Some(&donor));
        let m = &out.manifest;
        assert_eq!(m.format_version, 2, "format version is always 2");
        assert_eq!(m.header.name, "Crisp");
        assert_eq!(m.header.description, "Sharp");
        assert_eq!(m.header.uuid, H);
        assert_eq!(m.header.version, vec![2, 4, 6]);
        assert_eq!(m.header.min_engine_version, vec![1, 19, 80]);
        assert_eq!(m.modules[0].uuid, M);
        assert_eq!(m.modules[0].description, "Crisp textures");
        assert!(out.notes.is_empty(), "{:?}", out.notes);
    }

    #[test]
    fn single_component_version_is_padded() {
        let donor = json!({ "header": { "version": [5] } });
        let out = synth(Some(&donor));
        assert_eq!(out.manifest.header.version, vec![5, 0, 0]);
        assert!(out.notes.contains(&RepairNote::PaddedVersion { from: 1 }));
    }

    #[test]
    fn long_version_is_kept_whole() {
        let donor = json!({ "header": { "version": [1, 2, 3, 4] } });
        assert_eq!(synth(Some(&donor)).manifest.header.version, vec![1, 2, 3, 4]);
    }

    #[test]
    fn version_components_are_coerced() {
        let donor = json!({ "header": { "version": ["2", 3.7, "abc", -1, null] } });
        assert_eq!(synth(Some(&donor)).manifest.header.version, vec![2, 3, 1, 1, 1]);
    }

    #[test]
    fn short_min_engine_version_uses_default() {
        let donor = json!({ "header": { "min_engine_version": [1, 16] } });
        let out = synth(Some(&donor));
        assert_eq!(out.manifest.header.min_engine_version, vec![1, 20, 0]);
        assert!(out.notes.contains(&RepairNote::DefaultedMinEngineVersion));
    }

    #[test]
    fn min_engine_version_default_is_configurable() {
        let defaults = RepairDefaults {
            min_engine_version: "1.21.2".to_owned(),
            ..RepairDefaults::default()
        };
        let out = synthesize_manifest(None, &defaults, &mut FixedUuids::new([G1, G2]));
        assert_eq!(out.manifest.header.min_engine_version, vec![1, 21, 2]);
    }

    #[test]
    fn unparseable_min_engine_default_falls_back() {
        let defaults = RepairDefaults {
            min_engine_version: "latest".to_owned(),
            ..RepairDefaults::default()
        };
        assert_eq!(defaults.min_engine_triple(), [1, 20, 0]);
    }

    #[test]
    fn invalid_header_uuid_is_regenerated() {
        let donor = json!({ "header": { "uuid": "nope" } });
        let out = synth(Some(&donor));
        assert_eq!(out.manifest.header.uuid, G1);
        assert!(out.notes.contains(&RepairNote::GeneratedHeaderUuid));
    }

    #[test]
    fn module_uuid_equal_to_header_is_regenerated() {
        let donor = json!({
            "header": { "uuid": H },
            "modules": [{ "type": "resources", "uuid": H.to_uppercase() }]
        });
        let out = synth(Some(&donor));
        assert_eq!(out.manifest.header.uuid, H);
        assert_eq!(out.manifest.modules[0].uuid, G1);
        assert!(out.notes.contains(&RepairNote::GeneratedModuleUuid));
    }

    #[test]
    fn colliding_draws_are_retried() {
        let mut uuids = FixedUuids::new([G1, G1, G1, G2]);
        let out = synthesize_manifest(None, &RepairDefaults::default(), &mut uuids);
        assert_eq!(out.manifest.header.uuid, G1);
        assert_eq!(out.manifest.modules[0].uuid, G2);
    }

    #[test]
    fn module_version_falls_back_to_header_version() {
        let donor = json!({
            "header": { "version": [3, 1] },
            "modules": [{ "type": "resources" }]
        });
        let out = synth(Some(&donor));
        assert_eq!(out.manifest.modules[0].version, vec![3, 1, 0]);
        assert_eq!(out.manifest.modules[0].version, out.manifest.header.version);
    }

    #[test]
    fn module_version_is_kept_when_present() {
        let donor = json!({
            "header": { "version": [3, 1, 0] },
            "modules": [{ "version": ["7", 0] }]
        });
        assert_eq!(synth(Some(&donor)).manifest.modules[0].version, vec![7, 0]);
    }

    #[test]
    fn module_type_is_always_forced() {
        let donor = json!({ "modules": [{ "type": "data" }] });
        let out = synth(Some(&donor));
        assert_eq!(out.manifest.modules[0].module_type, "resources");
        assert!(out.notes.contains(&RepairNote::ForcedModuleType {
            found: Some("data".to_owned())
        }));
    }

    #[test]
    fn missing_header_with_data_module() {
        let donor = json!({
            "format_version": 2,
            "modules": [{ "type": "data", "uuid": M, "version": [1, 0, 0] }]
        });
        let out = synth(Some(&donor));
        let m = &out.manifest;
        assert_eq!(m.modules[0].module_type, "resources");
        assert_eq!(m.header.uuid, G1);
        assert_eq!(m.modules[0].uuid, M);
        assert_ne!(m.header.uuid, m.modules[0].uuid);
    }

    #[test]
    fn extra_modules_are_dropped() {
        let donor = json!({
            "modules": [{ "type": "resources" }, { "type": "data" }, { "type": "script" }]
        });
        let out = synth(Some(&donor));
        assert_eq!(out.manifest.modules.len(), 1);
        assert!(out.notes.contains(&RepairNote::DroppedModules { count: 2 }));
    }

    #[test]
    fn non_object_donor_is_ignored() {
        let donor = json!([1, 2, 3]);
        let out = synth(Some(&donor));
        assert_eq!(out.manifest.header.name, DEFAULT_PACK_NAME);
    }

    #[test]
    fn repeated_synthesis_differs_only_in_generated_uuids() {
        let donor = json!({ "header": { "name": "Crisp", "version": [1] } });
        let defaults = RepairDefaults::default();
        let a = synthesize_manifest(Some(&donor), &defaults, &mut crate::RandomUuids);
        let b = synthesize_manifest(Some(&donor), &defaults, &mut crate::RandomUuids);
        assert_eq!(a.manifest.header.name, b.manifest.header.name);
        assert_eq!(a.manifest.header.version, b.manifest.header.version);
        assert_ne!(a.manifest.header.uuid, b.manifest.header.uuid);
        assert_eq!(a.notes, b.notes);
    }

    #[test]
    fn scalar_donor_text_is_kept() {
        let donor = json!({
            "header": {"name": 2024, "description": false},
            "modules": [{"description": 7.5}]
        });
        let out = synth(Some(&donor));
        assert_eq!(out.manifest.header.name, "2024");
        assert_eq!(out.manifest.header.description, "false");
        assert_eq!(out.manifest.modules[0].description, "7.5");
        assert!(!out.notes.contains(&RepairNote::DefaultedName));
        assert!(!out.notes.contains(&RepairNote::DefaultedDescription));
        assert!(!out.notes.contains(&RepairNote::DefaultedModuleDescription));
    }

    #[test]
    fn structured_donor_name_falls_back() {
        let donor = json!({"header": {"name": {"en": "Crisp"}}});
        let out = synth(Some(&donor));
        assert_eq!(out.manifest.header.name, DEFAULT_PACK_NAME);
        assert!(out.notes.contains(&RepairNote::DefaultedName));
    }

    #[test]
    fn version_component_reads_numbers_and_numeric_strings() {
        assert_eq!(version_component(&json!(3)), Some(3));
        assert_eq!(version_component(&json!(2.9)), Some(2));
        assert_eq!(version_component(&json!("4")), Some(4));
        assert_eq!(version_component(&json!("5.7")), Some(5));
        assert_eq!(version_component(&json!("x")), None);
        assert_eq!(version_component(&json!(-1)), None);
        assert_eq!(version_component(&json!(null)), None);
    }

    #[test]
    fn coerces_large_and_negative_numbers_to_fallback() {
        assert_eq!(coerce_component(&json!(u64::from(u32::MAX) + 1)), 1);
        assert_eq!(coerce_component(&json!(-2.5)), 1);
        assert_eq!(coerce_component(&json!(" 12 ")), 12);
        assert_eq!(coerce_component(&json!(true)), 1);
    }
}
