//! Schema validation of pack manifests.
//!
//! Validation never fails: malformed input produces issues, not errors. All
//! checks run independently so a single pass reports every problem. Only the
//! first module is inspected.

use crate::ident::is_canonical_uuid;
use crate::issue::{ManifestIssue, Section};
use crate::manifest::RESOURCES_MODULE_TYPE;
use serde::Serialize;
use serde_json::{Map, Value};

/// Parsed document (if any) together with the issues found in it.
#[derive(Debug, Clone, PartialEq)]
pub struct ManifestCheck {
    pub document: Option<Value>,
    pub issues: Vec<ManifestIssue>,
}

/// Validation outcome for a whole pack archive.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub manifest_found: bool,
    pub issues: Vec<ManifestIssue>,
    /// Parsed manifest, kept as repair donor. `None` if missing or unparseable.
    #[serde(skip)]
    pub manifest: Option<Value>,
    /// Exact archive entry path the manifest was read from.
    pub manifest_path: Option<String>,
    pub has_pack_icon: bool,
}

impl ValidationResult {
    /// No manifest entry exists in the archive.
    pub fn not_found(has_pack_icon: bool) -> Self {
        Self {
            is_valid: false,
            manifest_found: false,
            issues: vec![ManifestIssue::ManifestNotFound],
            manifest: None,
            manifest_path: None,
            has_pack_icon,
        }
    }

    /// A manifest entry exists but its bytes could not be turned into text.
    pub fn unreadable(
        path: impl Into<String>,
        reason: impl Into<String>,
        has_pack_icon: bool,
    ) -> Self {
        Self {
            is_valid: false,
            manifest_found: true,
            issues: vec![ManifestIssue::ManifestUnreadable {
                reason: reason.into(),
            }],
            manifest: None,
            manifest_path: Some(path.into()),
            has_pack_icon,
        }
    }

    /// Validate the text read from the manifest entry at `path`.
    pub fn from_text(path: impl Into<String>, text: &str, has_pack_icon: bool) -> Self {
        let check = validate_manifest_text(text);
        Self {
            is_valid: check.issues.is_empty() && check.document.is_some(),
            manifest_found: true,
            issues: check.issues,
            manifest: check.document,
            manifest_path: Some(path.into()),
            has_pack_icon,
        }
    }
}

/// Parse `text` as JSON and check it against the manifest schema.
pub fn validate_manifest_text(text: &str) -> ManifestCheck {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(doc)) => {
            let issues = validate_document(&doc);
            ManifestCheck {
                document: Some(Value::Object(doc)),
                issues,
            }
        }
        Ok(other) => ManifestCheck {
            document: None,
            issues: vec![ManifestIssue::InvalidJson {
                reason: format!("expected a JSON object, found {}", json_kind(&other)),
            }],
        },
        Err(e) => ManifestCheck {
            document: None,
            issues: vec![ManifestIssue::InvalidJson {
                reason: e.to_string(),
            }],
        },
    }
}

/// Check an already-parsed manifest object.
pub fn validate_document(doc: &Map<String, Value>) -> Vec<ManifestIssue> {
    let mut issues = Vec::new();

    if field(doc, "format_version").is_none() {
        issues.push(ManifestIssue::MissingFormatVersion);
    }

    match field(doc, "header") {
        None => issues.push(ManifestIssue::MissingHeader),
        Some(Value::Object(header)) => check_header(header, &mut issues),
        Some(_) => issues.push(ManifestIssue::HeaderNotObject),
    }

    match field(doc, "modules") {
        None => issues.push(ManifestIssue::MissingModules),
        Some(Value::Array(modules)) => match modules.first() {
            None => issues.push(ManifestIssue::EmptyModules),
            Some(Value::Object(module)) => check_module(module, &mut issues),
            Some(_) => issues.push(ManifestIssue::ModulesNotArray),
        },
        Some(_) => issues.push(ManifestIssue::ModulesNotArray),
    }

    issues
}

fn check_header(header: &Map<String, Value>, issues: &mut Vec<ManifestIssue>) {
    if field(header, "name").is_none() {
        issues.push(ManifestIssue::MissingField {
            section: Section::Header,
            field: "name",
        });
    }

    check_uuid(header, Section::Header, issues);

    match field(header, "version") {
        None => issues.push(ManifestIssue::MissingField {
            section: Section::Header,
            field: "version",
        }),
        Some(Value::Array(parts)) if parts.is_empty() => {
            issues.push(ManifestIssue::EmptyVersion);
        }
        Some(Value::Array(_)) => {}
        Some(_) => issues.push(ManifestIssue::VersionNotArray),
    }

    if field(header, "min_engine_version").is_none() {
        issues.push(ManifestIssue::MissingField {
            section: Section::Header,
            field: "min_engine_version",
        });
    }
}

fn check_module(module: &Map<String, Value>, issues: &mut Vec<ManifestIssue>) {
    match field(module, "type") {
        None => issues.push(ManifestIssue::MissingField {
            section: Section::Module,
            field: "type",
        }),
        Some(Value::String(t)) if t == RESOURCES_MODULE_TYPE => {}
        Some(Value::String(t)) => issues.push(ManifestIssue::WrongModuleType { found: t.clone() }),
        Some(other) => issues.push(ManifestIssue::WrongModuleType {
            found: other.to_string(),
        }),
    }

    check_uuid(module, Section::Module, issues);

    if field(module, "version").is_none() {
        issues.push(ManifestIssue::MissingField {
            section: Section::Module,
            field: "version",
        });
    }
}

fn check_uuid(obj: &Map<String, Value>, section: Section, issues: &mut Vec<ManifestIssue>) {
    match field(obj, "uuid") {
        None => issues.push(ManifestIssue::MissingField {
            section,
            field: "uuid",
        }),
        Some(Value::String(s)) if is_canonical_uuid(s) => {}
        Some(_) => issues.push(ManifestIssue::InvalidUuid { section }),
    }
}

/// Look up a key, treating an explicit `null` the same as absence.
pub(crate) fn field<'a>(obj: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    obj.get(key).filter(|v| !v.is_null())
}

/// Text of a scalar value, the way manifest readers stringify it.
///
/// Objects and arrays have no text form here.
pub(crate) fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
