use crate::manifest::format_version;
use crate::repair::version_component;
use crate::validate::{field, scalar_text, ValidationResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProjectionError {
    #[error("manifest is not a JSON object")]
    NotAnObject,
    #[error("manifest has no header section")]
    MissingHeader,
    #[error("missing or invalid '{0}' in header section")]
    InvalidField(&'static str),
}

/// Minimal description of a usable pack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackInfo {
    pub name: String,
    pub description: String,
    pub version: Vec<u32>,
    pub uuid: String,
    /// True when the manifest had to be repaired before the pack became usable.
    #[serde(default)]
    pub was_fixed: bool,
}

impl PackInfo {
    /// Project a manifest that has already passed validation.
    ///
    /// Scalar names are read as text and version components may be numeric
    /// strings or floats, which are truncated.
    pub fn from_manifest(doc: &Value) -> Result<Self, ProjectionError> {
        let root = doc.as_object().ok_or(ProjectionError::NotAnObject)?;
        let header = field(root, "header")
            .and_then(Value::as_object)
            .ok_or(ProjectionError::MissingHeader)?;

        let name = field(header, "name")
            .and_then(scalar_text)
            .ok_or(ProjectionError::InvalidField("name"))?;
        let uuid = field(header, "uuid")
            .and_then(Value::as_str)
            .ok_or(ProjectionError::InvalidField("uuid"))?;
        let description = field(header, "description")
            .and_then(scalar_text)
            .unwrap_or_default();
        let version = field(header, "version")
            .and_then(Value::as_array)
            .ok_or(ProjectionError::InvalidField("version"))?
            .iter()
            .map(version_component)
            .collect::<Option<Vec<_>>>()
            .ok_or(ProjectionError::InvalidField("version"))?;

        Ok(Self {
            name,
            description,
            version,
            uuid: uuid.to_owned(),
            was_fixed: false,
        })
    }

    /// Project a validation result, or `None` if the pack is not valid.
    pub fn from_validation(result: &ValidationResult) -> Option<Self> {
        if !result.is_valid {
            return None;
        }
        result
            .manifest
            .as_ref()
            .and_then(|doc| Self::from_manifest(doc).ok())
    }

    #[must_use]
    pub fn fixed(mut self) -> Self {
        self.was_fixed = true;
        self
    }

    pub fn version_string(&self) -> String {
        format_version(&self.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc() -> Value {
        json!({
            "format_version": 2,
            "header": {
                "name": "Crisp",
                "description": "Sharp",
                "uuid": "5f1a8c3e-2b7d-4e9f-a0c1-d2e3f4a5b6c7",
                "version": [1, 2, 3],
                "min_engine_version": [1, 20, 0]
            },
            "modules": [{
                "type": "resources",
                "uuid": "9a8b7c6d-5e4f-4a3b-8c2d-1e0f9a8b7c6d",
                "version": [1, 2, 3]
            }]
        })
    }

    #[test]
    fn projects_literal_values() {
        let info = PackInfo::from_manifest(&doc()).unwrap();
        assert_eq!(info.name, "Crisp");
        assert_eq!(info.description, "Sharp");
        assert_eq!(info.version, vec![1, 2, 3]);
        assert_eq!(info.uuid, "5f1a8c3e-2b7d-4e9f-a0c1-d2e3f4a5b6c7");
        assert!(!info.was_fixed);
        assert_eq!(info.version_string(), "1.2.3");
    }

    #[test]
    fn missing_description_is_empty() {
        let mut d = doc();
        d["header"].as_object_mut().unwrap().remove("description");
        assert_eq!(PackInfo::from_manifest(&d).unwrap().description, "");
    }

    #[test]
    fn rejects_unusable_documents() {
        assert_eq!(
            PackInfo::from_manifest(&json!("x")),
            Err(ProjectionError::NotAnObject)
        );
        assert_eq!(
            PackInfo::from_manifest(&json!({})),
            Err(ProjectionError::MissingHeader)
        );
        let mut d = doc();
        d["header"]["version"] = json!(["a"]);
        assert_eq!(
            PackInfo::from_manifest(&d),
            Err(ProjectionError::InvalidField("version"))
        );
    }

    #[test]
    fn from_validation_requires_validity() {
        let text = doc().to_string();
        let ok = ValidationResult::from_text("manifest.json", &text, true);
        assert!(PackInfo::from_validation(&ok).is_some());

        let bad = ValidationResult::from_text("manifest.json", "{}", true);
        assert!(PackInfo::from_validation(&bad).is_none());
    }

    #[test]
    fn loosely_typed_fields_are_coerced() {
        let mut d = doc();
        d["header"]["name"] = json!(2024);
        d["header"]["version"] = json!(["1", 2.7, "3"]);
        let info = PackInfo::from_manifest(&d).unwrap();
        assert_eq!(info.name, "2024");
        assert_eq!(info.version, vec![1, 2, 3]);

        let text = d.to_string();
        let result = ValidationResult::from_text("manifest.json", &text, true);
        assert!(result.is_valid, "{:?}", result.issues);
        assert!(PackInfo::from_validation(&result).is_some());
    }

    #[test]
    fn fixed_sets_flag() {
        let info = PackInfo::from_manifest(&doc()).unwrap().fixed();
        assert!(info.was_fixed);
    }
}
