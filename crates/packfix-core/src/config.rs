use packfix_archive::scan::DEFAULT_MAX_MANIFEST_BYTES;
use packfix_archive::ScanOptions;
use packfix_schema::{
    parse_version_triple, RepairDefaults, DEFAULT_MIN_ENGINE_VERSION, DEFAULT_MODULE_DESCRIPTION,
    DEFAULT_PACK_DESCRIPTION, DEFAULT_PACK_NAME, MANIFEST_FILE_NAME, PACK_ICON_FILE_NAME,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Engine settings, read from `~/.config/packfix/config.toml`.
///
/// Every field is optional in the file; missing ones take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub pack_name: String,
    pub pack_description: String,
    pub module_description: String,
    /// Dotted `major.minor.patch` used when a manifest lacks one.
    pub min_engine_version: String,
    pub max_manifest_bytes: usize,
    /// Where `Engine::load` persists repaired archives. System temp dir if unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            pack_name: DEFAULT_PACK_NAME.to_owned(),
            pack_description: DEFAULT_PACK_DESCRIPTION.to_owned(),
            module_description: DEFAULT_MODULE_DESCRIPTION.to_owned(),
            min_engine_version: DEFAULT_MIN_ENGINE_VERSION.to_owned(),
            max_manifest_bytes: DEFAULT_MAX_MANIFEST_BYTES,
            output_dir: None,
        }
    }
}

impl EngineConfig {
    /// Load the per-user config file, or defaults if it does not exist.
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = default_config_path()?;
        if !path.exists() {
            debug!("no config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        Self::load(&path)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        debug!("loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        self.validate()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        parse_version_triple(&self.min_engine_version).map_err(|e| {
            ConfigError::Invalid(format!("min_engine_version: {e}"))
        })?;
        if self.max_manifest_bytes == 0 {
            return Err(ConfigError::Invalid(
                "max_manifest_bytes must be greater than zero".to_owned(),
            ));
        }
        Ok(())
    }

    pub fn repair_defaults(&self) -> RepairDefaults {
        RepairDefaults {
            pack_name: self.pack_name.clone(),
            pack_description: self.pack_description.clone(),
            module_description: self.module_description.clone(),
            min_engine_version: self.min_engine_version.clone(),
        }
    }

    pub fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            manifest_name: MANIFEST_FILE_NAME.to_owned(),
            icon_name: PACK_ICON_FILE_NAME.to_owned(),
            max_manifest_bytes: self.max_manifest_bytes,
        }
    }

    pub fn resolved_output_dir(&self) -> PathBuf {
        self.output_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    let home = std::env::var("HOME")
        .map_err(|_| ConfigError::Invalid("HOME not set".to_owned()))?;
    Ok(PathBuf::from(home).join(".config/packfix/config.toml"))
}
