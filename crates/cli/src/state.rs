use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::{fs, io};

use blobstore::{Backend, BackendKind, BlobError, Provider, ProviderConfig, ProviderData};
use serde::{Deserialize, Serialize};

pub const APP_NAME: &str = "blobctl";
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const DEFAULT_PROFILE: &str = "default";

/// Contents of the config file: named provider profiles.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CliConfig {
    /// Default log level (trace, debug, info, warn, error)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
    #[serde(default)]
    pub profiles: BTreeMap<String, ProfileConfig>,
}

/// One provider: which backend, and the options to configure it with.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileConfig {
    #[serde(default)]
    pub backend: BackendKind,
    #[serde(default)]
    pub options: ProviderConfig,
}

impl ProfileConfig {
    /// Build and configure the provider this profile describes.
    pub fn provider(&self) -> Result<Backend, StateError> {
        let mut provider = Backend::from_kind(self.backend, ProviderData::default());
        provider.configure(&self.options)?;
        Ok(provider)
    }
}

impl CliConfig {
    /// Get the config file path (custom or default ~/.config/blobctl/config.toml)
    pub fn config_path(custom_path: Option<PathBuf>) -> Result<PathBuf, StateError> {
        if let Some(path) = custom_path {
            return Ok(path);
        }
        let config_dir = dirs::config_dir().ok_or(StateError::NoConfigDirectory)?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE_NAME))
    }

    /// Write a new config file with a single filesystem profile named
    /// `default` rooted at `basedir`.
    pub fn init(custom_path: Option<PathBuf>, basedir: &Path) -> Result<(Self, PathBuf), StateError> {
        let config_path = Self::config_path(custom_path)?;
        if config_path.exists() {
            return Err(StateError::AlreadyInitialized(config_path));
        }

        let profile = ProfileConfig {
            backend: BackendKind::Filesystem,
            options: ProviderConfig::new().with("basedir", basedir.to_string_lossy()),
        };
        let config = Self {
            log_level: None,
            profiles: BTreeMap::from([(DEFAULT_PROFILE.to_string(), profile)]),
        };

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&config_path, toml::to_string_pretty(&config)?)?;
        Ok((config, config_path))
    }

    /// Load an existing config file.
    pub fn load(custom_path: Option<PathBuf>) -> Result<Self, StateError> {
        let config_path = Self::config_path(custom_path)?;
        if !config_path.exists() {
            return Err(StateError::NotFound(config_path));
        }
        let config_toml = fs::read_to_string(&config_path)?;
        Ok(toml::from_str(&config_toml)?)
    }

    /// The configured log level, if set and valid.
    pub fn log_level(&self) -> Option<tracing::Level> {
        self.log_level.as_deref()?.parse().ok()
    }

    pub fn profile(&self, name: &str) -> Result<&ProfileConfig, StateError> {
        self.profiles
            .get(name)
            .ok_or_else(|| StateError::UnknownProfile(name.to_string()))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("no config file at {0}. Run 'blobctl init' first")]
    NotFound(PathBuf),

    #[error("config file {0} already exists")]
    AlreadyInitialized(PathBuf),

    #[error("no config directory found")]
    NoConfigDirectory,

    #[error("no profile named {0:?} in the config file")]
    UnknownProfile(String),

    #[error("provider error: {0}")]
    Provider(#[from] BlobError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDe(#[from] toml::de::Error),
}
