//! Filesystem backend: one file per blob in a single base directory.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::{self, File};
use tokio::io::{self, AsyncWriteExt};
use tracing::debug;

use crate::error::{BlobError, Result};
use crate::factory::BackendKind;
use crate::name::BlobName;
use crate::provider::{BlobReader, BlobWriter, Provider, ProviderConfig, ProviderData};

/// Base directory used when `basedir` is not configured.
pub const DEFAULT_BASE_DIR: &str = "/var/lib/blobstore";

/// Option key for the base directory.
pub const OPT_BASE_DIR: &str = "basedir";

/// Fallback values applied by [`FilesystemProvider::configure`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilesystemDefaults {
    pub base_dir: PathBuf,
}

impl Default for FilesystemDefaults {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from(DEFAULT_BASE_DIR),
        }
    }
}

/// Resolved filesystem configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilesystemSettings {
    pub base_dir: PathBuf,
}

impl FilesystemSettings {
    pub fn resolve(config: &ProviderConfig, defaults: &FilesystemDefaults) -> Self {
        let base_dir = config
            .get(OPT_BASE_DIR)
            .map(PathBuf::from)
            .unwrap_or_else(|| defaults.base_dir.clone());
        Self { base_dir }
    }
}

/// Stores each blob as `<base_dir>/<name>`.
///
/// The base directory must already exist; it is never created.
#[derive(Debug, Clone)]
pub struct FilesystemProvider {
    data: ProviderData,
    defaults: FilesystemDefaults,
    settings: FilesystemSettings,
}

impl FilesystemProvider {
    pub fn new(data: ProviderData) -> Self {
        Self::with_defaults(data, FilesystemDefaults::default())
    }

    pub fn with_defaults(mut data: ProviderData, defaults: FilesystemDefaults) -> Self {
        data.reset();
        let settings = FilesystemSettings::resolve(&ProviderConfig::new(), &defaults);
        Self {
            data,
            defaults,
            settings,
        }
    }

    pub fn settings(&self) -> &FilesystemSettings {
        &self.settings
    }

    pub fn base_dir(&self) -> &Path {
        &self.settings.base_dir
    }

    fn blob_path(&self, name: &BlobName) -> PathBuf {
        self.settings.base_dir.join(name.as_str())
    }
}

#[async_trait]
impl Provider for FilesystemProvider {
    fn kind(&self) -> BackendKind {
        BackendKind::Filesystem
    }

    fn data(&self) -> &ProviderData {
        &self.data
    }

    fn location(&self) -> String {
        // Rebuilding from components drops trailing separators and `.`
        let base_dir: PathBuf = self.settings.base_dir.components().collect();
        format!("file://{}", base_dir.display())
    }

    fn configure(&mut self, config: &ProviderConfig) -> Result<()> {
        self.settings = FilesystemSettings::resolve(config, &self.defaults);
        debug!(base_dir = %self.settings.base_dir.display(), "configured filesystem provider");
        Ok(())
    }

    async fn store(&self, name: &str, data: &mut BlobReader<'_>) -> Result<u64> {
        let name = BlobName::parse(name)?;
        let path = self.blob_path(&name);

        let mut file = File::create(&path)
            .await
            .map_err(|e| BlobError::Unavailable(format!("{}: {}", path.display(), e)))?;
        let bytes = io::copy(data, &mut file).await?;
        file.flush().await?;

        debug!(name = %name, bytes, "stored blob");
        Ok(bytes)
    }

    async fn retrieve(&self, name: &str, dest: &mut BlobWriter<'_>) -> Result<u64> {
        let name = BlobName::parse(name)?;
        let path = self.blob_path(&name);

        let mut file = match File::open(&path).await {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(BlobError::NotFound(name.into_inner()))
            }
            Err(e) => {
                return Err(BlobError::Unavailable(format!(
                    "{}: {}",
                    path.display(),
                    e
                )))
            }
        };
        let bytes = io::copy(&mut file, dest).await?;
        dest.flush().await?;

        debug!(name = %name, bytes, "retrieved blob");
        Ok(bytes)
    }

    async fn remove(&self, name: &str) -> Result<()> {
        let name = BlobName::parse(name)?;
        let path = self.blob_path(&name);

        // Ignore NotFound errors - the blob may already be deleted
        match fs::remove_file(&path).await {
            Ok(()) => {
                debug!(name = %name, "removed blob");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, name: &str) -> Result<bool> {
        let name = BlobName::parse(name)?;
        match fs::metadata(self.blob_path(&name)).await {
            // Only a regular file can be retrieved
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
