//! Object-store backend for S3-compatible services (AWS S3, MinIO, ...).

mod client;
mod memory;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use futures::TryStreamExt;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use url::Url;

use crate::error::{BlobError, Result};
use crate::factory::BackendKind;
use crate::name::BlobName;
use crate::provider::{BlobReader, BlobWriter, Provider, ProviderConfig, ProviderData};

pub use client::{
    Connector, ObjectClient, ObjectInfo, ObjectStream, PooledConnector, S3Client, S3Connector,
};
pub use memory::MemoryConnector;

pub const DEFAULT_ENDPOINT: &str = "s3.amazonaws.com";
pub const DEFAULT_LOCATION: &str = "us-east-1";
pub const DEFAULT_BUCKET: &str = "blobstore";

/// Content type given to every uploaded blob.
pub const CONTENT_TYPE: &str = "application/octet-stream";

pub const OPT_ENDPOINT: &str = "endpoint";
pub const OPT_LOCATION: &str = "location";
pub const OPT_BUCKET: &str = "bucket";
pub const OPT_KEY: &str = "key";
pub const OPT_SECRET: &str = "secret";
pub const OPT_USE_SSL: &str = "useSSL";
const OPT_USE_SSL_ALT: &str = "use_ssl";

/// Fallback values applied by [`S3Provider::configure`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3Defaults {
    pub endpoint: String,
    pub location: String,
    pub bucket: String,
}

impl Default for S3Defaults {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            location: DEFAULT_LOCATION.to_string(),
            bucket: DEFAULT_BUCKET.to_string(),
        }
    }
}

/// Resolved object-store configuration.
#[derive(Clone, PartialEq, Eq)]
pub struct S3Settings {
    /// Host and optional port, or a full URL
    pub endpoint: String,
    pub access_key: String,
    pub secret_key: String,
    pub bucket: String,
    /// Region the bucket is created in
    pub location: String,
    pub use_ssl: bool,
}

impl S3Settings {
    pub fn resolve(config: &ProviderConfig, defaults: &S3Defaults) -> Result<Self> {
        let use_ssl = if config.get(OPT_USE_SSL).is_some() {
            config.flag(OPT_USE_SSL)?
        } else {
            config.flag(OPT_USE_SSL_ALT)?
        };

        Ok(Self {
            endpoint: config.get_or(OPT_ENDPOINT, &defaults.endpoint).to_string(),
            access_key: config.get_or(OPT_KEY, "").to_string(),
            secret_key: config.get_or(OPT_SECRET, "").to_string(),
            bucket: config.get_or(OPT_BUCKET, &defaults.bucket).to_string(),
            location: config.get_or(OPT_LOCATION, &defaults.location).to_string(),
            use_ssl,
        })
    }

    /// The endpoint as a URL. A bare `host[:port]` gets `https` or `http`
    /// depending on `use_ssl`; an explicit scheme is kept as given.
    pub fn endpoint_url(&self) -> Result<Url> {
        let raw = if self.endpoint.contains("://") {
            self.endpoint.clone()
        } else {
            let scheme = if self.use_ssl { "https" } else { "http" };
            format!("{}://{}", scheme, self.endpoint)
        };
        Url::parse(&raw)
            .map_err(|e| BlobError::Unavailable(format!("invalid endpoint {:?}: {}", raw, e)))
    }
}

impl fmt::Debug for S3Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3Settings")
            .field("endpoint", &self.endpoint)
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .field("bucket", &self.bucket)
            .field("location", &self.location)
            .field("use_ssl", &self.use_ssl)
            .finish()
    }
}

/// Stores each blob as an object in a single bucket.
///
/// Each operation asks the [`Connector`] for a client, so no connection is
/// held between calls. `store` creates the bucket on first use.
#[derive(Debug, Clone)]
pub struct S3Provider {
    data: ProviderData,
    defaults: S3Defaults,
    settings: S3Settings,
    connector: Arc<dyn Connector>,
}

impl S3Provider {
    pub fn new(data: ProviderData) -> Self {
        Self::with_connector(data, Arc::new(S3Connector))
    }

    pub fn with_connector(mut data: ProviderData, connector: Arc<dyn Connector>) -> Self {
        data.reset();
        let defaults = S3Defaults::default();
        let settings = Self::initial_settings(&defaults);
        Self {
            data,
            defaults,
            settings,
            connector,
        }
    }

    /// Replace the fallback values and re-apply them.
    pub fn with_defaults(mut self, defaults: S3Defaults) -> Self {
        self.settings = Self::initial_settings(&defaults);
        self.defaults = defaults;
        self
    }

    fn initial_settings(defaults: &S3Defaults) -> S3Settings {
        S3Settings {
            endpoint: defaults.endpoint.clone(),
            access_key: String::new(),
            secret_key: String::new(),
            bucket: defaults.bucket.clone(),
            location: defaults.location.clone(),
            use_ssl: false,
        }
    }

    pub fn settings(&self) -> &S3Settings {
        &self.settings
    }

    fn connect(&self) -> Result<Arc<dyn ObjectClient>> {
        self.connector.connect(&self.settings)
    }

    /// Create the bucket, tolerating one that already exists.
    async fn ensure_bucket(&self, client: &dyn ObjectClient) -> Result<()> {
        let bucket = &self.settings.bucket;
        let create_err = match client.make_bucket(&self.settings.location).await {
            Ok(()) => return Ok(()),
            Err(e) => e,
        };

        match client.bucket_exists().await {
            Ok(true) => {
                debug!(bucket = %bucket, "bucket already exists");
                Ok(())
            }
            Ok(false) => Err(BlobError::Unavailable(format!(
                "unable to create bucket {}: {}",
                bucket, create_err
            ))),
            Err(e) => {
                warn!(bucket = %bucket, error = %create_err, "bucket creation failed");
                Err(BlobError::Unavailable(format!(
                    "unable to create bucket {}: {}",
                    bucket, e
                )))
            }
        }
    }
}

#[async_trait]
impl Provider for S3Provider {
    fn kind(&self) -> BackendKind {
        BackendKind::ObjectStore
    }

    fn data(&self) -> &ProviderData {
        &self.data
    }

    fn location(&self) -> String {
        let endpoint = self
            .settings
            .endpoint_url()
            .map(|url| url.to_string())
            .unwrap_or_else(|_| self.settings.endpoint.clone());
        format!("{}/{}", endpoint.trim_end_matches('/'), self.settings.bucket)
    }

    fn configure(&mut self, config: &ProviderConfig) -> Result<()> {
        self.settings = S3Settings::resolve(config, &self.defaults)?;
        debug!(
            endpoint = %self.settings.endpoint,
            bucket = %self.settings.bucket,
            location = %self.settings.location,
            use_ssl = self.settings.use_ssl,
            "configured object store provider"
        );
        Ok(())
    }

    async fn store(&self, name: &str, data: &mut BlobReader<'_>) -> Result<u64> {
        let name = BlobName::parse(name)?;
        let client = self.connect()?;
        self.ensure_bucket(client.as_ref()).await?;

        let bytes = client.put_object(name.as_str(), data, CONTENT_TYPE).await?;
        debug!(name = %name, bucket = %self.settings.bucket, bytes, "stored blob");
        Ok(bytes)
    }

    async fn retrieve(&self, name: &str, dest: &mut BlobWriter<'_>) -> Result<u64> {
        let name = BlobName::parse(name)?;
        let client = self.connect()?;
        let mut stream = client.get_object(name.as_str()).await?;

        let mut bytes = 0u64;
        while let Some(chunk) = stream.try_next().await? {
            dest.write_all(&chunk).await?;
            bytes += chunk.len() as u64;
        }
        dest.flush().await?;

        debug!(name = %name, bucket = %self.settings.bucket, bytes, "retrieved blob");
        Ok(bytes)
    }

    async fn remove(&self, name: &str) -> Result<()> {
        let name = BlobName::parse(name)?;
        let client = self.connect()?;
        // Ignore NotFound errors - the blob may already be deleted
        match client.remove_object(name.as_str()).await {
            Ok(()) => {
                debug!(name = %name, bucket = %self.settings.bucket, "removed blob");
                Ok(())
            }
            Err(BlobError::NotFound(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn exists(&self, name: &str) -> Result<bool> {
        let name = BlobName::parse(name)?;
        let client = self.connect()?;
        match client.stat_object(name.as_str()).await {
            Ok(info) => {
                debug!(
                    key = %info.key,
                    size = info.size,
                    last_modified = %info.last_modified,
                    "blob exists"
                );
                Ok(true)
            }
            Err(BlobError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }
}
