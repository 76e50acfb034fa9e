//! Object store client capability.
//!
//! Object data goes through the `object_store` crate, which gives one
//! interface over S3, MinIO and in-memory stores. `object_store` has no notion
//! of creating buckets, so bucket provisioning goes through `rust-s3`.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use futures::{StreamExt, TryStreamExt};
use object_store::aws::AmazonS3Builder;
use object_store::buffered::BufWriter;
use object_store::path::Path as ObjectPath;
use object_store::{Attribute, AttributeValue, Attributes, ObjectStore};
use parking_lot::Mutex;
use ::s3::creds::Credentials;
use ::s3::region::Region;
use ::s3::{Bucket, BucketConfiguration};
use tokio::io::{self, AsyncWriteExt};
use tracing::{debug, warn};

use crate::error::{BlobError, Result};
use crate::provider::BlobReader;

use super::S3Settings;

/// Chunks of an object being downloaded.
pub type ObjectStream = BoxStream<'static, Result<Bytes>>;

/// Information about an object in storage.
#[derive(Debug, Clone)]
pub struct ObjectInfo {
    /// Object key
    pub key: String,
    /// Object size in bytes
    pub size: u64,
    /// Last modified time
    pub last_modified: chrono::DateTime<chrono::Utc>,
}

/// Operations against one bucket of an S3-compatible store.
///
/// Implementations report what the store says without retrying: a missing
/// object is `BlobError::NotFound`, anything that stops the request from
/// being served is `BlobError::Unavailable`.
#[async_trait]
pub trait ObjectClient: Send + Sync + fmt::Debug {
    /// Create the bucket in `location`. Fails if it already exists.
    async fn make_bucket(&self, location: &str) -> Result<()>;

    async fn bucket_exists(&self) -> Result<bool>;

    /// Upload everything from `data` as `key`. Returns bytes uploaded.
    async fn put_object(
        &self,
        key: &str,
        data: &mut BlobReader<'_>,
        content_type: &str,
    ) -> Result<u64>;

    async fn get_object(&self, key: &str) -> Result<ObjectStream>;

    async fn stat_object(&self, key: &str) -> Result<ObjectInfo>;

    async fn remove_object(&self, key: &str) -> Result<()>;
}

/// Builds an [`ObjectClient`] from resolved settings.
///
/// Called once per provider operation. Connecting must not perform I/O;
/// failures to reach the store surface from the client's operations.
pub trait Connector: Send + Sync + fmt::Debug {
    fn connect(&self, settings: &S3Settings) -> Result<Arc<dyn ObjectClient>>;
}

/// Data path shared by every `object_store` backed client.
#[derive(Debug, Clone)]
pub(crate) struct Objects {
    store: Arc<dyn ObjectStore>,
}

impl Objects {
    pub(crate) fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// Stream `data` into the store. Large uploads become multipart uploads
    /// inside `BufWriter`, so memory use stays bounded.
    pub(crate) async fn put(
        &self,
        key: &str,
        data: &mut BlobReader<'_>,
        content_type: &str,
    ) -> Result<u64> {
        let mut attributes = Attributes::new();
        attributes.insert(
            Attribute::ContentType,
            AttributeValue::from(content_type.to_string()),
        );
        let mut writer =
            BufWriter::new(Arc::clone(&self.store), ObjectPath::from(key)).with_attributes(attributes);

        let bytes = match io::copy(data, &mut writer).await {
            Ok(bytes) => bytes,
            Err(e) => {
                abort_upload(&mut writer, key).await;
                return Err(e.into());
            }
        };
        if let Err(e) = writer.shutdown().await {
            abort_upload(&mut writer, key).await;
            return Err(e.into());
        }

        debug!(key, bytes, "put object");
        Ok(bytes)
    }

    pub(crate) async fn get(&self, key: &str) -> Result<ObjectStream> {
        let result = self
            .store
            .get(&ObjectPath::from(key))
            .await
            .map_err(|e| BlobError::from_store(e, key))?;
        debug!(key, size = result.meta.size as u64, "get object");
        Ok(result
            .into_stream()
            .map_err(BlobError::from_transfer)
            .boxed())
    }

    pub(crate) async fn head(&self, key: &str) -> Result<ObjectInfo> {
        let meta = self
            .store
            .head(&ObjectPath::from(key))
            .await
            .map_err(|e| BlobError::from_store(e, key))?;
        Ok(ObjectInfo {
            key: meta.location.to_string(),
            size: meta.size as u64,
            last_modified: meta.last_modified,
        })
    }

    pub(crate) async fn delete(&self, key: &str) -> Result<()> {
        self.store
            .delete(&ObjectPath::from(key))
            .await
            .map_err(|e| BlobError::from_store(e, key))?;
        debug!(key, "delete object");
        Ok(())
    }

    /// Check the bucket exists by listing it. An empty bucket still yields a
    /// successful (empty) listing.
    pub(crate) async fn probe_bucket(&self, bucket: &str) -> Result<bool> {
        let mut stream = self.store.list(None);
        match stream.try_next().await {
            Ok(_) => Ok(true),
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(e) => {
                let msg = e.to_string();
                if is_missing_bucket(&msg) {
                    debug!(bucket, "bucket probe reports missing bucket");
                    return Ok(false);
                }
                Err(BlobError::Unavailable(msg))
            }
        }
    }
}

/// Whether a store error reports the S3 `NoSuchBucket` code.
fn is_missing_bucket(msg: &str) -> bool {
    msg.contains("NoSuchBucket")
}

/// Drop whatever part of a multipart upload already reached the store.
async fn abort_upload(writer: &mut BufWriter, key: &str) {
    if let Err(e) = writer.abort().await {
        warn!(key, error = %e, "failed to abort upload");
    }
}

/// Connects to a real S3-compatible endpoint.
#[derive(Debug, Clone, Copy, Default)]
pub struct S3Connector;

impl Connector for S3Connector {
    fn connect(&self, settings: &S3Settings) -> Result<Arc<dyn ObjectClient>> {
        Ok(Arc::new(S3Client::new(settings)?))
    }
}

/// Client for one bucket on an S3-compatible endpoint.
pub struct S3Client {
    objects: Objects,
    bucket: String,
    endpoint: String,
    credentials: Credentials,
}

impl S3Client {
    pub fn new(settings: &S3Settings) -> Result<Self> {
        let endpoint = settings.endpoint_url()?;
        let allow_http = endpoint.scheme() == "http";
        let endpoint = endpoint.as_str().trim_end_matches('/').to_string();

        let mut builder = AmazonS3Builder::new()
            .with_endpoint(&endpoint)
            .with_bucket_name(&settings.bucket)
            .with_region(&settings.location)
            .with_allow_http(allow_http);
        if !settings.access_key.is_empty() {
            builder = builder
                .with_access_key_id(&settings.access_key)
                .with_secret_access_key(&settings.secret_key);
        }
        let store = builder
            .build()
            .map_err(|e| BlobError::Unavailable(e.to_string()))?;

        let credentials = if settings.access_key.is_empty() {
            Credentials::anonymous()
        } else {
            Credentials::new(
                Some(&settings.access_key),
                Some(&settings.secret_key),
                None,
                None,
                None,
            )
        }
        .map_err(|e| BlobError::Unavailable(e.to_string()))?;

        Ok(Self {
            objects: Objects::new(Arc::new(store)),
            bucket: settings.bucket.clone(),
            endpoint,
            credentials,
        })
    }
}

impl fmt::Debug for S3Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3Client")
            .field("endpoint", &self.endpoint)
            .field("bucket", &self.bucket)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ObjectClient for S3Client {
    async fn make_bucket(&self, location: &str) -> Result<()> {
        let region = Region::Custom {
            region: location.to_string(),
            endpoint: self.endpoint.clone(),
        };
        let response = Bucket::create_with_path_style(
            &self.bucket,
            region,
            self.credentials.clone(),
            BucketConfiguration::default(),
        )
        .await
        .map_err(|e| BlobError::Unavailable(e.to_string()))?;

        if !response.success() {
            return Err(BlobError::Unavailable(format!(
                "creating bucket {} returned status {}",
                self.bucket, response.response_code
            )));
        }
        debug!(bucket = %self.bucket, location, "created bucket");
        Ok(())
    }

    async fn bucket_exists(&self) -> Result<bool> {
        self.objects.probe_bucket(&self.bucket).await
    }

    async fn put_object(
        &self,
        key: &str,
        data: &mut BlobReader<'_>,
        content_type: &str,
    ) -> Result<u64> {
        self.objects.put(key, data, content_type).await
    }

    async fn get_object(&self, key: &str) -> Result<ObjectStream> {
        self.objects.get(key).await
    }

    async fn stat_object(&self, key: &str) -> Result<ObjectInfo> {
        self.objects.head(key).await
    }

    async fn remove_object(&self, key: &str) -> Result<()> {
        self.objects.delete(key).await
    }
}

/// Reuses one client for as long as the settings stay the same.
///
/// Wrap a connector in this when reconnecting per operation is too costly.
/// The provider contract is unchanged; the wrapped client must tolerate
/// concurrent use, which both shipped clients do.
pub struct PooledConnector<C> {
    inner: C,
    cached: Mutex<Option<(S3Settings, Arc<dyn ObjectClient>)>>,
}

impl<C: Connector> PooledConnector<C> {
    pub fn new(inner: C) -> Self {
        Self {
            inner,
            cached: Mutex::new(None),
        }
    }
}

impl<C: Connector> Connector for PooledConnector<C> {
    fn connect(&self, settings: &S3Settings) -> Result<Arc<dyn ObjectClient>> {
        let mut cached = self.cached.lock();
        if let Some((cached_settings, client)) = cached.as_ref() {
            if cached_settings == settings {
                return Ok(Arc::clone(client));
            }
        }
        let client = self.inner.connect(settings)?;
        *cached = Some((settings.clone(), Arc::clone(&client)));
        Ok(client)
    }
}

impl<C: fmt::Debug> fmt::Debug for PooledConnector<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledConnector")
            .field("inner", &self.inner)
            .field("cached", &self.cached.lock().is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ProviderConfig;
    use crate::s3::{S3Defaults, OPT_ENDPOINT, OPT_USE_SSL};

    fn settings(endpoint: &str, use_ssl: &str) -> S3Settings {
        let config = ProviderConfig::new()
            .with(OPT_ENDPOINT, endpoint)
            .with(OPT_USE_SSL, use_ssl);
        S3Settings::resolve(&config, &S3Defaults::default()).unwrap()
    }

    #[test]
    fn test_client_builds_without_io() {
        let client = S3Client::new(&settings("127.0.0.1:9000", "no")).unwrap();
        assert_eq!(client.endpoint, "http://127.0.0.1:9000");
        assert_eq!(client.bucket, "blobstore");

        let client = S3Client::new(&settings("s3.amazonaws.com", "yes")).unwrap();
        assert_eq!(client.endpoint, "https://s3.amazonaws.com");
    }

    #[test]
    fn test_missing_bucket_classification() {
        assert!(is_missing_bucket(
            "Client error with status 404 Not Found: <Code>NoSuchBucket</Code>"
        ));
        assert!(!is_missing_bucket("bucket policy does not allow access"));
        assert!(!is_missing_bucket("could not connect to bucket endpoint"));
    }

    #[test]
    fn test_debug_hides_credentials() {
        let config = ProviderConfig::new()
            .with("key", "accesskey")
            .with("secret", "secretkey");
        let settings = S3Settings::resolve(&config, &S3Defaults::default()).unwrap();
        let client = S3Client::new(&settings).unwrap();
        let debug = format!("{:?}", client);
        assert!(!debug.contains("secretkey"));
    }

    #[derive(Debug, Default)]
    struct CountingConnector {
        connects: std::sync::atomic::AtomicUsize,
    }

    impl Connector for CountingConnector {
        fn connect(&self, settings: &S3Settings) -> Result<Arc<dyn ObjectClient>> {
            self.connects
                .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            S3Connector.connect(settings)
        }
    }

    #[test]
    fn test_pooled_connector_reuses_client() {
        let pooled = PooledConnector::new(CountingConnector::default());
        let a = settings("127.0.0.1:9000", "no");
        let b = settings("127.0.0.1:9001", "no");

        let first = pooled.connect(&a).unwrap();
        let second = pooled.connect(&a).unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        pooled.connect(&b).unwrap();
        let connects = pooled
            .inner
            .connects
            .load(std::sync::atomic::Ordering::SeqCst);
        assert_eq!(connects, 2);
    }
}
