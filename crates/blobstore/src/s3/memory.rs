//! In-process object store for tests and embedding.
//!
//! Behaves like a small S3 endpoint: buckets must be created before objects
//! can be written, creating an existing bucket fails, and credentials are
//! checked when configured. The whole endpoint can be taken offline to
//! exercise connectivity failures.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use object_store::memory::InMemory;
use parking_lot::Mutex;

use crate::error::{BlobError, Result};
use crate::provider::BlobReader;

use super::client::{Connector, ObjectClient, ObjectInfo, ObjectStream, Objects};
use super::S3Settings;

#[derive(Debug, Default)]
struct Endpoint {
    buckets: Mutex<HashMap<String, Arc<InMemory>>>,
    credentials: Option<(String, String)>,
    offline: AtomicBool,
}

/// Connector for an in-memory endpoint. Clones share the same endpoint.
#[derive(Debug, Clone, Default)]
pub struct MemoryConnector {
    endpoint: Arc<Endpoint>,
}

impl MemoryConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only accept clients configured with this key and secret.
    pub fn with_credentials(key: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            endpoint: Arc::new(Endpoint {
                credentials: Some((key.into(), secret.into())),
                ..Endpoint::default()
            }),
        }
    }

    /// Create `bucket` up front.
    pub fn with_bucket(self, bucket: impl Into<String>) -> Self {
        self.endpoint
            .buckets
            .lock()
            .entry(bucket.into())
            .or_insert_with(|| Arc::new(InMemory::new()));
        self
    }

    pub fn has_bucket(&self, bucket: &str) -> bool {
        self.endpoint.buckets.lock().contains_key(bucket)
    }

    /// Make every request fail as if the endpoint were unreachable.
    pub fn set_offline(&self, offline: bool) {
        self.endpoint.offline.store(offline, Ordering::SeqCst);
    }
}

impl Connector for MemoryConnector {
    fn connect(&self, settings: &S3Settings) -> Result<Arc<dyn ObjectClient>> {
        Ok(Arc::new(MemoryClient {
            endpoint: Arc::clone(&self.endpoint),
            bucket: settings.bucket.clone(),
            key: settings.access_key.clone(),
            secret: settings.secret_key.clone(),
        }))
    }
}

#[derive(Debug)]
struct MemoryClient {
    endpoint: Arc<Endpoint>,
    bucket: String,
    key: String,
    secret: String,
}

impl MemoryClient {
    /// Every request goes through here first, like a round trip would.
    fn request(&self) -> Result<()> {
        if self.endpoint.offline.load(Ordering::SeqCst) {
            return Err(BlobError::Unavailable("connection refused".to_string()));
        }
        if let Some((key, secret)) = &self.endpoint.credentials {
            if *key != self.key || *secret != self.secret {
                return Err(BlobError::Unavailable(
                    "the access key or secret is not valid".to_string(),
                ));
            }
        }
        Ok(())
    }

    fn objects(&self) -> Option<Objects> {
        self.endpoint
            .buckets
            .lock()
            .get(&self.bucket)
            .map(|store| Objects::new(Arc::clone(store) as _))
    }
}

#[async_trait]
impl ObjectClient for MemoryClient {
    async fn make_bucket(&self, _location: &str) -> Result<()> {
        self.request()?;
        let mut buckets = self.endpoint.buckets.lock();
        if buckets.contains_key(&self.bucket) {
            return Err(BlobError::Unavailable(format!(
                "bucket {} already exists",
                self.bucket
            )));
        }
        buckets.insert(self.bucket.clone(), Arc::new(InMemory::new()));
        Ok(())
    }

    async fn bucket_exists(&self) -> Result<bool> {
        self.request()?;
        Ok(self.objects().is_some())
    }

    async fn put_object(
        &self,
        key: &str,
        data: &mut BlobReader<'_>,
        content_type: &str,
    ) -> Result<u64> {
        self.request()?;
        let objects = self
            .objects()
            .ok_or_else(|| BlobError::Unavailable(format!("no such bucket: {}", self.bucket)))?;
        objects.put(key, data, content_type).await
    }

    async fn get_object(&self, key: &str) -> Result<ObjectStream> {
        self.request()?;
        let objects = self
            .objects()
            .ok_or_else(|| BlobError::NotFound(key.to_string()))?;
        objects.get(key).await
    }

    async fn stat_object(&self, key: &str) -> Result<ObjectInfo> {
        self.request()?;
        let objects = self
            .objects()
            .ok_or_else(|| BlobError::NotFound(key.to_string()))?;
        objects.head(key).await
    }

    async fn remove_object(&self, key: &str) -> Result<()> {
        self.request()?;
        let objects = self
            .objects()
            .ok_or_else(|| BlobError::NotFound(key.to_string()))?;
        objects.delete(key).await
    }
}
