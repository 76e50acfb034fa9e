//! Shared test utilities for provider integration tests
#![allow(dead_code)]

use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use blobstore::s3::MemoryConnector;
use blobstore::{Backend, Provider, ProviderConfig, ProviderData, S3Provider};
use tempfile::TempDir;
use tokio::io::{AsyncRead, ReadBuf};

pub const KEY: &str = "accesskey";
pub const SECRET: &str = "secretkey";
pub const ENDPOINT: &str = "127.0.0.1:9000";
pub const LOCATION: &str = "us-east-1";
pub const BUCKET: &str = "foobar";

/// Options for an object store provider pointed at the local MinIO setup
pub fn s3_config() -> ProviderConfig {
    ProviderConfig::new()
        .with("key", KEY)
        .with("secret", SECRET)
        .with("endpoint", ENDPOINT)
        .with("location", LOCATION)
        .with("bucket", BUCKET)
        .with("useSSL", "no")
}

/// A filesystem provider rooted in a fresh temp directory
pub fn filesystem() -> (Backend, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let mut provider = blobstore::new("filesystem", ProviderData::default());
    provider
        .configure(&ProviderConfig::new().with("basedir", temp_dir.path().to_string_lossy()))
        .unwrap();
    (provider, temp_dir)
}

/// An object store provider backed by an in-memory endpoint
pub fn object_store(connector: &MemoryConnector) -> Backend {
    let mut provider =
        S3Provider::with_connector(ProviderData::default(), Arc::new(connector.clone()));
    provider.configure(&s3_config()).unwrap();
    provider.into()
}

/// One configured provider per backend, with whatever keeps them alive
pub fn all_backends() -> Vec<(Backend, Option<TempDir>)> {
    let (fs, temp_dir) = filesystem();
    let s3 = object_store(&MemoryConnector::with_credentials(KEY, SECRET));
    vec![(fs, Some(temp_dir)), (s3, None)]
}

/// Store `data` under `name`, panicking on failure
pub async fn put(provider: &dyn Provider, name: &str, data: &[u8]) -> u64 {
    let mut reader = data;
    provider.store(name, &mut reader).await.unwrap()
}

/// Retrieve `name` into a fresh buffer
pub async fn get(provider: &dyn Provider, name: &str) -> blobstore::Result<Vec<u8>> {
    let mut buf = Vec::new();
    provider.retrieve(name, &mut buf).await?;
    Ok(buf)
}

/// A reader that yields `good` bytes and then fails, like a dropped upload
pub struct BrokenReader {
    good: usize,
}

impl BrokenReader {
    pub fn new(good: usize) -> Self {
        Self { good }
    }
}

impl AsyncRead for BrokenReader {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        if self.good == 0 {
            return Poll::Ready(Err(io::Error::new(
                io::ErrorKind::ConnectionReset,
                "client went away",
            )));
        }
        let n = self.good.min(buf.remaining());
        buf.put_slice(&vec![b'x'; n]);
        self.good -= n;
        Poll::Ready(Ok(()))
    }
}
