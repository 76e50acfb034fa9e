//! Backend selection.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::Result;
use crate::filesystem::FilesystemProvider;
use crate::provider::{BlobReader, BlobWriter, Provider, ProviderConfig, ProviderData};
use crate::s3::S3Provider;

/// The known backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BackendKind {
    /// Local directory
    #[default]
    Filesystem,
    /// S3-compatible object store
    ObjectStore,
}

impl BackendKind {
    /// Map a backend tag to a kind. Matching ignores case and surrounding
    /// whitespace; unrecognized tags select the filesystem backend.
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_ascii_lowercase().as_str() {
            "s3" | "object-store" | "object_store" | "objectstore" | "minio" => Self::ObjectStore,
            _ => Self::Filesystem,
        }
    }

    /// Canonical tag, accepted back by [`BackendKind::from_tag`].
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Filesystem => "filesystem",
            Self::ObjectStore => "s3",
        }
    }
}

impl FromStr for BackendKind {
    type Err = Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self::from_tag(s))
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for BackendKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for BackendKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let tag = String::deserialize(deserializer)?;
        Ok(Self::from_tag(&tag))
    }
}

/// A provider of any known kind.
#[derive(Debug, Clone)]
pub enum Backend {
    Filesystem(FilesystemProvider),
    ObjectStore(S3Provider),
}

impl Backend {
    /// Construct an unconfigured provider of the given kind.
    pub fn from_kind(kind: BackendKind, data: ProviderData) -> Self {
        match kind {
            BackendKind::Filesystem => Self::Filesystem(FilesystemProvider::new(data)),
            BackendKind::ObjectStore => Self::ObjectStore(S3Provider::new(data)),
        }
    }

    fn inner(&self) -> &dyn Provider {
        match self {
            Self::Filesystem(p) => p,
            Self::ObjectStore(p) => p,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn Provider {
        match self {
            Self::Filesystem(p) => p,
            Self::ObjectStore(p) => p,
        }
    }
}

impl From<FilesystemProvider> for Backend {
    fn from(p: FilesystemProvider) -> Self {
        Self::Filesystem(p)
    }
}

impl From<S3Provider> for Backend {
    fn from(p: S3Provider) -> Self {
        Self::ObjectStore(p)
    }
}

#[async_trait]
impl Provider for Backend {
    fn kind(&self) -> BackendKind {
        self.inner().kind()
    }

    fn data(&self) -> &ProviderData {
        self.inner().data()
    }

    fn location(&self) -> String {
        self.inner().location()
    }

    fn configure(&mut self, config: &ProviderConfig) -> Result<()> {
        self.inner_mut().configure(config)
    }

    async fn store(&self, name: &str, data: &mut BlobReader<'_>) -> Result<u64> {
        self.inner().store(name, data).await
    }

    async fn retrieve(&self, name: &str, dest: &mut BlobWriter<'_>) -> Result<u64> {
        self.inner().retrieve(name, dest).await
    }

    async fn remove(&self, name: &str) -> Result<()> {
        self.inner().remove(name).await
    }

    async fn exists(&self, name: &str) -> Result<bool> {
        self.inner().exists(name).await
    }
}

/// Construct an unconfigured provider for a backend tag.
///
/// `"s3"` (and its aliases, see [`BackendKind::from_tag`]) selects the object
/// store; anything else selects the filesystem. Performs no I/O.
pub fn new(tag: &str, data: ProviderData) -> Backend {
    Backend::from_kind(BackendKind::from_tag(tag), data)
}
