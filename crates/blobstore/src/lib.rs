//! Named blob storage over interchangeable backends.
//!
//! A [`Provider`] stores, retrieves, removes and checks the existence of
//! named blobs. Two backends are available:
//!
//! - [`FilesystemProvider`]: one file per blob in a base directory
//! - [`S3Provider`]: one object per blob in a bucket on an S3-compatible
//!   store (AWS S3, MinIO, ...), created on first store
//!
//! Callers pick a backend by tag with [`new`], configure it once, and then
//! use the same four operations regardless of the backend. Blob content is
//! always streamed; no backend holds a whole blob in memory.
//!
//! # Example
//!
//! ```rust,no_run
//! use blobstore::{Provider, ProviderConfig, ProviderData};
//!
//! # async fn example() -> Result<(), blobstore::BlobError> {
//! let mut provider = blobstore::new("filesystem", ProviderData::default());
//! provider.configure(&ProviderConfig::new().with("basedir", "/tmp"))?;
//!
//! let mut data: &[u8] = b"some more content";
//! let written = provider.store("bar", &mut data).await?;
//!
//! let mut buf = Vec::new();
//! let read = provider.retrieve("bar", &mut buf).await?;
//! assert_eq!(written, read);
//! # Ok(())
//! # }
//! ```

mod error;
mod factory;
mod name;
mod provider;
mod transfer;

pub mod filesystem;
pub mod s3;

pub use crate::s3::S3Provider;
pub use error::{BlobError, Result};
pub use factory::{new, Backend, BackendKind};
pub use filesystem::FilesystemProvider;
pub use name::BlobName;
pub use provider::{BlobReader, BlobWriter, Provider, ProviderConfig, ProviderData};
pub use transfer::{copy_blob, PIPE_CAPACITY};
