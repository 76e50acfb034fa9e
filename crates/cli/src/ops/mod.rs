pub mod copy;
pub mod exists;
pub mod init;
pub mod remove;
pub mod retrieve;
pub mod store;

pub use copy::Transfer;
pub use exists::Exists;
pub use init::Init;
pub use remove::Remove;
pub use retrieve::Retrieve;
pub use store::Store;

use blobstore::BlobError;

use crate::state::StateError;

/// Failure of an op that talks to a configured provider.
#[derive(Debug, thiserror::Error)]
pub enum BlobOpError {
    #[error("config error: {0}")]
    Config(#[from] StateError),
    #[error("{0}")]
    Blob(#[from] BlobError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
