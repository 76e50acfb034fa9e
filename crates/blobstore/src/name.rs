//! Blob names.
//!
//! A blob name is a single path segment. Providers join it onto their storage
//! root (a directory or a bucket), so a name that is not its own last segment
//! could escape that root. Validation here is the only thing standing between
//! a caller-supplied name and the backing store.

use std::fmt;
use std::str::FromStr;

use crate::error::{BlobError, Result};

/// A validated blob name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlobName(String);

impl BlobName {
    /// Validate `name` and wrap it.
    pub fn parse(name: &str) -> Result<Self> {
        if is_single_segment(name) {
            Ok(Self(name.to_string()))
        } else {
            Err(BlobError::InvalidName(name.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

/// True if `name` is its own last path segment on every platform we store to.
fn is_single_segment(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '\0'])
}

impl AsRef<str> for BlobName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BlobName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for BlobName {
    type Err = BlobError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for BlobName {
    type Error = BlobError;

    fn try_from(value: String) -> Result<Self> {
        if is_single_segment(&value) {
            Ok(Self(value))
        } else {
            Err(BlobError::InvalidName(value))
        }
    }
}
