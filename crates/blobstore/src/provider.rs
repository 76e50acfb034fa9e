//! The capability every blob backend implements.

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use tokio::io::{AsyncRead, AsyncWrite};

use crate::error::{BlobError, Result};
use crate::factory::BackendKind;

/// Byte source handed to [`Provider::store`].
pub type BlobReader<'a> = dyn AsyncRead + Unpin + Send + 'a;

/// Byte sink handed to [`Provider::retrieve`].
pub type BlobWriter<'a> = dyn AsyncWrite + Unpin + Send + 'a;

/// Metadata attached to every provider.
///
/// Reserved for encryption at rest. Providers reset it on construction and
/// never read it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderData {
    pub encryption: bool,
    pub secret: String,
}

impl ProviderData {
    /// Disable encryption and clear the secret.
    pub fn reset(&mut self) {
        self.encryption = false;
        self.secret.clear();
    }
}

/// String options used to configure a provider.
///
/// Keys a backend does not recognize are ignored, and empty values count as
/// absent. Deserializes from any map whose values are strings, booleans or
/// numbers, so `useSSL = true` and `useSSL = "yes"` are both accepted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ProviderConfig {
    options: BTreeMap<String, String>,
}

impl ProviderConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.options.insert(key.into(), value.into());
    }

    /// The value for `key`, or `None` if it is missing or empty.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.options
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// The value for `key`, or `default` if it is missing or empty.
    pub fn get_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get(key).unwrap_or(default)
    }

    /// Parse a yes/no style flag. Missing or empty is `false`.
    pub fn flag(&self, key: &str) -> Result<bool> {
        let Some(value) = self.get(key) else {
            return Ok(false);
        };
        match value.trim().to_ascii_lowercase().as_str() {
            "yes" | "true" | "1" | "on" => Ok(true),
            "no" | "false" | "0" | "off" | "" => Ok(false),
            _ => Err(BlobError::InvalidConfig(format!(
                "{} must be a boolean flag, got {:?}",
                key, value
            ))),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.options.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ProviderConfig {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            options: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl From<std::collections::HashMap<String, String>> for ProviderConfig {
    fn from(map: std::collections::HashMap<String, String>) -> Self {
        map.into_iter().collect()
    }
}

/// A single option value as it may appear in a config file.
#[derive(Deserialize)]
#[serde(untagged)]
enum OptionValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl From<OptionValue> for String {
    fn from(value: OptionValue) -> Self {
        match value {
            OptionValue::Bool(b) => b.to_string(),
            OptionValue::Int(i) => i.to_string(),
            OptionValue::Float(f) => f.to_string(),
            OptionValue::Str(s) => s,
        }
    }
}

impl<'de> Deserialize<'de> for ProviderConfig {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct OptionsVisitor;

        impl<'de> Visitor<'de> for OptionsVisitor {
            type Value = ProviderConfig;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of provider options")
            }

            fn visit_map<A: MapAccess<'de>>(
                self,
                mut map: A,
            ) -> std::result::Result<Self::Value, A::Error> {
                let mut config = ProviderConfig::new();
                while let Some((key, value)) = map.next_entry::<String, OptionValue>()? {
                    config.set(key, value);
                }
                Ok(config)
            }
        }

        deserializer.deserialize_map(OptionsVisitor)
    }
}

/// A blob storage backend.
///
/// A provider is configured once with [`Provider::configure`] and then shared
/// freely: the data operations take `&self` and acquire their own file or
/// client handle per call. Streams are borrowed for a single call only.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Which backend this is.
    fn kind(&self) -> BackendKind;

    /// The metadata stub attached at construction.
    fn data(&self) -> &ProviderData;

    /// Where this provider keeps its blobs, as a URL-like string. Two
    /// providers of the same kind with the same location share blobs.
    fn location(&self) -> String;

    /// Apply options, falling back to defaults for anything missing or
    /// empty. Performs no I/O. Calling it again replaces the previous
    /// configuration.
    fn configure(&mut self, config: &ProviderConfig) -> Result<()>;

    /// Write everything from `data` under `name`, replacing any existing
    /// blob. Returns the number of bytes written.
    async fn store(&self, name: &str, data: &mut BlobReader<'_>) -> Result<u64>;

    /// Copy the blob `name` into `dest`. Returns the number of bytes copied.
    async fn retrieve(&self, name: &str, dest: &mut BlobWriter<'_>) -> Result<u64>;

    /// Delete the blob `name`. Deleting a blob that does not exist succeeds.
    async fn remove(&self, name: &str) -> Result<()>;

    /// Whether `name` can currently be retrieved. A missing blob is
    /// `Ok(false)`; an error means the backend itself failed.
    async fn exists(&self, name: &str) -> Result<bool>;
}
