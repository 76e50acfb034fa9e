//! Streaming copies between providers.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, warn};

use crate::error::{BlobError, Result};
use crate::name::BlobName;
use crate::provider::Provider;

/// Bytes buffered between the reading and the writing side of a copy.
pub const PIPE_CAPACITY: usize = 64 * 1024;

/// Copy the blob `name` from `src` to `dst` without holding it in memory.
///
/// The source is retrieved into one end of an in-memory pipe while the
/// destination stores from the other end. Returns the number of bytes the
/// destination stored.
///
/// The destination is not touched until the source has produced its first
/// bytes (or ended), so a source that fails up front leaves an existing
/// destination blob as it was. If the copy fails after the destination
/// started writing, the partial destination blob is removed. Copying a blob
/// onto itself fails with [`BlobError::SameBlob`].
pub async fn copy_blob<S, D>(src: &S, dst: &D, name: &str) -> Result<u64>
where
    S: Provider + ?Sized,
    D: Provider + ?Sized,
{
    let name = BlobName::parse(name)?;
    if src.kind() == dst.kind() && src.location() == dst.location() {
        return Err(BlobError::SameBlob(format!("{}/{}", src.location(), name)));
    }
    if !src.exists(name.as_str()).await? {
        return Err(BlobError::NotFound(name.into_inner()));
    }

    let (mut writer, reader) = io::duplex(PIPE_CAPACITY);
    let started = AtomicBool::new(false);

    let retrieve = async {
        let bytes = src.retrieve(name.as_str(), &mut writer).await?;
        // Closing our end is what lets the store side see end of stream
        writer.shutdown().await?;
        Ok::<_, BlobError>(bytes)
    };
    let store = async {
        let mut reader = BufReader::with_capacity(PIPE_CAPACITY, reader);
        reader.fill_buf().await?;
        started.store(true, Ordering::SeqCst);
        dst.store(name.as_str(), &mut reader).await
    };

    match tokio::try_join!(retrieve, store) {
        Ok((read, written)) if read == written => {
            debug!(name = %name, bytes = written, from = %src.kind(), to = %dst.kind(), "copied blob");
            Ok(written)
        }
        Ok((read, written)) => {
            discard_partial(dst, &name).await;
            Err(BlobError::Io(std::io::Error::other(format!(
                "copied {} of {} bytes",
                written, read
            ))))
        }
        Err(e) => {
            if started.load(Ordering::SeqCst) {
                discard_partial(dst, &name).await;
            }
            Err(e)
        }
    }
}

async fn discard_partial<D: Provider + ?Sized>(dst: &D, name: &BlobName) {
    if let Err(e) = dst.remove(name.as_str()).await {
        warn!(name = %name, error = %e, "failed to remove partial copy");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;

    use super::*;
    use crate::factory::BackendKind;
    use crate::filesystem::{FilesystemProvider, OPT_BASE_DIR};
    use crate::provider::{BlobReader, BlobWriter, ProviderConfig, ProviderData};
    use crate::s3::{MemoryConnector, S3Provider};

    fn fs_provider(dir: &std::path::Path) -> FilesystemProvider {
        let mut p = FilesystemProvider::new(ProviderData::default());
        p.configure(&ProviderConfig::new().with(OPT_BASE_DIR, dir.to_string_lossy()))
            .unwrap();
        p
    }

    async fn read_back(p: &dyn Provider, name: &str) -> Vec<u8> {
        let mut buf = Vec::new();
        p.retrieve(name, &mut buf).await.unwrap();
        buf
    }

    /// Claims every blob exists, writes `good` bytes of any retrieve, then
    /// loses its connection.
    #[derive(Debug)]
    struct FlakySource {
        data: ProviderData,
        good: usize,
    }

    impl FlakySource {
        fn new(good: usize) -> Self {
            Self {
                data: ProviderData::default(),
                good,
            }
        }
    }

    #[async_trait]
    impl Provider for FlakySource {
        fn kind(&self) -> BackendKind {
            BackendKind::ObjectStore
        }

        fn data(&self) -> &ProviderData {
            &self.data
        }

        fn location(&self) -> String {
            "http://flaky.invalid/bucket".to_string()
        }

        fn configure(&mut self, _config: &ProviderConfig) -> Result<()> {
            Ok(())
        }

        async fn store(&self, _name: &str, _data: &mut BlobReader<'_>) -> Result<u64> {
            Err(BlobError::Unavailable("connection refused".to_string()))
        }

        async fn retrieve(&self, _name: &str, dest: &mut BlobWriter<'_>) -> Result<u64> {
            dest.write_all(&vec![1u8; self.good]).await?;
            Err(BlobError::Unavailable("connection refused".to_string()))
        }

        async fn remove(&self, _name: &str) -> Result<()> {
            Ok(())
        }

        async fn exists(&self, _name: &str) -> Result<bool> {
            Ok(true)
        }
    }

    #[tokio::test]
    async fn test_copy_filesystem_to_object_store() {
        let temp_dir = tempfile::tempdir().unwrap();
        let fs = fs_provider(temp_dir.path());
        let s3 = S3Provider::with_connector(
            ProviderData::default(),
            Arc::new(MemoryConnector::new()),
        );

        // Larger than the pipe so both sides have to take turns
        let data: Vec<u8> = (0..PIPE_CAPACITY * 3 + 17).map(|i| (i % 251) as u8).collect();
        let mut reader = data.as_slice();
        fs.store("bar", &mut reader).await.unwrap();

        let copied = copy_blob(&fs, &s3, "bar").await.unwrap();
        assert_eq!(copied, data.len() as u64);

        let mut buf = Vec::new();
        s3.retrieve("bar", &mut buf).await.unwrap();
        assert_eq!(buf, data);
    }

    #[tokio::test]
    async fn test_copy_missing_source_leaves_destination_alone() {
        let src_dir = tempfile::tempdir().unwrap();
        let dst_dir = tempfile::tempdir().unwrap();
        let src = fs_provider(src_dir.path());
        let dst = fs_provider(dst_dir.path());

        let mut reader: &[u8] = b"keep me";
        dst.store("bar", &mut reader).await.unwrap();

        let err = copy_blob(&src, &dst, "bar").await.unwrap_err();
        assert!(err.is_not_found());
        assert!(dst.exists("bar").await.unwrap());
    }

    #[tokio::test]
    async fn test_copy_rejects_invalid_name() {
        let temp_dir = tempfile::tempdir().unwrap();
        let fs = fs_provider(temp_dir.path());
        let err = copy_blob(&fs, &fs, "../x").await.unwrap_err();
        assert!(err.is_invalid_name());
    }

    #[tokio::test]
    async fn test_source_failing_up_front_keeps_destination() {
        let dst_dir = tempfile::tempdir().unwrap();
        let dst = fs_provider(dst_dir.path());
        let mut reader: &[u8] = b"precious";
        dst.store("bar", &mut reader).await.unwrap();

        let err = copy_blob(&FlakySource::new(0), &dst, "bar").await.unwrap_err();
        assert!(err.is_unavailable());
        assert_eq!(read_back(&dst, "bar").await, b"precious");
    }

    #[tokio::test]
    async fn test_source_failing_mid_stream_removes_partial_copy() {
        let dst_dir = tempfile::tempdir().unwrap();
        let dst = fs_provider(dst_dir.path());
        let mut reader: &[u8] = b"precious";
        dst.store("bar", &mut reader).await.unwrap();

        // More than the pipe holds, so the destination has begun writing
        let src = FlakySource::new(PIPE_CAPACITY * 3);
        let err = copy_blob(&src, &dst, "bar").await.unwrap_err();
        assert!(err.is_unavailable());
        assert!(!dst.exists("bar").await.unwrap());
    }

    #[tokio::test]
    async fn test_copy_onto_itself_is_refused() {
        let temp_dir = tempfile::tempdir().unwrap();
        let fs = fs_provider(temp_dir.path());
        let data = vec![9u8; 256 * 1024];
        let mut reader = data.as_slice();
        fs.store("bar", &mut reader).await.unwrap();

        let err = copy_blob(&fs, &fs, "bar").await.unwrap_err();
        assert!(matches!(err, BlobError::SameBlob(_)));

        // A second provider over the same directory is the same place too
        let alias = fs_provider(&temp_dir.path().join("."));
        let err = copy_blob(&fs, &alias, "bar").await.unwrap_err();
        assert!(matches!(err, BlobError::SameBlob(_)));

        assert_eq!(read_back(&fs, "bar").await, data);
    }
}
