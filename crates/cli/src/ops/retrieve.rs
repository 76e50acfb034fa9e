use std::path::{Path, PathBuf};

use blobstore::Provider;
use clap::Args;
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;

use super::BlobOpError;

#[derive(Args, Debug, Clone)]
pub struct Retrieve {
    /// Blob name
    pub name: String,

    /// File to write the content to (defaults to stdout)
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// Profile from the config file
    #[arg(long, default_value = crate::state::DEFAULT_PROFILE)]
    pub profile: String,
}

#[async_trait::async_trait]
impl crate::op::Op for Retrieve {
    type Error = BlobOpError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let provider = ctx.provider(&self.profile)?;

        let Some(path) = &self.output else {
            let mut stdout = tokio::io::stdout();
            let read = provider.retrieve(&self.name, &mut stdout).await?;
            stdout.flush().await?;
            tracing::info!(name = %self.name, read, "retrieved blob to stdout");
            // Content went to stdout; print nothing else there.
            return Ok(String::new());
        };

        // Stage next to the target so the final rename stays on one
        // filesystem. The target is only replaced once the blob is complete;
        // on failure the staging file is deleted when dropped.
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let staged = NamedTempFile::new_in(dir)?;
        let mut file = tokio::fs::File::from_std(staged.reopen()?);

        let read = provider.retrieve(&self.name, &mut file).await?;
        file.flush().await?;
        drop(file);

        staged.persist(path).map_err(|e| e.error)?;
        Ok(format!(
            "Retrieved {} ({} bytes) to {}",
            self.name,
            read,
            path.display()
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::op::{Op, OpContext};
    use crate::state::{CliConfig, DEFAULT_PROFILE};

    /// A config with a default filesystem profile, and a place for output.
    fn setup() -> (tempfile::TempDir, OpContext, PathBuf) {
        let temp_dir = tempfile::tempdir().unwrap();
        let blobs = temp_dir.path().join("blobs");
        std::fs::create_dir(&blobs).unwrap();
        let config_path = temp_dir.path().join("config.toml");
        CliConfig::init(Some(config_path.clone()), &blobs).unwrap();
        (temp_dir, OpContext::new(Some(config_path)), blobs)
    }

    fn retrieve(name: &str, output: &Path) -> Retrieve {
        Retrieve {
            name: name.to_string(),
            output: Some(output.to_path_buf()),
            profile: DEFAULT_PROFILE.to_string(),
        }
    }

    #[tokio::test]
    async fn test_retrieve_to_file() {
        let (temp_dir, ctx, blobs) = setup();
        std::fs::write(blobs.join("bar"), b"some more content").unwrap();
        let output = temp_dir.path().join("out.bin");
        std::fs::write(&output, b"old contents that are longer").unwrap();

        retrieve("bar", &output).execute(&ctx).await.unwrap();
        assert_eq!(std::fs::read(&output).unwrap(), b"some more content");
    }

    #[tokio::test]
    async fn test_missing_blob_keeps_existing_output() {
        let (temp_dir, ctx, _blobs) = setup();
        let output = temp_dir.path().join("important.txt");
        std::fs::write(&output, b"user data").unwrap();

        let err = retrieve("missing", &output).execute(&ctx).await.unwrap_err();
        assert!(matches!(err, BlobOpError::Blob(ref e) if e.is_not_found()));
        assert_eq!(std::fs::read(&output).unwrap(), b"user data");

        // No staging files left behind
        let entries: Vec<_> = std::fs::read_dir(temp_dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(entries.len(), 3, "{:?}", entries);
    }
}
