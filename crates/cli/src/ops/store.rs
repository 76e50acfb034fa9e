use std::path::PathBuf;

use blobstore::Provider;
use clap::Args;

use super::BlobOpError;

#[derive(Args, Debug, Clone)]
pub struct Store {
    /// Blob name
    pub name: String,

    /// File to read the content from (defaults to stdin)
    #[arg(long, short)]
    pub input: Option<PathBuf>,

    /// Profile from the config file
    #[arg(long, default_value = crate::state::DEFAULT_PROFILE)]
    pub profile: String,
}

#[async_trait::async_trait]
impl crate::op::Op for Store {
    type Error = BlobOpError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let provider = ctx.provider(&self.profile)?;

        let written = match &self.input {
            Some(path) => {
                let mut file = tokio::fs::File::open(path).await?;
                provider.store(&self.name, &mut file).await?
            }
            None => provider.store(&self.name, &mut tokio::io::stdin()).await?,
        };

        tracing::info!(name = %self.name, profile = %self.profile, written, "stored blob");
        Ok(format!("Stored {} ({} bytes)", self.name, written))
    }
}
