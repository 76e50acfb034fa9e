use clap::Args;

use crate::state::CliConfig;

use super::BlobOpError;

/// Copy a blob from one profile to another.
#[derive(Args, Debug, Clone)]
pub struct Transfer {
    /// Blob name, kept the same on both sides
    pub name: String,

    /// Source profile
    #[arg(long)]
    pub from: String,

    /// Destination profile
    #[arg(long)]
    pub to: String,
}

#[async_trait::async_trait]
impl crate::op::Op for Transfer {
    type Error = BlobOpError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let config = CliConfig::load(ctx.config_path.clone())?;
        let src = config.profile(&self.from)?.provider()?;
        let dst = config.profile(&self.to)?.provider()?;

        let copied = blobstore::copy_blob(&src, &dst, &self.name).await?;
        Ok(format!(
            "Copied {} ({} bytes) from {} to {}",
            self.name, copied, self.from, self.to
        ))
    }
}
