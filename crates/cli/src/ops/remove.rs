use blobstore::Provider;
use clap::Args;

use super::BlobOpError;

#[derive(Args, Debug, Clone)]
pub struct Remove {
    /// Blob name
    pub name: String,

    /// Profile from the config file
    #[arg(long, default_value = crate::state::DEFAULT_PROFILE)]
    pub profile: String,
}

#[async_trait::async_trait]
impl crate::op::Op for Remove {
    type Error = BlobOpError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let provider = ctx.provider(&self.profile)?;
        provider.remove(&self.name).await?;
        Ok(format!("Removed {}", self.name))
    }
}
