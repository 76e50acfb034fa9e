use blobstore::Provider;
use clap::Args;

use super::BlobOpError;

#[derive(Args, Debug, Clone)]
pub struct Exists {
    /// Blob name
    pub name: String,

    /// Profile from the config file
    #[arg(long, default_value = crate::state::DEFAULT_PROFILE)]
    pub profile: String,
}

#[async_trait::async_trait]
impl crate::op::Op for Exists {
    type Error = BlobOpError;
    type Output = bool;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let provider = ctx.provider(&self.profile)?;
        Ok(provider.exists(&self.name).await?)
    }
}
