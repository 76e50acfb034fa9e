use std::path::PathBuf;

use clap::Args;

use crate::state::{CliConfig, DEFAULT_PROFILE};

#[derive(Args, Debug, Clone)]
pub struct Init {
    /// Directory the default filesystem profile stores blobs in
    #[arg(long, default_value = blobstore::filesystem::DEFAULT_BASE_DIR)]
    pub basedir: PathBuf,
}

#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("init failed: {0}")]
    StateFailed(#[from] crate::state::StateError),
}

#[async_trait::async_trait]
impl crate::op::Op for Init {
    type Error = InitError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let (_, config_path) = CliConfig::init(ctx.config_path.clone(), &self.basedir)?;

        Ok(format!(
            "Initialized blobctl config at: {}\n\
             - Profile: {} (filesystem)\n\
             - Base directory: {}",
            config_path.display(),
            DEFAULT_PROFILE,
            self.basedir.display()
        ))
    }
}
