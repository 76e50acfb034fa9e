pub use clap::Parser;

use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "blobctl")]
#[command(about = "Store, fetch and copy named blobs on a filesystem or S3-compatible backend")]
pub struct Args {
    /// Path to the config file (defaults to ~/.config/blobctl/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level (overrides the config file; RUST_LOG directives still apply)
    #[arg(long, global = true)]
    pub log_level: Option<tracing::Level>,

    #[command(subcommand)]
    pub command: crate::Command,
}
