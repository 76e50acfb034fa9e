mod args;
mod op;
mod ops;
mod state;

use clap::{Parser, Subcommand};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use args::Args;
use op::Op;
use ops::{Exists, Init, Remove, Retrieve, Store, Transfer};

command_enum! {
    (Init, Init),
    (Store, Store),
    (Retrieve, Retrieve),
    (Remove, Remove),
    (Exists, Exists),
    (Copy, Transfer),
}

/// Logs go to stderr so retrieved content can be piped from stdout.
fn init_logging(level: tracing::Level) {
    let env_filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    let stderr_layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_writer(std::io::stderr)
        .with_filter(env_filter);

    tracing_subscriber::registry().with(stderr_layer).init();
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Flag > config file > warn
    let log_level = args
        .log_level
        .or_else(|| {
            state::CliConfig::load(args.config.clone())
                .ok()
                .and_then(|config| config.log_level())
        })
        .unwrap_or(tracing::Level::WARN);
    init_logging(log_level);

    let ctx = op::OpContext::new(args.config);

    match args.command.execute(&ctx).await {
        Ok(output) => {
            let output = output.to_string();
            if !output.is_empty() {
                println!("{}", output);
            }
            std::process::exit(0);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
