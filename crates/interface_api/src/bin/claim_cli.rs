//! Claims Adjudication - command line decisions
//!
//! ```bash
//! claim-decide data/john.json data/alice.json --declarations data/declarations
//! ```

use std::process;

use clap::Parser;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use interface_api::cli::{run, CliArgs};
use interface_api::{build_pipeline, config::AppConfig};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let args = CliArgs::parse();

    let mut config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid CLAIMS_ configuration: {}", e);
            process::exit(2);
        }
    };
    if let Some(dir) = &args.declarations {
        config.declarations_dir = dir.clone();
    }

    init_logging(args.log_level.as_deref().unwrap_or("warn"));

    let pipeline = match build_pipeline(&config) {
        Ok(pipeline) => pipeline,
        Err(e) => {
            eprintln!("{:#}", e);
            process::exit(2);
        }
    };

    process::exit(run(&pipeline, &args).await);
}

/// Logs go to stderr so decisions on stdout stay machine-readable
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .init();
}
