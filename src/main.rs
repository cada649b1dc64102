mod cli;
mod config;
mod feed;
mod model;
mod options;
mod reconcile;
mod session;
mod storage;
mod tools;

use std::process;

use tracing_subscriber::EnvFilter;

use config::Config;
use storage::Storage;

fn main() {
    let config = Config::load().unwrap_or_else(|e| {
        eprintln!("{e}");
        process::exit(1);
    });

    tracing_subscriber::fmt()
        .with_env_filter(log_filter(&config))
        .with_writer(std::io::stderr)
        .init();

    let path = config.state_path().unwrap_or_else(|| {
        eprintln!("Could not determine home directory.");
        process::exit(1);
    });

    let storage = match Storage::open(&path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Failed to open storage at {}: {e}", path.display());
            process::exit(1);
        }
    };

    if let Err(e) = cli::run(&storage) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

/// `LOOKOUT_LOG`, then the configured level, then `warn`.
fn log_filter(config: &Config) -> EnvFilter {
    EnvFilter::try_from_env("LOOKOUT_LOG").unwrap_or_else(|_| {
        let level = config.log_level.as_deref().unwrap_or("warn");
        EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("warn"))
    })
}
