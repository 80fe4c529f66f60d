//! Entry point for the command-line interface.
#![forbid(unsafe_code)]

use mapview_cli::CliError;
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "MAPVIEW_LOG";
const DEFAULT_DIRECTIVES: &str = "info";

fn main() {
    init_logging();
    if let Err(err) = mapview_cli::run() {
        if let CliError::ArgumentParsing(clap_err) = &err {
            clap_err.exit();
        }
        eprintln!("mapview: {err}");
        std::process::exit(1);
    }
}

/// Send `log` records to stderr, filtered by `MAPVIEW_LOG`, then `RUST_LOG`.
fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES));
    // A subscriber installed by an embedding process takes precedence.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
