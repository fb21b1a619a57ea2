use streamlog::cli::Cli;
use tracing_subscriber::EnvFilter;

fn main() {
    // Pipeline diagnostics go to stderr, log records to stdout
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = Cli::run() {
        eprintln!("✗ Error: {:#}", e);
        std::process::exit(1);
    }
}
