// Tracing initialization; logs go to stderr so stdout stays a clean bundle.
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

pub fn level_for(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    }
}

pub fn init_tracing(verbose: u8) {
    // Prefer RUST_LOG from env unless -v was given.
    let filter = std::env::var("RUST_LOG")
        .ok()
        .filter(|_| verbose == 0)
        .and_then(|_| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new(level_for(verbose)));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .try_init();
}
