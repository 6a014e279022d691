use anyhow::Result;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    // Diagnostics are off unless RUST_LOG is set, so the alternate screen
    // stays clean; opt in with e.g. `RUST_LOG=cc_convos=debug cc-convos 2>log`.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("off"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    cc_convos::app::run()
}
