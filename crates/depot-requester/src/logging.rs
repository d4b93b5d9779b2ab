use anyhow::{Context, Result};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_FILTER: &str = "depot=info";

/// Filter from RUST_LOG, falling back to info for depot crates
///
/// - RUST_LOG=debug      (verbose logging, including store cache hits)
/// - RUST_LOG=depot=info (default level)
/// - RUST_LOG=error      (errors only)
pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Initialize logging to stderr for a process embedding the requester
pub fn init() -> Result<()> {
    init_with_writer(std::io::stderr, true)
}

/// Initialize logging to an arbitrary writer
pub fn init_with_writer<W>(writer: W, ansi: bool) -> Result<()>
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    tracing_subscriber::registry()
        .with(env_filter())
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(ansi)
                .with_target(false)
                .compact(),
        )
        .try_init()
        .context("Failed to initialize tracing subscriber")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_parses() {
        let filter = EnvFilter::new(DEFAULT_FILTER);
        assert_eq!(filter.to_string(), DEFAULT_FILTER);
    }

    #[test]
    fn test_second_init_fails() {
        // Only one global subscriber may be installed per process
        let _ = init_with_writer(std::io::sink, false);
        let second = init_with_writer(std::io::sink, false);
        assert!(second.is_err());
    }
}
