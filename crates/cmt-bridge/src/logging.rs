//! Logging initialisation for hosts embedding the bridge.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::LoggingConfig;

/// Install a global subscriber filtered at the configured level.
///
/// `RUST_LOG`, when set, takes precedence. Returns `false` if a global
/// subscriber was already installed, in which case nothing changes.
pub fn init_logging(config: &LoggingConfig) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        let config = LoggingConfig::default();
        // Another test may have installed it first; a repeat never succeeds.
        init_logging(&config);
        assert!(!init_logging(&config));
    }

    #[test]
    fn test_bad_level_falls_back() {
        let config = LoggingConfig { level: "not a level[".to_string() };
        // Must not panic
        let _ = init_logging(&config);
    }
}
