use crate::config::LogConfig;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

pub const LOG_ENV: &str = "STALECLEAN_LOG";

/// `STALECLEAN_LOG` wins over the configured level; garbage in either falls
/// back to `info`.
pub fn build_filter(config: &LogConfig) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber. Output goes to stderr; stdout
/// carries the JSON transport and machine-readable reports.
pub fn init(config: &LogConfig) {
    let _ = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_ansi(false),
        )
        .with(build_filter(config))
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configured_level_is_used_when_env_is_unset() {
        if std::env::var(LOG_ENV).is_ok() {
            return;
        }
        let filter = build_filter(&LogConfig {
            level: "debug".into(),
        });
        assert_eq!(filter.to_string(), "debug");
    }

    #[test]
    fn init_twice_does_not_panic() {
        init(&LogConfig::default());
        init(&LogConfig::default());
    }
}
