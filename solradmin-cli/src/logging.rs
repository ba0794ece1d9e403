use crate::LogFormat;
use solradmin::LoggingConfig;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global subscriber. Logs go to stderr; stdout carries results.
///
/// `RUST_LOG` wins over `--debug`, which wins over the configured level.
pub fn init(config: &LoggingConfig, debug: bool, format: Option<LogFormat>) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if debug {
            EnvFilter::new("solradmin=debug,info")
        } else {
            EnvFilter::new(&config.level)
        }
    });

    let format = format.unwrap_or(if config.format == "json" {
        LogFormat::Json
    } else {
        LogFormat::Pretty
    });

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        LogFormat::Pretty => registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init(),
    }
}
