//! Structured logging initialization.

use crate::config::LogConfig;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable output.
    Pretty,
    /// One JSON object per line.
    Json,
}

impl LogFormat {
    /// Parses a format name; anything other than `json` is pretty.
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }
}

/// Installs a global subscriber for the client crates.
///
/// `RUST_LOG` takes precedence over `level`. Returns `false` if a subscriber
/// was already installed, which makes repeated calls harmless.
///
/// ```rust,no_run
/// use hfc_client::logging::{init_logging, LogFormat};
///
/// init_logging("debug", LogFormat::Json);
/// ```
pub fn init_logging(level: &str, format: LogFormat) -> bool {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("hfc_client={level},hfc_block={level},hfc_identity={level}").into()
    });

    let registry = tracing_subscriber::registry().with(env_filter);

    let installed = match format {
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(false)
                    .with_target(true),
            )
            .try_init()
            .is_ok(),
        LogFormat::Pretty => registry.with(fmt::layer().pretty()).try_init().is_ok(),
    };

    if installed {
        tracing::info!(
            level = %level,
            format = ?format,
            "logging initialized"
        );
    }
    installed
}

/// [`init_logging`] driven by the `log` section of the client configuration.
pub fn init_from_config(config: &LogConfig) -> bool {
    init_logging(&config.level, LogFormat::parse(&config.format))
}
