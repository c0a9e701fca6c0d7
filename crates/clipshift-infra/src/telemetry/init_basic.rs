use clipshift_core::LogFormat;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "clipshift=debug,clipshift_core=debug,clipshift_processing=debug,clipshift_plugin=debug,clipshift_cli=debug";

/// Initialize tracing with a text or JSON formatter.
///
/// Events go to stderr so command output on stdout stays machine-readable.
/// Fails if a global subscriber is already installed.
pub fn init_telemetry(format: LogFormat) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into());
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()?,
        LogFormat::Text => registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .try_init()?,
    }

    tracing::debug!(?format, "Tracing initialized");
    Ok(())
}
