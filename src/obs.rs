//! Tracing subscriber setup.

use crate::domain::settings::LogFormat;

/// Filter comes from `TRADECAST_LOG` when set, else `log_level`.
pub fn init_tracing(log_level: &str, format: LogFormat) -> Result<(), String> {
    let filter = std::env::var("TRADECAST_LOG").unwrap_or_else(|_| log_level.to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_new(filter)
        .map_err(|err| format!("invalid log filter: {err}"))?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr);
    let installed = match format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Text => builder.try_init(),
    };
    // A subscriber installed earlier in the process stays in place.
    if let Err(err) = installed {
        tracing::debug!(%err, "tracing subscriber already installed");
    }
    Ok(())
}
