use eyre::{Result, WrapErr};
use tracing_subscriber::{EnvFilter, Registry, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LoggingConfig;

/// Initialize tracing from the `[logging]` section of the server config.
///
/// `RUST_LOG`, when set, takes precedence over the configured level.
pub fn init_tracing_with_config(config: &LoggingConfig) -> Result<()> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.level)
            .wrap_err_with(|| format!("Invalid log level: {}", config.level))?,
    };

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_names(true);

    let installed = if config.json {
        Registry::default()
            .with(env_filter)
            .with(fmt_layer.json().with_current_span(true).with_span_list(true))
            .try_init()
    } else {
        Registry::default()
            .with(env_filter)
            .with(fmt_layer.with_ansi(true))
            .try_init()
    };
    installed.wrap_err("Failed to install tracing subscriber")?;

    tracing::info!(
        level = %config.level,
        json = config.json,
        "Kalium logging initialized"
    );
    Ok(())
}

/// Create a request-scoped tracing span
pub fn create_request_span(method: &str, path: &str, request_id: &str) -> tracing::Span {
    tracing::info_span!(
        "request",
        http.method = method,
        http.path = path,
        request.id = request_id,
        endpoint.kind = tracing::field::Empty,
        http.status_code = tracing::field::Empty,
        duration_ms = tracing::field::Empty,
    )
}

/// Span wrapping the whole life of a background task
pub fn create_background_span(route: &str) -> tracing::Span {
    tracing::info_span!("background_task", route = route)
}
