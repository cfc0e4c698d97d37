use std::path::Path;

use config::{Config, Environment, File, FileFormat};
use eyre::{Context, Result};

use crate::config::models::ServerConfig;

/// Prefix for environment overrides, e.g. `KALIUM_PORT=9000` or
/// `KALIUM_LOGGING__LEVEL=debug`.
pub const ENV_PREFIX: &str = "KALIUM";

/// Load configuration from a file using the config crate
/// Supports multiple formats: YAML, JSON, TOML, etc.
///
/// A missing file is not an error: defaults plus environment overrides apply.
pub fn load_config(config_path: &str) -> Result<ServerConfig> {
    let path = Path::new(config_path);

    // Determine file format based on extension
    let format = match path.extension().and_then(|ext| ext.to_str()) {
        Some("yaml") | Some("yml") => FileFormat::Yaml,
        Some("json") => FileFormat::Json,
        Some("ini") => FileFormat::Ini,
        _ => FileFormat::Toml, // Default to TOML
    };

    let settings = Config::builder()
        .add_source(
            File::new(
                path.to_str()
                    .ok_or_else(|| eyre::eyre!("Invalid UTF-8 path: {}", path.display()))?,
                format,
            )
            .required(false),
        )
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .with_context(|| format!("Failed to build config from {}", path.display()))?;

    let server_config: ServerConfig = settings
        .try_deserialize()
        .with_context(|| format!("Failed to deserialize config from {}", path.display()))?;

    Ok(server_config)
}

/// Load configuration only from an existing file, ignoring the environment
/// (used by the `validate` command).
pub fn load_config_file(config_path: &str) -> Result<ServerConfig> {
    let path = Path::new(config_path);
    if !path.exists() {
        eyre::bail!("Configuration file '{}' not found", path.display());
    }

    let format = match path.extension().and_then(|ext| ext.to_str()) {
        Some("yaml") | Some("yml") => FileFormat::Yaml,
        Some("json") => FileFormat::Json,
        _ => FileFormat::Toml,
    };

    Config::builder()
        .add_source(File::new(config_path, format))
        .build()
        .with_context(|| format!("Failed to build config from {}", path.display()))?
        .try_deserialize()
        .with_context(|| format!("Failed to deserialize config from {}", path.display()))
}
