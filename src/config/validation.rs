use tracing_subscriber::EnvFilter;

use crate::config::models::{LoggingConfig, ServerConfig};

/// Validation result type alias
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validation error types
#[derive(Debug, thiserror::Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Invalid field '{field}': {message}")]
    InvalidField { field: String, message: String },

    #[error("Invalid listen address '{address}': {reason}")]
    InvalidListenAddress { address: String, reason: String },

    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },
}

/// Server configuration validator
pub struct ServerConfigValidator;

impl ServerConfigValidator {
    /// Validate the entire server configuration, reporting every problem at once
    pub fn validate(config: &ServerConfig) -> ValidationResult<()> {
        let mut errors = Vec::new();

        if let Err(e) = Self::validate_listen_address(config) {
            errors.push(e);
        }

        if config.port == 0 {
            errors.push(ValidationError::InvalidField {
                field: "port".to_string(),
                message: "Port must be non-zero".to_string(),
            });
        }

        if let Err(e) = Self::validate_logging(&config.logging) {
            errors.push(e);
        }

        if config.shutdown_timeout_secs == 0 {
            errors.push(ValidationError::InvalidField {
                field: "shutdown_timeout_secs".to_string(),
                message: "Shutdown timeout must be at least one second".to_string(),
            });
        }

        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(ValidationError::ValidationFailed {
                message: Self::format_multiple_errors(&errors),
            }),
        }
    }

    fn validate_listen_address(config: &ServerConfig) -> ValidationResult<()> {
        if config.socket_addr().is_err() {
            return Err(ValidationError::InvalidListenAddress {
                address: config.listen_addr(),
                reason: "Host must be an IP address (e.g., '127.0.0.1' or '0.0.0.0')".to_string(),
            });
        }
        Ok(())
    }

    fn validate_logging(logging: &LoggingConfig) -> ValidationResult<()> {
        EnvFilter::try_new(&logging.level)
            .map(|_| ())
            .map_err(|e| ValidationError::InvalidField {
                field: "logging.level".to_string(),
                message: e.to_string(),
            })
    }

    fn format_multiple_errors(errors: &[ValidationError]) -> String {
        let mut message = format!("{} configuration errors found:", errors.len());
        for (i, error) in errors.iter().enumerate() {
            message.push_str(&format!("\n  {}. {}", i + 1, error));
        }
        message
    }
}
