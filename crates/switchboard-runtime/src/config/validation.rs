//! Configuration validation utilities.

use super::error::{ConfigError, ConfigResult};
use super::schema::{EngineConfig, LogOutput, LoggingConfig};

/// Validates the entire configuration.
pub fn validate_config(config: &EngineConfig) -> ConfigResult<()> {
    validate_capacities(config)?;
    validate_sessions(config)?;
    validate_logging(&config.logging)?;

    if config.command_prefix.is_empty() {
        return Err(ConfigError::validation("Command prefix must not be empty"));
    }
    if config.command_prefix.chars().any(char::is_whitespace) {
        return Err(ConfigError::validation(
            "Command prefix must not contain whitespace",
        ));
    }

    Ok(())
}

/// Queue capacities and pool sizes must all be positive.
fn validate_capacities(config: &EngineConfig) -> ConfigResult<()> {
    let sizes = [
        ("event_queue_capacity", config.event_queue_capacity),
        ("response_queue_capacity", config.response_queue_capacity),
        ("worker_pool_size", config.worker_pool_size),
        ("worker_queue_capacity", config.worker_queue_capacity),
    ];
    for (field, value) in sizes {
        if value == 0 {
            return Err(ConfigError::validation(format!(
                "{field} must be greater than 0"
            )));
        }
    }
    Ok(())
}

fn validate_sessions(config: &EngineConfig) -> ConfigResult<()> {
    if config.session_ttl_secs == 0 {
        return Err(ConfigError::validation(
            "session_ttl_secs must be greater than 0",
        ));
    }
    if config.session_sweep_interval_secs == 0 {
        return Err(ConfigError::validation(
            "session_sweep_interval_secs must be greater than 0",
        ));
    }
    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> ConfigResult<()> {
    if logging.output == LogOutput::File && logging.file_path.is_none() {
        return Err(ConfigError::validation(
            "logging.file_path is required when logging.output is 'file'",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_default_config() {
        assert!(validate_config(&EngineConfig::default()).is_ok());
    }

    #[test]
    fn test_validate_zero_sizes() {
        let config = EngineConfig {
            worker_pool_size: 0,
            ..Default::default()
        };
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("worker_pool_size"));

        let config = EngineConfig {
            event_queue_capacity: 0,
            ..Default::default()
        };
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_prefix() {
        let config = EngineConfig {
            command_prefix: String::new(),
            ..Default::default()
        };
        assert!(validate_config(&config).is_err());

        let config = EngineConfig {
            command_prefix: "! ".into(),
            ..Default::default()
        };
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_file_output_requires_path() {
        let mut config = EngineConfig::default();
        config.logging.output = LogOutput::File;
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::ValidationError { .. })
        ));

        config.logging.file_path = Some("switchboard.log".into());
        assert!(validate_config(&config).is_ok());
    }
}
