use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Upload limit and conversion timeout are not 0
/// - ffmpeg path is set
/// - Sweep interval is not 0 when a TTL is configured
/// - The TTL outlasts the conversion timeout
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.storage.max_upload_bytes == 0 {
        return Err(ConfigError::ValidationError(
            "storage.max_upload_bytes cannot be 0".to_string(),
        ));
    }

    if config.converter.ffmpeg_path.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError(
            "converter.ffmpeg_path cannot be empty".to_string(),
        ));
    }

    if config.converter.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "converter.timeout_secs cannot be 0".to_string(),
        ));
    }

    if config.retention.output_ttl_secs.is_some() && config.retention.sweep_interval_secs == 0 {
        return Err(ConfigError::ValidationError(
            "retention.sweep_interval_secs cannot be 0 when output_ttl_secs is set".to_string(),
        ));
    }

    if let Some(ttl) = config.retention.output_ttl_secs {
        if ttl <= config.converter.timeout_secs {
            return Err(ConfigError::ValidationError(format!(
                "retention.output_ttl_secs ({}) must be greater than converter.timeout_secs ({})",
                ttl, config.converter.timeout_secs
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_validate_valid_config() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_validate_port_zero_fails() {
        let mut config = Config::default();
        config.server.port = 0;
        let result = validate_config(&config);
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_validate_rejects_zero_limits() {
        let mut config = Config::default();
        config.storage.max_upload_bytes = 0;
        assert!(validate_config(&config).is_err());

        let mut config = Config::default();
        config.converter.timeout_secs = 0;
        assert!(validate_config(&config).is_err());

        let mut config = Config::default();
        config.converter.ffmpeg_path = PathBuf::new();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_sweep_interval() {
        let mut config = Config::default();
        config.retention.sweep_interval_secs = 0;
        assert!(validate_config(&config).is_err());

        // Without a TTL the sweeper never runs
        config.retention.output_ttl_secs = None;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_ttl_must_outlast_conversions() {
        let mut config = Config::default();
        config.converter.timeout_secs = 600;

        config.retention.output_ttl_secs = Some(600);
        assert!(validate_config(&config).is_err());

        config.retention.output_ttl_secs = Some(601);
        assert!(validate_config(&config).is_ok());
    }
}
