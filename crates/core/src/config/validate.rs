use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - No listener or backend port is 0
/// - The fetch body limit is non-zero
/// - No fetch, backend or worker job timeout is 0
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let ports = [
        ("server.port", config.server.port),
        ("backend.port", config.backend.port),
        ("processor.port", config.processor.port),
    ];
    for (key, port) in ports {
        if port == 0 {
            return Err(ConfigError::ValidationError(format!("{} cannot be 0", key)));
        }
    }

    if config.scraper.max_body_bytes == 0 {
        return Err(ConfigError::ValidationError(
            "scraper.max_body_bytes cannot be 0".to_string(),
        ));
    }

    let timeouts = [
        ("scraper.fetch_timeout_secs", config.scraper.fetch_timeout_secs),
        ("backend.connect_timeout_secs", config.backend.connect_timeout_secs),
        ("backend.response_timeout_secs", config.backend.response_timeout_secs),
        ("processor.job_timeout_secs", config.processor.job_timeout_secs),
    ];
    for (key, secs) in timeouts {
        if secs == 0 {
            return Err(ConfigError::ValidationError(format!("{} cannot be 0", key)));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BackendConfig, ProcessorConfig, ScraperConfig, ServerConfig};

    #[test]
    fn test_validate_valid_config() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_validate_port_zero_fails() {
        let config = Config {
            server: ServerConfig {
                port: 0,
                ..Default::default()
            },
            ..Default::default()
        };
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
        assert!(err.to_string().contains("server.port"));
    }

    #[test]
    fn test_validate_zero_body_limit_fails() {
        let config = Config {
            scraper: ScraperConfig {
                max_body_bytes: 0,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_validate_zero_fetch_timeout_fails() {
        let config = Config {
            scraper: ScraperConfig {
                fetch_timeout_secs: 0,
                ..Default::default()
            },
            ..Default::default()
        };
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("scraper.fetch_timeout_secs"));
    }

    #[test]
    fn test_validate_zero_backend_timeouts_fail() {
        let config = Config {
            backend: BackendConfig {
                connect_timeout_secs: 0,
                ..Default::default()
            },
            ..Default::default()
        };
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("backend.connect_timeout_secs"));

        let config = Config {
            backend: BackendConfig {
                response_timeout_secs: 0,
                ..Default::default()
            },
            ..Default::default()
        };
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("backend.response_timeout_secs"));
    }

    #[test]
    fn test_validate_zero_job_timeout_fails() {
        let config = Config {
            processor: ProcessorConfig {
                job_timeout_secs: 0,
                ..Default::default()
            },
            ..Default::default()
        };
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
        assert!(err.to_string().contains("processor.job_timeout_secs"));
    }
}
