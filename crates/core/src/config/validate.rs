use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Scheduler pool, queue and batch sizes are at least 1
/// - Fetcher timeouts are positive
/// - At least one mirror, each with an http(s) base URL
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    // Server validation
    if config.server.port == 0 {
        return Err(invalid("server.port cannot be 0"));
    }

    // Scheduler validation
    let scheduler = &config.scheduler;
    if scheduler.workers == 0 {
        return Err(invalid("scheduler.workers must be at least 1"));
    }
    if scheduler.queue_capacity == 0 {
        return Err(invalid("scheduler.queue_capacity must be at least 1"));
    }
    if scheduler.batch_size == 0 {
        return Err(invalid("scheduler.batch_size must be at least 1"));
    }

    // Fetcher validation
    let fetcher = &config.fetcher;
    if fetcher.connect_timeout_ms == 0 || fetcher.request_timeout_ms == 0 {
        return Err(invalid("fetcher timeouts must be greater than 0"));
    }
    if fetcher.mirrors.is_empty() {
        return Err(invalid("fetcher.mirrors cannot be empty"));
    }
    for mirror in &fetcher.mirrors {
        let url = url::Url::parse(&mirror.base_url).map_err(|e| {
            ConfigError::ValidationError(format!(
                "mirror '{}' has an invalid base_url: {}",
                mirror.name, e
            ))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::ValidationError(format!(
                "mirror '{}' must use http or https, got '{}'",
                mirror.name,
                url.scheme()
            )));
        }
    }

    Ok(())
}

fn invalid(message: &str) -> ConfigError {
    ConfigError::ValidationError(message.to_string())
}
