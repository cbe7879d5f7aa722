use crate::config::types::{Config, EnhancerConfig, ExtractionConfig, ServerConfig, StorageConfig};
use crate::ConfigError;
use std::net::SocketAddr;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_server_config(&config.server)?;
    validate_storage_config(&config.storage)?;
    validate_extraction_config(&config.extraction)?;
    validate_enhancer_config(&config.enhancer)?;
    Ok(())
}

/// Validates server configuration
fn validate_server_config(config: &ServerConfig) -> Result<(), ConfigError> {
    config.bind_address.parse::<SocketAddr>().map_err(|e| {
        ConfigError::Validation(format!(
            "bind-address '{}' is not a socket address: {}",
            config.bind_address, e
        ))
    })?;

    if config.max_upload_bytes < 1024 {
        return Err(ConfigError::Validation(format!(
            "max-upload-bytes must be >= 1024, got {}",
            config.max_upload_bytes
        )));
    }

    Ok(())
}

/// Validates storage configuration
fn validate_storage_config(config: &StorageConfig) -> Result<(), ConfigError> {
    if config.database_path.trim().is_empty() {
        return Err(ConfigError::Validation(
            "database-path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates extraction configuration
fn validate_extraction_config(config: &ExtractionConfig) -> Result<(), ConfigError> {
    if config.freshness_days < 1 || config.freshness_days > 365 {
        return Err(ConfigError::Validation(format!(
            "freshness-days must be between 1 and 365, got {}",
            config.freshness_days
        )));
    }

    if config.step_delay_ms > 10_000 {
        return Err(ConfigError::Validation(format!(
            "step-delay-ms must be <= 10000, got {}",
            config.step_delay_ms
        )));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    if config.max_page_bytes == 0 {
        return Err(ConfigError::Validation(
            "max-page-bytes must be greater than 0".to_string(),
        ));
    }

    Ok(())
}

/// Validates enhancer configuration
///
/// The endpoint is checked even when the enhancer is disabled so a config
/// does not silently break when it is switched back on.
fn validate_enhancer_config(config: &EnhancerConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.api_base)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid api-base: {}", e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "api-base must use http or https, got '{}'",
            url.scheme()
        )));
    }

    if config.model.trim().is_empty() {
        return Err(ConfigError::Validation("model cannot be empty".to_string()));
    }

    if config.api_key_env.is_empty()
        || !config
            .api_key_env
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(ConfigError::Validation(format!(
            "api-key-env must be a non-empty environment variable name, got '{}'",
            config.api_key_env
        )));
    }

    if config.timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "timeout-secs must be >= 1".to_string(),
        ));
    }

    if config.max_input_chars < 100 {
        return Err(ConfigError::Validation(format!(
            "max-input-chars must be >= 100, got {}",
            config.max_input_chars
        )));
    }

    Ok(())
}
