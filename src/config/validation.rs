use crate::config::types::{Config, CrawlerConfig, ProtocolConfig, UserAgentConfig};
use crate::ConfigError;
use std::collections::BTreeMap;
use url::Url;

/// Schemes a protocol implementation exists for
const KNOWN_SCHEMES: &[&str] = &["http", "https", "ftp", "sftp", "file"];

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_protocol_config(&config.protocols)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_decoders(&config.decoders)?;
    validate_seeds(&config.seeds)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.workers < 1 || config.workers > 1024 {
        return Err(ConfigError::Validation(format!(
            "workers must be between 1 and 1024, got {}",
            config.workers
        )));
    }

    for (name, value) in [
        ("queue_buffer", config.queue_buffer),
        ("output_buffer", config.output_buffer),
        ("error_buffer", config.error_buffer),
    ] {
        if value < 1 {
            return Err(ConfigError::Validation(format!(
                "{} must be >= 1, got {}",
                name, value
            )));
        }
    }

    Ok(())
}

/// Validates protocol configuration
fn validate_protocol_config(config: &ProtocolConfig) -> Result<(), ConfigError> {
    if config.timeout_ms < 100 {
        return Err(ConfigError::Validation(format!(
            "timeout_ms must be >= 100ms, got {}ms",
            config.timeout_ms
        )));
    }

    for scheme in &config.enabled {
        if !KNOWN_SCHEMES.contains(&scheme.to_ascii_lowercase().as_str()) {
            return Err(ConfigError::Validation(format!(
                "Unknown protocol scheme '{}', expected one of {}",
                scheme,
                KNOWN_SCHEMES.join(", ")
            )));
        }
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    // Validate crawler name: non-empty, alphanumeric + hyphens only
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    if config.crawler_version.trim().is_empty() {
        return Err(ConfigError::Validation(
            "crawler_version cannot be empty".to_string(),
        ));
    }

    if let Some(contact_url) = &config.contact_url {
        Url::parse(contact_url)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;
    }

    if let Some(contact_email) = &config.contact_email {
        validate_email(contact_email)?;
    }

    Ok(())
}

/// Validates decoder overrides: keys must look like `type/subtype`
fn validate_decoders<V>(decoders: &BTreeMap<String, V>) -> Result<(), ConfigError> {
    for content_type in decoders.keys() {
        let valid = content_type
            .split_once('/')
            .map_or(false, |(kind, subtype)| !kind.is_empty() && !subtype.is_empty());
        if !valid {
            return Err(ConfigError::Validation(format!(
                "Decoder key '{}' is not a content type",
                content_type
            )));
        }
    }
    Ok(())
}

/// Validates seed locations
fn validate_seeds(seeds: &[String]) -> Result<(), ConfigError> {
    for seed in seeds {
        Url::parse(seed)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid seed '{}': {}", seed, e)))?;
    }
    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "contact_email cannot be empty".to_string(),
        ));
    }

    // Basic email format check: must contain @ and have text on both sides
    let Some((local, domain)) = email.split_once('@') else {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    };

    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    // Domain part should contain at least one dot
    if !domain.contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}
