use crate::config::types::{
    Config, CrawlerConfig, DomainConstraints, FetcherConfig, HttpErrorLimit, StorageConfig,
    UserAgentConfig,
};
use crate::ConfigError;
use std::collections::HashSet;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_fetcher_config(&config.fetcher)?;
    validate_storage_config(&config.storage)?;
    validate_http_error_limits(&config.http_error_limits)?;
    validate_domain_constraints(&config.domains)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.workers < 1 || config.workers > 256 {
        return Err(ConfigError::Validation(format!(
            "workers must be between 1 and 256, got {}",
            config.workers
        )));
    }

    if config.defer_timeout < 1 {
        return Err(ConfigError::Validation(
            "defer_timeout must be >= 1ms".to_string(),
        ));
    }

    if config.poll_interval < 1 || config.poll_interval > 1000 {
        return Err(ConfigError::Validation(format!(
            "poll_interval must be between 1 and 1000ms, got {}ms",
            config.poll_interval
        )));
    }

    for seed in &config.seeds {
        validate_seed(seed)?;
    }

    Ok(())
}

/// Validates a seed URL: must parse, be http(s), and have a host
fn validate_seed(seed: &str) -> Result<(), ConfigError> {
    let url = Url::parse(seed)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid seed URL '{}': {}", seed, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "Seed URL '{}' must use HTTP or HTTPS",
            seed
        )));
    }

    if url.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(format!(
            "Seed URL '{}' has no host",
            seed
        )));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
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

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    validate_email(&config.contact_email)?;

    Ok(())
}

fn validate_fetcher_config(config: &FetcherConfig) -> Result<(), ConfigError> {
    if config.tries < 1 {
        return Err(ConfigError::Validation("tries must be >= 1".to_string()));
    }

    if config.connect_timeout < 1 || config.read_timeout < 1 {
        return Err(ConfigError::Validation(
            "fetcher timeouts must be >= 1ms".to_string(),
        ));
    }

    if config.allowed_content_types.is_empty() {
        return Err(ConfigError::Validation(
            "allowed_content_types cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates storage configuration
///
/// Both directories are wiped on startup, so they must be distinct.
fn validate_storage_config(config: &StorageConfig) -> Result<(), ConfigError> {
    if config.queue_dir.is_empty() {
        return Err(ConfigError::Validation("queue_dir cannot be empty".to_string()));
    }

    if config.stats_dir.is_empty() {
        return Err(ConfigError::Validation("stats_dir cannot be empty".to_string()));
    }

    if config.queue_dir == config.stats_dir {
        return Err(ConfigError::Validation(format!(
            "queue_dir and stats_dir must differ, both are '{}'",
            config.queue_dir
        )));
    }

    if config.queue_capacity < 1 {
        return Err(ConfigError::Validation(
            "queue_capacity must be >= 1".to_string(),
        ));
    }

    Ok(())
}

fn validate_http_error_limits(limits: &[HttpErrorLimit]) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();

    for entry in limits {
        if !(100..=599).contains(&entry.status) {
            return Err(ConfigError::Validation(format!(
                "http-error-limit status must be a valid HTTP status, got {}",
                entry.status
            )));
        }

        if entry.limit < 1 {
            return Err(ConfigError::Validation(format!(
                "http-error-limit for status {} must be >= 1",
                entry.status
            )));
        }

        if !seen.insert(entry.status) {
            return Err(ConfigError::Validation(format!(
                "http-error-limit for status {} is listed twice",
                entry.status
            )));
        }
    }

    Ok(())
}

fn validate_domain_constraints(domains: &[DomainConstraints]) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();

    for entry in domains {
        validate_domain_pattern(&entry.name)?;

        if !seen.insert(entry.name.as_str()) {
            return Err(ConfigError::Validation(format!(
                "Domain '{}' has more than one constraint entry",
                entry.name
            )));
        }
    }

    Ok(())
}

/// Validates a domain pattern (supports wildcards)
fn validate_domain_pattern(pattern: &str) -> Result<(), ConfigError> {
    if pattern.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Domain pattern cannot be empty".to_string(),
        ));
    }

    // Crawled domains never keep a leading "www."
    if pattern.starts_with("www.") {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain pattern '{}' would never match; use '{}'",
            pattern,
            &pattern["www.".len()..]
        )));
    }

    validate_domain_string(pattern.strip_prefix("*.").unwrap_or(pattern))
}

/// Validates a domain string (without wildcard prefix)
fn validate_domain_string(domain: &str) -> Result<(), ConfigError> {
    if domain.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Domain cannot be empty".to_string(),
        ));
    }

    if !domain
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '.' || c == '-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' must be lowercase and contain only letters, digits, '.' and '-'",
            domain
        )));
    }

    if domain.starts_with('.')
        || domain.ends_with('.')
        || domain.starts_with('-')
        || domain.ends_with('-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' cannot start or end with '.' or '-'",
            domain
        )));
    }

    if domain.contains("..") {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' cannot contain consecutive dots",
            domain
        )));
    }

    if !domain.contains('.') {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' must contain at least one dot (e.g., 'example.com')",
            domain
        )));
    }

    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    let (local, domain) = email
        .split_once('@')
        .ok_or_else(|| ConfigError::Validation(format!("Invalid email format: '{}'", email)))?;

    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    if !domain.contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}
