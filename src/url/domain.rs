use url::Url;

/// Extracts the host from a URL, lowercased
///
/// # Arguments
///
/// * `url` - The URL to extract the host from
///
/// # Returns
///
/// * `Some(String)` - The lowercase host
/// * `None` - If the URL has no host
///
/// # Examples
///
/// ```
/// use url::Url;
/// use ripple_frontier::url::extract_domain;
///
/// let url = Url::parse("https://WWW.Example.COM/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("www.example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Derives the domain name used for politeness and concurrency grouping
///
/// The host is lowercased and a leading `www.` is stripped, so that
/// `www.example.com` and `example.com` share one domain state.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use ripple_frontier::url::domain_name;
///
/// let url = Url::parse("http://WWW.Example.com/a").unwrap();
/// assert_eq!(domain_name(&url), Some("example.com".to_string()));
/// ```
pub fn domain_name(url: &Url) -> Option<String> {
    extract_domain(url).map(|host| match host.strip_prefix("www.") {
        Some(stripped) if !stripped.is_empty() => stripped.to_string(),
        _ => host,
    })
}
