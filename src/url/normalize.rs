use crate::UrlError;
use url::Url;

/// Query parameters that never change page content and only defeat dedup
const TRACKING_PARAMS: &[&str] = &["fbclid", "gclid", "mc_eid", "yclid", "_ga"];

/// Normalizes a discovered link before it is turned into a crawl task
///
/// Two spellings of the same page should map to the same string so the seen
/// URL set can deduplicate them.
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject anything other than http/https
/// 2. Lowercase the host (scheme and `www.` are kept; the server decides
///    whether those are equivalent, usually with a redirect)
/// 3. Collapse empty segments and resolve dot segments in the path
/// 4. Drop the fragment
/// 5. Drop tracking parameters (`utm_*` and a fixed list) and sort the rest
///
/// # Examples
///
/// ```
/// use ripple_frontier::url::normalize_url;
///
/// let url = normalize_url("http://Example.COM//a/./b?utm_source=x&b=2&a=1#top").unwrap();
/// assert_eq!(url.as_str(), "http://example.com/a/b?a=1&b=2");
/// ```
pub fn normalize_url(url_str: &str) -> Result<Url, UrlError> {
    let mut url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    let host = url
        .host_str()
        .map(str::to_lowercase)
        .ok_or(UrlError::MissingDomain)?;
    url.set_host(Some(&host))
        .map_err(|e| UrlError::Malformed(format!("Failed to set host: {}", e)))?;

    let path = normalize_path(url.path());
    url.set_path(&path);

    url.set_fragment(None);

    if url.query().is_some() {
        let params = filter_and_sort_query_params(&url);
        if params.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(params);
        }
    }

    Ok(url)
}

/// Collapses repeated slashes and resolves `.`/`..`, keeping a trailing slash
fn normalize_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            _ => segments.push(segment),
        }
    }

    if segments.is_empty() {
        return "/".to_string();
    }

    let mut result = format!("/{}", segments.join("/"));
    if path.ends_with('/') {
        result.push('/');
    }
    result
}

fn filter_and_sort_query_params(url: &Url) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| {
            !key.starts_with("utm_") && !TRACKING_PARAMS.contains(&key.as_ref())
        })
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    params.sort();
    params
}
