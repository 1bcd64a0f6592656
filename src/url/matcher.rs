/// Checks if a domain matches a constraint pattern
///
/// `"example.com"` matches only `example.com`. `"*.example.com"` matches the
/// bare `example.com` as well as any subdomain at any depth.
///
/// # Examples
///
/// ```
/// use ripple_frontier::url::matches_wildcard;
///
/// assert!(matches_wildcard("example.com", "example.com"));
/// assert!(matches_wildcard("*.example.com", "api.v2.example.com"));
/// assert!(!matches_wildcard("*.example.com", "notexample.com"));
/// ```
pub fn matches_wildcard(pattern: &str, candidate: &str) -> bool {
    match pattern.strip_prefix("*.") {
        Some(base) => {
            candidate == base
                || (candidate.len() > base.len()
                    && candidate.ends_with(base)
                    && candidate.as_bytes()[candidate.len() - base.len() - 1] == b'.')
        }
        None => candidate == pattern,
    }
}

/// Picks the most specific pattern matching `candidate`
///
/// An exact pattern always wins. Among wildcard patterns the one with the
/// longest base domain wins; ties keep the first one listed.
pub(crate) fn most_specific<'a, I>(patterns: I, candidate: &str) -> Option<usize>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut best: Option<(usize, usize)> = None;

    for (index, pattern) in patterns.into_iter().enumerate() {
        if !matches_wildcard(pattern, candidate) {
            continue;
        }
        if pattern == candidate {
            return Some(index);
        }
        let specificity = pattern.len();
        match best {
            Some((_, current)) if current >= specificity => {}
            _ => best = Some((index, specificity)),
        }
    }

    best.map(|(index, _)| index)
}
