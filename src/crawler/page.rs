use std::time::Duration;

/// Outcome of crawling one task
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    /// URL that was requested
    pub url: String,

    /// HTTP status code
    pub response_code: u16,

    pub title: Option<String>,

    /// Absolute URLs found in the content, if it was parsed
    pub links: Option<Vec<String>>,

    /// Redirect target, only meaningful for 3xx responses
    pub redirect_url: Option<String>,

    pub content_type: Option<String>,

    /// Time from sending the request to receiving the full body
    pub response_time: Duration,
}

impl Page {
    pub fn new(url: impl Into<String>, response_code: u16, response_time: Duration) -> Self {
        Self {
            url: url.into(),
            response_code,
            title: None,
            links: None,
            redirect_url: None,
            content_type: None,
            response_time,
        }
    }

    pub fn with_links(mut self, links: Vec<String>) -> Self {
        self.links = Some(links);
        self
    }

    pub fn with_redirect(mut self, target: impl Into<String>) -> Self {
        self.redirect_url = Some(target.into());
        self
    }

    /// Only 200 responses have their links followed
    pub fn is_success(&self) -> bool {
        self.response_code == 200
    }

    pub fn is_redirect(&self) -> bool {
        (300..400).contains(&self.response_code)
    }

    /// Redirect target of a 3xx response
    pub fn redirect_target(&self) -> Option<&str> {
        if self.is_redirect() {
            self.redirect_url.as_deref()
        } else {
            None
        }
    }
}
