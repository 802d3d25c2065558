use reqwest::blocking::{Client, Response};
use reqwest::{header, redirect, StatusCode};
use std::io::Read;
use std::time::Duration;
use thiserror::Error;
use url::Url;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("unexpected status {0}")]
    Status(u16),
    #[error("content type {0:?} is not html")]
    NotHtml(String),
    #[error("more than {0} redirects")]
    TooManyRedirects(usize),
    #[error("body of {0} bytes exceeds the limit")]
    TooLarge(u64),
    #[error("reading body failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Source of page bodies for the crawler. Implementations must only return
/// HTML; anything else is an error so the page is skipped.
pub trait Fetch: Send + Sync {
    fn fetch(&self, url: &Url) -> Result<String, FetchError>;
}

#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Redirect hops followed before giving up
    pub redirects: usize,
    pub timeout: Duration,
    pub user_agent: String,
    /// Bodies larger than this are skipped
    pub max_bytes: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            redirects: 3,
            timeout: Duration::from_secs(12),
            user_agent: "search-engine-rs-bot/0.1 (+https://example.com/bot)".to_string(),
            max_bytes: 2 * 1024 * 1024,
        }
    }
}

/// Blocking HTTP/1.1 fetcher. Must be created outside of any async runtime.
/// Redirects are followed here rather than by the client so the hop count is exact.
pub struct HttpFetcher {
    client: Client,
    redirects: usize,
    max_bytes: usize,
}

impl HttpFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .redirect(redirect::Policy::none())
            .timeout(config.timeout)
            .build()?;
        Ok(Self { client, redirects: config.redirects, max_bytes: config.max_bytes })
    }

    fn follow(&self, url: &Url) -> Result<Response, FetchError> {
        let mut url = url.clone();
        let mut hops = 0;
        loop {
            let resp = self.client.get(url.clone()).send()?;
            if !resp.status().is_redirection() {
                return Ok(resp);
            }
            let Some(next) = location(&url, &resp) else {
                return Err(FetchError::Status(resp.status().as_u16()));
            };
            if hops == self.redirects {
                return Err(FetchError::TooManyRedirects(self.redirects));
            }
            hops += 1;
            tracing::trace!(from = %url, to = %next, hops, "following redirect");
            url = next;
        }
    }
}

impl Fetch for HttpFetcher {
    fn fetch(&self, url: &Url) -> Result<String, FetchError> {
        let resp = self.follow(url)?;
        if resp.status() != StatusCode::OK {
            return Err(FetchError::Status(resp.status().as_u16()));
        }
        let content_type = resp
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        if !is_html(&content_type) {
            return Err(FetchError::NotHtml(content_type));
        }
        let limit = self.max_bytes as u64;
        if let Some(len) = resp.content_length().filter(|&len| len > limit) {
            return Err(FetchError::TooLarge(len));
        }
        // Bodies without a length are read one byte past the limit at most.
        let mut bytes = Vec::new();
        resp.take(limit + 1).read_to_end(&mut bytes)?;
        if bytes.len() as u64 > limit {
            return Err(FetchError::TooLarge(bytes.len() as u64));
        }
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

fn location(base: &Url, resp: &Response) -> Option<Url> {
    let target = resp.headers().get(header::LOCATION)?.to_str().ok()?;
    base.join(target).ok()
}

fn is_html(content_type: &str) -> bool {
    content_type.trim_start().to_ascii_lowercase().starts_with("text/html")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_html_content_types() {
        assert!(is_html("text/html"));
        assert!(is_html("Text/HTML; charset=utf-8"));
        assert!(!is_html("application/json"));
        assert!(!is_html(""));
    }
}
