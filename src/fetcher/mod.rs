use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::config::Config;
use crate::error::{FetchCause, FetchError};
use crate::traits::PageFetcher;

/// Fetches listing pages from the source site over HTTP.
///
/// One GET per call, no retries and no caching.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
    base_url: String,
}

impl HttpFetcher {
    /// Builds a fetcher with the configured user agent and request timeout.
    ///
    /// # Errors
    ///
    /// Returns the `reqwest` error if the HTTP client cannot be constructed.
    pub fn new(config: &Config) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url_for(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else if path.starts_with('/') {
            format!("{}{path}", self.base_url)
        } else {
            format!("{}/{path}", self.base_url)
        }
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, path: &str) -> Result<String, FetchError> {
        let url = self.url_for(path);
        debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| FetchError::new(path, classify(e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::new(path, FetchCause::Status(status.as_u16())));
        }

        response
            .text()
            .await
            .map_err(|e| FetchError::new(path, classify(e)))
    }
}

fn classify(err: reqwest::Error) -> FetchCause {
    if err.is_timeout() {
        FetchCause::Timeout
    } else if err.is_builder() {
        FetchCause::InvalidUrl(err.to_string())
    } else {
        FetchCause::Transport(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fetcher(base_url: &str) -> HttpFetcher {
        let config = Config {
            base_url: base_url.to_string(),
            ..Config::default()
        };
        HttpFetcher::new(&config).unwrap()
    }

    #[test]
    fn joins_relative_paths_onto_base_url() {
        let fetcher = fetcher("https://example.com/");
        assert_eq!(fetcher.base_url(), "https://example.com");
        assert_eq!(
            fetcher.url_for("/reviews?page=2"),
            "https://example.com/reviews?page=2"
        );
        assert_eq!(
            fetcher.url_for("products?page=1"),
            "https://example.com/products?page=1"
        );
    }

    #[test]
    fn leaves_absolute_urls_alone() {
        let fetcher = fetcher("https://example.com");
        assert_eq!(
            fetcher.url_for("https://other.example/x"),
            "https://other.example/x"
        );
    }
}
