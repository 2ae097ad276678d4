use std::time::Duration;

use async_trait::async_trait;

use crate::collectors::retry::{FailureKind, RetryPolicy};
use crate::config::CrawlConfig;
use crate::error::AppError;
use crate::events::{CrawlEvent, EventSink};

/// Per-request timeout, independent of the retry delay.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// A fetched HTML page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub url: String,
    pub html: String,
}

/// Retrieves pages. `None` means every attempt failed; callers treat it
/// as an empty result, not an error.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str, events: &dyn EventSink) -> Option<Document>;
}

pub struct HttpFetcher {
    client: reqwest::Client,
    retry: RetryPolicy,
}

impl HttpFetcher {
    /// Build a client carrying the configured headers, routed through the
    /// configured proxies when there are any.
    pub fn new(config: &CrawlConfig) -> Result<Self, AppError> {
        Self::with_timeout(config, REQUEST_TIMEOUT)
    }

    fn with_timeout(config: &CrawlConfig, timeout: Duration) -> Result<Self, AppError> {
        let mut builder = reqwest::Client::builder()
            .default_headers(config.headers.clone())
            .timeout(timeout);

        for (scheme, url) in &config.proxies {
            let proxy = match scheme.as_str() {
                "http" => reqwest::Proxy::http(url.as_str()),
                "https" => reqwest::Proxy::https(url.as_str()),
                _ => reqwest::Proxy::all(url.as_str()),
            }
            .map_err(|e| AppError::Config(format!("Invalid proxy '{url}': {e}")))?;
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            retry: RetryPolicy::default(),
        })
    }

    #[cfg(test)]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn get(&self, url: &str) -> Result<String, reqwest::Error> {
        self.client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str, events: &dyn EventSink) -> Option<Document> {
        let mut attempt = 0;
        while attempt < self.retry.max_attempts {
            attempt += 1;
            let error = match self.get(url).await {
                Ok(html) => {
                    return Some(Document {
                        url: url.to_string(),
                        html,
                    });
                }
                Err(e) => e,
            };

            let kind = RetryPolicy::classify(&error);
            match kind {
                FailureKind::Timeout => events.emit(CrawlEvent::FetchTimeout {
                    url: url.to_string(),
                    attempt,
                }),
                FailureKind::Other => events.emit(CrawlEvent::FetchFailed {
                    url: url.to_string(),
                    attempt,
                    error: error.to_string(),
                }),
            }

            match self.retry.next_delay(attempt, kind) {
                Some(delay) if !delay.is_zero() => tokio::time::sleep(delay).await,
                Some(_) => {}
                None => break,
            }
        }

        events.emit(CrawlEvent::FetchExhausted {
            url: url.to_string(),
            attempts: attempt,
        });
        None
    }
}
