// crates/edge/src/feeds.rs
//
// Async HTTP side of ingestion: fetch feed documents, fetch entry pages,
// reduce pages to text. One shared pooled client; a semaphore caps the
// number of requests in flight across all feed tasks.

use crate::{Error, Result};
use extract::feed::FeedEntry;
use extract::html::clean_html;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

/// Cap on concurrent in-flight HTTP requests across all feed tasks.
pub const MAX_IN_FLIGHT_REQUESTS: usize = 10;

/// Per-request timeout.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone)]
pub struct FeedClient {
    http: reqwest::Client,
    permits: Arc<Semaphore>,
}

impl FeedClient {
    pub fn new(max_in_flight: usize, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Fetch(e.to_string()))?;

        Ok(Self {
            http,
            permits: Arc::new(Semaphore::new(max_in_flight)),
        })
    }

    /// GET a feed document and parse it into entries, preserving the
    /// publisher's order.
    pub async fn fetch_feed(
        &self,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<FeedEntry>> {
        let body = self.get(url, cancel).await?;
        Ok(extract::feed::parse_feed(&body)?)
    }

    /// GET an entry's HTML page and reduce it to readable text.
    pub async fn fetch_post(&self, url: &str, cancel: &CancellationToken) -> Result<String> {
        let body = self.get(url, cancel).await?;
        let html = String::from_utf8_lossy(&body);
        Ok(clean_html(&html))
    }

    /// Permit-gated GET. Statuses of 400 and above and transport errors
    /// both fail as `Fetch`; cancellation can interrupt at any
    /// suspension point (permit acquisition, response reception, the
    /// body read).
    async fn get(&self, url: &str, cancel: &CancellationToken) -> Result<Vec<u8>> {
        let _permit = tokio::select! {
            _ = cancel.cancelled() => return Err(Error::Fetch(format!("GET {url}: cancelled"))),
            permit = self.permits.acquire() => {
                permit.map_err(|_| Error::Fetch("http client shut down".into()))?
            }
        };

        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(Error::Fetch(format!("GET {url}: cancelled"))),
            response = self.http.get(url).send() => {
                response.map_err(|e| Error::Fetch(format!("GET {url}: {e}")))?
            }
        };

        let status = response.status();
        if status.as_u16() >= 400 {
            return Err(Error::Fetch(format!("GET {url}: status {status}")));
        }

        let body = tokio::select! {
            _ = cancel.cancelled() => return Err(Error::Fetch(format!("GET {url}: cancelled"))),
            body = response.bytes() => {
                body.map_err(|e| Error::Fetch(format!("GET {url}: {e}")))?
            }
        };

        Ok(body.to_vec())
    }
}
