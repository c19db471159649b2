// src/feed/source.rs
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

/// What a single fetch produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Body(String),
    /// Server reported no change since the previous request (HTTP 304).
    NotModified,
}

#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchOutcome>;
    fn name(&self) -> &'static str;
}

#[async_trait]
impl<S: FeedSource + ?Sized> FeedSource for std::sync::Arc<S> {
    async fn fetch(&self, url: &str) -> Result<FetchOutcome> {
        (**self).fetch(url).await
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

/// Fetches the feed over HTTP with a bounded number of retries.
#[derive(Clone)]
pub struct HttpSource {
    client: Client,
    timeout: Duration,
    max_retries: u8,
}

impl Default for HttpSource {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpSource {
    pub fn new() -> Self {
        Self::with_client(Client::new())
    }

    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            timeout: Duration::from_secs(10),
            max_retries: 3,
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }

    pub fn with_retries(mut self, retries: u8) -> Self {
        self.max_retries = retries.max(1);
        self
    }
}

const BACKOFF_BASE_MS: u64 = 500;
const BACKOFF_MAX_SHIFT: u8 = 6;

/// Delay before retry number `attempt` (1-based): 500 ms doubling, capped at 32 s.
fn backoff_delay(attempt: u8) -> Duration {
    let shift = attempt.saturating_sub(1).min(BACKOFF_MAX_SHIFT);
    Duration::from_millis(BACKOFF_BASE_MS << shift)
}

/// How a response status is handled by [`HttpSource`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StatusClass {
    NotModified,
    Success,
    Failure,
}

fn classify(status: StatusCode) -> StatusClass {
    if status == StatusCode::NOT_MODIFIED {
        StatusClass::NotModified
    } else if status.is_success() {
        StatusClass::Success
    } else {
        StatusClass::Failure
    }
}

#[async_trait]
impl FeedSource for HttpSource {
    async fn fetch(&self, url: &str) -> Result<FetchOutcome> {
        let mut attempt: u8 = 0;
        loop {
            attempt = attempt.saturating_add(1);
            let res = self
                .client
                .get(url)
                .timeout(self.timeout)
                .header(reqwest::header::ACCEPT, "application/vnd.geo+json;version=2")
                .send()
                .await;

            let err = match res {
                Ok(rsp) => match classify(rsp.status()) {
                    StatusClass::NotModified => return Ok(FetchOutcome::NotModified),
                    StatusClass::Success => {
                        let body = rsp.text().await.context("quakes http .text()")?;
                        return Ok(FetchOutcome::Body(body));
                    }
                    StatusClass::Failure => anyhow!("quakes feed HTTP error: status {}", rsp.status()),
                },
                Err(e) => anyhow!("quakes feed request failed: {e}"),
            };

            if attempt >= self.max_retries {
                return Err(err);
            }
            tracing::debug!(%url, attempt, error = %err, "quakes fetch failed, retrying");
            tokio::time::sleep(backoff_delay(attempt)).await;
        }
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

/// One scripted reply of a [`FixtureSource`].
#[derive(Debug, Clone)]
pub enum FixtureResponse {
    Body(String),
    NotModified,
    Error(String),
}

/// Serves scripted responses in order; the last one repeats forever.
/// Records every requested URL.
pub struct FixtureSource {
    responses: Mutex<VecDeque<FixtureResponse>>,
    pub requests: Mutex<Vec<String>>,
}

impl FixtureSource {
    pub fn from_fixture_str(body: &str) -> Self {
        Self::sequence(vec![FixtureResponse::Body(body.to_string())])
    }

    pub fn sequence(responses: Vec<FixtureResponse>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requested_urls(&self) -> Vec<String> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    fn next_response(&self) -> Option<FixtureResponse> {
        let mut queue = self.responses.lock().ok()?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

#[async_trait]
impl FeedSource for FixtureSource {
    async fn fetch(&self, url: &str) -> Result<FetchOutcome> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(url.to_string());
        }
        match self.next_response() {
            Some(FixtureResponse::Body(body)) => Ok(FetchOutcome::Body(body)),
            Some(FixtureResponse::NotModified) => Ok(FetchOutcome::NotModified),
            Some(FixtureResponse::Error(msg)) => Err(anyhow!(msg)),
            None => Err(anyhow!("fixture source has no responses")),
        }
    }

    fn name(&self) -> &'static str {
        "fixture"
    }
}
