use std::time::Duration;

use anyhow::Context as _;
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, USER_AGENT};
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::Instant;
use url::Url;

use crate::config::Settings;

const RETRY_BACKOFF_BASE: Duration = Duration::from_millis(500);

#[derive(Debug, Error)]
enum FetchError {
    #[error("GET {url} returned {status}")]
    Status { url: Url, status: StatusCode },
    #[error("GET {url} failed: {source}")]
    Transport {
        url: Url,
        #[source]
        source: reqwest::Error,
    },
}

impl FetchError {
    fn is_retryable(&self) -> bool {
        match self {
            Self::Status { status, .. } => {
                *status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
            }
            Self::Transport { .. } => true,
        }
    }
}

/// Rate-limited, retrying HTTP fetcher. All requests go through one manager so
/// the inter-request delay holds across concurrent fetch tasks.
#[derive(Debug)]
pub struct RequestManager {
    client: reqwest::Client,
    user_agent: String,
    delay: Duration,
    retries: u32,
    last_request: Mutex<Option<Instant>>,
}

impl RequestManager {
    pub fn new(settings: &Settings) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .context("build http client")?;

        Ok(Self {
            client,
            user_agent: settings.user_agent.clone(),
            delay: Duration::from_millis(settings.delay_ms),
            retries: settings.retries,
            last_request: Mutex::new(None),
        })
    }

    /// GET a page body, pacing and retrying as configured.
    pub async fn get_text(&self, url: &Url) -> anyhow::Result<String> {
        let mut attempt = 0;
        loop {
            self.pace().await;

            match self.try_get(url).await {
                Ok(body) => return Ok(body),
                Err(err) if err.is_retryable() && attempt < self.retries => {
                    attempt += 1;
                    let backoff = RETRY_BACKOFF_BASE * 2_u32.saturating_pow(attempt - 1);
                    tracing::warn!(%url, %err, attempt, backoff_ms = backoff.as_millis() as u64, "retrying fetch");
                    tokio::time::sleep(backoff).await;
                }
                Err(err) => return Err(err).with_context(|| format!("fetch {url}")),
            }
        }
    }

    async fn try_get(&self, url: &Url) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .header(USER_AGENT, &self.user_agent)
            .header(ACCEPT, "text/html,application/xhtml+xml;q=0.9,*/*;q=0.8")
            .send()
            .await
            .map_err(|source| FetchError::Transport {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.clone(),
                status,
            });
        }

        response.text().await.map_err(|source| FetchError::Transport {
            url: url.clone(),
            source,
        })
    }

    /// Hold request starts at least `delay` apart. The lock is held across the
    /// sleep so queued callers line up instead of stampeding.
    async fn pace(&self) {
        if self.delay.is_zero() {
            return;
        }

        let mut last_request = self.last_request.lock().await;
        if let Some(previous) = *last_request {
            let elapsed = previous.elapsed();
            if elapsed < self.delay {
                tokio::time::sleep(self.delay - elapsed).await;
            }
        }
        *last_request = Some(Instant::now());
    }
}
