use reqwest::{Client, ClientBuilder, RequestBuilder, Response, StatusCode};
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::error::{Result, TortlensError};

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_USER_AGENT: &str = concat!("tortlens/", env!("CARGO_PKG_VERSION"));

/// Fixed exponential backoff applied to 429 and 5xx responses.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self { max_retries, base_delay }
    }

    /// No retries: the first failing response is final.
    pub fn none() -> Self {
        Self { max_retries: 0, base_delay: Duration::ZERO }
    }

    /// Delay before retry number `attempt` (0-based): `base * 2^attempt`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(attempt))
    }

    pub fn is_retryable(status: StatusCode) -> bool {
        status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}

/// HTTP client restricted to the research APIs tortlens talks to.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    allowlist: HashSet<String>,
}

impl ApiClient {
    /// Client with the default timeout and allowlist.
    pub fn new() -> Result<Self> {
        Self::with_options(Duration::from_secs(DEFAULT_TIMEOUT_SECS), DEFAULT_USER_AGENT)
    }

    pub fn with_options(timeout: Duration, user_agent: &str) -> Result<Self> {
        let mut allowlist = HashSet::new();
        let domains = [
            "api.fda.gov",           // openFDA
            "www.courtlistener.com", // CourtListener
            "localhost",
            "127.0.0.1",
        ];
        for d in domains {
            allowlist.insert(d.to_string());
        }

        let client = ClientBuilder::new()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()?;

        Ok(Self { client, allowlist })
    }

    /// Appends an exact hostname to the allowlist.
    pub fn allow_domain(&mut self, domain: &str) {
        self.allowlist.insert(domain.to_string());
    }

    /// Exact host match or a subdomain of an allowed host.
    pub fn is_allowed(&self, url: &str) -> bool {
        let Ok(parsed) = Url::parse(url) else {
            return false;
        };
        let Some(host) = parsed.host_str() else {
            return false;
        };
        self.allowlist
            .iter()
            .any(|allowed| host == allowed || host.ends_with(&format!(".{}", allowed)))
    }

    pub fn get(&self, url: &str) -> Result<RequestBuilder> {
        if !self.is_allowed(url) {
            return Err(TortlensError::SecurityError(format!(
                "domain not in allowlist for URL {}",
                url
            )));
        }
        Ok(self.client.get(url))
    }

    /// Send a request, retrying retryable statuses per `policy`.
    ///
    /// The final response is returned whatever its status; callers decide
    /// what a non-success means for them.
    pub async fn execute(&self, request: RequestBuilder, policy: &RetryPolicy) -> Result<Response> {
        let mut attempt = 0;
        loop {
            let Some(this_try) = request.try_clone() else {
                // Streaming bodies cannot be replayed; send once.
                return Ok(request.send().await?);
            };
            let resp = this_try.send().await?;
            let status = resp.status();
            if !RetryPolicy::is_retryable(status) || attempt >= policy.max_retries {
                debug!(status = status.as_u16(), url = %resp.url(), attempt, "HTTP response");
                return Ok(resp);
            }
            let delay = policy.delay_for(attempt);
            warn!(
                status = status.as_u16(),
                url = %resp.url(),
                attempt = attempt + 1,
                max = policy.max_retries,
                delay_ms = delay.as_millis() as u64,
                "Retryable HTTP status, backing off"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    /// `execute` and decode JSON, turning any non-success status into
    /// [`TortlensError::Status`].
    pub async fn get_json(&self, request: RequestBuilder, policy: &RetryPolicy) -> Result<serde_json::Value> {
        let resp = self.execute(request, policy).await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(TortlensError::Status {
                status: status.as_u16(),
                url: resp.url().to_string(),
            });
        }
        Ok(resp.json().await?)
    }
}
