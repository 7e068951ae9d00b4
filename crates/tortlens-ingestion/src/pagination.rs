//! Skip/limit pagination shared by the paged JSON sources.
//!
//! Pages are requested one after another. A page shorter than the page size
//! ends the loop normally. The page cap, the skip ceiling and errors also end
//! it, and mark the outcome `truncated` since more results may exist. An
//! error never discards what was already collected; its message is kept.

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub skip: usize,
    pub limit: usize,
}

/// Anything that can serve one page of raw JSON results.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch_page(&self, page: PageRequest) -> anyhow::Result<Vec<Value>>;
}

#[derive(Debug, Clone)]
pub struct PaginationConfig {
    pub page_size: usize,
    pub max_pages: Option<usize>,
    pub delay: Duration,
    /// Largest `skip` the API accepts.
    pub max_skip: Option<usize>,
}

impl PaginationConfig {
    pub fn with_max_pages(mut self, max_pages: Option<usize>) -> Self {
        self.max_pages = max_pages;
        self
    }
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            page_size: 100,
            max_pages: None,
            delay: Duration::from_millis(250),
            max_skip: Some(25_000),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PageOutcome {
    pub results: Vec<Value>,
    pub pages_fetched: usize,
    pub truncated: bool,
    pub error: Option<String>,
}

pub async fn paginate<S: PageSource + ?Sized>(source: &S, config: &PaginationConfig) -> PageOutcome {
    let mut outcome = PageOutcome::default();
    let page_size = config.page_size.max(1);
    let mut skip = 0usize;

    loop {
        if let Some(max) = config.max_pages {
            if outcome.pages_fetched >= max {
                debug!(pages = outcome.pages_fetched, "Page cap reached");
                outcome.truncated = true;
                break;
            }
        }
        if let Some(max_skip) = config.max_skip {
            if skip > max_skip {
                warn!(skip, max_skip, "Skip ceiling reached; remaining results not reachable");
                outcome.truncated = true;
                break;
            }
        }
        if outcome.pages_fetched > 0 && !config.delay.is_zero() {
            tokio::time::sleep(config.delay).await;
        }

        let request = PageRequest { skip, limit: page_size };
        match source.fetch_page(request).await {
            Ok(page) => {
                let n = page.len();
                outcome.pages_fetched += 1;
                outcome.results.extend(page);
                debug!(skip, n, total = outcome.results.len(), "Page fetched");
                if n < page_size {
                    break;
                }
                skip += page_size;
            }
            Err(e) => {
                warn!(skip, error = %e, "Page request failed; keeping partial results");
                outcome.truncated = true;
                outcome.error = Some(e.to_string());
                break;
            }
        }
    }

    outcome
}
