//! Subcommand handlers.

pub mod dataset;
pub mod dockets;
pub mod maude;
pub mod reference;

use std::time::Duration;

use tortlens_common::http::ApiClient;
use tortlens_ingestion::sources::courtlistener::CourtListenerClient;
use tortlens_ingestion::sources::openfda::OpenFdaClient;

use crate::config::Config;

fn api_client(config: &Config) -> anyhow::Result<ApiClient> {
    Ok(ApiClient::with_options(
        Duration::from_secs(config.http.timeout_secs),
        &config.http.user_agent,
    )?)
}

pub fn openfda_client(config: &Config) -> anyhow::Result<OpenFdaClient> {
    if config.openfda.api_key.is_none() {
        tracing::debug!("No openFDA API key; anonymous rate limits apply");
    }
    Ok(OpenFdaClient::new(
        api_client(config)?,
        config.openfda.api_key.clone(),
        config.openfda.retry(),
    ))
}

pub fn courtlistener_client(config: &Config) -> anyhow::Result<CourtListenerClient> {
    if config.courtlistener.token.is_none() {
        tracing::warn!(
            "No CourtListener token (set courtlistener.token or TORTLENS_COURTLISTENER_TOKEN); \
             anonymous requests are heavily throttled"
        );
    }
    Ok(CourtListenerClient::new(
        api_client(config)?,
        config.courtlistener.token.clone(),
        config.courtlistener.retry(),
    )
    .with_page_delay(Duration::from_millis(config.courtlistener.delay_ms)))
}

/// Log a partial fetch. Partial results are still exported.
pub(crate) fn warn_partial(source: &str, truncated: bool, error: Option<&str>) {
    if let Some(e) = error {
        tracing::warn!(source, error = e, "Fetch stopped early; exporting partial results");
    } else if truncated {
        tracing::warn!(source, "Fetch hit a page or offset limit; results are incomplete");
    }
}
