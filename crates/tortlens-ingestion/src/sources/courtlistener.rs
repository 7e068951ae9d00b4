//! CourtListener REST v4 search client.
//!
//! API docs: https://www.courtlistener.com/help/api/rest/search/
//! Endpoint: https://www.courtlistener.com/api/rest/v4/search/
//!
//! v4 search is cursor-paginated: each response carries a `next` URL that
//! already encodes the query, so later pages are fetched from it verbatim.
//! An API token (`Authorization: Token <token>`) raises the rate limit.

use chrono::NaiveDate;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use tortlens_common::dates::parse_iso_date;
use tortlens_common::http::{ApiClient, RetryPolicy};
use tortlens_common::{parse_mdl_number, CaseSource, CaseStatus, LitigationCase, TortlensError};

use super::text;

pub const COURTLISTENER_SEARCH_URL: &str = "https://www.courtlistener.com/api/rest/v4/search/";
const COURTLISTENER_BASE: &str = "https://www.courtlistener.com";

/// Parameters for one docket search.
#[derive(Debug, Clone)]
pub struct DocketSearch {
    pub q: String,
    /// `r` = RECAP dockets, `o` = opinions, `d` = dockets without documents.
    pub search_type: String,
    pub filed_after: Option<NaiveDate>,
    pub order_by: String,
    pub max_pages: Option<usize>,
}

impl DocketSearch {
    pub fn new(q: impl Into<String>) -> Self {
        Self {
            q: q.into(),
            search_type: "r".to_string(),
            filed_after: None,
            order_by: "dateFiled desc".to_string(),
            max_pages: Some(10),
        }
    }

    fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("q", self.q.clone()),
            ("type", self.search_type.clone()),
            ("order_by", self.order_by.clone()),
        ];
        if let Some(d) = self.filed_after {
            // Same MM/DD/YYYY form the web search form submits.
            params.push(("filed_after", d.format("%m/%d/%Y").to_string()));
        }
        params
    }
}

/// One docket search hit flattened into a row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocketRow {
    pub docket_id: u64,
    pub case_name: String,
    pub docket_number: Option<String>,
    pub court: Option<String>,
    pub date_filed: Option<NaiveDate>,
    pub cause: Option<String>,
    pub nature_of_suit: Option<String>,
    pub url: Option<String>,
}

impl DocketRow {
    pub fn into_case(self) -> LitigationCase {
        let mdl_number = self
            .docket_number
            .as_deref()
            .and_then(parse_mdl_number)
            .or_else(|| parse_mdl_number(&self.case_name));

        let mut case = LitigationCase::new(
            format!("cl-{}", self.docket_id),
            self.case_name,
            CaseSource::CourtListener,
        );
        case.mdl_number = mdl_number;
        case.docket_number = self.docket_number;
        case.court = self.court;
        case.date_filed = self.date_filed;
        case.allegations = self.cause;
        case.status = CaseStatus::Unknown;
        case.url = self.url;
        if let Some(nos) = self.nature_of_suit {
            case.notes.push(format!("Nature of suit: {}", nos));
        }
        case
    }
}

#[derive(Debug, Default)]
pub struct DocketSearchOutcome {
    pub rows: Vec<DocketRow>,
    pub skipped: usize,
    pub pages_fetched: usize,
    /// Result count reported by the first page.
    pub reported_count: Option<u64>,
    pub truncated: bool,
    pub error: Option<String>,
}

pub struct CourtListenerClient {
    client: ApiClient,
    base_url: String,
    token: Option<SecretString>,
    retry: RetryPolicy,
    page_delay: Duration,
}

impl CourtListenerClient {
    pub fn new(client: ApiClient, token: Option<String>, retry: RetryPolicy) -> Self {
        Self {
            client,
            base_url: COURTLISTENER_SEARCH_URL.to_string(),
            token: token.filter(|t| !t.is_empty()).map(SecretString::from),
            retry,
            page_delay: Duration::from_millis(1000),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_page_delay(mut self, delay: Duration) -> Self {
        self.page_delay = delay;
        self
    }

    async fn get_page(&self, url: &str, params: Option<&[(&'static str, String)]>) -> anyhow::Result<Value> {
        let mut request = self.client.get(url)?;
        if let Some(params) = params {
            request = request.query(params);
        }
        if let Some(token) = &self.token {
            request = request.header("Authorization", format!("Token {}", token.expose_secret()));
        }
        Ok(self.client.get_json(request, &self.retry).await?)
    }

    /// Run a search, following `next` until exhausted or `max_pages`.
    #[instrument(skip(self, search), fields(q = %search.q))]
    pub async fn search(&self, search: &DocketSearch) -> DocketSearchOutcome {
        let mut outcome = DocketSearchOutcome::default();
        let first_params = search.params();
        let mut next: Option<String> = Some(self.base_url.clone());

        while let Some(url) = next.take() {
            if let Some(max) = search.max_pages {
                if outcome.pages_fetched >= max {
                    debug!(pages = outcome.pages_fetched, "Page cap reached");
                    outcome.truncated = true;
                    break;
                }
            }
            if outcome.pages_fetched > 0 && !self.page_delay.is_zero() {
                tokio::time::sleep(self.page_delay).await;
            }

            let params = (outcome.pages_fetched == 0).then_some(first_params.as_slice());
            let page = match self.get_page(&url, params).await {
                Ok(page) => page,
                Err(e) => {
                    warn!(error = %e, pages = outcome.pages_fetched, "CourtListener request failed; keeping partial results");
                    outcome.truncated = true;
                    outcome.error = Some(e.to_string());
                    break;
                }
            };

            outcome.pages_fetched += 1;
            if outcome.reported_count.is_none() {
                outcome.reported_count = page["count"].as_u64();
            }
            for hit in page["results"].as_array().map(Vec::as_slice).unwrap_or_default() {
                match flatten_docket(hit) {
                    Ok(row) => outcome.rows.push(row),
                    Err(e) => {
                        debug!(error = %e, "Skipping unflattenable docket");
                        outcome.skipped += 1;
                    }
                }
            }
            next = page["next"].as_str().map(String::from);
        }

        info!(
            rows = outcome.rows.len(),
            skipped = outcome.skipped,
            pages = outcome.pages_fetched,
            truncated = outcome.truncated,
            "CourtListener search finished"
        );
        outcome
    }
}

/// Flatten one v4 search hit. `docket_id` is required.
pub fn flatten_docket(hit: &Value) -> Result<DocketRow, TortlensError> {
    let docket_id = hit["docket_id"]
        .as_u64()
        .or_else(|| hit["docket_id"].as_str().and_then(|s| s.trim().parse().ok()))
        .ok_or_else(|| TortlensError::Extraction("search hit has no docket_id".to_string()))?;

    let url = text(&hit["docket_absolute_url"])
        .or_else(|| text(&hit["absolute_url"]))
        .map(|path| {
            if path.starts_with("http") {
                path
            } else {
                format!("{}{}", COURTLISTENER_BASE, path)
            }
        });

    Ok(DocketRow {
        docket_id,
        case_name: text(&hit["caseName"]).unwrap_or_default(),
        docket_number: text(&hit["docketNumber"]),
        court: text(&hit["court"]).or_else(|| text(&hit["court_id"])),
        date_filed: hit["dateFiled"].as_str().and_then(parse_iso_date),
        cause: text(&hit["cause"]),
        nature_of_suit: text(&hit["suitNature"]),
        url,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn sample_hit() -> Value {
        json!({
            "docket_id": 4356473,
            "caseName": "In Re: Bard IVC Filters Products Liability Litigation",
            "docketNumber": "2:15-md-02641",
            "court": "District Court, D. Arizona",
            "court_id": "azd",
            "dateFiled": "2015-08-17",
            "cause": "28:1332 Diversity-Product Liability",
            "suitNature": "365 Personal Inj. Prod. Liability",
            "docket_absolute_url": "/docket/4356473/in-re-bard-ivc-filters/"
        })
    }

    #[test]
    fn test_flatten_docket() {
        let row = flatten_docket(&sample_hit()).unwrap();
        assert_eq!(row.docket_id, 4356473);
        assert_eq!(row.docket_number.as_deref(), Some("2:15-md-02641"));
        assert_eq!(row.court.as_deref(), Some("District Court, D. Arizona"));
        assert_eq!(row.date_filed, NaiveDate::from_ymd_opt(2015, 8, 17));
        assert_eq!(
            row.url.as_deref(),
            Some("https://www.courtlistener.com/docket/4356473/in-re-bard-ivc-filters/")
        );
    }

    #[test]
    fn test_flatten_docket_court_fallback_and_string_id() {
        let hit = json!({ "docket_id": "77", "caseName": "Doe v. Acme", "court_id": "nysd" });
        let row = flatten_docket(&hit).unwrap();
        assert_eq!(row.docket_id, 77);
        assert_eq!(row.court.as_deref(), Some("nysd"));
        assert_eq!(row.url, None);
    }

    #[test]
    fn test_flatten_docket_requires_id() {
        let err = flatten_docket(&json!({ "caseName": "No id" })).unwrap_err();
        assert!(matches!(err, TortlensError::Extraction(_)));
    }

    #[test]
    fn test_row_into_case_parses_mdl() {
        let case = flatten_docket(&sample_hit()).unwrap().into_case();
        assert_eq!(case.id, "cl-4356473");
        assert_eq!(case.mdl_number, Some(2641));
        assert_eq!(case.source, CaseSource::CourtListener);
        assert_eq!(case.notes, vec!["Nature of suit: 365 Personal Inj. Prod. Liability".to_string()]);
    }

    #[test]
    fn test_search_params() {
        let mut search = DocketSearch::new("hernia mesh");
        search.filed_after = NaiveDate::from_ymd_opt(2020, 1, 31);
        let params = search.params();
        assert!(params.contains(&("type", "r".to_string())));
        assert!(params.contains(&("order_by", "dateFiled desc".to_string())));
        assert!(params.contains(&("filed_after", "01/31/2020".to_string())));
    }
}
