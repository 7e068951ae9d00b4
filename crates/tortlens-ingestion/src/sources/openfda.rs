//! openFDA device adverse event client (MAUDE).
//!
//! API docs: https://open.fda.gov/apis/device/event/
//! Endpoint: https://api.fda.gov/device/event.json
//!
//! Query parameters used:
//!   search  Lucene-style `field:value` clauses joined with AND/OR
//!   limit   page size (max 100 per page without a download token)
//!   skip    offset (openFDA rejects skip > 25000)
//!   count   aggregation field, returns `{term, count}` buckets

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use tortlens_common::dates::{format_yyyymmdd, parse_yyyymmdd};
use tortlens_common::http::{ApiClient, RetryPolicy};
use tortlens_common::{AdverseEventRecord, EventType, TortlensError};

use super::{join_unique, text};
use crate::pagination::{paginate, PageRequest, PageSource, PaginationConfig};

pub const OPENFDA_DEVICE_EVENT_URL: &str = "https://api.fda.gov/device/event.json";

// ── Query builder ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Joiner {
    #[default]
    And,
    Or,
}

impl Joiner {
    fn as_str(&self) -> &'static str {
        match self {
            Joiner::And => " AND ",
            Joiner::Or  => " OR ",
        }
    }
}

/// Builds the `search` parameter.
#[derive(Debug, Clone, Default)]
pub struct SearchQuery {
    clauses: Vec<String>,
    joiner: Joiner,
}

impl SearchQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, name: &str, value: &str) -> Self {
        self.clauses.push(format!("{}:{}", name, quote_value(value)));
        self
    }

    /// `(name:a OR name:b ...)`; an empty list adds nothing.
    pub fn any_of<S: AsRef<str>>(mut self, name: &str, values: &[S]) -> Self {
        let parts: Vec<String> = values
            .iter()
            .map(|v| format!("{}:{}", name, quote_value(v.as_ref())))
            .collect();
        match parts.len() {
            0 => {}
            1 => self.clauses.push(parts.into_iter().next().unwrap_or_default()),
            _ => self.clauses.push(format!("({})", parts.join(" OR "))),
        }
        self
    }

    pub fn date_range(mut self, name: &str, from: NaiveDate, to: NaiveDate) -> Self {
        self.clauses.push(format!(
            "{}:[{} TO {}]",
            name,
            format_yyyymmdd(from),
            format_yyyymmdd(to)
        ));
        self
    }

    pub fn raw(mut self, clause: &str) -> Self {
        let clause = clause.trim();
        if !clause.is_empty() {
            self.clauses.push(clause.to_string());
        }
        self
    }

    pub fn and(mut self) -> Self {
        self.joiner = Joiner::And;
        self
    }

    pub fn or(mut self) -> Self {
        self.joiner = Joiner::Or;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn build(&self) -> String {
        self.clauses.join(self.joiner.as_str())
    }
}

const SPECIAL_CHARS: &[char] = &[
    ':', '(', ')', '[', ']', '{', '}', '"', '+', '-', '&', '|', '!', '^', '~', '*', '?', '\\', '/',
];

/// Quote values with whitespace or query syntax in them.
fn quote_value(value: &str) -> String {
    let v = value.trim();
    if !v.is_empty() && !v.chars().any(|c| c.is_whitespace() || SPECIAL_CHARS.contains(&c)) {
        return v.to_string();
    }
    format!("\"{}\"", v.replace('\\', "\\\\").replace('"', "\\\""))
}

// ── Client ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountBucket {
    pub term: String,
    pub count: u64,
}

#[derive(Debug, Default)]
pub struct EventSearchOutcome {
    pub records: Vec<AdverseEventRecord>,
    /// Raw results that could not be flattened.
    pub skipped: usize,
    pub pages_fetched: usize,
    pub truncated: bool,
    pub error: Option<String>,
}

pub struct OpenFdaClient {
    client: ApiClient,
    base_url: String,
    api_key: Option<SecretString>,
    retry: RetryPolicy,
}

impl OpenFdaClient {
    pub fn new(client: ApiClient, api_key: Option<String>, retry: RetryPolicy) -> Self {
        Self {
            client,
            base_url: OPENFDA_DEVICE_EVENT_URL.to_string(),
            api_key: api_key.filter(|k| !k.is_empty()).map(SecretString::from),
            retry,
        }
    }

    /// Point at a different endpoint (a local mirror, for instance).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn base_params(&self, query: &SearchQuery) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if !query.is_empty() {
            params.push(("search", query.build()));
        }
        if let Some(key) = &self.api_key {
            params.push(("api_key", key.expose_secret().to_string()));
        }
        params
    }

    /// GET with the given params. openFDA answers a query with no matches
    /// with 404 `NOT_FOUND`, which is mapped to `Ok(None)`.
    async fn get(&self, params: &[(&'static str, String)]) -> anyhow::Result<Option<Value>> {
        let request = self.client.get(&self.base_url)?.query(params);
        let resp = self.client.execute(request, &self.retry).await?;
        let status = resp.status();
        if !status.is_success() {
            let url = resp.url().to_string();
            let body = resp.text().await.unwrap_or_default();
            // Only the API's own NOT_FOUND envelope means "no matches"
            if status == StatusCode::NOT_FOUND && is_no_matches(&body) {
                debug!("openFDA returned NOT_FOUND (no matching records)");
                return Ok(None);
            }
            warn!(status = status.as_u16(), body = %truncate(&body, 300), "openFDA request failed");
            return Err(TortlensError::Status { status: status.as_u16(), url }.into());
        }
        Ok(Some(resp.json().await?))
    }

    /// Page through matching events and flatten them.
    #[instrument(skip(self, config), fields(search = %query.build()))]
    pub async fn search_events(&self, query: &SearchQuery, config: &PaginationConfig) -> EventSearchOutcome {
        let pages = EventPages { client: self, query };
        let raw = paginate(&pages, config).await;

        let mut outcome = EventSearchOutcome {
            pages_fetched: raw.pages_fetched,
            truncated: raw.truncated,
            error: raw.error,
            ..Default::default()
        };
        for result in &raw.results {
            match flatten_event(result) {
                Ok(record) => outcome.records.push(record),
                Err(e) => {
                    debug!(error = %e, "Skipping unflattenable event");
                    outcome.skipped += 1;
                }
            }
        }

        info!(
            records = outcome.records.len(),
            skipped = outcome.skipped,
            pages = outcome.pages_fetched,
            truncated = outcome.truncated,
            "openFDA event search finished"
        );
        outcome
    }

    /// Bucketed counts of `field` over the matching events.
    #[instrument(skip(self), fields(search = %query.build()))]
    pub async fn count(&self, query: &SearchQuery, field: &str) -> anyhow::Result<Vec<CountBucket>> {
        let mut params = self.base_params(query);
        params.push(("count", field.to_string()));

        let Some(resp) = self.get(&params).await? else {
            return Ok(Vec::new());
        };
        Ok(parse_count_buckets(&resp))
    }

    /// Total number of matching events (`meta.results.total`).
    #[instrument(skip(self), fields(search = %query.build()))]
    pub async fn total(&self, query: &SearchQuery) -> anyhow::Result<u64> {
        let mut params = self.base_params(query);
        params.push(("limit", "1".to_string()));

        let Some(resp) = self.get(&params).await? else {
            return Ok(0);
        };
        Ok(resp["meta"]["results"]["total"].as_u64().unwrap_or(0))
    }
}

struct EventPages<'a> {
    client: &'a OpenFdaClient,
    query: &'a SearchQuery,
}

#[async_trait]
impl PageSource for EventPages<'_> {
    async fn fetch_page(&self, page: PageRequest) -> anyhow::Result<Vec<Value>> {
        let mut params = self.client.base_params(self.query);
        params.push(("limit", page.limit.to_string()));
        params.push(("skip", page.skip.to_string()));

        let Some(resp) = self.client.get(&params).await? else {
            return Ok(Vec::new());
        };
        Ok(resp["results"].as_array().cloned().unwrap_or_default())
    }
}

fn parse_count_buckets(resp: &Value) -> Vec<CountBucket> {
    resp["results"]
        .as_array()
        .map(|buckets| {
            buckets
                .iter()
                .filter_map(|b| {
                    Some(CountBucket {
                        term: text(&b["term"])?,
                        count: b["count"].as_u64()?,
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

/// `{"error": {"code": "NOT_FOUND", ...}}` is openFDA's empty result.
fn is_no_matches(body: &str) -> bool {
    serde_json::from_str::<Value>(body)
        .map(|v| v["error"]["code"] == "NOT_FOUND")
        .unwrap_or(false)
}

fn truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

// ── Flattening ────────────────────────────────────────────────────────────────

/// Flatten one raw `device/event` result into a row.
///
/// Only `mdr_report_key` is required; every device descriptor comes from
/// the first `device[]` entry.
pub fn flatten_event(raw: &Value) -> Result<AdverseEventRecord, TortlensError> {
    let report_id = text(&raw["mdr_report_key"])
        .ok_or_else(|| TortlensError::Extraction("event has no mdr_report_key".to_string()))?;

    static NO_DEVICE: Value = Value::Null;
    let device = raw["device"]
        .as_array()
        .and_then(|d| d.first())
        .unwrap_or(&NO_DEVICE);

    let manufacturer_name = text(&device["manufacturer_d_name"])
        .or_else(|| text(&raw["manufacturer_name"]))
        .unwrap_or_default();

    let patient_problems = raw["patient"]
        .as_array()
        .map(|patients| {
            join_unique(
                patients
                    .iter()
                    .filter_map(|p| p["patient_problems"].as_array())
                    .flatten(),
            )
        })
        .unwrap_or_default();

    let product_problems = raw["product_problems"]
        .as_array()
        .map(|p| join_unique(p.iter()))
        .unwrap_or_default();

    Ok(AdverseEventRecord {
        report_id,
        report_number: text(&raw["report_number"]),
        date_received: raw["date_received"].as_str().and_then(parse_yyyymmdd),
        event_type: raw["event_type"]
            .as_str()
            .map(EventType::from_openfda)
            .unwrap_or(EventType::NoAnswer),
        brand_name: text(&device["brand_name"]).unwrap_or_default(),
        generic_name: text(&device["generic_name"]).unwrap_or_default(),
        manufacturer_name,
        device_class: text(&device["openfda"]["device_class"]),
        product_code: text(&device["device_report_product_code"]),
        patient_problems,
        product_problems,
    })
}
