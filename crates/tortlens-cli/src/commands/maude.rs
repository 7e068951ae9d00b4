use std::path::Path;

use anyhow::Context;
use tracing::{info, warn};

use tortlens_common::EventType;
use tortlens_ingestion::dedup::{dedup_events, DedupKey};
use tortlens_ingestion::export;
use tortlens_ingestion::sources::openfda::SearchQuery;

use crate::cli::MaudeFilters;
use crate::config::Config;

/// ANDed openFDA search from the command-line filters.
pub fn build_query(filters: &MaudeFilters) -> SearchQuery {
    let mut query = SearchQuery::new();
    if let Some(raw) = &filters.query {
        query = query.raw(raw);
    }
    query = query.any_of("device.brand_name", &filters.brand);
    if let Some(m) = &filters.manufacturer {
        query = query.field("device.manufacturer_d_name", m);
    }
    query = query.any_of("device.device_report_product_code", &filters.product_code);
    if let Some(t) = &filters.event_type {
        query = query.field("event_type", EventType::from_openfda(t).as_str());
    }
    if let (Some(from), Some(to)) = (filters.from, filters.to) {
        query = query.date_range("date_received", from, to);
    }
    query
}

pub async fn search(
    config: &Config,
    filters: &MaudeFilters,
    max_pages: Option<usize>,
    dedup: &str,
    out: &Path,
) -> anyhow::Result<()> {
    let key = DedupKey::parse(dedup).with_context(|| {
        format!("unknown dedup key {:?} (expected report-id, report-number or brand-date)", dedup)
    })?;
    let out = config.output.resolve(out);
    // Fail on a bad extension before spending requests.
    export::ExportFormat::from_path(&out)?;

    let query = build_query(filters);
    if query.is_empty() {
        warn!("No filters given; fetching unfiltered events up to the page limits");
    }

    let client = super::openfda_client(config)?;
    let pagination = config
        .openfda
        .pagination()
        .with_max_pages(max_pages.or(config.openfda.max_pages));
    let outcome = client.search_events(&query, &pagination).await;
    super::warn_partial("openfda", outcome.truncated, outcome.error.as_deref());

    let fetched = outcome.records.len();
    let (records, removed) = dedup_events(outcome.records, key);
    let written = export::export(&out, "MAUDE", &records)?;

    info!(fetched, duplicates = removed, skipped = outcome.skipped, "MAUDE search complete");
    println!(
        "{} events written to {} ({} fetched, {} duplicates removed, {} unparseable)",
        written,
        out.display(),
        fetched,
        removed,
        outcome.skipped
    );
    Ok(())
}

pub async fn count(config: &Config, filters: &MaudeFilters, field: &str, top: usize) -> anyhow::Result<()> {
    let query = build_query(filters);
    let client = super::openfda_client(config)?;

    let total = client.total(&query).await?;
    let buckets = client.count(&query, field).await?;

    println!("{} matching events", total);
    if buckets.is_empty() {
        println!("No buckets for {}", field);
        return Ok(());
    }
    for bucket in buckets.iter().take(top) {
        println!("{:>10}  {}", bucket.count, bucket.term);
    }
    if buckets.len() > top {
        println!("... {} more", buckets.len() - top);
    }
    Ok(())
}
