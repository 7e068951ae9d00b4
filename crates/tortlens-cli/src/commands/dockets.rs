use std::path::Path;

use chrono::NaiveDate;
use tracing::info;

use tortlens_ingestion::dedup::dedup_dockets;
use tortlens_ingestion::export;
use tortlens_ingestion::sources::courtlistener::DocketSearch;

use crate::config::Config;

pub async fn search(
    config: &Config,
    q: &str,
    filed_after: Option<NaiveDate>,
    max_pages: Option<usize>,
    out: &Path,
) -> anyhow::Result<()> {
    if q.trim().is_empty() {
        anyhow::bail!("--q must not be empty");
    }
    let out = config.output.resolve(out);
    export::ExportFormat::from_path(&out)?;

    let mut search = DocketSearch::new(q);
    search.filed_after = filed_after;
    search.max_pages = Some(max_pages.unwrap_or(config.courtlistener.max_pages));

    let client = super::courtlistener_client(config)?;
    let outcome = client.search(&search).await;
    super::warn_partial("courtlistener", outcome.truncated, outcome.error.as_deref());

    let fetched = outcome.rows.len();
    let (rows, removed) = dedup_dockets(outcome.rows);
    let written = export::export(&out, "Dockets", &rows)?;

    info!(fetched, duplicates = removed, reported = ?outcome.reported_count, "Docket search complete");
    match outcome.reported_count {
        Some(total) => println!(
            "{} dockets written to {} ({} of {} reported hits fetched)",
            written,
            out.display(),
            fetched,
            total
        ),
        None => println!("{} dockets written to {}", written, out.display()),
    }
    Ok(())
}
