use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::Utc;
use tracing::{info, warn};

use tortlens_common::{AdverseEventRecord, LitigationCase};
use tortlens_dataset::matching::match_events_to_cases;
use tortlens_dataset::reference::{format_usd, reference_table};
use tortlens_dataset::{BenchmarkDataset, Summary};
use tortlens_ingestion::export;
use tortlens_ingestion::sources::courtlistener::DocketRow;

fn load_or_new(base: &Path) -> anyhow::Result<BenchmarkDataset> {
    if base.exists() {
        BenchmarkDataset::load(base)
    } else {
        info!(path = %base.display(), "Base dataset not found; starting an empty one");
        Ok(BenchmarkDataset::default())
    }
}

/// Cases from every input, in order: reference table, docket exports, case files.
pub fn collect_incoming(
    dockets: &[PathBuf],
    cases: &[PathBuf],
    reference: bool,
) -> anyhow::Result<Vec<LitigationCase>> {
    let mut incoming = Vec::new();
    if reference {
        incoming.extend(reference_table().iter().map(|e| e.to_case()));
    }
    for path in dockets {
        let rows: Vec<DocketRow> = export::read_json(path)
            .with_context(|| format!("reading docket export {}", path.display()))?;
        incoming.extend(rows.into_iter().map(DocketRow::into_case));
    }
    for path in cases {
        let more: Vec<LitigationCase> = export::read_json(path)
            .with_context(|| format!("reading cases {}", path.display()))?;
        incoming.extend(more);
    }
    Ok(incoming)
}

pub fn merge(
    base: &Path,
    dockets: &[PathBuf],
    cases: &[PathBuf],
    reference: bool,
    in_place: bool,
) -> anyhow::Result<()> {
    let incoming = collect_incoming(dockets, cases, reference)?;
    if incoming.is_empty() {
        warn!("Nothing to merge; pass --dockets, --cases or --reference");
    }

    let mut dataset = load_or_new(base)?;
    let report = dataset.merge(incoming);
    let duplicates = dataset.dedup();

    let written = if in_place {
        dataset.recompute_summary();
        dataset.generated_at = Some(Utc::now());
        dataset.save(base)?;
        base.to_path_buf()
    } else {
        dataset.save_next_version(base)?
    };

    println!(
        "{} added, {} updated, {} unchanged, {} duplicates removed -> {}",
        report.added,
        report.updated,
        report.unchanged,
        duplicates,
        written.display()
    );
    print_summary(&dataset.summary);
    Ok(())
}

pub fn summary(base: &Path) -> anyhow::Result<()> {
    let dataset = BenchmarkDataset::load(base)?;
    let computed = Summary::from_cases(&dataset.cases);
    if computed != dataset.summary {
        warn!(path = %base.display(), "Stored summary is stale; showing recomputed counters");
    }
    if let Some(v) = &dataset.version {
        println!("Version:        {}", v);
    }
    if let Some(at) = dataset.generated_at {
        println!("Generated at:   {}", at.to_rfc3339());
    }
    print_summary(&computed);
    Ok(())
}

fn print_summary(summary: &Summary) {
    println!("Cases:          {}", summary.total_cases);
    println!("  active:       {}", summary.active_cases);
    println!("  settled:      {}", summary.settled_cases);
    println!("MDLs:           {}", summary.mdl_count);
    println!("Manufacturers:  {}", summary.manufacturers);
    println!("Settlements:    {}", format_usd(summary.total_settlement_usd));
}

pub fn match_events(base: &Path, events: &Path, out: Option<&Path>) -> anyhow::Result<()> {
    let dataset = BenchmarkDataset::load(base)?;
    let events: Vec<AdverseEventRecord> = export::read_json(events)
        .with_context(|| format!("reading events {}", events.display()))?;

    let matches = match_events_to_cases(&events, &dataset.cases);
    info!(cases = matches.len(), events = events.len(), "Matched events to cases");

    match out {
        Some(path) => {
            export::write_json(path, &matches)?;
            println!("{} case matches written to {}", matches.len(), path.display());
        }
        None => {
            for m in &matches {
                println!("{:<16} {:>6} events", m.case_id, m.report_ids.len());
            }
            if matches.is_empty() {
                println!("No events matched any case device");
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use tortlens_common::CaseSource;

    fn docket_row(id: u64, docket_number: &str) -> DocketRow {
        DocketRow {
            docket_id: id,
            case_name: format!("Doe v. Bard {}", id),
            docket_number: Some(docket_number.to_string()),
            court: Some("azd".into()),
            date_filed: None,
            cause: None,
            nature_of_suit: Some("Personal Injury: Prod. Liability".into()),
            url: None,
        }
    }

    #[test]
    fn test_collect_incoming_order_and_sources() {
        let dir = tempdir().unwrap();
        let dockets = dir.path().join("dockets.json");
        export::write_json(&dockets, &[docket_row(7, "2:16-cv-00001")]).unwrap();
        let cases = dir.path().join("cases.json");
        export::write_json(&cases, &[LitigationCase::new("manual-1", "Hand entered", CaseSource::Manual)]).unwrap();

        let incoming = collect_incoming(&[dockets], &[cases], true).unwrap();
        let n_ref = reference_table().len();
        assert_eq!(incoming.len(), n_ref + 2);
        assert_eq!(incoming[0].source, CaseSource::Reference);
        assert_eq!(incoming[n_ref].id, "cl-7");
        assert_eq!(incoming[n_ref + 1].id, "manual-1");
    }

    #[test]
    fn test_merge_writes_next_version() {
        let dir = tempdir().unwrap();
        let base = dir.path().join("bench_v01.json");
        BenchmarkDataset::default().save(&base).unwrap();

        merge(&base, &[], &[], true, false).unwrap();
        let next = dir.path().join("bench_v02.json");
        let saved = BenchmarkDataset::load(&next).unwrap();
        assert_eq!(saved.cases.len(), reference_table().len());
        assert_eq!(saved.summary.total_cases, reference_table().len());
        assert_eq!(saved.version.as_deref(), Some("v02"));

        // base untouched
        assert!(BenchmarkDataset::load(&base).unwrap().cases.is_empty());
        // a second run would overwrite v02
        assert!(merge(&base, &[], &[], true, false).is_err());
    }

    #[test]
    fn test_merge_in_place() {
        let dir = tempdir().unwrap();
        let base = dir.path().join("bench.json");
        merge(&base, &[], &[], true, true).unwrap();
        let saved = BenchmarkDataset::load(&base).unwrap();
        assert_eq!(saved.summary.total_cases, reference_table().len());
        assert!(saved.generated_at.is_some());
    }

    #[test]
    fn test_missing_docket_file_is_error() {
        let dir = tempdir().unwrap();
        let err = collect_incoming(&[dir.path().join("nope.json")], &[], false).unwrap_err();
        assert!(err.to_string().contains("nope.json"));
    }
}
