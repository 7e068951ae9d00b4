//! Benchmark dataset manager.
//!
//! The dashboard reads a single JSON document:
//!
//! ```json
//! { "version": "v49", "generated_at": "...", "summary": { ... }, "cases": [ ... ] }
//! ```
//!
//! Files are versioned by a `_vNN` suffix on the stem
//! (`benchmark_v48.json` → `benchmark_v49.json`). Keys this crate does not
//! know about are carried through untouched.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, info};

use tortlens_common::{CaseStatus, LitigationCase};

/// Counters shown in the dashboard header.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Summary {
    pub total_cases: usize,
    pub active_cases: usize,
    pub settled_cases: usize,
    /// Distinct MDL numbers.
    pub mdl_count: usize,
    /// Sum of disclosed settlement amounts.
    pub total_settlement_usd: u64,
    /// Distinct manufacturers (case-insensitive).
    pub manufacturers: usize,
}

impl Summary {
    pub fn from_cases(cases: &[LitigationCase]) -> Self {
        let mdls: HashSet<u32> = cases.iter().filter_map(|c| c.mdl_number).collect();
        let manufacturers: HashSet<String> = cases
            .iter()
            .filter_map(|c| c.manufacturer.as_deref())
            .map(|m| m.trim().to_lowercase())
            .filter(|m| !m.is_empty())
            .collect();

        Self {
            total_cases: cases.len(),
            active_cases: cases.iter().filter(|c| c.status == CaseStatus::Active).count(),
            settled_cases: cases.iter().filter(|c| c.status == CaseStatus::Settled).count(),
            mdl_count: mdls.len(),
            total_settlement_usd: cases
                .iter()
                .filter_map(|c| c.settlement_amount_usd)
                .fold(0u64, |acc, v| acc.saturating_add(v)),
            manufacturers: manufacturers.len(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkDataset {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub generated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub summary: Summary,
    #[serde(default)]
    pub cases: Vec<LitigationCase>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Outcome of [`BenchmarkDataset::merge`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    pub added: usize,
    pub updated: usize,
    pub unchanged: usize,
}

impl BenchmarkDataset {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading benchmark dataset {}", path.display()))?;
        let dataset: BenchmarkDataset = serde_json::from_str(&content)
            .with_context(|| format!("parsing benchmark dataset {}", path.display()))?;
        info!(path = %path.display(), cases = dataset.cases.len(), "Loaded benchmark dataset");
        Ok(dataset)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .with_context(|| format!("writing benchmark dataset {}", path.display()))?;
        info!(path = %path.display(), cases = self.cases.len(), "Saved benchmark dataset");
        Ok(())
    }

    pub fn recompute_summary(&mut self) {
        self.summary = Summary::from_cases(&self.cases);
    }

    fn find_match(&self, incoming: &LitigationCase) -> Option<usize> {
        self.cases.iter().position(|c| same_case(c, incoming))
    }

    /// Merge incoming cases. Matches are enriched, never blanked;
    /// everything else is appended in input order.
    pub fn merge(&mut self, incoming: impl IntoIterator<Item = LitigationCase>) -> MergeReport {
        let mut report = MergeReport::default();
        for case in incoming {
            match self.find_match(&case) {
                Some(idx) => {
                    if fill_from(&mut self.cases[idx], case) {
                        report.updated += 1;
                    } else {
                        report.unchanged += 1;
                    }
                }
                None => {
                    debug!(id = %case.id, "Appending new case");
                    self.cases.push(case);
                    report.added += 1;
                }
            }
        }
        info!(added = report.added, updated = report.updated, unchanged = report.unchanged, "Merged cases");
        report
    }

    /// Fold later duplicates into their first occurrence. Returns the
    /// number of cases removed.
    pub fn dedup(&mut self) -> usize {
        let before = self.cases.len();
        let mut kept: Vec<LitigationCase> = Vec::with_capacity(before);
        for case in std::mem::take(&mut self.cases) {
            match kept.iter().position(|k| same_case(k, &case)) {
                Some(idx) => {
                    fill_from(&mut kept[idx], case);
                }
                None => kept.push(case),
            }
        }
        self.cases = kept;
        before - self.cases.len()
    }

    /// Recompute the summary, stamp version and time, and write the next
    /// `_vNN` file next to `current`. Never overwrites an existing file.
    pub fn save_next_version(&mut self, current: &Path) -> Result<PathBuf> {
        let next = next_version_path(current);
        if next.exists() {
            anyhow::bail!(
                "refusing to overwrite existing dataset {}; bump the version by hand",
                next.display()
            );
        }
        self.recompute_summary();
        self.version = version_label(&next);
        self.generated_at = Some(Utc::now());
        self.save(&next)?;
        Ok(next)
    }
}

fn normalise_docket(value: &str) -> String {
    value
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase()
}

fn normalise_court(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Same id, same MDL number, or same docket number in the same court.
fn same_case(a: &LitigationCase, b: &LitigationCase) -> bool {
    if a.id == b.id {
        return true;
    }
    if let (Some(x), Some(y)) = (a.mdl_number, b.mdl_number) {
        return x == y;
    }
    match (a.docket_number.as_deref(), b.docket_number.as_deref()) {
        (Some(x), Some(y)) if normalise_docket(x) == normalise_docket(y) => {
            match (a.court.as_deref(), b.court.as_deref()) {
                (Some(cx), Some(cy)) => normalise_court(cx) == normalise_court(cy),
                _ => true,
            }
        }
        _ => false,
    }
}

fn fill<T>(slot: &mut Option<T>, value: Option<T>) -> bool {
    if slot.is_none() && value.is_some() {
        *slot = value;
        true
    } else {
        false
    }
}

/// Fill gaps in `existing` from `incoming`. Returns whether anything changed.
fn fill_from(existing: &mut LitigationCase, incoming: LitigationCase) -> bool {
    let mut changed = false;
    if existing.case_name.trim().is_empty() && !incoming.case_name.trim().is_empty() {
        existing.case_name = incoming.case_name;
        changed = true;
    }
    changed |= fill(&mut existing.mdl_number, incoming.mdl_number);
    changed |= fill(&mut existing.docket_number, incoming.docket_number);
    changed |= fill(&mut existing.court, incoming.court);
    changed |= fill(&mut existing.date_filed, incoming.date_filed);
    changed |= fill(&mut existing.device, incoming.device);
    changed |= fill(&mut existing.manufacturer, incoming.manufacturer);
    changed |= fill(&mut existing.allegations, incoming.allegations);
    changed |= fill(&mut existing.settlement_amount_usd, incoming.settlement_amount_usd);
    changed |= fill(&mut existing.url, incoming.url);
    if existing.status == CaseStatus::Unknown && incoming.status != CaseStatus::Unknown {
        existing.status = incoming.status;
        changed = true;
    }
    for note in incoming.notes {
        if !existing.notes.contains(&note) {
            existing.notes.push(note);
            changed = true;
        }
    }
    for (key, value) in incoming.extra {
        if !existing.extra.contains_key(&key) {
            existing.extra.insert(key, value);
            changed = true;
        }
    }
    changed
}

fn version_regex() -> &'static Regex {
    static VERSION_RE: OnceLock<Regex> = OnceLock::new();
    VERSION_RE.get_or_init(|| Regex::new(r"^(.*)_v(\d+)$").expect("static regex"))
}

/// Version number from a trailing `_vNN` on the file stem.
pub fn parse_version(path: &Path) -> Option<u32> {
    let stem = path.file_stem()?.to_str()?;
    version_regex().captures(stem)?.get(2)?.as_str().parse().ok()
}

/// `vNN` exactly as spelled in the file name, padding included.
pub fn version_label(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_str()?;
    let digits = version_regex().captures(stem)?.get(2)?.as_str();
    Some(format!("v{}", digits))
}

/// `data_v48.json` → `data_v49.json`; `data.json` → `data_v1.json`.
pub fn next_version_path(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("benchmark");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    let next_stem = match version_regex().captures(stem) {
        Some(caps) => {
            let base = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
            let digits = caps.get(2).map(|m| m.as_str()).unwrap_or_default();
            let n: u32 = digits.parse().unwrap_or(0);
            // keep zero padding: v09 → v10, v01 → v02
            format!("{}_v{:0width$}", base, n.saturating_add(1), width = digits.len())
        }
        None => format!("{}_v1", stem),
    };
    path.with_file_name(format!("{}.{}", next_stem, ext))
}
