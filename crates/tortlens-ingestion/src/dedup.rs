//! Deduplication of fetched rows.
//!
//! The first occurrence of a key wins and input order is preserved. Rows
//! that lack the key field cannot collide and are always kept.

use std::collections::HashSet;

use tortlens_common::AdverseEventRecord;

use crate::sources::courtlistener::DocketRow;

/// Field used to decide two adverse-event rows are the same report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DedupKey {
    #[default]
    ReportId,
    ReportNumber,
    BrandAndDate,
}

impl DedupKey {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "report-id" | "mdr-report-key" => Some(DedupKey::ReportId),
            "report-number"                => Some(DedupKey::ReportNumber),
            "brand-date" | "brand-and-date" => Some(DedupKey::BrandAndDate),
            _ => None,
        }
    }

    fn key_of(&self, record: &AdverseEventRecord) -> Option<String> {
        match self {
            DedupKey::ReportId => {
                let id = record.report_id.trim();
                (!id.is_empty()).then(|| id.to_string())
            }
            DedupKey::ReportNumber => record
                .report_number
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string),
            DedupKey::BrandAndDate => {
                let brand = record.brand_name.trim().to_lowercase();
                match (brand.is_empty(), record.date_received) {
                    (false, Some(date)) => Some(format!("{}|{}", brand, date)),
                    _ => None,
                }
            }
        }
    }
}

/// Returns the kept records and how many were dropped.
pub fn dedup_events(records: Vec<AdverseEventRecord>, key: DedupKey) -> (Vec<AdverseEventRecord>, usize) {
    let before = records.len();
    let mut seen = HashSet::new();
    let kept: Vec<AdverseEventRecord> = records
        .into_iter()
        .filter(|r| match key.key_of(r) {
            Some(k) => seen.insert(k),
            None => true,
        })
        .collect();
    let removed = before - kept.len();
    (kept, removed)
}

pub fn dedup_dockets(rows: Vec<DocketRow>) -> (Vec<DocketRow>, usize) {
    let before = rows.len();
    let mut seen = HashSet::new();
    let kept: Vec<DocketRow> = rows.into_iter().filter(|r| seen.insert(r.docket_id)).collect();
    let removed = before - kept.len();
    (kept, removed)
}
