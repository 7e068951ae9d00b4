//! Brand-name association between adverse events and litigation cases.
//!
//! There is no shared key between MAUDE reports and dockets, so this is
//! plain string matching on device names and is meant as a starting point
//! for manual review.

use std::collections::HashSet;

use serde::Serialize;

use tortlens_common::{AdverseEventRecord, LitigationCase};

fn normalise(value: &str) -> String {
    value.trim().trim_matches('.').to_lowercase()
}

fn tokens(value: &str) -> HashSet<&str> {
    value
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Case-insensitive substring match, falling back to "every query token
/// appears in the candidate".
pub fn brand_matches(candidate: &str, query: &str) -> bool {
    let candidate = normalise(candidate);
    let query = normalise(query);
    if candidate.is_empty() || query.is_empty() {
        return false;
    }
    if candidate.contains(&query) {
        return true;
    }
    let candidate_tokens = tokens(&candidate);
    let query_tokens = tokens(&query);
    !query_tokens.is_empty() && query_tokens.iter().all(|t| candidate_tokens.contains(t))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaseMatch {
    pub case_id: String,
    pub report_ids: Vec<String>,
}

/// Device names on a case. Reference entries list alternatives as
/// `A / B / C filter`; each alternative is tried on its own.
fn device_aliases(device: &str) -> Vec<String> {
    let parts: Vec<&str> = device.split('/').map(str::trim).filter(|p| !p.is_empty()).collect();
    if parts.len() <= 1 {
        return vec![device.trim().to_string()];
    }
    // "Recovery IVC filter": only the first word of the last part is a
    // brand, the rest qualifies every alternative.
    let last_brand = parts
        .last()
        .and_then(|p| p.split_whitespace().next())
        .unwrap_or_default()
        .to_string();
    parts
        .iter()
        .enumerate()
        .map(|(i, p)| if i + 1 == parts.len() { last_brand.clone() } else { p.to_string() })
        .filter(|p| !p.is_empty())
        .collect()
}

fn event_matches(event: &AdverseEventRecord, alias: &str) -> bool {
    [&event.brand_name, &event.generic_name]
        .iter()
        .any(|name| brand_matches(name, alias))
}

/// For each case with a device name, the report ids whose brand or
/// generic name matches it. Cases with no matching events are omitted.
pub fn match_events_to_cases(events: &[AdverseEventRecord], cases: &[LitigationCase]) -> Vec<CaseMatch> {
    cases
        .iter()
        .filter_map(|case| {
            let aliases = device_aliases(case.device.as_deref()?);
            let report_ids: Vec<String> = events
                .iter()
                .filter(|e| aliases.iter().any(|a| event_matches(e, a)))
                .map(|e| e.report_id.clone())
                .collect();
            (!report_ids.is_empty()).then(|| CaseMatch {
                case_id: case.id.clone(),
                report_ids,
            })
        })
        .collect()
}
