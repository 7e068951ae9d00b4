//! Core record types shared by the fetchers, the exporters and the
//! benchmark dataset.

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

// ---------------------------------------------------------------------------
// Adverse event (MAUDE MDR)
// ---------------------------------------------------------------------------

/// openFDA `event_type` classification of a Medical Device Report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    Death,
    Injury,
    Malfunction,
    Other,
    NoAnswer,
}

impl EventType {
    pub fn from_openfda(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "death"                               => EventType::Death,
            "injury"                              => EventType::Injury,
            "malfunction"                         => EventType::Malfunction,
            "" | "no answer provided" | "*"       => EventType::NoAnswer,
            _                                     => EventType::Other,
        }
    }

    /// Spelling used by openFDA, also accepted in `event_type:` clauses.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Death       => "Death",
            EventType::Injury      => "Injury",
            EventType::Malfunction => "Malfunction",
            EventType::Other       => "Other",
            EventType::NoAnswer    => "No answer provided",
        }
    }
}

impl Serialize for EventType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for EventType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(EventType::from_openfda(&s))
    }
}

/// One MDR flattened into a spreadsheet-friendly row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdverseEventRecord {
    pub report_id: String,
    pub report_number: Option<String>,
    pub date_received: Option<NaiveDate>,
    pub event_type: EventType,
    pub brand_name: String,
    pub generic_name: String,
    pub manufacturer_name: String,
    pub device_class: Option<String>,
    pub product_code: Option<String>,
    /// `; `-joined, deduplicated patient problem terms.
    pub patient_problems: String,
    pub product_problems: String,
}

// ---------------------------------------------------------------------------
// Litigation case
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CaseStatus {
    Active,
    Settled,
    Dismissed,
    Closed,
    #[default]
    Unknown,
}

impl CaseStatus {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "active" | "pending" | "open" => CaseStatus::Active,
            "settled" | "settlement"      => CaseStatus::Settled,
            "dismissed"                   => CaseStatus::Dismissed,
            "closed" | "terminated"       => CaseStatus::Closed,
            _                             => CaseStatus::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CaseStatus::Active    => "active",
            CaseStatus::Settled   => "settled",
            CaseStatus::Dismissed => "dismissed",
            CaseStatus::Closed    => "closed",
            CaseStatus::Unknown   => "unknown",
        }
    }
}

impl Serialize for CaseStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for CaseStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(CaseStatus::parse(&s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaseSource {
    Reference,
    CourtListener,
    #[default]
    Manual,
}

impl CaseSource {
    /// Anything that is not a known source counts as hand-entered.
    pub fn parse(value: &str) -> Self {
        let key: String = value
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        match key.as_str() {
            "reference"     => CaseSource::Reference,
            "courtlistener" => CaseSource::CourtListener,
            _               => CaseSource::Manual,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CaseSource::Reference     => "reference",
            CaseSource::CourtListener => "courtlistener",
            CaseSource::Manual        => "manual",
        }
    }
}

impl Serialize for CaseSource {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for CaseSource {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(CaseSource::parse(&s))
    }
}

// Hand-edited dataset files are loose about types; these accept the
// shapes seen in practice and normalise them.

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

/// `"text"` or `["a", "b"]`; blank strings are dropped.
fn notes_lenient<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    let notes = match Option::<OneOrMany>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(OneOrMany::One(s)) => vec![s],
        Some(OneOrMany::Many(v)) => v,
    };
    Ok(notes.into_iter().filter(|n| !n.trim().is_empty()).collect())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberLike {
    Int(u64),
    Float(f64),
    Text(String),
}

/// `2641`, `"2641"` or `"MDL No. 2641"`.
fn mdl_number_lenient<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u32>, D::Error> {
    use serde::de::Error;
    match Option::<NumberLike>::deserialize(deserializer)? {
        None => Ok(None),
        Some(NumberLike::Int(n)) => u32::try_from(n)
            .map(Some)
            .map_err(|_| D::Error::custom(format!("mdl_number {} out of range", n))),
        Some(NumberLike::Float(f)) if f.fract() == 0.0 && (0.0..=u32::MAX as f64).contains(&f) => {
            Ok(Some(f as u32))
        }
        Some(NumberLike::Float(f)) => Err(D::Error::custom(format!("invalid mdl_number {}", f))),
        Some(NumberLike::Text(s)) => {
            let t = s.trim();
            if t.is_empty() {
                return Ok(None);
            }
            t.parse()
                .ok()
                .or_else(|| parse_mdl_number(t))
                .map(Some)
                .ok_or_else(|| D::Error::custom(format!("invalid mdl_number {:?}", s)))
        }
    }
}

/// Whole dollars from `2475000000`, `2.475e9` or `"$2,475,000,000"`.
fn usd_lenient<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
    use serde::de::Error;
    let amount = match Option::<NumberLike>::deserialize(deserializer)? {
        None => return Ok(None),
        Some(NumberLike::Int(n)) => return Ok(Some(n)),
        Some(NumberLike::Float(f)) => f,
        Some(NumberLike::Text(s)) => {
            let cleaned: String = s.chars().filter(|c| !matches!(c, '$' | ',' | ' ')).collect();
            if cleaned.is_empty() {
                return Ok(None);
            }
            cleaned
                .parse::<f64>()
                .map_err(|_| D::Error::custom(format!("invalid settlement amount {:?}", s)))?
        }
    };
    if !amount.is_finite() || amount < 0.0 {
        return Err(D::Error::custom(format!("invalid settlement amount {}", amount)));
    }
    Ok(Some(amount.round() as u64))
}

/// A litigation case as stored in the benchmark dataset.
///
/// Fields the dashboard adds by hand are kept in `extra` so a load/save
/// cycle never drops them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LitigationCase {
    pub id: String,
    pub case_name: String,
    #[serde(default, deserialize_with = "mdl_number_lenient")]
    pub mdl_number: Option<u32>,
    #[serde(default)]
    pub docket_number: Option<String>,
    #[serde(default)]
    pub court: Option<String>,
    #[serde(default)]
    pub date_filed: Option<NaiveDate>,
    #[serde(default)]
    pub device: Option<String>,
    #[serde(default)]
    pub manufacturer: Option<String>,
    #[serde(default)]
    pub allegations: Option<String>,
    #[serde(default)]
    pub status: CaseStatus,
    #[serde(default, deserialize_with = "usd_lenient")]
    pub settlement_amount_usd: Option<u64>,
    #[serde(default)]
    pub source: CaseSource,
    #[serde(default, deserialize_with = "notes_lenient")]
    pub notes: Vec<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl LitigationCase {
    pub fn new(id: impl Into<String>, case_name: impl Into<String>, source: CaseSource) -> Self {
        Self {
            id: id.into(),
            case_name: case_name.into(),
            mdl_number: None,
            docket_number: None,
            court: None,
            date_filed: None,
            device: None,
            manufacturer: None,
            allegations: None,
            status: CaseStatus::Unknown,
            settlement_amount_usd: None,
            source,
            notes: Vec::new(),
            url: None,
            extra: Map::new(),
        }
    }
}

/// Pull an MDL number out of free text such as "MDL No. 2641",
/// "MDL 2641" or "2:15-md-02641".
pub fn parse_mdl_number(text: &str) -> Option<u32> {
    use std::sync::OnceLock;
    static MDL_RE: OnceLock<Regex> = OnceLock::new();
    static MD_DOCKET_RE: OnceLock<Regex> = OnceLock::new();

    let mdl_re = MDL_RE.get_or_init(|| {
        Regex::new(r"(?i)\bMDL[\s\-]*(?:No\.?\s*)?(\d{3,4})\b").expect("static regex")
    });
    if let Some(caps) = mdl_re.captures(text) {
        return caps.get(1)?.as_str().parse().ok();
    }

    let md_re = MD_DOCKET_RE.get_or_init(|| {
        Regex::new(r"(?i)\b\d{1,2}:\d{2}-md-0*(\d{3,4})\b").expect("static regex")
    });
    md_re.captures(text)?.get(1)?.as_str().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_event_type_from_openfda() {
        assert_eq!(EventType::from_openfda("Death"), EventType::Death);
        assert_eq!(EventType::from_openfda("INJURY"), EventType::Injury);
        assert_eq!(EventType::from_openfda(" malfunction "), EventType::Malfunction);
        assert_eq!(EventType::from_openfda("No answer provided"), EventType::NoAnswer);
        assert_eq!(EventType::from_openfda(""), EventType::NoAnswer);
        assert_eq!(EventType::from_openfda("Unknown"), EventType::Other);
    }

    #[test]
    fn test_parse_mdl_number() {
        assert_eq!(parse_mdl_number("In re: Bard IVC Filters, MDL No. 2641"), Some(2641));
        assert_eq!(parse_mdl_number("mdl-2197"), Some(2197));
        assert_eq!(parse_mdl_number("MDL 3014 (Philips CPAP)"), Some(3014));
        assert_eq!(parse_mdl_number("2:15-md-02641"), Some(2641));
        assert_eq!(parse_mdl_number("1:19-cv-01234"), None);
        assert_eq!(parse_mdl_number("model 12"), None);
    }

    #[test]
    fn test_case_status_tolerates_unknown_strings() {
        let case: LitigationCase = serde_json::from_value(serde_json::json!({
            "id": "mdl-2641",
            "case_name": "In re Bard IVC Filters",
            "status": "Winding down"
        }))
        .unwrap();
        assert_eq!(case.status, CaseStatus::Unknown);
        assert_eq!(case.source, CaseSource::Manual);
    }

    #[test]
    fn test_case_keeps_unknown_fields() {
        let input = serde_json::json!({
            "id": "mdl-2197",
            "case_name": "In re DePuy ASR",
            "status": "settled",
            "dashboard_color": "#aa0000"
        });
        let case: LitigationCase = serde_json::from_value(input).unwrap();
        assert_eq!(case.status, CaseStatus::Settled);
        assert_eq!(case.extra.get("dashboard_color"), Some(&Value::from("#aa0000")));

        let out = serde_json::to_value(&case).unwrap();
        assert_eq!(out["dashboard_color"], "#aa0000");
        assert_eq!(out["status"], "settled");
    }

    fn case_from(fields: Value) -> serde_json::Result<LitigationCase> {
        let mut obj = serde_json::json!({ "id": "c1", "case_name": "Doe v. Acme" });
        if let (Some(base), Value::Object(more)) = (obj.as_object_mut(), fields) {
            base.extend(more);
        }
        serde_json::from_value(obj)
    }

    #[test]
    fn test_notes_accepts_string_or_list() {
        let case = case_from(serde_json::json!({ "notes": "bellwether set for 2019" })).unwrap();
        assert_eq!(case.notes, vec!["bellwether set for 2019".to_string()]);

        let case = case_from(serde_json::json!({ "notes": ["a", " ", "b"] })).unwrap();
        assert_eq!(case.notes, vec!["a".to_string(), "b".to_string()]);

        let case = case_from(serde_json::json!({ "notes": null })).unwrap();
        assert!(case.notes.is_empty());
    }

    #[test]
    fn test_unknown_source_is_manual() {
        let case = case_from(serde_json::json!({ "source": "pacer" })).unwrap();
        assert_eq!(case.source, CaseSource::Manual);
        let case = case_from(serde_json::json!({ "source": "CourtListener" })).unwrap();
        assert_eq!(case.source, CaseSource::CourtListener);
        assert_eq!(serde_json::to_value(case.source).unwrap(), "courtlistener");
    }

    #[test]
    fn test_mdl_number_accepts_numeric_strings() {
        assert_eq!(case_from(serde_json::json!({ "mdl_number": "2641" })).unwrap().mdl_number, Some(2641));
        assert_eq!(case_from(serde_json::json!({ "mdl_number": 2641 })).unwrap().mdl_number, Some(2641));
        assert_eq!(case_from(serde_json::json!({ "mdl_number": "MDL No. 2197" })).unwrap().mdl_number, Some(2197));
        assert_eq!(case_from(serde_json::json!({ "mdl_number": "" })).unwrap().mdl_number, None);
        assert!(case_from(serde_json::json!({ "mdl_number": "pending" })).is_err());
    }

    #[test]
    fn test_settlement_accepts_floats_and_text() {
        let amount = |v: Value| case_from(serde_json::json!({ "settlement_amount_usd": v })).unwrap().settlement_amount_usd;
        assert_eq!(amount(serde_json::json!(2.475e9)), Some(2_475_000_000));
        assert_eq!(amount(serde_json::json!(56000000)), Some(56_000_000));
        assert_eq!(amount(serde_json::json!("$1,100,000,000")), Some(1_100_000_000));
        assert_eq!(amount(Value::Null), None);
        assert!(case_from(serde_json::json!({ "settlement_amount_usd": -5.0 })).is_err());
    }

    #[test]
    fn test_loose_case_round_trips_in_canonical_form() {
        let case = case_from(serde_json::json!({
            "mdl_number": "2641",
            "notes": "remanded",
            "settlement_amount_usd": 1.5e6
        }))
        .unwrap();
        let back: LitigationCase = serde_json::from_value(serde_json::to_value(&case).unwrap()).unwrap();
        assert_eq!(back, case);
        assert_eq!(back.notes, vec!["remanded".to_string()]);
    }
}
