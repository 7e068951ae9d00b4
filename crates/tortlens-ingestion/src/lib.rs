//! tortlens-ingestion: Fetching and flattening of external records.
//! - openFDA device adverse events (MAUDE)
//! - CourtListener docket search
//! - Skip/limit pagination with permissive truncation
//! - Deduplication
//! - CSV/XLSX export

pub mod sources;
pub mod pagination;
pub mod dedup;
pub mod export;
