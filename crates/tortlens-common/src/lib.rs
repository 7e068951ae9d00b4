//! tortlens-common: Shared types, errors, and the HTTP client used across all tortlens crates.

pub mod error;
pub mod entities;
pub mod dates;
pub mod http;

// Re-export commonly used types
pub use entities::{parse_mdl_number, AdverseEventRecord, CaseSource, CaseStatus, EventType, LitigationCase};
pub use error::{Result, TortlensError};
