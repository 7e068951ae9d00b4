//! tortlens-dataset: The litigation side of the toolkit.
//! - Benchmark JSON dataset consumed by the dashboard (load, merge, versioned save)
//! - Static reference tables of device MDLs and settlements
//! - Brand-name association between adverse events and cases

pub mod benchmark;
pub mod reference;
pub mod matching;

pub use benchmark::{BenchmarkDataset, MergeReport, Summary};
pub use reference::ReferenceEntry;
