//! Command-line surface.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

use tortlens_common::dates::{parse_iso_date, parse_yyyymmdd};

#[derive(Parser, Debug)]
#[command(name = "tortlens", author, version, about = "Medical-device mass-tort research toolkit")]
pub struct Cli {
    /// Config file (defaults to ./tortlens.toml)
    #[arg(long, global = true, env = "TORTLENS_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// openFDA device adverse events (MAUDE)
    Maude {
        #[command(subcommand)]
        action: MaudeCommand,
    },
    /// CourtListener docket search
    Dockets {
        #[command(subcommand)]
        action: DocketsCommand,
    },
    /// Benchmark dataset maintenance
    Dataset {
        #[command(subcommand)]
        action: DatasetCommand,
    },
    /// Static MDL reference table
    Reference {
        #[command(subcommand)]
        action: ReferenceCommand,
    },
}

#[derive(Args, Debug, Clone, Default)]
pub struct MaudeFilters {
    /// Raw openFDA search clause, ANDed with the other filters
    #[arg(long)]
    pub query: Option<String>,
    /// Brand name (repeatable; any match)
    #[arg(long)]
    pub brand: Vec<String>,
    #[arg(long)]
    pub manufacturer: Option<String>,
    /// Three-letter FDA product code (repeatable; any match)
    #[arg(long = "product-code")]
    pub product_code: Vec<String>,
    /// Death, Injury, Malfunction or Other
    #[arg(long = "event-type")]
    pub event_type: Option<String>,
    /// Earliest date_received (YYYYMMDD or YYYY-MM-DD)
    #[arg(long, requires = "to", value_parser = parse_date_arg)]
    pub from: Option<NaiveDate>,
    /// Latest date_received (YYYYMMDD or YYYY-MM-DD)
    #[arg(long, requires = "from", value_parser = parse_date_arg)]
    pub to: Option<NaiveDate>,
}

#[derive(Subcommand, Debug)]
pub enum MaudeCommand {
    /// Fetch, flatten, dedup and export matching events
    Search {
        #[command(flatten)]
        filters: MaudeFilters,
        #[arg(long = "max-pages")]
        max_pages: Option<usize>,
        /// report-id, report-number or brand-date
        #[arg(long, default_value = "report-id")]
        dedup: String,
        /// Output file; format from the extension (.csv, .xlsx, .json)
        #[arg(long)]
        out: PathBuf,
    },
    /// Bucketed counts of one field over matching events
    Count {
        #[command(flatten)]
        filters: MaudeFilters,
        /// e.g. event_type.exact or device.brand_name.exact
        #[arg(long)]
        field: String,
        /// Print at most this many buckets
        #[arg(long, default_value_t = 25)]
        top: usize,
    },
}

#[derive(Subcommand, Debug)]
pub enum DocketsCommand {
    /// Search RECAP dockets and export the hits
    Search {
        #[arg(long)]
        q: String,
        #[arg(long = "filed-after", value_parser = parse_date_arg)]
        filed_after: Option<NaiveDate>,
        #[arg(long = "max-pages")]
        max_pages: Option<usize>,
        #[arg(long)]
        out: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
pub enum DatasetCommand {
    /// Merge cases into the dataset and save the next version
    Merge {
        #[arg(long)]
        base: PathBuf,
        /// Docket rows written by `dockets search --out FILE.json` (repeatable)
        #[arg(long)]
        dockets: Vec<PathBuf>,
        /// JSON array of cases (repeatable)
        #[arg(long)]
        cases: Vec<PathBuf>,
        /// Also merge the built-in MDL reference table
        #[arg(long)]
        reference: bool,
        /// Overwrite the base file instead of writing the next _vNN
        #[arg(long = "in-place")]
        in_place: bool,
    },
    /// Print summary counters
    Summary {
        #[arg(long)]
        base: PathBuf,
    },
    /// Associate exported MAUDE events with dataset cases by device name
    Match {
        #[arg(long)]
        base: PathBuf,
        /// Events written by `maude search --out FILE.json`
        #[arg(long)]
        events: PathBuf,
        /// Write matches as JSON instead of printing them
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
pub enum ReferenceCommand {
    /// Print the reference report, optionally filtered
    Show {
        #[arg(long)]
        mdl: Option<u32>,
        #[arg(long)]
        manufacturer: Option<String>,
    },
}

pub fn parse_date_arg(value: &str) -> Result<NaiveDate, String> {
    parse_yyyymmdd(value)
        .or_else(|| parse_iso_date(value))
        .ok_or_else(|| format!("invalid date {:?} (expected YYYYMMDD or YYYY-MM-DD)", value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_date_arg() {
        let d = NaiveDate::from_ymd_opt(2021, 6, 14).unwrap();
        assert_eq!(parse_date_arg("20210614"), Ok(d));
        assert_eq!(parse_date_arg("2021-06-14"), Ok(d));
        assert!(parse_date_arg("14/06/2021").is_err());
    }

    #[test]
    fn test_maude_search_args() {
        let cli = Cli::try_parse_from([
            "tortlens", "maude", "search",
            "--brand", "DreamStation", "--brand", "System One",
            "--from", "20210101", "--to", "20211231",
            "--dedup", "brand-date", "--out", "cpap.csv",
        ])
        .unwrap();
        let Command::Maude { action: MaudeCommand::Search { filters, dedup, out, max_pages } } = cli.command else {
            panic!("wrong subcommand");
        };
        assert_eq!(filters.brand, vec!["DreamStation", "System One"]);
        assert_eq!(filters.from, NaiveDate::from_ymd_opt(2021, 1, 1));
        assert_eq!(dedup, "brand-date");
        assert_eq!(out, PathBuf::from("cpap.csv"));
        assert_eq!(max_pages, None);
    }

    #[test]
    fn test_from_requires_to() {
        let err = Cli::try_parse_from(["tortlens", "maude", "count", "--field", "x", "--from", "20210101"]);
        assert!(err.is_err());
    }

    #[test]
    fn test_dataset_merge_args() {
        let cli = Cli::try_parse_from([
            "tortlens", "dataset", "merge", "--base", "bench_v03.json",
            "--dockets", "a.json", "--dockets", "b.json", "--reference",
        ])
        .unwrap();
        let Command::Dataset { action: DatasetCommand::Merge { dockets, reference, in_place, .. } } = cli.command else {
            panic!("wrong subcommand");
        };
        assert_eq!(dockets.len(), 2);
        assert!(reference);
        assert!(!in_place);
    }
}
