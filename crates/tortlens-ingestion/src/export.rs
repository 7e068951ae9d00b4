//! Spreadsheet and JSON export of flattened rows.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use rust_xlsxwriter::{Format, Workbook};
use serde::Serialize;
use tracing::info;

use tortlens_common::dates::format_yyyymmdd;
use tortlens_common::{AdverseEventRecord, Result, TortlensError};

use crate::sources::courtlistener::DocketRow;

/// A record that renders as one spreadsheet row.
pub trait TabularRow {
    fn headers() -> &'static [&'static str];
    fn fields(&self) -> Vec<String>;
}

impl TabularRow for AdverseEventRecord {
    fn headers() -> &'static [&'static str] {
        &[
            "report_id",
            "report_number",
            "date_received",
            "event_type",
            "brand_name",
            "generic_name",
            "manufacturer_name",
            "device_class",
            "product_code",
            "patient_problems",
            "product_problems",
        ]
    }

    fn fields(&self) -> Vec<String> {
        vec![
            self.report_id.clone(),
            self.report_number.clone().unwrap_or_default(),
            self.date_received.map(format_yyyymmdd).unwrap_or_default(),
            self.event_type.as_str().to_string(),
            self.brand_name.clone(),
            self.generic_name.clone(),
            self.manufacturer_name.clone(),
            self.device_class.clone().unwrap_or_default(),
            self.product_code.clone().unwrap_or_default(),
            self.patient_problems.clone(),
            self.product_problems.clone(),
        ]
    }
}

impl TabularRow for DocketRow {
    fn headers() -> &'static [&'static str] {
        &[
            "docket_id",
            "case_name",
            "docket_number",
            "court",
            "date_filed",
            "cause",
            "nature_of_suit",
            "url",
        ]
    }

    fn fields(&self) -> Vec<String> {
        vec![
            self.docket_id.to_string(),
            self.case_name.clone(),
            self.docket_number.clone().unwrap_or_default(),
            self.court.clone().unwrap_or_default(),
            self.date_filed.map(|d| d.to_string()).unwrap_or_default(),
            self.cause.clone().unwrap_or_default(),
            self.nature_of_suit.clone().unwrap_or_default(),
            self.url.clone().unwrap_or_default(),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Xlsx,
    Json,
}

impl ExportFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match ext.as_str() {
            "csv"  => Ok(ExportFormat::Csv),
            "xlsx" => Ok(ExportFormat::Xlsx),
            "json" => Ok(ExportFormat::Json),
            other  => Err(TortlensError::Config(format!(
                "unsupported output extension {:?} for {} (expected csv, xlsx or json)",
                other,
                path.display()
            ))),
        }
    }
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Write rows as CSV with a header line. Returns the number of data rows.
pub fn write_csv<R: TabularRow>(path: &Path, rows: &[R]) -> Result<usize> {
    ensure_parent(path)?;
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(R::headers())?;
    for row in rows {
        writer.write_record(row.fields())?;
    }
    writer.flush()?;
    Ok(rows.len())
}

/// Write rows to a single-sheet workbook with a bold header row.
pub fn write_xlsx<R: TabularRow>(path: &Path, sheet_name: &str, rows: &[R]) -> Result<usize> {
    ensure_parent(path)?;
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();
    let sheet = workbook.add_worksheet();
    sheet.set_name(sheet_name)?;

    for (col, header) in R::headers().iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *header, &header_format)?;
    }
    for (i, row) in rows.iter().enumerate() {
        let r = (i + 1) as u32;
        for (col, value) in row.fields().into_iter().enumerate() {
            if !value.is_empty() {
                sheet.write_string(r, col as u16, value)?;
            }
        }
    }

    workbook.save(path)?;
    Ok(rows.len())
}

pub fn write_json<R: Serialize>(path: &Path, rows: &[R]) -> Result<usize> {
    ensure_parent(path)?;
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, rows)?;
    writer.flush()?;
    Ok(rows.len())
}

/// Export by file extension (`.csv`, `.xlsx`, `.json`).
pub fn export<R: TabularRow + Serialize>(path: &Path, sheet_name: &str, rows: &[R]) -> Result<usize> {
    let format = ExportFormat::from_path(path)?;
    let n = match format {
        ExportFormat::Csv  => write_csv(path, rows)?,
        ExportFormat::Xlsx => write_xlsx(path, sheet_name, rows)?,
        ExportFormat::Json => write_json(path, rows)?,
    };
    info!(path = %path.display(), rows = n, ?format, "Export written");
    Ok(n)
}

/// Read back rows written by [`write_json`].
pub fn read_json<R: serde::de::DeserializeOwned>(path: &Path) -> Result<Vec<R>> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}
