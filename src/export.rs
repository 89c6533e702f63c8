//! Spreadsheet export.
//!
//! Query results are written as `.xlsx` workbooks under one export
//! directory, which is created on demand.

use std::path::{Path, PathBuf};

use chrono::Local;
use rust_xlsxwriter::{Format, Workbook, XlsxError};
use tracing::debug;

use crate::db::{QueryResult, Value};
use crate::error::{CrmError, Result};

/// Extension appended to every export file stem.
pub const EXPORT_EXTENSION: &str = "xlsx";

/// Writes query results to files and finds them again.
pub trait Exporter: Send + Sync {
    /// Writes `result` to `<stem>.xlsx` and returns the file path.
    fn export(&self, result: &QueryResult, stem: &str) -> Result<PathBuf>;

    /// Returns the path of a previously exported file.
    ///
    /// `stem` is the file name without extension.
    fn locate(&self, stem: &str) -> Result<PathBuf>;
}

/// Builds a file stem like `campaign_results_20240630_091500` from local time.
pub fn timestamped_stem(prefix: &str) -> String {
    format!("{}_{}", prefix, Local::now().format("%Y%m%d_%H%M%S"))
}

/// Writes `.xlsx` workbooks with a bold header row.
#[derive(Debug, Clone)]
pub struct XlsxExporter {
    dir: PathBuf,
}

impl XlsxExporter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The export directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn build_workbook(result: &QueryResult) -> std::result::Result<Workbook, XlsxError> {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        let header = Format::new().set_bold();

        for (col, column) in result.columns.iter().enumerate() {
            worksheet.write_string_with_format(0, col as u16, &column.name, &header)?;
        }

        for (row_index, row) in result.rows.iter().enumerate() {
            let xlsx_row = row_index as u32 + 1;
            for (col, value) in row.iter().enumerate() {
                let col = col as u16;
                match value {
                    Value::Null => {}
                    Value::Bool(b) => {
                        worksheet.write_boolean(xlsx_row, col, *b)?;
                    }
                    Value::Int(i) => {
                        worksheet.write_number(xlsx_row, col, *i as f64)?;
                    }
                    Value::Float(f) => {
                        worksheet.write_number(xlsx_row, col, *f)?;
                    }
                    Value::String(s) => {
                        worksheet.write_string(xlsx_row, col, s)?;
                    }
                    Value::Bytes(bytes) => {
                        worksheet.write_string(xlsx_row, col, String::from_utf8_lossy(bytes))?;
                    }
                }
            }
        }

        Ok(workbook)
    }
}

impl Exporter for XlsxExporter {
    fn export(&self, result: &QueryResult, stem: &str) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir).map_err(|e| {
            CrmError::export(format!(
                "Failed to create export directory {}: {e}",
                self.dir.display()
            ))
        })?;

        let path = self.dir.join(format!("{stem}.{EXPORT_EXTENSION}"));
        let mut workbook = Self::build_workbook(result)
            .map_err(|e| CrmError::export(format!("Failed to build spreadsheet: {e}")))?;
        workbook
            .save(&path)
            .map_err(|e| CrmError::export(format!("Failed to write {}: {e}", path.display())))?;

        debug!("Exported {} rows to {}", result.row_count(), path.display());
        Ok(path)
    }

    fn locate(&self, stem: &str) -> Result<PathBuf> {
        resolve_export(&self.dir, stem)
    }
}

/// Resolves an export file stem inside `dir`.
///
/// Stems that could escape the directory are treated as missing.
pub fn resolve_export(dir: &Path, stem: &str) -> Result<PathBuf> {
    let not_found = || CrmError::not_found(format!("Export '{stem}' does not exist"));

    if stem.is_empty()
        || stem.contains('/')
        || stem.contains('\\')
        || stem.contains("..")
        || stem.contains('\0')
    {
        return Err(not_found());
    }

    let path = dir.join(format!("{stem}.{EXPORT_EXTENSION}"));
    if path.is_file() {
        Ok(path)
    } else {
        Err(not_found())
    }
}
