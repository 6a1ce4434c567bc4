//! Dataset loading for uploads and local files

use crate::error::{ClassifierError, Result};
use calamine::{open_workbook_auto_from_rs, Data, Reader};
use polars::prelude::*;
use std::io::Cursor;
use std::path::Path;
use tracing::debug;

/// Extensions accepted for training data
pub const SUPPORTED_EXTENSIONS: &[&str] = &[".csv", ".xlsx", ".xls"];

/// Tabular file format, detected from the file name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Csv,
    Xlsx,
    Xls,
}

impl FileFormat {
    pub fn from_filename(name: &str) -> Result<Self> {
        let lower = name.trim().to_lowercase();
        if lower.ends_with(".csv") {
            Ok(FileFormat::Csv)
        } else if lower.ends_with(".xlsx") {
            Ok(FileFormat::Xlsx)
        } else if lower.ends_with(".xls") {
            Ok(FileFormat::Xls)
        } else {
            Err(ClassifierError::UnsupportedFormat(format!(
                "'{}', please upload one of: {}",
                name,
                SUPPORTED_EXTENSIONS.join(", ")
            )))
        }
    }
}

/// Reads CSV through polars and spreadsheets through calamine
#[derive(Debug, Clone)]
pub struct DataLoader {
    infer_schema_length: usize,
}

impl Default for DataLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl DataLoader {
    pub fn new() -> Self {
        Self { infer_schema_length: 10_000 }
    }

    /// Rows scanned for CSV type inference
    pub fn with_infer_schema_length(mut self, rows: usize) -> Self {
        self.infer_schema_length = rows.max(1);
        self
    }

    /// Load a file from disk, choosing the reader by extension
    pub fn load_path(&self, path: impl AsRef<Path>) -> Result<DataFrame> {
        let path = path.as_ref();
        let name = path.to_string_lossy();
        let format = FileFormat::from_filename(&name)?;
        let bytes = std::fs::read(path)?;
        self.load_bytes(format, bytes)
    }

    /// Load an uploaded file body
    pub fn load_upload(&self, filename: &str, bytes: Vec<u8>) -> Result<DataFrame> {
        let format = FileFormat::from_filename(filename)?;
        self.load_bytes(format, bytes)
    }

    pub fn load_bytes(&self, format: FileFormat, bytes: Vec<u8>) -> Result<DataFrame> {
        let df = match format {
            FileFormat::Csv => self.read_csv(bytes)?,
            FileFormat::Xlsx | FileFormat::Xls => read_spreadsheet(bytes)?,
        };
        debug!(?format, rows = df.height(), columns = df.width(), "Dataset loaded");
        if df.height() == 0 {
            return Err(ClassifierError::DataError("uploaded file contains no rows".to_string()));
        }
        Ok(df)
    }

    fn read_csv(&self, bytes: Vec<u8>) -> Result<DataFrame> {
        // NASA archive exports prefix their metadata block with '#'
        let parse_options = CsvParseOptions::default().with_comment_prefix(Some("#"));

        CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(self.infer_schema_length))
            .with_parse_options(parse_options)
            .into_reader_with_file_handle(Cursor::new(bytes))
            .finish()
            .map_err(|e| ClassifierError::DataError(format!("Failed to parse CSV: {}", e)))
    }
}

/// First worksheet, first row as header. A column is numeric when every
/// non-empty cell is a number.
fn read_spreadsheet(bytes: Vec<u8>) -> Result<DataFrame> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| ClassifierError::DataError("workbook has no worksheets".to_string()))??;

    let mut rows = range.rows();
    let header: Vec<String> = match rows.next() {
        Some(cells) => cells
            .iter()
            .enumerate()
            .map(|(i, cell)| match cell_text(cell) {
                Some(name) => name,
                None => format!("column_{}", i),
            })
            .collect(),
        None => return Err(ClassifierError::DataError("worksheet is empty".to_string())),
    };

    let body: Vec<&[Data]> = rows.collect();
    let columns = header
        .iter()
        .enumerate()
        .map(|(j, name)| {
            let cells: Vec<&Data> = body.iter().map(|row| row.get(j).unwrap_or(&Data::Empty)).collect();
            spreadsheet_column(name, &cells)
        })
        .collect::<Vec<Column>>();

    Ok(DataFrame::new(columns)?)
}

fn spreadsheet_column(name: &str, cells: &[&Data]) -> Column {
    let all_numeric = cells
        .iter()
        .all(|cell| matches!(cell, Data::Empty | Data::Int(_) | Data::Float(_)));

    if all_numeric {
        let values: Vec<Option<f64>> = cells
            .iter()
            .map(|cell| match cell {
                Data::Int(v) => Some(*v as f64),
                Data::Float(v) => Some(*v),
                _ => None,
            })
            .collect();
        Series::new(name.into(), values).into()
    } else {
        let values: Vec<Option<String>> = cells.iter().map(|cell| cell_text(cell)).collect();
        Series::new(name.into(), values).into()
    }
}

fn cell_text(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty | Data::Error(_) => None,
        Data::String(s) if s.trim().is_empty() => None,
        Data::String(s) => Some(s.trim().to_string()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_detection() {
        assert_eq!(FileFormat::from_filename("koi.CSV").unwrap(), FileFormat::Csv);
        assert_eq!(FileFormat::from_filename("a.xlsx").unwrap(), FileFormat::Xlsx);
        assert_eq!(FileFormat::from_filename("a.xls").unwrap(), FileFormat::Xls);
        assert!(matches!(
            FileFormat::from_filename("data.parquet"),
            Err(ClassifierError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_csv_skips_comment_lines() {
        let body = "# This file was produced by the archive\n# COLUMN pl_orbper\nx,label\n1.5,a\n2.5,b\n";
        let df = DataLoader::new().load_upload("toi.csv", body.as_bytes().to_vec()).unwrap();
        assert_eq!(df.shape(), (2, 2));
        assert_eq!(df.column("x").unwrap().dtype(), &DataType::Float64);
    }

    #[test]
    fn test_header_only_csv_is_rejected() {
        let err = DataLoader::new().load_upload("a.csv", b"x,label\n".to_vec()).unwrap_err();
        assert!(matches!(err, ClassifierError::DataError(_)));
    }

    #[test]
    fn test_spreadsheet_column_typing() {
        let numeric = spreadsheet_column("n", &[&Data::Int(1), &Data::Empty, &Data::Float(2.5)]);
        assert_eq!(numeric.dtype(), &DataType::Float64);
        assert_eq!(numeric.null_count(), 1);

        let text = spreadsheet_column("s", &[&Data::Int(1), &Data::String("PC".to_string())]);
        assert_eq!(text.dtype(), &DataType::String);
    }
}
