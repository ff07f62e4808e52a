//! Raw labeled text → canonical `(text, emotion)` tables.
//!
//! Input files may carry the emotion as a categorical `emotion` column, as a
//! numeric `label` code, or as one indicator column per emotion. Everything is
//! folded into [`LabeledExample`] rows, shuffled, optionally split with
//! per-category stratification, and written back out as CSV next to a
//! [`LabelMapping`](crate::LabelMapping) document.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use log::warn;
use serde::{Deserialize, Serialize};

mod preparer;
mod split;

pub use preparer::{
    DatasetPreparer, PreparationConfig, PreparationOutcome, PreparationReport, PreparedDataset,
};
pub use split::{stratified_split, Splits, SplitRatios};

/// One training example in canonical form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabeledExample {
    pub text: String,
    pub emotion: String,
}

impl LabeledExample {
    pub fn new(text: impl Into<String>, emotion: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            emotion: emotion.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DataError {
    #[error("Dataset not found at {0:?}. Ensure the file is placed correctly.")]
    NotFound(PathBuf),
    #[error("Dataset must contain a '{0}' column")]
    MissingColumn(String),
    #[error("Dataset does not contain emotion labels: expected an 'emotion' column, a 'label' column or per-emotion indicator columns")]
    NoLabelSource,
    #[error("Dataset has no usable rows")]
    EmptyDataset,
    #[error("Header of {other:?} does not match header of {first:?}")]
    HeaderMismatch { first: PathBuf, other: PathBuf },
    #[error("Invalid split ratios: {0}")]
    InvalidSplit(String),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// A parsed delimited file: trimmed header names plus the rows that parsed.
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<StringRecord>,
    /// Rows dropped because they could not be parsed (wrong field count, bad UTF-8)
    pub skipped: usize,
}

impl RawTable {
    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }
}

/// `.tsv` files are tab separated, everything else comma separated.
pub fn delimiter_for(path: &Path) -> u8 {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") => b'\t',
        _ => b',',
    }
}

/// Reads one delimited file, skipping rows that fail to parse.
pub fn read_table<P: AsRef<Path>>(path: P) -> Result<RawTable, DataError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(DataError::NotFound(path.to_path_buf()));
    }
    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter_for(path))
        .has_headers(true)
        .flexible(false)
        .from_reader(File::open(path)?);

    let headers = reader
        .headers()?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
        .collect();

    let mut table = RawTable {
        headers,
        rows: Vec::new(),
        skipped: 0,
    };
    for record in reader.records() {
        match record {
            Ok(record) => table.rows.push(record),
            Err(e) => {
                log::debug!("Skipping malformed row in {:?}: {}", path, e);
                table.skipped += 1;
            }
        }
    }
    if table.skipped > 0 {
        warn!("Skipped {} malformed rows in {:?}", table.skipped, path);
    }
    Ok(table)
}

/// Reads and concatenates several files that share one header.
pub fn read_tables<P: AsRef<Path>>(paths: &[P]) -> Result<RawTable, DataError> {
    let mut combined: Option<(PathBuf, RawTable)> = None;
    for path in paths {
        let table = read_table(path)?;
        match combined.as_mut() {
            None => combined = Some((path.as_ref().to_path_buf(), table)),
            Some((first, acc)) => {
                if acc.headers != table.headers {
                    return Err(DataError::HeaderMismatch {
                        first: first.clone(),
                        other: path.as_ref().to_path_buf(),
                    });
                }
                acc.rows.extend(table.rows);
                acc.skipped += table.skipped;
            }
        }
    }
    combined.map(|(_, t)| t).ok_or(DataError::EmptyDataset)
}

/// Reads one file in any supported label encoding, keeping row order.
pub fn read_examples<P: AsRef<Path>>(path: P) -> Result<Vec<LabeledExample>, DataError> {
    let table = read_table(path)?;
    let (examples, _) = DatasetPreparer::default().canonicalize(&table)?;
    Ok(examples)
}

#[derive(Serialize)]
struct ProcessedRow<'a> {
    text: &'a str,
    emotion: &'a str,
    label: usize,
}

/// Writes `text,emotion,label` rows; `label` is the index in `mapping`.
pub fn write_examples<P: AsRef<Path>>(
    path: P,
    examples: &[LabeledExample],
    mapping: &crate::LabelMapping,
) -> Result<(), DataError> {
    if let Some(parent) = path.as_ref().parent() {
        fs::create_dir_all(parent)?;
    }
    let mut writer = WriterBuilder::new()
        .delimiter(delimiter_for(path.as_ref()))
        .from_path(path.as_ref())?;
    for example in examples {
        let label = mapping.index_of(&example.emotion).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("emotion '{}' missing from label mapping", example.emotion),
            )
        })?;
        writer.serialize(ProcessedRow {
            text: &example.text,
            emotion: &example.emotion,
            label,
        })?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delimiter_by_extension() {
        assert_eq!(delimiter_for(Path::new("data/train.tsv")), b'\t');
        assert_eq!(delimiter_for(Path::new("data/train.TSV")), b'\t');
        assert_eq!(delimiter_for(Path::new("data/train.csv")), b',');
        assert_eq!(delimiter_for(Path::new("data/train")), b',');
    }

    #[test]
    fn test_read_table_skips_malformed_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("raw.tsv");
        fs::write(&path, "text\tlabel\nhello there\t17\nbroken row\n\"quoted\ttab\"\t2\n").unwrap();
        let table = read_table(&path).unwrap();
        assert_eq!(table.headers, vec!["text", "label"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.skipped, 1);
        assert_eq!(&table.rows[1][0], "quoted\ttab");
    }

    #[test]
    fn test_read_tables_requires_matching_headers() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.csv");
        let b = dir.path().join("b.csv");
        fs::write(&a, "text,joy\nyay,1\n").unwrap();
        fs::write(&b, "text,anger\ngrr,1\n").unwrap();
        assert!(matches!(read_tables(&[&a, &b]), Err(DataError::HeaderMismatch { .. })));
        let both = read_tables(&[&a, &a]).unwrap();
        assert_eq!(both.rows.len(), 2);
    }

    #[test]
    fn test_read_examples_keeps_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("val.csv");
        fs::write(&path, "text,emotion,label\nfirst,joy,0\nsecond,anger,1\nthird,joy,0\n").unwrap();
        let examples = read_examples(&path).unwrap();
        let texts: Vec<&str> = examples.iter().map(|e| e.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second", "third"]);
        assert_eq!(examples[1].emotion, "anger");
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(read_table("/nonexistent/x.csv"), Err(DataError::NotFound(_))));
    }
}
