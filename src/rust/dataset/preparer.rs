use std::path::{Path, PathBuf};

use csv::StringRecord;
use log::{info, warn};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use super::split::{stratified_split, SplitRatios, Splits};
use super::{read_tables, write_examples, DataError, LabeledExample, RawTable};
use crate::emotions::{emotion_for_code, LabelMapping, EMOTIONS};

const TEXT_COLUMN: &str = "text";
const EMOTION_COLUMN: &str = "emotion";
const LABEL_COLUMN: &str = "label";

/// Settings for turning raw files into a canonical dataset.
#[derive(Debug, Clone)]
pub struct PreparationConfig {
    /// Seed for the row shuffle. `None` draws from OS entropy.
    pub shuffle_seed: Option<u64>,
    /// Stratified split to produce; `None` writes only the full table
    pub split: Option<SplitRatios>,
    pub split_seed: u64,
    /// Names recognised as indicator columns, in no particular order
    pub categories: Vec<String>,
}

impl Default for PreparationConfig {
    fn default() -> Self {
        Self {
            shuffle_seed: None,
            split: None,
            split_seed: 42,
            categories: EMOTIONS.iter().map(|e| e.to_string()).collect(),
        }
    }
}

/// Row counts gathered while canonicalizing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreparationReport {
    pub total_rows: usize,
    pub kept_rows: usize,
    /// Rows whose label cells were all missing
    pub dropped_missing_labels: usize,
    pub dropped_empty_text: usize,
    /// Rows whose numeric label code is not in the code table
    pub dropped_unknown_codes: usize,
    /// Rows the CSV reader could not parse
    pub skipped_malformed: usize,
}

#[derive(Debug, Clone)]
pub struct PreparedDataset {
    pub examples: Vec<LabeledExample>,
    pub mapping: LabelMapping,
    pub report: PreparationReport,
}

/// Paths written by [`DatasetPreparer::prepare`].
#[derive(Debug, Clone)]
pub struct PreparationOutcome {
    pub processed: PathBuf,
    pub mapping: PathBuf,
    pub splits: Option<(PathBuf, PathBuf, PathBuf)>,
    pub report: PreparationReport,
}

/// Where the emotion of each row comes from.
#[derive(Debug, Clone, PartialEq)]
enum LabelSource {
    Emotion(usize),
    Codes(usize),
    /// `(column index, emotion name)` in header order
    Indicators(Vec<(usize, String)>),
}

#[derive(Debug, Clone, Default)]
pub struct DatasetPreparer {
    config: PreparationConfig,
}

impl DatasetPreparer {
    pub fn new(config: PreparationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PreparationConfig {
        &self.config
    }

    /// Reads `inputs`, canonicalizes them and shuffles the rows.
    ///
    /// The label mapping follows first appearance in the unshuffled input.
    pub fn load<P: AsRef<Path>>(&self, inputs: &[P]) -> Result<PreparedDataset, DataError> {
        let table = read_tables(inputs)?;
        let (mut examples, report) = self.canonicalize(&table)?;
        let mapping = LabelMapping::from_names(examples.iter().map(|e| e.emotion.as_str()));

        let mut rng = match self.config.shuffle_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        examples.shuffle(&mut rng);

        info!(
            "Loaded {} examples across {} emotions ({} of {} rows kept)",
            examples.len(),
            mapping.len(),
            report.kept_rows,
            report.total_rows
        );
        Ok(PreparedDataset { examples, mapping, report })
    }

    /// Folds whatever label encoding `table` uses into `(text, emotion)` rows.
    ///
    /// Label source priority: an `emotion` column, then a numeric `label`
    /// column, then indicator columns named after known categories. With
    /// indicator columns the highest value wins and ties go to the column that
    /// comes first in the header.
    pub fn canonicalize(
        &self,
        table: &RawTable,
    ) -> Result<(Vec<LabeledExample>, PreparationReport), DataError> {
        let text_idx = table
            .column(TEXT_COLUMN)
            .ok_or_else(|| DataError::MissingColumn(TEXT_COLUMN.to_string()))?;
        let source = self.label_source(table)?;
        info!("Using label source {:?}", source);

        let mut report = PreparationReport {
            total_rows: table.rows.len(),
            skipped_malformed: table.skipped,
            ..PreparationReport::default()
        };
        let mut examples = Vec::with_capacity(table.rows.len());

        for row in &table.rows {
            let emotion = match &source {
                LabelSource::Emotion(idx) => cell(row, *idx).map(str::to_string),
                LabelSource::Codes(idx) => match cell(row, *idx) {
                    None => None,
                    Some(raw) => match parse_code(raw) {
                        Some(name) => Some(name.to_string()),
                        None => {
                            report.dropped_unknown_codes += 1;
                            continue;
                        }
                    },
                },
                LabelSource::Indicators(columns) => strongest_indicator(row, columns),
            };
            let Some(emotion) = emotion else {
                report.dropped_missing_labels += 1;
                continue;
            };

            let text = row.get(text_idx).unwrap_or("").trim();
            if text.is_empty() {
                report.dropped_empty_text += 1;
                continue;
            }
            examples.push(LabeledExample::new(text, emotion));
        }

        if report.dropped_missing_labels > 0 {
            warn!(
                "Found {} rows with no emotion value. These rows were dropped.",
                report.dropped_missing_labels
            );
        }
        if report.dropped_unknown_codes > 0 {
            warn!("Dropped {} rows with unknown label codes", report.dropped_unknown_codes);
        }
        if report.dropped_empty_text > 0 {
            warn!("Dropped {} rows with empty text", report.dropped_empty_text);
        }

        report.kept_rows = examples.len();
        if examples.is_empty() {
            return Err(DataError::EmptyDataset);
        }
        Ok((examples, report))
    }

    /// Loads, writes `processed.csv` and `label_mapping.json` into
    /// `output_dir`, plus `train.csv`/`val.csv`/`test.csv` when a split is
    /// configured.
    pub fn prepare<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        inputs: &[P],
        output_dir: Q,
    ) -> Result<PreparationOutcome, DataError> {
        let output_dir = output_dir.as_ref();
        let dataset = self.load(inputs)?;

        let mapping_path = output_dir.join("label_mapping.json");
        dataset.mapping.save(&mapping_path)?;
        info!("Label mapping saved to {:?}", mapping_path);

        let processed = output_dir.join("processed.csv");
        write_examples(&processed, &dataset.examples, &dataset.mapping)?;
        info!("Processed dataset saved to {:?}", processed);

        let splits = match self.config.split {
            None => None,
            Some(ratios) => {
                let Splits { train, validation, test } =
                    stratified_split(&dataset.examples, ratios, self.config.split_seed)?;
                let paths = (
                    output_dir.join("train.csv"),
                    output_dir.join("val.csv"),
                    output_dir.join("test.csv"),
                );
                write_examples(&paths.0, &train, &dataset.mapping)?;
                write_examples(&paths.1, &validation, &dataset.mapping)?;
                write_examples(&paths.2, &test, &dataset.mapping)?;
                info!("Train set size: {}", train.len());
                info!("Validation set size: {}", validation.len());
                info!("Test set size: {}", test.len());
                Some(paths)
            }
        };

        Ok(PreparationOutcome {
            processed,
            mapping: mapping_path,
            splits,
            report: dataset.report,
        })
    }

    fn label_source(&self, table: &RawTable) -> Result<LabelSource, DataError> {
        if let Some(idx) = table.column(EMOTION_COLUMN) {
            return Ok(LabelSource::Emotion(idx));
        }
        if let Some(idx) = table.column(LABEL_COLUMN) {
            return Ok(LabelSource::Codes(idx));
        }
        let indicators: Vec<(usize, String)> = table
            .headers
            .iter()
            .enumerate()
            .filter(|(_, h)| self.config.categories.iter().any(|c| c == *h))
            .map(|(i, h)| (i, h.clone()))
            .collect();
        if indicators.is_empty() {
            return Err(DataError::NoLabelSource);
        }
        Ok(LabelSource::Indicators(indicators))
    }
}

fn cell(row: &StringRecord, idx: usize) -> Option<&str> {
    row.get(idx).map(str::trim).filter(|v| !v.is_empty())
}

/// `"17"` → joy. Multi-label cells such as `"3,27"` use their first code.
fn parse_code(raw: &str) -> Option<&'static str> {
    let first = raw.split(',').next()?.trim();
    let code: usize = first.parse().ok()?;
    emotion_for_code(code)
}

fn strongest_indicator(row: &StringRecord, columns: &[(usize, String)]) -> Option<String> {
    let mut best: Option<(f64, &str)> = None;
    for (idx, name) in columns {
        let Some(value) = cell(row, *idx).and_then(|v| v.parse::<f64>().ok()) else {
            continue;
        };
        if !value.is_finite() {
            continue;
        }
        match best {
            Some((current, _)) if value <= current => {}
            _ => best = Some((value, name.as_str())),
        }
    }
    best.map(|(_, name)| name.to_string())
}
