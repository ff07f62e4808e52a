use std::collections::BTreeMap;
use std::io;
use std::path::Path;

use log::{info, warn};
use serde::Serialize;

use crate::artifact::{ArtifactError, ArtifactStore};
use crate::classifier::{Classifier, ClassifierError};
use crate::config::{BootstrapPolicy, ServiceConfig, TrainingConfig};
use crate::dataset::{DataError, DatasetPreparer, LabeledExample, PreparationConfig};
use crate::dominant_words::DominantWordTable;
use crate::translate::TranslateError;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// The caller sent something unusable; not a system fault
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Classifier(ClassifierError),
    #[error(transparent)]
    Artifact(#[from] ArtifactError),
    #[error(transparent)]
    Data(#[from] DataError),
    #[error(transparent)]
    Translate(#[from] TranslateError),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Startup failed: {0}")]
    Bootstrap(String),
}

impl From<ClassifierError> for ServiceError {
    fn from(err: ClassifierError) -> Self {
        match err {
            ClassifierError::ValidationError(msg) => ServiceError::Validation(msg),
            other => ServiceError::Classifier(other),
        }
    }
}

/// Result of analyzing one piece of feedback.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedbackAnalysis {
    /// Predicted emotion
    pub feedback_type: String,
    /// Probability of the predicted emotion
    pub emotion_score: f64,
    pub probabilities: BTreeMap<String, f64>,
    pub dominant_words: BTreeMap<String, Vec<String>>,
}

/// The fitted classifier plus the dominant word table, built once at startup
/// and shared read-only by every request.
#[derive(Debug, Clone)]
pub struct EmotionService {
    classifier: Classifier,
    words: DominantWordTable,
}

impl EmotionService {
    pub fn new(classifier: Classifier, words: DominantWordTable) -> Self {
        Self { classifier, words }
    }

    /// Loads the persisted classifier and the word table named in `config`.
    ///
    /// When no classifier has been persisted, [`BootstrapPolicy::LoadOnly`]
    /// fails and [`BootstrapPolicy::LoadOrTrain`] trains one from
    /// `config.training_data` (blocking for the full training time) and saves it.
    pub fn bootstrap(config: &ServiceConfig) -> Result<Self, ServiceError> {
        // Cheap to load, so a bad path fails before any training starts.
        let words = DominantWordTable::from_path(&config.words_path).map_err(|e| match e {
            DataError::NotFound(path) => {
                ServiceError::Bootstrap(format!("dominant word table not found at {:?}", path))
            }
            other => other.into(),
        })?;

        let store = ArtifactStore::new(&config.model_dir)?;
        let classifier = match store.load() {
            Ok(classifier) => classifier,
            Err(ArtifactError::NotFound(path)) => match config.bootstrap {
                BootstrapPolicy::LoadOnly => {
                    return Err(ServiceError::Bootstrap(format!(
                        "no classifier at {:?}; run `sentio_bin train` first or start with --train-if-missing",
                        path
                    )));
                }
                BootstrapPolicy::LoadOrTrain => {
                    warn!("No classifier at {:?}; training from {:?}", path, config.training_data);
                    let classifier = train_from_files(&[&config.training_data], &config.training)?;
                    store.save(&classifier)?;
                    classifier
                }
            },
            Err(e) => return Err(e.into()),
        };

        Ok(Self::new(classifier, words))
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    pub fn words(&self) -> &DominantWordTable {
        &self.words
    }

    pub fn predict_label(&self, text: &str) -> Result<String, ServiceError> {
        Ok(self.classifier.predict_label(text)?)
    }

    pub fn predict_distribution(&self, text: &str) -> Result<BTreeMap<String, f64>, ServiceError> {
        Ok(self.classifier.predict_distribution(text)?)
    }

    pub fn dominant_words(&self, text: &str, emotion: Option<&str>) -> BTreeMap<String, Vec<String>> {
        self.words.dominant_words(text, emotion)
    }

    /// Label, confidence, full distribution and word overlaps for `feedback`.
    pub fn analyze(&self, feedback: &str) -> Result<FeedbackAnalysis, ServiceError> {
        if feedback.trim().is_empty() {
            return Err(ServiceError::Validation("No feedback provided".into()));
        }
        let (feedback_type, probabilities) = self.classifier.predict(feedback)?;
        let emotion_score = probabilities.get(&feedback_type).copied().unwrap_or(0.0);
        Ok(FeedbackAnalysis {
            feedback_type,
            emotion_score,
            probabilities,
            dominant_words: self.dominant_words(feedback, None),
        })
    }
}

/// Reads raw training files in any supported label encoding and fits a classifier.
pub fn train_from_files<P: AsRef<Path>>(
    paths: &[P],
    config: &TrainingConfig,
) -> Result<Classifier, ServiceError> {
    let preparer = DatasetPreparer::new(PreparationConfig {
        shuffle_seed: config.shuffle_seed,
        ..PreparationConfig::default()
    });
    let dataset = preparer.load(paths)?;
    info!("Training on {} examples", dataset.examples.len());
    let classifier = Classifier::builder()
        .with_config(config.clone())
        .add_examples(dataset.examples)?
        .build()?;
    let info = classifier.info();
    info!(
        "Trained classifier: {} classes, {} vocabulary terms",
        info.num_classes, info.vocabulary_size
    );
    Ok(classifier)
}

/// Accuracy of a classifier on held-out examples.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub total: usize,
    pub correct: usize,
    /// Examples whose text has no vocabulary term at all
    pub out_of_vocabulary: usize,
}

impl Evaluation {
    pub fn accuracy(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.correct as f64 / self.total as f64
        }
    }
}

pub fn evaluate(classifier: &Classifier, examples: &[LabeledExample]) -> Result<Evaluation, ServiceError> {
    let mut evaluation = Evaluation { total: 0, correct: 0, out_of_vocabulary: 0 };
    for example in examples {
        if example.text.trim().is_empty() {
            continue;
        }
        if classifier.features(&example.text)?.is_empty() {
            evaluation.out_of_vocabulary += 1;
        }
        if classifier.predict_label(&example.text)? == example.emotion {
            evaluation.correct += 1;
        }
        evaluation.total += 1;
    }
    Ok(evaluation)
}
