mod error;
mod classifier;
mod lbfgs;
mod logistic;
mod utils;
pub mod builder;
pub mod vectorizer;

pub use error::ClassifierError;
pub use classifier::Classifier;
pub use builder::ClassifierBuilder;
pub use lbfgs::{LbfgsConfig, LbfgsOutcome};
pub use logistic::MultinomialLogisticRegression;
pub use vectorizer::{tokenize, SparseVector, TfidfVectorizer};

/// Information about the current state and configuration of a classifier
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifierInfo {
    /// Number of emotion classes the classifier was trained on
    pub num_classes: usize,
    /// Labels of the classes, in model order
    pub class_labels: Vec<String>,
    /// Number of terms in the fitted vocabulary
    pub vocabulary_size: usize,
}
