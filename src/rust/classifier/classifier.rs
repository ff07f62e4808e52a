use std::collections::{BTreeMap, HashSet};

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use super::error::ClassifierError;
use super::logistic::MultinomialLogisticRegression;
use super::utils::{argmax, softmax};
use super::vectorizer::{SparseVector, TfidfVectorizer};

/// A fitted TF-IDF + multinomial logistic regression pipeline.
///
/// This is the single persisted artifact of the system. It is immutable once
/// built, so one instance can be shared across threads and requests without
/// locking.
///
/// # Thread Safety
///
/// This type is automatically `Send + Sync`: every field is plain owned data.
///
/// ```rust
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use sentio::Classifier;
/// use std::sync::Arc;
/// use std::thread;
///
/// let classifier = Arc::new(Classifier::builder()
///     .add_example("what a wonderful happy day", "joy")?
///     .add_example("this makes me so angry", "anger")?
///     .build()?);
///
/// let classifier_clone = Arc::clone(&classifier);
/// thread::spawn(move || {
///     classifier_clone.predict("happy").unwrap();
/// }).join().unwrap();
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classifier {
    classes: Vec<String>,
    vectorizer: TfidfVectorizer,
    model: MultinomialLogisticRegression,
}

// Compile-time verification of thread-safety
const _: () = {
    fn assert_send_sync<T: Send + Sync>() {}
    fn verify_thread_safety() {
        assert_send_sync::<Classifier>();
    }
};

impl Classifier {
    /// Creates a new ClassifierBuilder for fluent construction
    pub fn builder() -> super::builder::ClassifierBuilder {
        super::builder::ClassifierBuilder::new()
    }

    pub(crate) fn from_parts(
        classes: Vec<String>,
        vectorizer: TfidfVectorizer,
        model: MultinomialLogisticRegression,
    ) -> Result<Self, ClassifierError> {
        let classifier = Self { classes, vectorizer, model };
        classifier.validate()?;
        Ok(classifier)
    }

    /// Returns information about the classifier's current state
    pub fn info(&self) -> super::ClassifierInfo {
        super::ClassifierInfo {
            num_classes: self.classes.len(),
            class_labels: self.classes.clone(),
            vocabulary_size: self.vectorizer.vocabulary_size(),
        }
    }

    /// Class names in model order.
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn vectorizer(&self) -> &TfidfVectorizer {
        &self.vectorizer
    }

    pub fn model(&self) -> &MultinomialLogisticRegression {
        &self.model
    }

    /// Makes a prediction for the given text, returning the winning class and
    /// the full probability distribution.
    pub fn predict(&self, text: &str) -> Result<(String, BTreeMap<String, f64>), ClassifierError> {
        let scores = self.decision_scores(text)?;
        let label = self.label_for(&scores)?;
        let distribution = self.distribution_for(&scores);
        Ok((label, distribution))
    }

    /// The class with the highest linear score. Ties go to the earlier class.
    pub fn predict_label(&self, text: &str) -> Result<String, ClassifierError> {
        let scores = self.decision_scores(text)?;
        self.label_for(&scores)
    }

    /// Softmax over all class scores, keyed by class name.
    ///
    /// Always contains every class; values are non-negative and sum to 1.
    /// Text with no known terms still yields a valid (intercept-only) distribution.
    pub fn predict_distribution(&self, text: &str) -> Result<BTreeMap<String, f64>, ClassifierError> {
        let scores = self.decision_scores(text)?;
        Ok(self.distribution_for(&scores))
    }

    /// Raw per-class linear scores for `text`.
    pub fn decision_scores(&self, text: &str) -> Result<Array1<f64>, ClassifierError> {
        let features = self.features(text)?;
        self.model.decision_function(&features)
    }

    /// The TF-IDF row `text` maps to.
    pub fn features(&self, text: &str) -> Result<SparseVector, ClassifierError> {
        if text.trim().is_empty() {
            return Err(ClassifierError::ValidationError("Input text cannot be empty".into()));
        }
        Ok(self.vectorizer.transform(text))
    }

    /// Checks that the vectorizer, model and class list agree with each other.
    pub fn validate(&self) -> Result<(), ClassifierError> {
        self.vectorizer.validate()?;
        self.model.validate()?;
        if self.classes.len() != self.model.nb_classes() {
            return Err(ClassifierError::ModelError(format!(
                "Model has {} classes but {} labels were provided",
                self.model.nb_classes(),
                self.classes.len()
            )));
        }
        if self.vectorizer.vocabulary_size() != self.model.nb_features() {
            return Err(ClassifierError::ModelError(format!(
                "Vocabulary has {} terms but the model expects {} features",
                self.vectorizer.vocabulary_size(),
                self.model.nb_features()
            )));
        }
        let unique: HashSet<&String> = self.classes.iter().collect();
        if unique.len() != self.classes.len() {
            return Err(ClassifierError::ModelError("Duplicate class labels".into()));
        }
        Ok(())
    }

    fn label_for(&self, scores: &Array1<f64>) -> Result<String, ClassifierError> {
        argmax(scores)
            .map(|i| self.classes[i].clone())
            .ok_or_else(|| ClassifierError::PredictionError("Classifier has no classes".into()))
    }

    fn distribution_for(&self, scores: &Array1<f64>) -> BTreeMap<String, f64> {
        self.classes
            .iter()
            .cloned()
            .zip(softmax(scores).iter().copied())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn handmade() -> Classifier {
        let vectorizer = TfidfVectorizer::fit(&["glad happy", "mad angry"], 10).unwrap();
        // vocabulary: angry(0) glad(1) happy(2) mad(3)
        let model = MultinomialLogisticRegression::new(
            array![[2.0, -1.0, -1.0, 2.0], [-2.0, 1.0, 1.0, -2.0]],
            array![0.0, 0.1],
        )
        .unwrap();
        Classifier::from_parts(vec!["anger".into(), "joy".into()], vectorizer, model).unwrap()
    }

    #[test]
    fn test_predict_matches_distribution() {
        let classifier = handmade();
        let (label, dist) = classifier.predict("so happy and glad").unwrap();
        assert_eq!(label, "joy");
        assert!(dist["joy"] > dist["anger"]);
        assert_eq!(classifier.predict_label("mad mad").unwrap(), "anger");
    }

    #[test]
    fn test_unknown_terms_fall_back_to_intercepts() {
        let classifier = handmade();
        let dist = classifier.predict_distribution("zzz qqq").unwrap();
        assert_eq!(dist.len(), 2);
        assert!(dist["joy"] > dist["anger"]);
        assert!((dist.values().sum::<f64>() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_input_is_rejected() {
        let classifier = handmade();
        assert!(matches!(
            classifier.predict("   "),
            Err(ClassifierError::ValidationError(_))
        ));
    }

    #[test]
    fn test_mismatched_parts_are_rejected() {
        let vectorizer = TfidfVectorizer::fit(&["glad happy"], 10).unwrap();
        let model = MultinomialLogisticRegression::new(array![[1.0, 1.0, 1.0]], array![0.0]).unwrap();
        assert!(Classifier::from_parts(vec!["joy".into()], vectorizer, model).is_err());
    }

    #[test]
    fn test_class_info() {
        let info = handmade().info();
        assert_eq!(info.num_classes, 2);
        assert_eq!(info.vocabulary_size, 4);
        assert_eq!(info.class_labels, vec!["anger".to_string(), "joy".to_string()]);
    }
}
