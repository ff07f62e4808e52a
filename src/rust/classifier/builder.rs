use std::collections::{BTreeMap, BTreeSet};

use log::{info, warn};

use super::classifier::Classifier;
use super::error::ClassifierError;
use super::logistic::MultinomialLogisticRegression;
use super::vectorizer::TfidfVectorizer;
use crate::config::TrainingConfig;
use crate::dataset::LabeledExample;

/// A builder that collects labeled examples and fits a [`Classifier`].
#[derive(Debug, Default)]
pub struct ClassifierBuilder {
    config: TrainingConfig,
    categories: Option<BTreeSet<String>>,
    texts: Vec<String>,
    labels: Vec<String>,
}

impl ClassifierBuilder {
    /// Creates a new empty ClassifierBuilder instance with default configuration
    ///
    /// # Example
    /// ```
    /// use sentio::ClassifierBuilder;
    ///
    /// let builder = ClassifierBuilder::new();
    /// ```
    pub fn new() -> Self {
        Self {
            config: TrainingConfig::default(),
            categories: None,
            texts: Vec::new(),
            labels: Vec::new(),
        }
    }

    /// Replaces all training hyper-parameters at once
    pub fn with_config(mut self, config: TrainingConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the maximum vocabulary size (default 10,000)
    pub fn with_max_features(mut self, max_features: usize) -> Self {
        self.config.max_features = max_features;
        self
    }

    /// Sets the inverse regularization strength `C` (default 1.0)
    pub fn with_regularization(mut self, c: f64) -> Self {
        self.config.c = c;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.config.max_iterations = max_iterations;
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.config.tolerance = tolerance;
        self
    }

    /// Restricts accepted labels to `categories`
    ///
    /// # Returns
    /// * `Err(ClassifierError::ValidationError)` if an already added example
    ///   carries a label outside the set
    ///
    /// # Example
    /// ```
    /// use sentio::{ClassifierBuilder, EMOTIONS};
    ///
    /// let builder = ClassifierBuilder::new()
    ///     .with_categories(EMOTIONS)
    ///     .unwrap()
    ///     .add_example("thank you so much", "gratitude");
    /// assert!(builder.is_ok());
    /// ```
    pub fn with_categories<I, S>(mut self, categories: I) -> Result<Self, ClassifierError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let categories: BTreeSet<String> = categories.into_iter().map(Into::into).collect();
        if let Some(label) = self.labels.iter().find(|l| !categories.contains(*l)) {
            return Err(ClassifierError::ValidationError(format!(
                "Label '{}' is not in the category set",
                label
            )));
        }
        self.categories = Some(categories);
        Ok(self)
    }

    /// Validates one example:
    /// - text must contain something other than whitespace
    /// - emotion must not be empty
    /// - emotion must belong to the category set when one was given
    fn validate_example(&self, text: &str, emotion: &str) -> Result<(), ClassifierError> {
        if text.trim().is_empty() {
            return Err(ClassifierError::ValidationError(format!(
                "Example {} has empty text",
                self.texts.len() + 1
            )));
        }
        if emotion.trim().is_empty() {
            return Err(ClassifierError::ValidationError(format!(
                "Example {} has an empty emotion label",
                self.texts.len() + 1
            )));
        }
        if let Some(categories) = &self.categories {
            if !categories.contains(emotion) {
                return Err(ClassifierError::ValidationError(format!(
                    "Label '{}' is not in the category set",
                    emotion
                )));
            }
        }
        Ok(())
    }

    /// Adds a single `(text, emotion)` training pair
    pub fn add_example(
        mut self,
        text: impl Into<String>,
        emotion: impl Into<String>,
    ) -> Result<Self, ClassifierError> {
        let text = text.into();
        let emotion = emotion.into();
        self.validate_example(&text, &emotion)?;
        self.texts.push(text);
        self.labels.push(emotion);
        Ok(self)
    }

    /// Adds every example, stopping at the first invalid one
    pub fn add_examples<I>(mut self, examples: I) -> Result<Self, ClassifierError>
    where
        I: IntoIterator<Item = LabeledExample>,
    {
        for example in examples {
            self = self.add_example(example.text, example.emotion)?;
        }
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.texts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.texts.is_empty()
    }

    /// Fits the vectorizer and the logistic regression and returns the pipeline
    ///
    /// # Returns
    /// * `Result<Classifier, ClassifierError>` - The fitted classifier, or an error if:
    ///   - The hyper-parameters are invalid
    ///   - Fewer than two distinct emotions were seen
    ///   - The corpus yields an empty vocabulary
    ///   - The solver hit a numerical failure
    ///
    /// # Example
    /// ```
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// use sentio::ClassifierBuilder;
    ///
    /// let classifier = ClassifierBuilder::new()
    ///     .add_example("thank you for the help", "gratitude")?
    ///     .add_example("i am scared of the dark", "fear")?
    ///     .build()?;
    /// assert_eq!(classifier.classes().len(), 2);
    /// # Ok(())
    /// # }
    /// ```
    pub fn build(self) -> Result<Classifier, ClassifierError> {
        const MAX_CLASSES: usize = 100;

        if self.config.max_features == 0 {
            return Err(ClassifierError::ValidationError(
                "max_features must be greater than zero".into(),
            ));
        }
        if !(self.config.c > 0.0 && self.config.c.is_finite()) {
            return Err(ClassifierError::ValidationError(format!(
                "Regularization strength must be positive, got {}",
                self.config.c
            )));
        }
        if self.texts.is_empty() {
            return Err(ClassifierError::BuildError("At least one example must be added".into()));
        }

        let mut per_class: BTreeMap<&str, usize> = BTreeMap::new();
        for label in &self.labels {
            *per_class.entry(label.as_str()).or_insert(0) += 1;
        }
        if per_class.len() < 2 {
            return Err(ClassifierError::BuildError(format!(
                "At least two distinct emotions are required, found {}",
                per_class.len()
            )));
        }
        if per_class.len() > MAX_CLASSES {
            return Err(ClassifierError::ValidationError(format!(
                "Maximum number of classes ({}) exceeded",
                MAX_CLASSES
            )));
        }
        for (label, count) in &per_class {
            info!("Class '{}': {} examples", label, count);
        }

        let class_index: BTreeMap<&str, usize> =
            per_class.keys().enumerate().map(|(i, &label)| (label, i)).collect();
        let targets: Vec<usize> = self.labels.iter().map(|l| class_index[l.as_str()]).collect();
        let classes: Vec<String> = per_class.keys().map(|s| s.to_string()).collect();

        let vectorizer = TfidfVectorizer::fit(&self.texts, self.config.max_features)?;
        let rows = vectorizer.transform_all(&self.texts);
        let empty_rows = rows.iter().filter(|r| r.is_empty()).count();
        if empty_rows > 0 {
            warn!("{} training examples have no vocabulary terms", empty_rows);
        }

        let model = MultinomialLogisticRegression::fit(
            &rows,
            &targets,
            classes.len(),
            vectorizer.vocabulary_size(),
            self.config.c,
            &self.config.solver(),
        )?;

        Classifier::from_parts(classes, vectorizer, model)
    }
}
