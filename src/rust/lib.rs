//! Emotion classification for free-text feedback.
//!
//! Raw labeled text is normalized into `(text, emotion)` pairs, a TF-IDF +
//! multinomial logistic regression pipeline is fitted on them, and the
//! fitted pipeline answers label and probability queries, locally or over HTTP.
//!
//! # Basic Usage
//!
//! ```rust
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use sentio::Classifier;
//!
//! let classifier = Classifier::builder()
//!     .with_max_features(5_000)
//!     .add_example("thank you so much, this is wonderful", "gratitude")?
//!     .add_example("I am so happy today", "joy")?
//!     .add_example("this is unacceptable and I am furious", "anger")?
//!     .build()?;
//!
//! let (label, scores) = classifier.predict("so happy with this")?;
//! println!("Predicted emotion: {}", label);
//! assert_eq!(scores.len(), 3);
//! # Ok(())
//! # }
//! ```
//!
//! # Serving
//!
//! ```rust,no_run
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! use std::sync::Arc;
//! use sentio::{create_router, AppState, EmotionService, HttpTranslator, ServiceConfig};
//!
//! let config = ServiceConfig::from_env();
//! let service = Arc::new(EmotionService::bootstrap(&config)?);
//! let translator = Arc::new(HttpTranslator::new(config.translate_url.clone()));
//! let app = create_router(Arc::new(AppState::new(service, translator)));
//!
//! let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

pub mod artifact;
pub mod classifier;
pub mod config;
pub mod dataset;
pub mod dominant_words;
pub mod emotions;
pub mod server;
pub mod service;
pub mod translate;

pub use artifact::{ArtifactError, ArtifactStore};
pub use classifier::{Classifier, ClassifierBuilder, ClassifierError, ClassifierInfo};
pub use config::{BootstrapPolicy, ServiceConfig, TrainingConfig};
pub use dataset::{
    DataError, DatasetPreparer, LabeledExample, PreparationConfig, PreparationReport, SplitRatios,
};
pub use dominant_words::DominantWordTable;
pub use emotions::{LabelMapping, EMOTIONS};
pub use server::{create_router, AppState};
pub use service::{train_from_files, EmotionService, FeedbackAnalysis, ServiceError};
pub use translate::{HttpTranslator, TranslateError, Translator};

pub fn init_logger() {
    env_logger::init();
}
