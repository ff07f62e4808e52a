use std::env;
use std::path::PathBuf;

use crate::artifact::ArtifactStore;
use crate::classifier::LbfgsConfig;

/// Hyper-parameters for fitting the TF-IDF + logistic regression pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingConfig {
    /// Upper bound on the vocabulary size
    pub max_features: usize,
    /// Inverse L2 regularization strength
    pub c: f64,
    pub max_iterations: usize,
    /// Gradient tolerance for the solver
    pub tolerance: f64,
    /// L-BFGS correction pairs
    pub history: usize,
    /// Seed for the row order seen by the solver. `None` draws from OS entropy.
    pub shuffle_seed: Option<u64>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            max_features: 10_000,
            c: 1.0,
            max_iterations: 100,
            tolerance: 1e-4,
            history: 10,
            shuffle_seed: None,
        }
    }
}

impl TrainingConfig {
    pub fn solver(&self) -> LbfgsConfig {
        LbfgsConfig {
            history: self.history,
            max_iterations: self.max_iterations,
            gradient_tolerance: self.tolerance,
            ..LbfgsConfig::default()
        }
    }
}

/// What the service does when no persisted classifier exists at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BootstrapPolicy {
    /// Refuse to start; the artifact must be provisioned with `train` first
    #[default]
    LoadOnly,
    /// Train synchronously from the configured training file, persist, then serve
    LoadOrTrain,
}

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub host: String,
    pub port: u16,
    /// Directory holding the persisted classifier
    pub model_dir: PathBuf,
    /// CSV with `emotion` and `word` columns
    pub words_path: PathBuf,
    /// Raw training file used by `BootstrapPolicy::LoadOrTrain`
    pub training_data: PathBuf,
    pub bootstrap: BootstrapPolicy,
    pub training: TrainingConfig,
    /// Base URL of the translation provider
    pub translate_url: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
            model_dir: ArtifactStore::get_default_models_dir(),
            words_path: PathBuf::from("plots/emotion_words.csv"),
            training_data: PathBuf::from("data/train.tsv"),
            bootstrap: BootstrapPolicy::default(),
            training: TrainingConfig::default(),
            translate_url: crate::translate::DEFAULT_TRANSLATE_URL.to_string(),
        }
    }
}

impl ServiceConfig {
    /// Defaults overridden by `SENTIO_HOST`, `SENTIO_PORT`, `SENTIO_WORDS`,
    /// `SENTIO_TRAIN_DATA` and `SENTIO_TRANSLATE_URL` when set.
    /// The model directory follows `SENTIO_HOME` (see [`ArtifactStore`]).
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(host) = env::var("SENTIO_HOST") {
            config.host = host;
        }
        if let Ok(port) = env::var("SENTIO_PORT") {
            match port.parse() {
                Ok(port) => config.port = port,
                Err(_) => log::warn!("Ignoring invalid SENTIO_PORT value '{}'", port),
            }
        }
        if let Ok(path) = env::var("SENTIO_WORDS") {
            config.words_path = PathBuf::from(path);
        }
        if let Ok(path) = env::var("SENTIO_TRAIN_DATA") {
            config.training_data = PathBuf::from(path);
        }
        if let Ok(url) = env::var("SENTIO_TRANSLATE_URL") {
            config.translate_url = url;
        }
        config
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_training_defaults() {
        let config = TrainingConfig::default();
        assert_eq!(config.max_features, 10_000);
        assert_eq!(config.c, 1.0);
        let solver = config.solver();
        assert_eq!(solver.max_iterations, 100);
        assert_eq!(solver.gradient_tolerance, 1e-4);
    }

    #[test]
    fn test_service_defaults() {
        let config = ServiceConfig::default();
        assert_eq!(config.bootstrap, BootstrapPolicy::LoadOnly);
        assert_eq!(config.bind_addr(), "127.0.0.1:5000");
        assert_eq!(config.training_data, PathBuf::from("data/train.tsv"));
    }
}
