use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::classifier::{Classifier, ClassifierError};

const MODEL_FILE: &str = "emotion_classifier.json";
const DIGEST_SUFFIX: &str = "sha256";

#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("No classifier artifact at {0:?}")]
    NotFound(PathBuf),
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Hash mismatch: expected {expected}, got {actual}")]
    HashMismatch { expected: String, actual: String },
    #[error("Invalid classifier artifact: {0}")]
    Invalid(#[from] ClassifierError),
}

/// Owns the on-disk location of the fitted classifier.
///
/// The classifier is stored as one JSON document with a hex SHA-256 digest
/// next to it. There is no file locking: only one process should write at a time.
#[derive(Clone, Debug)]
pub struct ArtifactStore {
    models_dir: PathBuf,
}

impl ArtifactStore {
    /// Creates a new ArtifactStore with the default models directory
    pub fn new_default() -> io::Result<Self> {
        Self::new(Self::get_default_models_dir())
    }

    /// Returns the default models directory path
    pub fn get_default_models_dir() -> PathBuf {
        // 1. Check environment variable
        if let Ok(path) = env::var("SENTIO_HOME") {
            return PathBuf::from(path).join("models");
        }

        // 2. Use platform-specific data directory
        if let Some(data_dir) = dirs::data_dir() {
            return data_dir.join("sentio").join("models");
        }

        // 3. Fallback to user's home directory
        if let Some(home_dir) = dirs::home_dir() {
            return home_dir.join(".local").join("share").join("sentio").join("models");
        }

        // 4. If all else fails, use system temp directory (platform agnostic)
        env::temp_dir().join("sentio").join("models")
    }

    pub fn new<P: AsRef<Path>>(models_dir: P) -> io::Result<Self> {
        let models_dir = models_dir.as_ref().to_path_buf();
        fs::create_dir_all(&models_dir)?;
        Ok(Self { models_dir })
    }

    pub fn models_dir(&self) -> &Path {
        &self.models_dir
    }

    pub fn get_model_path(&self) -> PathBuf {
        self.models_dir.join(MODEL_FILE)
    }

    pub fn get_digest_path(&self) -> PathBuf {
        self.models_dir.join(format!("{}.{}", MODEL_FILE, DIGEST_SUFFIX))
    }

    pub fn is_present(&self) -> bool {
        let model_path = self.get_model_path();
        log::debug!("Checking for classifier at {:?} (exists: {})", model_path, model_path.exists());
        model_path.exists()
    }

    /// Serializes `classifier` and writes it together with its digest.
    pub fn save(&self, classifier: &Classifier) -> Result<PathBuf, ArtifactError> {
        let bytes = serde_json::to_vec(classifier)?;
        let hash = digest(&bytes);
        let model_path = self.get_model_path();

        fs::create_dir_all(&self.models_dir)?;
        let staging = self.models_dir.join(format!("{}.tmp", MODEL_FILE));
        log::info!("Writing {} bytes to {:?}", bytes.len(), model_path);
        fs::write(&staging, &bytes)?;
        fs::rename(&staging, &model_path)?;
        fs::write(self.get_digest_path(), &hash)?;
        log::info!("Classifier saved (sha256 {})", hash);
        Ok(model_path)
    }

    /// Checks the stored digest against the artifact bytes.
    ///
    /// Returns `Ok(false)` when the artifact is missing or the digest differs.
    /// A missing digest file counts as verified.
    pub fn verify(&self) -> Result<bool, ArtifactError> {
        let model_path = self.get_model_path();
        if !model_path.exists() {
            return Ok(false);
        }
        let bytes = fs::read(&model_path)?;
        Ok(self.check_digest(&bytes)?.is_none())
    }

    /// Loads and validates the persisted classifier.
    pub fn load(&self) -> Result<Classifier, ArtifactError> {
        let model_path = self.get_model_path();
        if !model_path.exists() {
            return Err(ArtifactError::NotFound(model_path));
        }
        log::info!("Loading classifier from {:?}", model_path);
        let bytes = fs::read(&model_path)?;
        if let Some((expected, actual)) = self.check_digest(&bytes)? {
            log::error!("Classifier digest mismatch: expected {}, got {}", expected, actual);
            return Err(ArtifactError::HashMismatch { expected, actual });
        }

        let classifier: Classifier = serde_json::from_slice(&bytes)?;
        classifier.validate()?;
        log::info!(
            "Classifier loaded: {} classes, {} vocabulary terms",
            classifier.classes().len(),
            classifier.vectorizer().vocabulary_size()
        );
        Ok(classifier)
    }

    pub fn remove(&self) -> Result<(), ArtifactError> {
        let model_path = self.get_model_path();
        let digest_path = self.get_digest_path();

        if model_path.exists() {
            fs::remove_file(&model_path)?;
        }
        if digest_path.exists() {
            fs::remove_file(&digest_path)?;
        }
        Ok(())
    }

    /// `Some((expected, actual))` on mismatch.
    fn check_digest(&self, bytes: &[u8]) -> Result<Option<(String, String)>, ArtifactError> {
        let digest_path = self.get_digest_path();
        if !digest_path.exists() {
            log::warn!("No digest found at {:?}; skipping verification", digest_path);
            return Ok(None);
        }
        let expected = fs::read_to_string(&digest_path)?.trim().to_string();
        let actual = digest(bytes);
        log::debug!("Calculated hash: {}", actual);
        log::debug!("Expected hash:   {}", expected);
        if expected == actual {
            Ok(None)
        } else {
            Ok(Some((expected, actual)))
        }
    }
}

fn digest(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}
