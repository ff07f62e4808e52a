use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// The 28 emotion categories, indexed by their numeric label code.
pub const EMOTIONS: [&str; 28] = [
    "admiration",
    "amusement",
    "anger",
    "annoyance",
    "approval",
    "caring",
    "confusion",
    "curiosity",
    "desire",
    "disappointment",
    "disapproval",
    "disgust",
    "embarrassment",
    "excitement",
    "fear",
    "gratitude",
    "grief",
    "joy",
    "love",
    "nervousness",
    "optimism",
    "pride",
    "realization",
    "relief",
    "remorse",
    "sadness",
    "surprise",
    "neutral",
];

/// Maps a numeric label code to its emotion name.
pub fn emotion_for_code(code: usize) -> Option<&'static str> {
    EMOTIONS.get(code).copied()
}

/// Bidirectional label index <-> emotion name mapping.
///
/// Once written next to a processed dataset it is never regenerated for that
/// dataset; inference code reads it back to turn label indices into names.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LabelMapping {
    names: Vec<String>,
}

impl LabelMapping {
    /// Builds a mapping in first-appearance order, ignoring repeats.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut ordered: Vec<String> = Vec::new();
        for name in names {
            let name = name.as_ref();
            if !ordered.iter().any(|n| n == name) {
                ordered.push(name.to_string());
            }
        }
        Self { names: ordered }
    }

    /// The fixed 28-entry code table.
    pub fn builtin() -> Self {
        Self::from_names(EMOTIONS)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    pub fn name_of(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Writes the mapping as a `{"0": "name", ...}` JSON document.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), std::io::Error> {
        let json = serde_json::to_string_pretty(&MappingDocument::from(self))
            .map_err(std::io::Error::from)?;
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, json)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, std::io::Error> {
        let bytes = fs::read(path)?;
        let doc: MappingDocument = serde_json::from_slice(&bytes).map_err(std::io::Error::from)?;
        doc.try_into()
    }
}

#[derive(Serialize, Deserialize)]
#[serde(transparent)]
struct MappingDocument(BTreeMap<String, String>);

impl From<&LabelMapping> for MappingDocument {
    fn from(mapping: &LabelMapping) -> Self {
        Self(
            mapping
                .names
                .iter()
                .enumerate()
                .map(|(i, name)| (i.to_string(), name.clone()))
                .collect(),
        )
    }
}

impl TryFrom<MappingDocument> for LabelMapping {
    type Error = std::io::Error;

    fn try_from(doc: MappingDocument) -> Result<Self, Self::Error> {
        let mut indexed = Vec::with_capacity(doc.0.len());
        for (key, name) in doc.0 {
            let index: usize = key.parse().map_err(|_| {
                std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!("label mapping key '{}' is not an index", key),
                )
            })?;
            indexed.push((index, name));
        }
        indexed.sort_by_key(|(i, _)| *i);
        if indexed.iter().enumerate().any(|(pos, (i, _))| pos != *i) {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "label mapping indices must be contiguous from 0",
            ));
        }
        Ok(Self {
            names: indexed.into_iter().map(|(_, name)| name).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_table() {
        assert_eq!(emotion_for_code(0), Some("admiration"));
        assert_eq!(emotion_for_code(17), Some("joy"));
        assert_eq!(emotion_for_code(27), Some("neutral"));
        assert_eq!(emotion_for_code(28), None);
    }

    #[test]
    fn test_mapping_first_appearance_order() {
        let mapping = LabelMapping::from_names(["joy", "anger", "joy", "fear"]);
        assert_eq!(mapping.len(), 3);
        assert_eq!(mapping.index_of("anger"), Some(1));
        assert_eq!(mapping.name_of(2), Some("fear"));
        assert_eq!(mapping.index_of("grief"), None);
    }

    #[test]
    fn test_mapping_persistence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("label_mapping.json");
        // more than 10 entries so lexical key order differs from numeric order
        let mapping = LabelMapping::builtin();
        mapping.save(&path).unwrap();

        let raw: BTreeMap<String, String> =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["0"], "admiration");
        assert_eq!(raw["27"], "neutral");

        let loaded = LabelMapping::load(&path).unwrap();
        assert_eq!(loaded, mapping);
    }

    #[test]
    fn test_mapping_rejects_gaps() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, r#"{"0": "joy", "2": "fear"}"#).unwrap();
        assert!(LabelMapping::load(&path).is_err());
    }
}
