//! Lexical overlap between feedback text and a static emotion → word list.
//!
//! This is a heuristic: a word matching an emotion's list says nothing about
//! what the classifier actually relied on.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::Path;

use log::info;

use crate::dataset::{read_table, DataError};

/// Emotion name → associated words, loaded once and read-only afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DominantWordTable {
    words: BTreeMap<String, BTreeSet<String>>,
}

impl DominantWordTable {
    /// Loads a CSV (or TSV) with `emotion` and `word` columns.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, DataError> {
        let table = read_table(&path)?;
        let emotion_idx = table
            .column("emotion")
            .ok_or_else(|| DataError::MissingColumn("emotion".into()))?;
        let word_idx = table
            .column("word")
            .ok_or_else(|| DataError::MissingColumn("word".into()))?;

        let pairs = table.rows.iter().filter_map(|row| {
            let emotion = row.get(emotion_idx)?.trim();
            let word = row.get(word_idx)?.trim();
            (!emotion.is_empty() && !word.is_empty()).then(|| (emotion.to_string(), word.to_string()))
        });
        let loaded: Self = pairs.collect();
        info!(
            "Loaded dominant word table from {:?}: {} emotions, {} words",
            path.as_ref(),
            loaded.words.len(),
            loaded.words.values().map(BTreeSet::len).sum::<usize>()
        );
        Ok(loaded)
    }

    pub fn emotions(&self) -> impl Iterator<Item = &str> {
        self.words.keys().map(String::as_str)
    }

    pub fn words_for(&self, emotion: &str) -> Option<&BTreeSet<String>> {
        self.words.get(emotion)
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Words of `text` found in the table.
    ///
    /// Tokens are the lower-cased, whitespace-separated pieces of `text`, so
    /// punctuation stays attached. With `emotion` set the result has exactly
    /// one entry (possibly empty, also for unknown emotions); otherwise only
    /// emotions with at least one match appear. Matches are deduplicated and sorted.
    pub fn dominant_words(&self, text: &str, emotion: Option<&str>) -> BTreeMap<String, Vec<String>> {
        let lowered = text.to_lowercase();
        let tokens: HashSet<&str> = lowered.split_whitespace().collect();
        let matches = |list: &BTreeSet<String>| -> Vec<String> {
            list.iter().filter(|w| tokens.contains(w.as_str())).cloned().collect()
        };

        match emotion {
            Some(emotion) => {
                let matched = self.words.get(emotion).map(&matches).unwrap_or_default();
                BTreeMap::from([(emotion.to_string(), matched)])
            }
            None => self
                .words
                .iter()
                .filter_map(|(emotion, list)| {
                    let matched = matches(list);
                    (!matched.is_empty()).then(|| (emotion.clone(), matched))
                })
                .collect(),
        }
    }
}

impl<E: Into<String>, W: Into<String>> FromIterator<(E, W)> for DominantWordTable {
    fn from_iter<I: IntoIterator<Item = (E, W)>>(iter: I) -> Self {
        let mut words: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for (emotion, word) in iter {
            words.entry(emotion.into()).or_default().insert(word.into().to_lowercase());
        }
        Self { words }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> DominantWordTable {
        DominantWordTable::from_iter([
            ("joy", "happy"),
            ("joy", "glad"),
            ("joy", "today"),
            ("sadness", "sad"),
            ("sadness", "today"),
            ("anger", "furious"),
        ])
    }

    #[test]
    fn test_all_emotions_only_non_empty() {
        let words = table().dominant_words("I am so HAPPY today and glad glad", None);
        assert_eq!(words.len(), 2);
        assert_eq!(words["joy"], vec!["glad", "happy", "today"]);
        assert_eq!(words["sadness"], vec!["today"]);
        assert!(!words.contains_key("anger"));
    }

    #[test]
    fn test_single_emotion() {
        let words = table().dominant_words("happy and sad", Some("sadness"));
        assert_eq!(words.len(), 1);
        assert_eq!(words["sadness"], vec!["sad"]);

        let words = table().dominant_words("happy", Some("anger"));
        assert_eq!(words["anger"], Vec::<String>::new());

        let words = table().dominant_words("happy", Some("boredom"));
        assert_eq!(words.len(), 1);
        assert!(words["boredom"].is_empty());
    }

    #[test]
    fn test_punctuation_stays_attached() {
        let words = table().dominant_words("happy!", None);
        assert!(words.is_empty());
    }

    #[test]
    fn test_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("emotion_words.csv");
        std::fs::write(&path, "word,emotion\nHappy,joy\nsad,sadness\n,joy\n").unwrap();
        let table = DominantWordTable::from_path(&path).unwrap();
        assert_eq!(table.emotions().collect::<Vec<_>>(), vec!["joy", "sadness"]);
        assert!(table.words_for("joy").unwrap().contains("happy"));

        let bad = dir.path().join("bad.csv");
        std::fs::write(&bad, "term,emotion\nx,joy\n").unwrap();
        assert!(matches!(DominantWordTable::from_path(&bad), Err(DataError::MissingColumn(_))));
    }
}
