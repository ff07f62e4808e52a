use std::collections::{BTreeMap, HashMap, HashSet};

use lazy_static::lazy_static;
use log::{debug, info};
use ndarray::ArrayView1;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::error::ClassifierError;
use super::utils::normalize_sparse;

lazy_static! {
    // Unicode words of two or more characters; single characters are dropped.
    static ref TOKEN_REGEX: Regex = Regex::new(r"\b\w\w+\b").unwrap();
}

/// Lower-cases `text` and splits it into vocabulary tokens.
pub fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    TOKEN_REGEX
        .find_iter(&lowered)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// A sparse row: strictly increasing column indices with their weights.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SparseVector {
    pub indices: Vec<usize>,
    pub values: Vec<f64>,
}

impl SparseVector {
    pub fn nnz(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Dot product against a dense row.
    pub fn dot(&self, dense: ArrayView1<f64>) -> f64 {
        self.indices
            .iter()
            .zip(&self.values)
            .map(|(&i, &v)| dense[i] * v)
            .sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.indices.iter().copied().zip(self.values.iter().copied())
    }
}

/// Term-frequency × inverse-document-frequency vectorizer with a bounded vocabulary.
///
/// Fitting keeps the `max_features` terms with the highest corpus-wide count
/// (alphabetical order breaks ties) and numbers the kept terms alphabetically.
/// IDF is smoothed: `ln((1 + n) / (1 + df)) + 1`. Transformed rows are L2-normalized.
///
/// The vocabulary is frozen once fitted; unseen terms are ignored at transform time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TfidfVectorizer {
    vocabulary: BTreeMap<String, usize>,
    idf: Vec<f64>,
}

impl TfidfVectorizer {
    /// Learns the vocabulary and IDF weights from `documents`.
    pub fn fit<S: AsRef<str>>(documents: &[S], max_features: usize) -> Result<Self, ClassifierError> {
        if max_features == 0 {
            return Err(ClassifierError::ValidationError(
                "max_features must be greater than zero".into(),
            ));
        }
        if documents.is_empty() {
            return Err(ClassifierError::VectorizerError(
                "Cannot fit a vocabulary on an empty corpus".into(),
            ));
        }

        let mut term_counts: HashMap<String, usize> = HashMap::new();
        let mut doc_freq: HashMap<String, usize> = HashMap::new();
        for doc in documents {
            let tokens = tokenize(doc.as_ref());
            let mut seen: HashSet<&str> = HashSet::new();
            for token in &tokens {
                *term_counts.entry(token.clone()).or_insert(0) += 1;
                if seen.insert(token.as_str()) {
                    *doc_freq.entry(token.clone()).or_insert(0) += 1;
                }
            }
        }

        if term_counts.is_empty() {
            return Err(ClassifierError::VectorizerError(
                "Empty vocabulary: the documents contain no tokens of two or more characters".into(),
            ));
        }

        let mut ranked: Vec<(String, usize)> = term_counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        let dropped = ranked.len().saturating_sub(max_features);
        ranked.truncate(max_features);
        let kept = ranked.len();

        let mut terms: Vec<String> = ranked.into_iter().map(|(term, _)| term).collect();
        terms.sort();

        let n_docs = documents.len() as f64;
        let idf = terms
            .iter()
            .map(|term| {
                let df = doc_freq.get(term).copied().unwrap_or(0) as f64;
                ((1.0 + n_docs) / (1.0 + df)).ln() + 1.0
            })
            .collect();
        let vocabulary = terms.into_iter().enumerate().map(|(i, t)| (t, i)).collect();

        info!(
            "Fitted TF-IDF vocabulary on {} documents ({} terms kept, {} dropped)",
            documents.len(),
            kept,
            dropped
        );
        let vectorizer = Self { vocabulary, idf };
        debug!("Vocabulary size: {}", vectorizer.vocabulary_size());
        Ok(vectorizer)
    }

    pub fn vocabulary_size(&self) -> usize {
        self.idf.len()
    }

    /// Column index of `term`, if it made it into the vocabulary.
    pub fn term_index(&self, term: &str) -> Option<usize> {
        self.vocabulary.get(term).copied()
    }

    pub fn idf(&self, term: &str) -> Option<f64> {
        self.term_index(term).map(|i| self.idf[i])
    }

    /// Turns `text` into an L2-normalized TF-IDF row over the fitted vocabulary.
    pub fn transform(&self, text: &str) -> SparseVector {
        let mut counts: BTreeMap<usize, f64> = BTreeMap::new();
        for token in tokenize(text) {
            if let Some(&idx) = self.vocabulary.get(&token) {
                *counts.entry(idx).or_insert(0.0) += 1.0;
            }
        }

        let indices: Vec<usize> = counts.keys().copied().collect();
        let mut values: Vec<f64> = counts
            .into_iter()
            .map(|(idx, tf)| tf * self.idf[idx])
            .collect();
        normalize_sparse(&mut values);
        SparseVector { indices, values }
    }

    pub fn transform_all<S: AsRef<str>>(&self, documents: &[S]) -> Vec<SparseVector> {
        documents.iter().map(|d| self.transform(d.as_ref())).collect()
    }

    /// Checks internal consistency after deserialization.
    pub(crate) fn validate(&self) -> Result<(), ClassifierError> {
        if self.vocabulary.len() != self.idf.len() {
            return Err(ClassifierError::VectorizerError(format!(
                "Vocabulary has {} terms but {} IDF weights",
                self.vocabulary.len(),
                self.idf.len()
            )));
        }
        if self.vocabulary.values().any(|&i| i >= self.idf.len()) {
            return Err(ClassifierError::VectorizerError(
                "Vocabulary index out of range".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_drops_single_chars_and_lowercases() {
        assert_eq!(tokenize("I am SO happy, today!"), vec!["am", "so", "happy", "today"]);
        assert!(tokenize("a b c").is_empty());
    }

    #[test]
    fn test_fit_builds_sorted_vocabulary() {
        let docs = ["the cat sat", "the dog sat", "the cat ran"];
        let v = TfidfVectorizer::fit(&docs, 100).unwrap();
        assert_eq!(v.vocabulary_size(), 5);
        assert_eq!(v.term_index("cat"), Some(0));
        assert_eq!(v.term_index("the"), Some(4));
        // "the" appears everywhere, so it carries the minimum weight
        let idf_the = v.idf("the").unwrap();
        assert!((idf_the - 1.0).abs() < 1e-12);
        assert!(v.idf("dog").unwrap() > v.idf("cat").unwrap());
    }

    #[test]
    fn test_max_features_keeps_most_frequent() {
        let docs = ["apple apple apple", "banana banana", "cherry"];
        let v = TfidfVectorizer::fit(&docs, 2).unwrap();
        assert_eq!(v.vocabulary_size(), 2);
        assert!(v.term_index("apple").is_some());
        assert!(v.term_index("banana").is_some());
        assert!(v.term_index("cherry").is_none());
    }

    #[test]
    fn test_max_features_ties_are_alphabetical() {
        let docs = ["zeta alpha mid"];
        let v = TfidfVectorizer::fit(&docs, 2).unwrap();
        assert!(v.term_index("alpha").is_some());
        assert!(v.term_index("mid").is_some());
        assert!(v.term_index("zeta").is_none());
    }

    #[test]
    fn test_transform_is_unit_norm_and_ignores_unknown_terms() {
        let docs = ["happy joy", "sad grief", "happy sad"];
        let v = TfidfVectorizer::fit(&docs, 100).unwrap();
        let row = v.transform("happy happy unknownword");
        assert_eq!(row.nnz(), 1);
        assert!((row.values[0] - 1.0).abs() < 1e-12);

        let row = v.transform("joy grief");
        let norm: f64 = row.values.iter().map(|x| x * x).sum::<f64>().sqrt();
        assert!((norm - 1.0).abs() < 1e-12);
        assert!(row.indices.windows(2).all(|w| w[0] < w[1]));

        assert!(v.transform("nothing known here").is_empty());
    }

    #[test]
    fn test_fit_rejects_degenerate_input() {
        let empty: [&str; 0] = [];
        assert!(TfidfVectorizer::fit(&empty, 10).is_err());
        assert!(TfidfVectorizer::fit(&["a b c"], 10).is_err());
        assert!(TfidfVectorizer::fit(&["fine words"], 0).is_err());
    }
}
