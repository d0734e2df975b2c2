use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::pipelines::PipelineError;

use super::Config;

/// A sparse feature vector as `(feature index, weight)` pairs, sorted by index
pub type SparseVector = Vec<(usize, f64)>;

/// TF-IDF vectorizer with a fixed vocabulary learned at fit time.
///
/// Deserialization rejects vocabularies that point past the IDF table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "VectorizerParts")]
pub struct Vectorizer {
    /// A map from terms to their feature index
    vocabulary: HashMap<String, usize>,

    /// Inverse document frequency per feature index
    idf: Vec<f64>,

    /// Smallest n-gram size
    ngram_min: usize,

    /// Largest n-gram size
    ngram_max: usize,

    /// Minimum token length in characters
    min_token_len: usize,

    /// Whether term frequencies are log-scaled
    sublinear_tf: bool,
}

#[derive(Deserialize)]
struct VectorizerParts {
    vocabulary: HashMap<String, usize>,
    idf: Vec<f64>,
    ngram_min: usize,
    ngram_max: usize,
    min_token_len: usize,
    sublinear_tf: bool,
}

impl TryFrom<VectorizerParts> for Vectorizer {
    type Error = String;

    fn try_from(parts: VectorizerParts) -> Result<Self, Self::Error> {
        if let Some((term, index)) = parts
            .vocabulary
            .iter()
            .find(|(_, &index)| index >= parts.idf.len())
        {
            return Err(format!(
                "term '{}' has feature index {} but only {} IDF weights exist",
                term,
                index,
                parts.idf.len()
            ));
        }

        Ok(Self {
            vocabulary: parts.vocabulary,
            idf: parts.idf,
            ngram_min: parts.ngram_min,
            ngram_max: parts.ngram_max,
            min_token_len: parts.min_token_len,
            sublinear_tf: parts.sublinear_tf,
        })
    }
}

impl Vectorizer {
    /// Learn the vocabulary and IDF weights from a set of documents
    pub fn fit(texts: &[String], config: &Config) -> Result<Self, PipelineError> {
        let mut vectorizer = Self {
            vocabulary: HashMap::new(),
            idf: Vec::new(),
            ngram_min: config.ngram_min,
            ngram_max: config.ngram_max,
            min_token_len: config.min_token_len,
            sublinear_tf: config.sublinear_tf,
        };

        let mut document_frequency: BTreeMap<String, usize> = BTreeMap::new();

        for text in texts {
            let terms: HashSet<String> = vectorizer.analyze(text).into_iter().collect();

            for term in terms {
                *document_frequency.entry(term).or_default() += 1;
            }
        }

        // BTreeMap iteration keeps feature indexes stable for identical corpora
        let kept = document_frequency
            .into_iter()
            .filter(|(_, df)| *df >= config.min_df)
            .collect::<Vec<_>>();

        if kept.is_empty() {
            return Err(PipelineError::Fit(
                "empty vocabulary; documents contain no usable tokens".to_string(),
            ));
        }

        let n_docs = texts.len() as f64;

        for (index, (term, df)) in kept.into_iter().enumerate() {
            vectorizer.vocabulary.insert(term, index);
            vectorizer
                .idf
                .push(((1.0 + n_docs) / (1.0 + df as f64)).ln() + 1.0);
        }

        Ok(vectorizer)
    }

    /// Number of features produced by `transform`
    pub fn len(&self) -> usize {
        self.idf.len()
    }

    /// Whether the vocabulary is empty
    pub fn is_empty(&self) -> bool {
        self.idf.is_empty()
    }

    /// Convert a document into an L2-normalized TF-IDF vector
    pub fn transform(&self, text: &str) -> SparseVector {
        let mut counts: HashMap<usize, f64> = HashMap::new();

        for term in self.analyze(text) {
            if let Some(&index) = self.vocabulary.get(&term) {
                *counts.entry(index).or_default() += 1.0;
            }
        }

        let mut vector = counts
            .into_iter()
            .map(|(index, tf)| {
                let tf = if self.sublinear_tf { 1.0 + tf.ln() } else { tf };

                (index, tf * self.idf[index])
            })
            .collect::<SparseVector>();

        let norm = vector.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
        if norm > 0.0 {
            for (_, weight) in vector.iter_mut() {
                *weight /= norm;
            }
        }

        vector.sort_unstable_by_key(|(index, _)| *index);

        vector
    }

    /// Split a document into the terms (n-grams of tokens) used as features
    fn analyze(&self, text: &str) -> Vec<String> {
        let tokens = tokenize(text, self.min_token_len);
        let mut terms = Vec::new();

        for n in self.ngram_min..=self.ngram_max {
            if n == 1 {
                terms.extend(tokens.iter().cloned());
            } else {
                terms.extend(tokens.windows(n).map(|window| window.join(" ")));
            }
        }

        terms
    }
}

/// Lowercase a document and split it into word tokens of at least `min_len` characters
pub fn tokenize(text: &str, min_len: usize) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|token| !token.is_empty() && token.chars().count() >= min_len)
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn docs(texts: &[&str]) -> Vec<String> {
        texts.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn test_tokenize_keeps_accents_and_drops_short_tokens() {
        assert_eq!(
            tokenize("La educación, y el AGUA potable!", 2),
            vec!["la", "educación", "el", "agua", "potable"]
        );
    }

    #[test]
    fn test_vocabulary_is_sorted() {
        let vectorizer = Vectorizer::fit(&docs(&["zeta alfa", "beta"]), &Config::default()).unwrap();

        assert_eq!(vectorizer.len(), 3);
        assert_eq!(vectorizer.vocabulary["alfa"], 0);
        assert_eq!(vectorizer.vocabulary["beta"], 1);
        assert_eq!(vectorizer.vocabulary["zeta"], 2);
    }

    #[test]
    fn test_transform_is_normalized() {
        let vectorizer =
            Vectorizer::fit(&docs(&["agua limpia", "agua potable"]), &Config::default()).unwrap();

        let vector = vectorizer.transform("agua agua limpia desconocido");
        let norm: f64 = vector.iter().map(|(_, w)| w * w).sum();

        assert_eq!(vector.len(), 2);
        assert!((norm - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_unknown_terms_produce_empty_vector() {
        let vectorizer = Vectorizer::fit(&docs(&["agua limpia"]), &Config::default()).unwrap();

        assert!(vectorizer.transform("nada conocido").is_empty());
    }

    #[test]
    fn test_bigrams() {
        let config = Config {
            ngram_max: 2,
            ..Config::default()
        };
        let vectorizer = Vectorizer::fit(&docs(&["agua limpia ya"]), &config).unwrap();

        assert!(vectorizer.vocabulary.contains_key("agua limpia"));
        assert!(vectorizer.vocabulary.contains_key("limpia ya"));
        assert_eq!(vectorizer.len(), 5);
    }

    #[test]
    fn test_out_of_range_vocabulary_is_rejected() {
        let vectorizer = Vectorizer::fit(&docs(&["agua limpia"]), &Config::default()).unwrap();

        let mut value = serde_json::to_value(&vectorizer).unwrap();
        value["vocabulary"]["agua"] = serde_json::json!(99);

        let result = serde_json::from_value::<Vectorizer>(value);
        assert!(result.unwrap_err().to_string().contains("feature index 99"));

        let restored =
            serde_json::from_value::<Vectorizer>(serde_json::to_value(&vectorizer).unwrap());
        assert_eq!(restored.unwrap().vocabulary, vectorizer.vocabulary);
    }

    #[test]
    fn test_empty_vocabulary_fails() {
        let result = Vectorizer::fit(&docs(&["a b", "!"]), &Config::default());

        assert!(matches!(result, Err(PipelineError::Fit(_))));
    }
}
