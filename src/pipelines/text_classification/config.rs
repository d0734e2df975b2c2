use derive_new::new;
use serde::{Deserialize, Serialize};

/// Hyperparameters for the text classification pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, new)]
#[serde(default)]
pub struct Config {
    /// Additive (Laplace/Lidstone) smoothing for the per-class term estimates
    pub alpha: f64,

    /// Smallest n-gram size extracted from each document
    pub ngram_min: usize,

    /// Largest n-gram size extracted from each document
    pub ngram_max: usize,

    /// Minimum number of characters for a token to be kept
    pub min_token_len: usize,

    /// Minimum number of documents a term must appear in to enter the vocabulary
    pub min_df: usize,

    /// Replace raw term frequency with `1 + ln(tf)`
    pub sublinear_tf: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            alpha: 1.0,
            ngram_min: 1,
            ngram_max: 1,
            min_token_len: 2,
            min_df: 1,
            sublinear_tf: false,
        }
    }
}

impl Config {
    /// Check the hyperparameters before any training work is done
    pub fn validate(&self) -> Result<(), String> {
        if self.alpha.is_nan() || self.alpha <= 0.0 {
            return Err(format!("alpha must be positive, got {}", self.alpha));
        }

        if self.ngram_min == 0 || self.ngram_min > self.ngram_max {
            return Err(format!(
                "invalid n-gram range ({}, {})",
                self.ngram_min, self.ngram_max
            ));
        }

        if self.min_df == 0 {
            return Err("min_df must be at least 1".to_string());
        }

        Ok(())
    }
}
