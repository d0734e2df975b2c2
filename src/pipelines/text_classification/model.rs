use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::pipelines::PipelineError;

use super::SparseVector;

/// Multinomial naive Bayes over TF-IDF features
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NaiveBayes {
    /// Sorted class labels
    classes: Vec<String>,

    /// Log prior probability per class
    class_log_prior: Vec<f64>,

    /// Log probability of each feature given a class, shaped `[class][feature]`
    feature_log_prob: Vec<Vec<f64>>,
}

impl NaiveBayes {
    /// Estimate class priors and smoothed feature likelihoods
    pub fn fit(
        features: &[SparseVector],
        labels: &[String],
        n_features: usize,
        alpha: f64,
    ) -> Result<Self, PipelineError> {
        if features.len() != labels.len() {
            return Err(PipelineError::Fit(format!(
                "found {} feature rows but {} labels",
                features.len(),
                labels.len()
            )));
        }

        if features.is_empty() {
            return Err(PipelineError::Fit("no training samples".to_string()));
        }

        let mut class_index: BTreeMap<&str, usize> = BTreeMap::new();
        for label in labels {
            class_index.entry(label.as_str()).or_default();
        }
        for (index, value) in class_index.values_mut().enumerate() {
            *value = index;
        }

        let n_classes = class_index.len();
        let mut class_count = vec![0.0; n_classes];
        let mut feature_count = vec![vec![0.0; n_features]; n_classes];

        for (vector, label) in features.iter().zip(labels) {
            let class = class_index[label.as_str()];
            class_count[class] += 1.0;

            for &(feature, weight) in vector {
                feature_count[class][feature] += weight;
            }
        }

        let total = features.len() as f64;
        let class_log_prior = class_count.iter().map(|c| (c / total).ln()).collect();

        let feature_log_prob = feature_count
            .into_iter()
            .map(|counts| {
                let denominator = (counts.iter().sum::<f64>() + alpha * n_features as f64).ln();

                counts
                    .into_iter()
                    .map(|count| (count + alpha).ln() - denominator)
                    .collect()
            })
            .collect();

        Ok(Self {
            classes: class_index.keys().map(|c| c.to_string()).collect(),
            class_log_prior,
            feature_log_prob,
        })
    }

    /// The class labels, in the column order of `predict_proba`
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    /// Number of features each class was estimated over
    pub fn n_features(&self) -> usize {
        self.feature_log_prob.first().map(Vec::len).unwrap_or(0)
    }

    /// Check that the estimated tables agree with each other
    pub fn check(&self, n_features: usize) -> Result<(), PipelineError> {
        let n_classes = self.classes.len();

        if n_classes == 0
            || self.class_log_prior.len() != n_classes
            || self.feature_log_prob.len() != n_classes
        {
            return Err(PipelineError::Corrupt(format!(
                "class tables disagree: {} classes, {} priors, {} likelihood rows",
                n_classes,
                self.class_log_prior.len(),
                self.feature_log_prob.len()
            )));
        }

        if self.feature_log_prob.iter().any(|row| row.len() != n_features) {
            return Err(PipelineError::Corrupt(format!(
                "likelihood rows do not match the {} vectorizer features",
                n_features
            )));
        }

        Ok(())
    }

    /// Posterior class probabilities for a single feature vector
    pub fn predict_proba(&self, vector: &SparseVector) -> Vec<f64> {
        let joint = self
            .class_log_prior
            .iter()
            .zip(&self.feature_log_prob)
            .map(|(prior, log_prob)| {
                prior
                    + vector
                        .iter()
                        .map(|&(feature, weight)| weight * log_prob[feature])
                        .sum::<f64>()
            })
            .collect::<Vec<_>>();

        // log-sum-exp keeps the normalization stable for long documents
        let max = joint.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let exp = joint.iter().map(|j| (j - max).exp()).collect::<Vec<_>>();
        let sum = exp.iter().sum::<f64>();

        exp.into_iter().map(|e| e / sum).collect()
    }
}

/// Index of the largest value, preferring the first on ties
pub fn argmax(values: &[f64]) -> Option<usize> {
    values
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, f64)>, (index, &value)| match best {
            Some((_, top)) if top >= value => best,
            _ => Some((index, value)),
        })
        .map(|(index, _)| index)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn labels(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_classes_are_sorted() {
        let features = vec![vec![(0, 1.0)], vec![(1, 1.0)], vec![(0, 1.0)]];
        let model = NaiveBayes::fit(&features, &labels(&["b", "a", "b"]), 2, 1.0).unwrap();

        assert_eq!(model.classes(), &labels(&["a", "b"])[..]);
        assert_eq!(model.n_features(), 2);
        assert!(model.check(2).is_ok());
        assert!(model.check(3).is_err());
    }

    #[test]
    fn test_predict_proba_sums_to_one() {
        let features = vec![vec![(0, 1.0)], vec![(1, 1.0)]];
        let model = NaiveBayes::fit(&features, &labels(&["a", "b"]), 2, 1.0).unwrap();

        let proba = model.predict_proba(&vec![(0, 1.0)]);

        assert!((proba.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        assert!(proba[0] > proba[1]);
    }

    #[test]
    fn test_empty_vector_falls_back_to_priors() {
        let features = vec![vec![(0, 1.0)], vec![(0, 1.0)], vec![(1, 1.0)]];
        let model = NaiveBayes::fit(&features, &labels(&["a", "a", "b"]), 2, 1.0).unwrap();

        let proba = model.predict_proba(&vec![]);

        assert!((proba[0] - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_mismatched_lengths_fail() {
        let result = NaiveBayes::fit(&[vec![(0, 1.0)]], &labels(&["a", "b"]), 1, 1.0);

        assert!(matches!(result, Err(PipelineError::Fit(_))));
    }

    #[test]
    fn test_argmax_prefers_first() {
        assert_eq!(argmax(&[0.2, 0.4, 0.4]), Some(1));
        assert_eq!(argmax(&[]), None);
    }
}
