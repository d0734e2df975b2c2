use std::collections::BTreeSet;

use derive_new::new;
use serde::{ser::SerializeMap, Deserialize, Serialize, Serializer};

/// Precision, recall and F1 for one class or one averaged row
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, new)]
pub struct ClassMetrics {
    /// Fraction of predictions for the class that were correct
    pub precision: f64,

    /// Fraction of true instances of the class that were found
    pub recall: f64,

    /// Harmonic mean of precision and recall
    #[serde(rename = "f1-score")]
    pub f1_score: f64,

    /// Number of true instances
    pub support: usize,
}

/// Summary keys that share the serialized map with class labels
pub static SUMMARY_KEYS: [&str; 3] = ["accuracy", "macro avg", "weighted avg"];

/// Per-class metrics plus accuracy and macro/weighted averages.
///
/// Serializes to the flat map shape `{label: {...}, "accuracy": f, "macro avg": {...},
/// "weighted avg": {...}}`. Labels equal to one of `SUMMARY_KEYS` would collide, so uploads
/// carrying them are rejected before training.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationReport {
    classes: Vec<(String, ClassMetrics)>,
    accuracy: f64,
    macro_avg: ClassMetrics,
    weighted_avg: ClassMetrics,
}

impl ClassificationReport {
    /// Compare predicted labels against the true labels.
    ///
    /// Classes are the sorted union of both label sets. A class that is never predicted gets a
    /// precision of zero rather than an undefined value.
    pub fn new(y_true: &[String], y_pred: &[String]) -> Self {
        let labels = y_true
            .iter()
            .chain(y_pred)
            .map(String::as_str)
            .collect::<BTreeSet<_>>();

        let total = y_true.len();

        let classes = labels
            .into_iter()
            .map(|label| {
                let pairs = || y_true.iter().zip(y_pred);

                let true_positive = pairs().filter(|(t, p)| *t == label && *p == label).count();
                let predicted = y_pred.iter().filter(|p| *p == label).count();
                let support = y_true.iter().filter(|t| *t == label).count();

                let precision = ratio(true_positive, predicted);
                let recall = ratio(true_positive, support);

                (
                    label.to_string(),
                    ClassMetrics::new(precision, recall, f1(precision, recall), support),
                )
            })
            .collect::<Vec<_>>();

        let correct = y_true.iter().zip(y_pred).filter(|(t, p)| t == p).count();

        let macro_avg = average(&classes, total, |_| 1.0);
        let weighted_avg = average(&classes, total, |m| m.support as f64);

        Self {
            classes,
            accuracy: ratio(correct, total),
            macro_avg,
            weighted_avg,
        }
    }

    /// Per-class rows, sorted by label
    pub fn classes(&self) -> &[(String, ClassMetrics)] {
        &self.classes
    }

    /// Metrics for a single class
    pub fn get(&self, label: &str) -> Option<&ClassMetrics> {
        self.classes
            .iter()
            .find(|(name, _)| name == label)
            .map(|(_, metrics)| metrics)
    }

    /// Fraction of exact matches
    pub fn accuracy(&self) -> f64 {
        self.accuracy
    }

    /// Unweighted mean over classes
    pub fn macro_avg(&self) -> &ClassMetrics {
        &self.macro_avg
    }

    /// Support-weighted mean over classes
    pub fn weighted_avg(&self) -> &ClassMetrics {
        &self.weighted_avg
    }
}

impl Serialize for ClassificationReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.classes.len() + 3))?;

        for (label, metrics) in &self.classes {
            map.serialize_entry(label, metrics)?;
        }

        let [accuracy, macro_avg, weighted_avg] = SUMMARY_KEYS;
        map.serialize_entry(accuracy, &self.accuracy)?;
        map.serialize_entry(macro_avg, &self.macro_avg)?;
        map.serialize_entry(weighted_avg, &self.weighted_avg)?;

        map.end()
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

fn f1(precision: f64, recall: f64) -> f64 {
    if precision + recall == 0.0 {
        0.0
    } else {
        2.0 * precision * recall / (precision + recall)
    }
}

fn average(
    classes: &[(String, ClassMetrics)],
    total: usize,
    weight: impl Fn(&ClassMetrics) -> f64,
) -> ClassMetrics {
    let weights = classes.iter().map(|(_, m)| weight(m)).collect::<Vec<_>>();
    let weight_sum = weights.iter().sum::<f64>();

    let mean = |field: fn(&ClassMetrics) -> f64| {
        if weight_sum == 0.0 {
            return 0.0;
        }

        classes
            .iter()
            .zip(&weights)
            .map(|((_, m), w)| field(m) * w)
            .sum::<f64>()
            / weight_sum
    };

    ClassMetrics::new(
        mean(|m| m.precision),
        mean(|m| m.recall),
        mean(|m| m.f1_score),
        total,
    )
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn labels(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_per_class_metrics() {
        let report = ClassificationReport::new(
            &labels(&["4", "4", "6", "6"]),
            &labels(&["4", "6", "6", "6"]),
        );

        let four = report.get("4").unwrap();
        assert_eq!(four.precision, 1.0);
        assert_eq!(four.recall, 0.5);
        assert_eq!(four.support, 2);

        let six = report.get("6").unwrap();
        assert!((six.precision - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(six.recall, 1.0);
        assert!((six.f1_score - 0.8).abs() < 1e-12);

        assert_eq!(report.accuracy(), 0.75);
        assert_eq!(report.macro_avg().support, 4);
    }

    #[test]
    fn test_unseen_predicted_class_has_zero_support() {
        let report = ClassificationReport::new(&labels(&["4"]), &labels(&["7"]));

        assert_eq!(report.classes().len(), 2);
        assert_eq!(report.get("7").unwrap().support, 0);
        assert_eq!(report.get("7").unwrap().precision, 0.0);
        assert_eq!(report.get("4").unwrap().recall, 0.0);
        assert_eq!(report.weighted_avg().f1_score, 0.0);
    }

    #[test]
    fn test_serialized_shape() {
        let report = ClassificationReport::new(&labels(&["4", "6"]), &labels(&["4", "6"]));

        let value = serde_json::to_value(&report).unwrap();

        assert_eq!(
            value,
            json!({
                "4": {"precision": 1.0, "recall": 1.0, "f1-score": 1.0, "support": 1},
                "6": {"precision": 1.0, "recall": 1.0, "f1-score": 1.0, "support": 1},
                "accuracy": 1.0,
                "macro avg": {"precision": 1.0, "recall": 1.0, "f1-score": 1.0, "support": 2},
                "weighted avg": {"precision": 1.0, "recall": 1.0, "f1-score": 1.0, "support": 2},
            })
        );
    }
}
