use chrono::{DateTime, Utc};
use derive_new::new;
use serde::{Deserialize, Serialize};

use crate::datasets::Corpus;

/// A pipeline paired with the corpus that produced it. This is the unit that gets published
/// to predictions and persisted to storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, new)]
pub struct ModelVersion<P> {
    /// The trained pipeline
    pub pipeline: P,

    /// Every example the pipeline was trained on
    pub corpus: Corpus,

    /// When the pipeline finished training
    pub trained_at: DateTime<Utc>,
}
