use std::{
    fmt::Display,
    sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, TryLockError},
    time::Instant,
};

use chrono::Utc;
use derive_new::new;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::{
    datasets::{Corpus, IngestValidator, UploadedDataset, ValidationError},
    pipelines::Pipeline,
    store::{ModelStore, StoreError},
};

/// Manager errors
pub mod error;

/// Classification reports
pub mod report;

/// Published model versions
pub mod version;

pub use error::{PredictionError, RetrainError, TrainingError};
pub use report::{ClassMetrics, ClassificationReport};
pub use version::ModelVersion;

/// A predicted label with the highest class probability for one instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, new)]
pub struct PredictionResult {
    /// The predicted class label
    pub label: String,

    /// Maximum posterior probability across classes, in `[0, 1]`
    pub confidence: f64,
}

/// Outcome of a successful retrain
#[derive(Debug, Clone, PartialEq, Serialize, new)]
pub struct RetrainReport {
    /// Metrics for the new pipeline on the freshly submitted rows
    pub report: ClassificationReport,

    /// Rows added by this retrain
    pub added: usize,

    /// Corpus size after the retrain
    pub total: usize,
}

/// What a retrain does when another one is already running
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetrainPolicy {
    /// Wait for the running retrain to finish, then proceed
    #[default]
    Queue,

    /// Fail immediately with `RetrainError::InProgress`
    Reject,
}

impl Display for RetrainPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RetrainPolicy::Queue => "queue",
            RetrainPolicy::Reject => "reject",
        };

        write!(f, "{}", name)
    }
}

/// Owns the published model version, serves predictions from it and publishes retrained
/// successors.
///
/// Predictions clone an `Arc` to the published version under a read lock and release the lock
/// before doing any work. Retrains are serialized by `retrain_gate`; fitting and evaluation run
/// while holding only that gate, and the write lock is taken just to swap the pointer.
pub struct ModelManager<P: Pipeline> {
    published: RwLock<Arc<ModelVersion<P>>>,
    retrain_gate: Mutex<()>,
    store: Box<dyn ModelStore<P>>,
    validator: IngestValidator,
    policy: RetrainPolicy,
}

impl<P: Pipeline> ModelManager<P> {
    /// Create a manager publishing `initial`
    pub fn new(
        initial: ModelVersion<P>,
        store: Box<dyn ModelStore<P>>,
        validator: IngestValidator,
        policy: RetrainPolicy,
    ) -> Self {
        Self {
            published: RwLock::new(Arc::new(initial)),
            retrain_gate: Mutex::new(()),
            store,
            validator,
            policy,
        }
    }

    /// Create a manager publishing whatever the store holds
    pub fn load(
        store: Box<dyn ModelStore<P>>,
        validator: IngestValidator,
        policy: RetrainPolicy,
    ) -> Result<Self, StoreError> {
        let initial = store.load()?;

        Ok(Self::new(initial, store, validator, policy))
    }

    /// A snapshot of the published version
    pub fn current(&self) -> Arc<ModelVersion<P>> {
        self.published
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The validator applied to uploads
    pub fn validator(&self) -> &IngestValidator {
        &self.validator
    }

    /// Predict a label and confidence for each instance, in input order
    pub fn predict(&self, instances: &[String]) -> Result<Vec<PredictionResult>, PredictionError> {
        if instances.is_empty() {
            return Err(PredictionError::Input("no instances given".to_string()));
        }

        let snapshot = self.current();
        let pipeline = &snapshot.pipeline;

        let labels = pipeline.predict(instances)?;
        let probabilities = pipeline.predict_proba(instances)?;

        if labels.len() != instances.len() || probabilities.len() != instances.len() {
            return Err(PredictionError::Model(format!(
                "expected {} results, got {} labels and {} probability rows",
                instances.len(),
                labels.len(),
                probabilities.len()
            )));
        }

        let results = labels
            .into_iter()
            .zip(probabilities)
            .map(|(label, row)| {
                let confidence = row.into_iter().fold(f64::NAN, f64::max);

                if !(0.0..=1.0).contains(&confidence) {
                    return Err(PredictionError::Model(format!(
                        "probability {} for '{}' is out of range",
                        confidence, label
                    )));
                }

                Ok(PredictionResult::new(label, confidence))
            })
            .collect::<Result<Vec<_>, _>>()?;

        debug!("Predicted {} instances", results.len());

        Ok(results)
    }

    /// Validate an upload, then retrain on the existing corpus plus its rows
    pub fn retrain(&self, dataset: &UploadedDataset) -> Result<RetrainReport, RetrainError> {
        let additions = self.validator.validate(dataset).map_err(|err| {
            warn!("Rejected upload {}: {}", dataset.file_name(), err);
            err
        })?;

        self.retrain_corpus(additions)
    }

    /// Retrain on the existing corpus plus `additions`, then persist and publish the result.
    ///
    /// Every failure leaves the published version and the stored file as they were.
    pub fn retrain_corpus(&self, additions: Corpus) -> Result<RetrainReport, RetrainError> {
        if additions.is_empty() {
            return Err(ValidationError::EmptyFile.into());
        }

        let _gate = self.acquire_gate()?;
        let started = Instant::now();

        let current = self.current();
        let merged = current.corpus.merged(&additions);

        info!(
            "Retraining on {} rows ({} new)",
            merged.len(),
            additions.len()
        );

        let pipeline = current
            .pipeline
            .fit(&merged.texts(), &merged.labels())
            .map_err(TrainingError::Fit)?;

        let predicted = pipeline
            .predict(&additions.texts())
            .map_err(TrainingError::Evaluate)?;
        let report = ClassificationReport::new(&additions.labels(), &predicted);

        let version = ModelVersion::new(pipeline, merged, Utc::now());

        // Persist before publishing so served predictions never run ahead of storage
        self.store.save(&version)?;

        let total = version.corpus.len();
        *self
            .published
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Arc::new(version);

        info!(
            "Published retrained model: {} rows, accuracy {:.3} on new rows, took {:.2?}",
            total,
            report.accuracy(),
            started.elapsed()
        );

        Ok(RetrainReport::new(report, additions.len(), total))
    }

    fn acquire_gate(&self) -> Result<MutexGuard<'_, ()>, RetrainError> {
        match self.policy {
            RetrainPolicy::Queue => Ok(self
                .retrain_gate
                .lock()
                .unwrap_or_else(PoisonError::into_inner)),
            RetrainPolicy::Reject => match self.retrain_gate.try_lock() {
                Ok(guard) => Ok(guard),
                Err(TryLockError::Poisoned(poisoned)) => Ok(poisoned.into_inner()),
                Err(TryLockError::WouldBlock) => Err(RetrainError::InProgress),
            },
        }
    }
}
