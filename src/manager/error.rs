use crate::{datasets::ValidationError, pipelines::PipelineError, store::StoreError};

/// Prediction Error. A failed batch never returns partial results.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum PredictionError {
    /// The instances could not be processed as given
    #[error("invalid prediction input: {0}")]
    Input(String),

    /// The published model failed at runtime
    #[error("model failed to predict: {0}")]
    Model(String),
}

impl From<PipelineError> for PredictionError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::InvalidInput(message) => Self::Input(message),
            other => Self::Model(other.to_string()),
        }
    }
}

/// Training Error. The published model is unchanged when one of these is returned.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum TrainingError {
    /// Fitting the merged corpus failed
    #[error("fit failed: {0}")]
    Fit(PipelineError),

    /// The new pipeline could not score the submitted rows
    #[error("evaluation failed: {0}")]
    Evaluate(PipelineError),
}

/// Retrain Error
#[derive(thiserror::Error, Debug)]
pub enum RetrainError {
    /// The upload was rejected before touching the corpus
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Training or evaluation failed
    #[error(transparent)]
    Training(#[from] TrainingError),

    /// The new version could not be persisted, so it was not published
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Another retrain holds the gate and the policy is to reject
    #[error("a retrain is already in progress")]
    InProgress,
}
