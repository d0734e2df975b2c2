/// Text Classification
pub mod text_classification;

pub use text_classification::TextClassifier;

/// A trained feature transform plus classifier.
///
/// Implementations are immutable once trained: `fit` produces a new value using the receiver's
/// hyperparameters and leaves the receiver untouched, so a published pipeline can keep serving
/// while its successor trains.
pub trait Pipeline: Send + Sync + Sized {
    /// The class labels this pipeline can predict, in column order for `predict_proba`
    fn classes(&self) -> &[String];

    /// Predict a class label for each instance
    fn predict(&self, instances: &[String]) -> Result<Vec<String>, PipelineError>;

    /// Predict a probability distribution over `classes()` for each instance
    fn predict_proba(&self, instances: &[String]) -> Result<Vec<Vec<f64>>, PipelineError>;

    /// Train a new pipeline on the given texts and labels
    fn fit(&self, texts: &[String], labels: &[String]) -> Result<Self, PipelineError>;
}

/// Pipeline Error
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    /// The caller supplied something the pipeline cannot process
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Training could not produce a model from the given data
    #[error("unable to fit pipeline: {0}")]
    Fit(String),

    /// The trained model is internally inconsistent
    #[error("model is corrupt: {0}")]
    Corrupt(String),
}
