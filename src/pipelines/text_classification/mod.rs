/// Classifier hyperparameters
pub mod config;

/// TF-IDF feature extraction
pub mod vectorizer;

/// Multinomial naive Bayes
pub mod model;

/// The trained pipeline
pub mod pipeline;

/// Text Classification Items
pub mod item;

pub use config::Config;
pub use item::Item;
pub use model::NaiveBayes;
pub use pipeline::TextClassifier;
pub use vectorizer::{SparseVector, Vectorizer};

/// The unique string token that identifies this pipeline
pub static PIPELINE: &str = "text-classification";
