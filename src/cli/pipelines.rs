use std::fmt::Display;

use crate::pipelines::text_classification::{self, TextClassifier};

/// Available Pipelines
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Hash)]
pub enum Pipeline {
    /// Text Classification
    #[default]
    TextClassification,
}

impl Pipeline {
    /// Train the pipeline from scratch on labeled items
    pub fn train<I: text_classification::Item>(
        &self,
        config: text_classification::Config,
        items: &[I],
    ) -> anyhow::Result<TextClassifier> {
        match self {
            Pipeline::TextClassification => TextClassifier::train_items(config, items)
                .map_err(|e| anyhow!("Unable to train {}: {}", self, e)),
        }
    }
}

impl TryFrom<&str> for Pipeline {
    type Error = PipelineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        if value == text_classification::PIPELINE {
            Ok(Pipeline::TextClassification)
        } else {
            Err(PipelineError::Unknown(value.to_string()))
        }
    }
}

impl Display for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Pipeline::TextClassification => text_classification::PIPELINE,
        };

        write!(f, "{}", name)
    }
}

/// Pipeline Error
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    /// No pipeline found for the given string
    #[error("no pipeline found for {0}")]
    Unknown(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trips_name() {
        let pipeline = Pipeline::try_from("text-classification").unwrap();

        assert_eq!(pipeline, Pipeline::TextClassification);
        assert_eq!(pipeline.to_string(), "text-classification");
        assert!(Pipeline::try_from("token-classification").is_err());
    }
}
