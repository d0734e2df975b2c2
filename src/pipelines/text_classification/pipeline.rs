use serde::{Deserialize, Serialize};

use crate::pipelines::{Pipeline, PipelineError};

use super::{
    model::{argmax, NaiveBayes},
    Config, Item, Vectorizer,
};

/// Text Classification Pipeline: TF-IDF features feeding a naive Bayes classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextClassifier {
    /// Hyperparameters reused when this pipeline is refit
    config: Config,

    /// Feature extraction
    vectorizer: Vectorizer,

    /// Classification
    model: NaiveBayes,
}

impl TextClassifier {
    /// Train a new pipeline from scratch
    pub fn train(config: Config, texts: &[String], labels: &[String]) -> Result<Self, PipelineError> {
        config.validate().map_err(PipelineError::Fit)?;

        if texts.len() != labels.len() {
            return Err(PipelineError::Fit(format!(
                "found {} texts but {} labels",
                texts.len(),
                labels.len()
            )));
        }

        if texts.is_empty() {
            return Err(PipelineError::Fit("no training samples".to_string()));
        }

        let vectorizer = Vectorizer::fit(texts, &config)?;
        let features = texts
            .iter()
            .map(|text| vectorizer.transform(text))
            .collect::<Vec<_>>();

        let model = NaiveBayes::fit(&features, labels, vectorizer.len(), config.alpha)?;

        Ok(Self {
            config,
            vectorizer,
            model,
        })
    }

    /// Train a new pipeline from dataset items
    pub fn train_items<I: Item>(config: Config, items: &[I]) -> Result<Self, PipelineError> {
        let (texts, labels): (Vec<String>, Vec<String>) = items
            .iter()
            .map(|item| (item.input().to_string(), item.class_label().to_string()))
            .unzip();

        Self::train(config, &texts, &labels)
    }

    /// The hyperparameters this pipeline was trained with
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Number of features in the learned vocabulary
    pub fn vocabulary_size(&self) -> usize {
        self.vectorizer.len()
    }
}

impl Pipeline for TextClassifier {
    fn classes(&self) -> &[String] {
        self.model.classes()
    }

    fn predict(&self, instances: &[String]) -> Result<Vec<String>, PipelineError> {
        let classes = self.model.classes();

        self.predict_proba(instances)?
            .into_iter()
            .map(|row| {
                argmax(&row)
                    .map(|index| classes[index].clone())
                    .ok_or_else(|| PipelineError::Corrupt("model has no classes".to_string()))
            })
            .collect()
    }

    fn predict_proba(&self, instances: &[String]) -> Result<Vec<Vec<f64>>, PipelineError> {
        if instances.is_empty() {
            return Err(PipelineError::InvalidInput("no instances given".to_string()));
        }

        self.model.check(self.vectorizer.len())?;

        Ok(instances
            .iter()
            .map(|text| self.model.predict_proba(&self.vectorizer.transform(text)))
            .collect())
    }

    fn fit(&self, texts: &[String], labels: &[String]) -> Result<Self, PipelineError> {
        Self::train(self.config.clone(), texts, labels)
    }
}
