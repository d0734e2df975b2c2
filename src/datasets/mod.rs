use std::{fs::File, io, path::Path};

use derive_new::new;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::pipelines::text_classification;

/// Uploaded datasets and their validation
pub mod upload;

pub use upload::{IngestValidator, UploadedDataset, ValidationError};

/// A labeled text example
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, new)]
pub struct Item {
    /// The text for classification
    pub text: String,

    /// The class label of the text
    pub label: String,
}

impl text_classification::Item for Item {
    fn input(&self) -> &str {
        &self.text
    }

    fn class_label(&self) -> &str {
        &self.label
    }
}

/// The cumulative, ordered set of labeled examples a pipeline was trained on.
///
/// Rows are never deduplicated; every retrain appends.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Corpus {
    items: Vec<Item>,
}

impl Corpus {
    /// Wrap a list of items
    pub fn new(items: Vec<Item>) -> Self {
        Self { items }
    }

    /// Read a corpus from a CSV file on disk, using the validator's column names
    pub fn load_csv(path: impl AsRef<Path>, validator: &IngestValidator) -> Result<Self, ValidationError> {
        let file = File::open(path.as_ref())
            .map_err(|e| ValidationError::Malformed(format!("unable to open dataset: {}", e)))?;

        validator.read(io::BufReader::new(file))
    }

    /// Number of examples
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the corpus has no examples
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The examples, in insertion order
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    /// The example texts, in insertion order
    pub fn texts(&self) -> Vec<String> {
        self.items.iter().map(|item| item.text.clone()).collect()
    }

    /// The example labels, in insertion order
    pub fn labels(&self) -> Vec<String> {
        self.items.iter().map(|item| item.label.clone()).collect()
    }

    /// A new corpus holding this corpus' rows followed by `other`'s rows
    pub fn merged(&self, other: &Corpus) -> Corpus {
        let mut items = Vec::with_capacity(self.len() + other.len());
        items.extend_from_slice(&self.items);
        items.extend_from_slice(&other.items);

        Corpus { items }
    }

    /// Returns up to `count` random examples
    pub fn sample(&self, count: usize) -> Vec<&Item> {
        let mut rng = rand::thread_rng();

        self.items.choose_multiple(&mut rng, count).collect()
    }
}

impl FromIterator<Item> for Corpus {
    fn from_iter<T: IntoIterator<Item = Item>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
