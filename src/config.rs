use std::{fs, net::SocketAddr, path::Path};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::{datasets::IngestValidator, manager::RetrainPolicy, pipelines::text_classification};

/// Application configuration, loaded from YAML. Every field has a default.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server settings
    pub server: Server,

    /// Model persistence settings
    pub store: Store,

    /// Upload schema settings
    pub dataset: Dataset,

    /// Retrain concurrency settings
    pub retrain: Retrain,

    /// Hyperparameters used when training a model from scratch
    pub pipeline: text_classification::Config,

    /// Log filter used when `RUST_LOG` is not set
    pub log_level: Option<String>,

    /// File that receives a copy of every log line, e.g. `app.log`
    pub log_file: Option<String>,
}

/// HTTP server settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Server {
    /// Address to listen on
    pub bind_addr: SocketAddr,

    /// Largest accepted request body, in bytes
    pub max_upload_bytes: usize,
}

impl Default for Server {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 5000)),
            max_upload_bytes: 50 * 1024 * 1024,
        }
    }
}

/// Model persistence settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Store {
    /// The single file holding the published version
    pub model_path: String,
}

impl Default for Store {
    fn default() -> Self {
        Self {
            model_path: "data/model.json".to_string(),
        }
    }
}

/// Upload schema settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Dataset {
    /// Header of the text column
    pub text_column: String,

    /// Header of the label column
    pub label_column: String,

    /// Accepted upload file extensions
    pub allowed_extensions: Vec<String>,
}

impl Default for Dataset {
    fn default() -> Self {
        Self {
            text_column: "Textos_espanol".to_string(),
            label_column: "sdg".to_string(),
            allowed_extensions: vec!["csv".to_string()],
        }
    }
}

impl Dataset {
    /// Build the upload validator for this schema
    pub fn validator(&self) -> IngestValidator {
        IngestValidator::new(
            self.text_column.clone(),
            self.label_column.clone(),
            self.allowed_extensions.clone(),
        )
    }
}

/// Retrain concurrency settings
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Retrain {
    /// What happens to a retrain that arrives while another is running
    pub policy: RetrainPolicy,
}

impl Config {
    /// Load configuration from a YAML file
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Unable to read config file {}", path.display()))?;

        Self::from_yaml(&contents)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    /// Load configuration from a YAML file if given, falling back to defaults
    pub fn load_or_default(path: Option<&str>) -> anyhow::Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Parse configuration from YAML text
    pub fn from_yaml(contents: &str) -> anyhow::Result<Self> {
        let config: Self = serde_yaml::from_str(contents)?;

        config
            .pipeline
            .validate()
            .map_err(|e| anyhow!("Invalid pipeline settings: {}", e))?;

        Ok(config)
    }
}
