//! # SDG Classifier
#![forbid(unsafe_code)]

/// Configuration
pub mod config;

/// Pipelines
pub mod pipelines;

/// Datasets
pub mod datasets;

/// Model lifecycle management
pub mod manager;

/// Model persistence
pub mod store;

/// HTTP server
pub mod server;

/// Utilities
pub mod utils;

/// CLI indexes and utilities
pub mod cli;

pub use config::Config;
pub use manager::{ModelManager, ModelVersion, PredictionResult, RetrainReport};

/// Error macros
#[macro_use]
extern crate anyhow;
