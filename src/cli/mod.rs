/// CLI Indexes: Pipelines
pub mod pipelines;

/// Shared command line arguments
pub mod args;
