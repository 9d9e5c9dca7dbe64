// src/errors.rs

//! Crate-wide error aliases and helpers.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ElementalError {
    /// Bad user input: config directory, platform, media type, log target...
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The environment is not in the state the command requires.
    #[error("{0}")]
    Precondition(String),

    #[error("could not read description file '{path}': {source}")]
    DescriptionRead {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("could not unmarshal description file '{path}': {source}")]
    DescriptionParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("failed parsing {what} source URI ('{uri}'): {reason}")]
    InvalidSource {
        what: &'static str,
        uri: String,
        reason: String,
    },

    #[error("inconsistent deployment setup found: {0}")]
    InconsistentDeployment(String),

    #[error("failed to define target disk: {0}")]
    TargetResolution(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, ElementalError>;
