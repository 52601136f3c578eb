//! Common types and utilities for Cmdletgen
//!
//! This crate contains the shared error type, the owned XML element tree
//! used by the merge and report components, and the analyzer interface
//! consumed by the report writer.

mod analyzer;
mod xml;

pub use analyzer::{AnalyzedParameter, AnalyzedType, NullAnalyzer, OperationAnalysis, OperationAnalyzer};
pub use xml::{XmlElement, XmlNode};

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading, merging, or reporting configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML processing error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("XML attribute error: {0}")]
    XmlAttribute(#[from] quick_xml::events::attributes::AttrError),

    #[error("Malformed document: {0}")]
    Malformed(String),

    #[error("Failed to load {path}: {message}")]
    Load { path: PathBuf, message: String },

    #[error("Failed to write {path}: {message}")]
    Write { path: PathBuf, message: String },

    #[error("Overrides document failed validation: {0}")]
    Validation(String),

    #[error("Override for '{service}' attempts to change identity field <{tag}>")]
    IdentityOverride { service: String, tag: String },
}

impl ConfigError {
    /// Wrap an error with the path of the file being loaded.
    pub fn load(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        ConfigError::Load {
            path: path.into(),
            message: err.to_string(),
        }
    }

    /// Wrap an error with the path of the file being written.
    pub fn write(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        ConfigError::Write {
            path: path.into(),
            message: err.to_string(),
        }
    }
}

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;
