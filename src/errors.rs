// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

use crate::types::AssetType;

#[derive(Error, Debug)]
pub enum AssetflowError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Unit '{unit}' depends on unknown unit '{dependency}'")]
    UnknownDependency { unit: String, dependency: String },

    #[error("Cycle detected in unit dependencies: {0}")]
    DependencyCycle(String),

    #[error("Unit not found: {0}")]
    UnknownUnit(String),

    #[error("Compilation of {asset_type} assets for unit '{unit}' failed: {detail}")]
    CompileFailed {
        unit: String,
        asset_type: AssetType,
        detail: String,
    },

    #[error("Executor error: {0}")]
    Executor(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, AssetflowError>;
