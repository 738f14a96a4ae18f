// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::model::{Manifest, RawManifest};
use crate::errors::Result;

/// Load a manifest from a given path and return the raw `RawManifest`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawManifest> {
    let contents = fs::read_to_string(path.as_ref())?;
    parse_str(&contents)
}

/// Deserialize manifest text.
pub fn parse_str(contents: &str) -> Result<RawManifest> {
    Ok(toml::from_str(contents)?)
}

/// Load a manifest from path and validate it.
///
/// Dependency names and cycles are checked later, when the unit registry
/// is assembled from [`Manifest::discovered_units`].
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<Manifest> {
    let raw = load_from_path(&path)?;
    Manifest::try_from(raw)
}

/// Default manifest path: `Assetflow.toml` in the current working directory.
pub fn default_manifest_path() -> PathBuf {
    PathBuf::from("Assetflow.toml")
}
