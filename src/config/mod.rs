// src/config/mod.rs

//! Manifest loading and validation for assetflow.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a manifest from disk (`loader.rs`).
//! - Validate settings and compiler coverage (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_manifest_path, load_and_validate, load_from_path, parse_str};
pub use model::{CompilerConfig, ConfigSection, Manifest, RawManifest, UnitConfig};
