// src/config/validate.rs

use std::collections::BTreeMap;

use regex::Regex;

use crate::config::model::{CompilerConfig, Manifest, RawManifest};
use crate::errors::{AssetflowError, Result};
use crate::types::AssetType;

impl TryFrom<RawManifest> for Manifest {
    type Error = AssetflowError;

    fn try_from(raw: RawManifest) -> std::result::Result<Self, Self::Error> {
        ensure_has_units(&raw)?;
        validate_global_config(&raw)?;
        let compilers = parse_compilers(&raw)?;
        validate_unit_compilers(&raw, &compilers)?;
        Ok(Manifest::new_unchecked(raw.config, compilers, raw.unit))
    }
}

fn ensure_has_units(cfg: &RawManifest) -> Result<()> {
    if cfg.unit.is_empty() {
        return Err(AssetflowError::ConfigError(
            "manifest must contain at least one [unit.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_global_config(cfg: &RawManifest) -> Result<()> {
    if cfg.config.max_parallelism == Some(0) {
        return Err(AssetflowError::ConfigError(
            "[config].max_parallelism must be >= 1 (got 0)".to_string(),
        ));
    }

    if cfg.config.debounce_ms == 0 {
        return Err(AssetflowError::ConfigError(
            "[config].debounce_ms must be >= 1 (got 0)".to_string(),
        ));
    }

    Ok(())
}

fn parse_compilers(cfg: &RawManifest) -> Result<BTreeMap<AssetType, CompilerConfig>> {
    let mut compilers = BTreeMap::new();

    for (key, compiler) in cfg.compiler.iter() {
        let asset_type: AssetType = key
            .parse()
            .map_err(|e: String| AssetflowError::ConfigError(format!("[compiler.{key}]: {e}")))?;

        if compiler.cmd.trim().is_empty() {
            return Err(AssetflowError::ConfigError(format!(
                "[compiler.{key}].cmd must not be empty"
            )));
        }

        if let Some(pattern) = &compiler.unchanged_on_stdout {
            Regex::new(pattern).map_err(|e| {
                AssetflowError::ConfigError(format!(
                    "[compiler.{key}].unchanged_on_stdout is not a valid regex: {e}"
                ))
            })?;
        }

        if compilers.insert(asset_type, compiler.clone()).is_some() {
            return Err(AssetflowError::ConfigError(format!(
                "compiler for asset type '{asset_type}' is configured more than once"
            )));
        }
    }

    Ok(compilers)
}

/// Every asset type a unit uses needs a compiler; the test-only type is
/// exempt when the manifest builds for production.
fn validate_unit_compilers(
    cfg: &RawManifest,
    compilers: &BTreeMap<AssetType, CompilerConfig>,
) -> Result<()> {
    for (name, unit) in cfg.unit.iter() {
        for asset_type in unit.assets.iter() {
            if cfg.config.production && asset_type.is_test_only() {
                continue;
            }
            if !compilers.contains_key(asset_type) {
                return Err(AssetflowError::ConfigError(format!(
                    "unit '{name}' has {asset_type} assets but no [compiler.{asset_type}] is configured"
                )));
            }
        }
    }
    Ok(())
}
