// src/exec/request.rs

use std::path::PathBuf;

use crate::dag::{JobKey, UnitName};
use crate::types::AssetType;

/// Everything an external compiler needs to run one compile step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileRequest {
    pub unit: UnitName,
    pub asset_type: AssetType,
    /// Root directory of the unit.
    pub unit_dir: PathBuf,
    /// The unit's assets directory.
    pub assets_dir: PathBuf,
    /// Directories of every declared dependency of the unit.
    pub dependency_paths: Vec<PathBuf>,
    /// Directory holding the manifest.
    pub root_dir: PathBuf,
    pub production: bool,
    pub verbose: bool,
}

impl CompileRequest {
    pub fn key(&self) -> JobKey {
        JobKey::new(self.asset_type, self.unit.clone())
    }
}

/// What a compile step reports back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileResult {
    /// Output was (re)written; dependents must rebuild.
    Changed,
    /// Output is identical to the previous run.
    Unchanged,
    Failed(String),
}

impl CompileResult {
    /// Whether dependents have to be invalidated. Failures count as changed.
    pub fn invalidates_dependents(&self) -> bool {
        !matches!(self, CompileResult::Unchanged)
    }
}
