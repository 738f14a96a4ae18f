// src/config/model.rs

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::dag::DiscoveredUnit;
use crate::types::AssetType;

/// Top-level manifest as read from a TOML file, before validation.
///
/// ```toml
/// [config]
/// max_parallelism = 4
///
/// [compiler.ts]
/// cmd = "node tools/compile-ts.js"
/// unchanged_on_stdout = "^UNCHANGED$"
///
/// [unit."cf.platform"]
/// assets = ["ts", "less"]
///
/// [unit."cf.cplace.documents"]
/// assets = ["ts"]
/// depends = ["cf.platform"]
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawManifest {
    #[serde(default)]
    pub config: ConfigSection,

    /// `[compiler.<asset type>]`; keys are validated into [`AssetType`]s.
    #[serde(default)]
    pub compiler: BTreeMap<String, CompilerConfig>,

    /// `[unit."<name>"]`.
    #[serde(default)]
    pub unit: BTreeMap<String, UnitConfig>,
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigSection {
    /// Upper bound of concurrent compile steps. Defaults to the number of
    /// available cores minus one (at least one).
    #[serde(default)]
    pub max_parallelism: Option<usize>,

    /// Production build; the `--production` flag ORs with it.
    #[serde(default)]
    pub production: bool,

    /// Quiet window before a burst of source changes triggers a rebuild.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

fn default_debounce_ms() -> u64 {
    500
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            max_parallelism: None,
            production: false,
            debounce_ms: default_debounce_ms(),
        }
    }
}

/// `[compiler.<asset type>]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CompilerConfig {
    /// Shell command run once per compile step.
    pub cmd: String,

    /// Regex; a matching stdout line reports the step as unchanged.
    #[serde(default)]
    pub unchanged_on_stdout: Option<String>,
}

/// `[unit."<name>"]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UnitConfig {
    /// Unit directory relative to the manifest; defaults to the unit name.
    #[serde(default)]
    pub dir: Option<String>,

    /// Assets directory relative to the unit directory; defaults to `assets`.
    #[serde(default)]
    pub assets_dir: Option<String>,

    #[serde(default)]
    pub assets: Vec<AssetType>,

    /// Declared dependencies, in order.
    #[serde(default)]
    pub depends: Vec<String>,
}

/// A validated manifest.
///
/// Only constructible through `TryFrom<RawManifest>` (see `validate.rs`) or
/// the loader.
#[derive(Debug, Clone)]
pub struct Manifest {
    config: ConfigSection,
    compilers: BTreeMap<AssetType, CompilerConfig>,
    units: BTreeMap<String, UnitConfig>,
}

impl Manifest {
    pub(crate) fn new_unchecked(
        config: ConfigSection,
        compilers: BTreeMap<AssetType, CompilerConfig>,
        units: BTreeMap<String, UnitConfig>,
    ) -> Self {
        Self {
            config,
            compilers,
            units,
        }
    }

    pub fn config(&self) -> &ConfigSection {
        &self.config
    }

    pub fn compilers(&self) -> &BTreeMap<AssetType, CompilerConfig> {
        &self.compilers
    }

    pub fn compiler(&self, asset_type: AssetType) -> Option<&CompilerConfig> {
        self.compilers.get(&asset_type)
    }

    pub fn units(&self) -> &BTreeMap<String, UnitConfig> {
        &self.units
    }

    /// Units as graph-assembly input, with directories resolved against `root`.
    pub fn discovered_units(&self, root: &Path) -> Vec<DiscoveredUnit> {
        self.units
            .iter()
            .map(|(name, cfg)| {
                let dir: PathBuf = root.join(cfg.dir.as_deref().unwrap_or(name));
                let assets_dir = dir.join(cfg.assets_dir.as_deref().unwrap_or("assets"));
                DiscoveredUnit {
                    name: name.clone(),
                    dir,
                    assets_dir,
                    asset_types: cfg.assets.iter().copied().collect(),
                    depends: cfg.depends.clone(),
                }
            })
            .collect()
    }
}
