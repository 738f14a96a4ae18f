#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::PathBuf;

use assetflow::config::{CompilerConfig, ConfigSection, Manifest, RawManifest, UnitConfig};
use assetflow::dag::{DiscoveredUnit, UnitRegistry};
use assetflow::errors::Result;
use assetflow::types::AssetType;

/// Builder for `UnitRegistry` to simplify test setup.
///
/// Units live under `/units/<name>` unless a root is given.
pub struct RegistryBuilder {
    root: PathBuf,
    units: Vec<DiscoveredUnit>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self {
            root: PathBuf::from("/units"),
            units: Vec::new(),
        }
    }

    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    /// Add a unit with the given asset types and declared dependencies.
    pub fn unit(mut self, name: &str, assets: &[AssetType], depends: &[&str]) -> Self {
        let mut unit = DiscoveredUnit::new(name, self.root.join(name));
        unit.asset_types = assets.iter().copied().collect();
        unit.depends = depends.iter().map(|d| d.to_string()).collect();
        self.units.push(unit);
        self
    }

    pub fn discovered(&self) -> Vec<DiscoveredUnit> {
        self.units.clone()
    }

    pub fn try_build(self) -> Result<UnitRegistry> {
        UnitRegistry::build(self.units)
    }

    pub fn build(self) -> UnitRegistry {
        self.try_build().expect("Failed to build valid registry from builder")
    }
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `Manifest`.
pub struct ManifestBuilder {
    raw: RawManifest,
}

impl ManifestBuilder {
    pub fn new() -> Self {
        Self {
            raw: RawManifest {
                config: ConfigSection::default(),
                compiler: BTreeMap::new(),
                unit: BTreeMap::new(),
            },
        }
    }

    pub fn with_compiler(mut self, key: &str, cmd: &str) -> Self {
        self.raw.compiler.insert(
            key.to_string(),
            CompilerConfig {
                cmd: cmd.to_string(),
                unchanged_on_stdout: None,
            },
        );
        self
    }

    pub fn with_unchanged_marker(mut self, key: &str, pattern: &str) -> Self {
        if let Some(compiler) = self.raw.compiler.get_mut(key) {
            compiler.unchanged_on_stdout = Some(pattern.to_string());
        }
        self
    }

    pub fn with_unit(mut self, name: &str, unit: UnitConfig) -> Self {
        self.raw.unit.insert(name.to_string(), unit);
        self
    }

    pub fn max_parallelism(mut self, n: usize) -> Self {
        self.raw.config.max_parallelism = Some(n);
        self
    }

    pub fn production(mut self, val: bool) -> Self {
        self.raw.config.production = val;
        self
    }

    pub fn debounce_ms(mut self, ms: u64) -> Self {
        self.raw.config.debounce_ms = ms;
        self
    }

    pub fn raw(self) -> RawManifest {
        self.raw
    }

    pub fn try_build(self) -> Result<Manifest> {
        Manifest::try_from(self.raw)
    }

    pub fn build(self) -> Manifest {
        self.try_build().expect("Failed to build valid manifest from builder")
    }
}

impl Default for ManifestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `UnitConfig`.
pub struct UnitConfigBuilder {
    unit: UnitConfig,
}

impl UnitConfigBuilder {
    pub fn new() -> Self {
        Self {
            unit: UnitConfig::default(),
        }
    }

    pub fn assets(mut self, assets: &[AssetType]) -> Self {
        self.unit.assets.extend_from_slice(assets);
        self
    }

    pub fn depends(mut self, dep: &str) -> Self {
        self.unit.depends.push(dep.to_string());
        self
    }

    pub fn dir(mut self, dir: &str) -> Self {
        self.unit.dir = Some(dir.to_string());
        self
    }

    pub fn assets_dir(mut self, dir: &str) -> Self {
        self.unit.assets_dir = Some(dir.to_string());
        self
    }

    pub fn build(self) -> UnitConfig {
        self.unit
    }
}

impl Default for UnitConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
