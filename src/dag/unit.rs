// src/dag/unit.rs

//! Build units and the registry that resolves their declared dependencies.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use tracing::debug;

use crate::errors::{AssetflowError, Result};
use crate::types::AssetType;

/// Canonical unit name type used throughout the crate.
pub type UnitName = String;

/// A unit as reported by external project discovery, before its dependency
/// names have been resolved.
#[derive(Debug, Clone)]
pub struct DiscoveredUnit {
    pub name: UnitName,
    /// Root directory of the unit (handed to dependents as a dependency path).
    pub dir: PathBuf,
    /// The unit's `assets` directory.
    pub assets_dir: PathBuf,
    pub asset_types: BTreeSet<AssetType>,
    /// Declared outgoing dependencies, in declaration order.
    pub depends: Vec<UnitName>,
}

impl DiscoveredUnit {
    /// Unit rooted at `dir` with the conventional `<dir>/assets` layout.
    pub fn new(name: impl Into<UnitName>, dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        Self {
            name: name.into(),
            assets_dir: dir.join("assets"),
            dir,
            asset_types: BTreeSet::new(),
            depends: Vec::new(),
        }
    }
}

/// A resolved build unit.
#[derive(Debug, Clone)]
pub struct Unit {
    name: UnitName,
    dir: PathBuf,
    assets_dir: PathBuf,
    asset_types: BTreeSet<AssetType>,
    dependencies: Vec<UnitName>,
    dependents: Vec<UnitName>,
}

impl Unit {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn assets_dir(&self) -> &Path {
        &self.assets_dir
    }

    pub fn asset_types(&self) -> impl Iterator<Item = AssetType> + '_ {
        self.asset_types.iter().copied()
    }

    pub fn has_asset_type(&self, asset_type: AssetType) -> bool {
        self.asset_types.contains(&asset_type)
    }

    /// Declared dependencies (units this one needs).
    pub fn dependencies(&self) -> &[UnitName] {
        &self.dependencies
    }

    /// Units that declare a dependency on this one.
    pub fn dependents(&self) -> &[UnitName] {
        &self.dependents
    }
}

/// Every unit of the run, index-addressed, with a name lookup.
///
/// Construction guarantees that all dependency names resolve and that the
/// declared dependency graph is acyclic. The registry is read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct UnitRegistry {
    units: Vec<Unit>,
    index: HashMap<UnitName, usize>,
}

impl UnitRegistry {
    /// Resolve discovered units into a registry.
    ///
    /// Fails on duplicate names, unknown dependency names and dependency
    /// cycles (including a unit depending on itself).
    pub fn build(discovered: Vec<DiscoveredUnit>) -> Result<Self> {
        let mut index = HashMap::with_capacity(discovered.len());
        for (i, unit) in discovered.iter().enumerate() {
            if index.insert(unit.name.clone(), i).is_some() {
                return Err(AssetflowError::ConfigError(format!(
                    "unit '{}' is declared more than once",
                    unit.name
                )));
            }
        }

        for unit in &discovered {
            for dep in &unit.depends {
                if !index.contains_key(dep) {
                    return Err(AssetflowError::UnknownDependency {
                        unit: unit.name.clone(),
                        dependency: dep.clone(),
                    });
                }
            }
        }

        ensure_acyclic(&discovered)?;

        let mut units: Vec<Unit> = discovered
            .into_iter()
            .map(|d| Unit {
                name: d.name,
                dir: d.dir,
                assets_dir: d.assets_dir,
                asset_types: d.asset_types,
                dependencies: d.depends,
                dependents: Vec::new(),
            })
            .collect();

        // Invert the resolved edges. Iterating in registry order keeps the
        // dependents lists deterministic.
        for i in 0..units.len() {
            let name = units[i].name.clone();
            let deps = units[i].dependencies.clone();
            for dep in deps {
                let dep_idx = index[&dep];
                if !units[dep_idx].dependents.contains(&name) {
                    units[dep_idx].dependents.push(name.clone());
                }
            }
        }

        debug!(units = units.len(), "unit registry assembled");

        Ok(Self { units, index })
    }

    /// Keep only `roots` and everything they transitively depend on.
    pub fn restrict_to(self, roots: &[UnitName]) -> Result<Self> {
        let mut keep: HashSet<&str> = HashSet::new();
        let mut stack: Vec<&str> = Vec::new();

        for root in roots {
            if !self.index.contains_key(root) {
                return Err(AssetflowError::UnknownUnit(root.clone()));
            }
            stack.push(root.as_str());
        }

        while let Some(name) = stack.pop() {
            if !keep.insert(name) {
                continue;
            }
            if let Some(unit) = self.get(name) {
                stack.extend(unit.dependencies.iter().map(|d| d.as_str()));
            }
        }

        let discovered = self
            .units
            .iter()
            .filter(|u| keep.contains(u.name.as_str()))
            .map(|u| DiscoveredUnit {
                name: u.name.clone(),
                dir: u.dir.clone(),
                assets_dir: u.assets_dir.clone(),
                asset_types: u.asset_types.clone(),
                depends: u.dependencies.clone(),
            })
            .collect();

        Self::build(discovered)
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Unit> {
        self.index.get(name).map(|&i| &self.units[i])
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Unit at a registry index. Indices come from [`UnitRegistry::index_of`]
    /// or from a graph projected from this registry.
    pub fn unit_at(&self, idx: usize) -> &Unit {
        &self.units[idx]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Unit> {
        self.units.iter()
    }

    /// Directories of the declared dependencies of `unit`.
    pub fn dependency_paths(&self, unit: &Unit) -> Vec<PathBuf> {
        unit.dependencies
            .iter()
            .filter_map(|d| self.get(d))
            .map(|d| d.dir.clone())
            .collect()
    }
}

fn ensure_acyclic(units: &[DiscoveredUnit]) -> Result<()> {
    // Edge direction: dependency -> dependent.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for unit in units {
        graph.add_node(unit.name.as_str());
    }
    for unit in units {
        for dep in &unit.depends {
            graph.add_edge(dep.as_str(), unit.name.as_str(), ());
        }
    }

    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => Err(AssetflowError::DependencyCycle(format!(
            "cycle detected in unit dependencies involving '{}'",
            cycle.node_id()
        ))),
    }
}
