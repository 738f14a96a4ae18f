// src/dag/graph.rs

use std::collections::HashMap;

use crate::dag::unit::{UnitName, UnitRegistry};
use crate::types::AssetType;

/// Internal node structure: stores immediate deps and dependents as node
/// indices within the same graph.
#[derive(Debug, Clone)]
struct TypeNode {
    unit: UnitName,
    /// Index of the unit in the registry this graph was projected from.
    unit_index: usize,
    deps: Vec<usize>,
    dependents: Vec<usize>,
}

/// Dependency graph of a single asset type.
///
/// Nodes are the units that carry the asset type; edges are the declared
/// dependencies whose *both* endpoints carry it. A unit whose dependency has
/// no assets of this type simply has no edge to it here.
///
/// The registry already rejected cycles, so the projection is acyclic too.
#[derive(Debug, Clone)]
pub struct TypeGraph {
    asset_type: AssetType,
    nodes: Vec<TypeNode>,
    index: HashMap<UnitName, usize>,
}

impl TypeGraph {
    /// Project the registry onto `asset_type`.
    pub fn project(registry: &UnitRegistry, asset_type: AssetType) -> Self {
        let mut nodes = Vec::new();
        let mut index = HashMap::new();

        // First pass: select the units carrying the flag.
        for (unit_index, unit) in registry.iter().enumerate() {
            if unit.has_asset_type(asset_type) {
                index.insert(unit.name().to_string(), nodes.len());
                nodes.push(TypeNode {
                    unit: unit.name().to_string(),
                    unit_index,
                    deps: Vec::new(),
                    dependents: Vec::new(),
                });
            }
        }

        // Second pass: keep only edges between selected units.
        for node in nodes.iter_mut() {
            let unit = registry.unit_at(node.unit_index);
            node.deps = unit
                .dependencies()
                .iter()
                .filter_map(|d| index.get(d).copied())
                .collect();
            node.dependents = unit
                .dependents()
                .iter()
                .filter_map(|d| index.get(d).copied())
                .collect();
        }

        Self {
            asset_type,
            nodes,
            index,
        }
    }

    pub fn asset_type(&self) -> AssetType {
        self.asset_type
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn index_of(&self, unit: &str) -> Option<usize> {
        self.index.get(unit).copied()
    }

    pub fn unit_name(&self, node: usize) -> &str {
        &self.nodes[node].unit
    }

    pub fn unit_index(&self, node: usize) -> usize {
        self.nodes[node].unit_index
    }

    /// Immediate dependencies of a node (node indices).
    pub fn dependencies_of(&self, node: usize) -> &[usize] {
        &self.nodes[node].deps
    }

    /// Immediate dependents of a node (node indices).
    pub fn dependents_of(&self, node: usize) -> &[usize] {
        &self.nodes[node].dependents
    }

    /// Unit names in node order.
    pub fn units(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(|n| n.unit.as_str())
    }

    /// Dependency names of `unit` inside this graph (empty for unknown units).
    pub fn dependency_names(&self, unit: &str) -> Vec<&str> {
        match self.index_of(unit) {
            Some(node) => self.nodes[node]
                .deps
                .iter()
                .map(|&d| self.nodes[d].unit.as_str())
                .collect(),
            None => Vec::new(),
        }
    }

    /// Dependent names of `unit` inside this graph (empty for unknown units).
    pub fn dependent_names(&self, unit: &str) -> Vec<&str> {
        match self.index_of(unit) {
            Some(node) => self.nodes[node]
                .dependents
                .iter()
                .map(|&d| self.nodes[d].unit.as_str())
                .collect(),
            None => Vec::new(),
        }
    }
}
