// src/watch/patterns.rs

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::types::AssetType;
use crate::watch::path_utils::relative_to;

/// Compiled source patterns of one asset type.
///
/// Patterns are relative to the type's watch directory inside a unit's
/// assets directory (e.g. `<assets>/less`). The watcher passes relative paths
/// (e.g. `"theme/colors.less"`) into `matches`.
#[derive(Clone)]
pub struct WatchPattern {
    asset_type: AssetType,
    globs: Vec<String>,
    set: GlobSet,
}

impl fmt::Debug for WatchPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchPattern")
            .field("asset_type", &self.asset_type)
            .field("globs", &self.globs)
            .finish_non_exhaustive()
    }
}

impl WatchPattern {
    /// Patterns for every extension of `asset_type`, at any depth.
    pub fn for_asset_type(asset_type: AssetType) -> Result<Self> {
        let globs: Vec<String> = asset_type
            .watch_extensions()
            .iter()
            .map(|ext| format!("**/*.{ext}"))
            .collect();

        let mut builder = GlobSetBuilder::new();
        for pat in &globs {
            let glob = Glob::new(pat).with_context(|| format!("invalid glob pattern: {pat}"))?;
            builder.add(glob);
        }
        let set = builder
            .build()
            .with_context(|| format!("building watch globset for {asset_type}"))?;

        Ok(Self {
            asset_type,
            globs,
            set,
        })
    }

    pub fn asset_type(&self) -> AssetType {
        self.asset_type
    }

    /// Directory observed for this type inside a unit's assets directory.
    pub fn watch_dir(&self, assets_dir: &Path) -> PathBuf {
        assets_dir.join(self.asset_type.watch_subdir())
    }

    /// Whether a path relative to the watch directory is a source of this type.
    pub fn matches(&self, rel_path: &str) -> bool {
        self.set.is_match(rel_path)
    }

    /// Like [`matches`](Self::matches) for an absolute path below `watch_dir`.
    pub fn matches_path(&self, watch_dir: &Path, path: &Path) -> bool {
        relative_to(watch_dir, path).is_some_and(|rel| self.matches(&rel))
    }
}
