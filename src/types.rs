use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// Kind of compile step a unit can take part in.
///
/// Every asset type gets its own dependency graph and its own job tracker.
/// The manifest spells them as `"ts"`, `"ts_e2e"`, `"less"` and
/// `"compress_css"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
pub enum AssetType {
    /// Test/integration-language sources (`assets/e2e`).
    #[serde(rename = "ts_e2e", alias = "e2e")]
    TypeScriptE2e,
    /// Primary-language sources (`assets/ts`).
    #[serde(rename = "ts")]
    TypeScript,
    /// Stylesheet sources (`assets/less`).
    #[serde(rename = "less")]
    Less,
    /// Stylesheet bundle step (`assets/css`).
    #[serde(rename = "compress_css", alias = "css")]
    CompressCss,
}

impl AssetType {
    /// Scheduling priority, highest first.
    ///
    /// Types with the longest dependency chains come first so that shallow
    /// pipelines fill whatever capacity is left over.
    pub const PRIORITY: [AssetType; 4] = [
        AssetType::TypeScriptE2e,
        AssetType::TypeScript,
        AssetType::Less,
        AssetType::CompressCss,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AssetType::TypeScriptE2e => "ts_e2e",
            AssetType::TypeScript => "ts",
            AssetType::Less => "less",
            AssetType::CompressCss => "compress_css",
        }
    }

    /// Test-only asset types are dropped entirely in production builds.
    pub fn is_test_only(self) -> bool {
        matches!(self, AssetType::TypeScriptE2e)
    }

    /// Sub-directory of a unit's assets directory holding this type's sources.
    pub fn watch_subdir(self) -> &'static str {
        match self {
            AssetType::TypeScriptE2e => "e2e",
            AssetType::TypeScript => "ts",
            AssetType::Less => "less",
            AssetType::CompressCss => "css",
        }
    }

    /// File extensions whose changes invalidate this type's compile step.
    pub fn watch_extensions(self) -> &'static [&'static str] {
        match self {
            AssetType::TypeScriptE2e => &["ts"],
            AssetType::TypeScript => &["ts", "htm", "html"],
            AssetType::Less => &["less"],
            AssetType::CompressCss => &["css"],
        }
    }

    /// Asset types that take part in a run with the given production flag,
    /// in priority order.
    pub fn active(production: bool) -> impl Iterator<Item = AssetType> {
        Self::PRIORITY
            .into_iter()
            .filter(move |t| !(production && t.is_test_only()))
    }
}

impl fmt::Display for AssetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssetType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ts" => Ok(AssetType::TypeScript),
            "ts_e2e" | "e2e" => Ok(AssetType::TypeScriptE2e),
            "less" => Ok(AssetType::Less),
            "compress_css" | "css" => Ok(AssetType::CompressCss),
            other => Err(format!(
                "invalid asset type: {other} (expected \"ts\", \"ts_e2e\", \"less\" or \"compress_css\")"
            )),
        }
    }
}
