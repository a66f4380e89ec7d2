use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// `policyscan.toml` schema v1.
///
/// Values are kept as loose strings here; `resolve_config` validates them.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PolicyscanConfigV1 {
    /// Optional schema string for tooling (`policyscan.config.v1`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,

    #[serde(default)]
    pub scan: ScanConfig,

    /// Map of kind id -> per-kind settings.
    #[serde(default)]
    pub checks: BTreeMap<String, CheckConfig>,

    /// Map of kind id -> (finding name -> `allow` | `forbid` | `unreviewed`).
    #[serde(default)]
    pub rules: BTreeMap<String, BTreeMap<String, String>>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ScanConfig {
    /// Hard cutoff on matches per scan query.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_results: Option<u32>,

    /// Number of distinct scan queries kept in the memo cache.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_capacity: Option<u32>,

    #[serde(default)]
    pub repositories: RepositoryFilterConfig,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RepositoryFilterConfig {
    /// `regexp` (default) or `glob`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    #[serde(default)]
    pub includes: Vec<String>,

    #[serde(default)]
    pub excludes: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CheckConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,

    /// Version token a CI directive must list (directive kinds only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_version: Option<String>,
}
