//! Config parsing, validation and policy resolution.
//!
//! This crate is IO-free: it parses, resolves and patches configuration provided as strings.

#![forbid(unsafe_code)]

mod model;
mod patch;
mod resolve;

pub use model::{CheckConfig, PolicyscanConfigV1, RepositoryFilterConfig, ScanConfig};
pub use patch::apply_policy_patch;
pub use resolve::{DEFAULT_CACHE_CAPACITY, Overrides, ResolvedConfig};

/// Parse `policyscan.toml` (or equivalent) into a typed model.
pub fn parse_config_toml(input: &str) -> anyhow::Result<PolicyscanConfigV1> {
    let cfg: PolicyscanConfigV1 = toml::from_str(input)?;
    Ok(cfg)
}

/// Resolve the scan settings and policy decisions used by the engine.
pub fn resolve_config(
    cfg: PolicyscanConfigV1,
    overrides: Overrides,
) -> anyhow::Result<ResolvedConfig> {
    resolve::resolve_config(cfg, overrides)
}

/// Parse and resolve in one step. Empty input resolves to defaults.
pub fn load_config_str(input: &str, overrides: Overrides) -> anyhow::Result<ResolvedConfig> {
    resolve_config(parse_config_toml(input)?, overrides)
}
