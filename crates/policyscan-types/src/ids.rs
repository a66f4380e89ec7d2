//! Stable identifiers for finding kinds and diagnostic identity tags.
//!
//! `KIND_*` ids are snake_case and appear in config (`[rules.<kind>]`) and reports.
//! `TAG_*` values prefix the encoded diagnostic code (`<TAG>:<payload>`).

// Kinds
pub const KIND_NPM_DEPENDENCY: &str = "npm_dependency";
pub const KIND_TRAVIS_GO_VERSION: &str = "travis_go_version";

// Identity tags
pub const TAG_DEPENDENCY_RULES: &str = "DEPENDENCY_RULES";
pub const TAG_TRAVIS_GO: &str = "TRAVIS_GO";

// Config
pub const SCHEMA_CONFIG_V1: &str = "policyscan.config.v1";
pub const DEFAULT_CONFIG_FILE: &str = "policyscan.toml";
