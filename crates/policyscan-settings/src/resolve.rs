use crate::model::{PolicyscanConfigV1, RepositoryFilterConfig};
use anyhow::Context;
use globset::Glob;
use policyscan_domain::model::FindingKind;
use policyscan_domain::policy::{
    CheckPolicy, EffectiveConfig, FindingKey, PolicyConfig, PolicyDecision,
};
use policyscan_types::{FilterKind, PathFilter, ids};
use regex::Regex;

pub const DEFAULT_CACHE_CAPACITY: usize = 64;

#[derive(Clone, Debug, Default)]
pub struct Overrides {
    pub max_results: Option<u32>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedConfig {
    pub effective: EffectiveConfig,
    pub policy: PolicyConfig,
    pub cache_capacity: usize,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            effective: EffectiveConfig::default(),
            policy: PolicyConfig::new(),
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

pub fn resolve_config(
    cfg: PolicyscanConfigV1,
    overrides: Overrides,
) -> anyhow::Result<ResolvedConfig> {
    if let Some(schema) = cfg.schema.as_deref()
        && schema != ids::SCHEMA_CONFIG_V1
    {
        anyhow::bail!(
            "unsupported config schema: {schema} (expected {})",
            ids::SCHEMA_CONFIG_V1
        );
    }

    let mut effective = EffectiveConfig::default();

    if let Some(mr) = overrides.max_results.or(cfg.scan.max_results) {
        effective.max_results = mr as usize;
    }

    let cache_capacity = match cfg.scan.cache_capacity {
        Some(0) => anyhow::bail!("scan.cache_capacity must be at least 1"),
        Some(n) => n as usize,
        None => DEFAULT_CACHE_CAPACITY,
    };

    effective.repositories =
        resolve_filter(&cfg.scan.repositories).context("invalid scan.repositories")?;

    // per-kind overrides
    for (kind_id, cc) in cfg.checks.iter() {
        let kind = parse_kind(kind_id).context("invalid [checks] table")?;
        let entry = effective
            .checks
            .entry(kind)
            .or_insert_with(CheckPolicy::enabled);

        if let Some(enabled) = cc.enabled {
            entry.enabled = enabled;
        }
        if let Some(version) = cc.required_version.as_deref() {
            if kind != FindingKind::TravisGoVersion {
                anyhow::bail!("required_version is not supported for {kind_id}");
            }
            if version.trim().is_empty() {
                anyhow::bail!("required_version for {kind_id} must not be empty");
            }
            entry.required_version = Some(version.to_string());
        }
    }

    let mut policy = PolicyConfig::new();
    for (kind_id, rules) in cfg.rules.iter() {
        let kind = parse_kind(kind_id).context("invalid [rules] table")?;
        for (name, decision) in rules {
            let decision = PolicyDecision::parse(decision).with_context(|| {
                format!(
                    "unknown decision for {kind_id}.{name}: {decision} (expected allow|forbid|unreviewed)"
                )
            })?;
            policy.set(FindingKey::new(kind, name.as_str()), decision);
        }
    }

    Ok(ResolvedConfig {
        effective,
        policy,
        cache_capacity,
    })
}

fn parse_kind(v: &str) -> anyhow::Result<FindingKind> {
    FindingKind::from_id(v).with_context(|| {
        format!(
            "unknown kind: {v} (expected {} or {})",
            ids::KIND_NPM_DEPENDENCY,
            ids::KIND_TRAVIS_GO_VERSION
        )
    })
}

fn resolve_filter(cfg: &RepositoryFilterConfig) -> anyhow::Result<PathFilter> {
    let kind = match cfg.kind.as_deref() {
        None | Some("regexp") | Some("regex") => FilterKind::Regexp,
        Some("glob") => FilterKind::Glob,
        Some(other) => anyhow::bail!("unknown filter kind: {other} (expected regexp|glob)"),
    };

    for pattern in cfg.includes.iter().chain(cfg.excludes.iter()) {
        match kind {
            FilterKind::Regexp => {
                Regex::new(pattern).with_context(|| format!("invalid regexp: {pattern}"))?;
            }
            FilterKind::Glob => {
                Glob::new(pattern).with_context(|| format!("invalid glob: {pattern}"))?;
            }
        }
    }

    Ok(PathFilter {
        includes: cfg.includes.clone(),
        excludes: cfg.excludes.clone(),
        kind,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_config_toml;
    use policyscan_domain::policy::DEFAULT_MAX_RESULTS;

    fn resolve(input: &str) -> anyhow::Result<ResolvedConfig> {
        resolve_config(parse_config_toml(input)?, Overrides::default())
    }

    #[test]
    fn empty_config_resolves_to_defaults() {
        let resolved = resolve("").expect("resolve");
        assert_eq!(resolved, ResolvedConfig::default());
        assert_eq!(resolved.effective.max_results, DEFAULT_MAX_RESULTS);
    }

    #[test]
    fn full_config_resolves() {
        let resolved = resolve(
            r#"
schema = "policyscan.config.v1"

[scan]
max_results = 50
cache_capacity = 8

[scan.repositories]
includes = ["^acme/"]
excludes = ["hackathon"]

[checks.travis_go_version]
required_version = "1.21.x"

[rules.npm_dependency]
left-pad = "forbid"
react = "allow"
"@types/node" = "unreviewed"
"#,
        )
        .expect("resolve");

        assert_eq!(resolved.effective.max_results, 50);
        assert_eq!(resolved.cache_capacity, 8);
        assert_eq!(
            resolved.effective.repositories,
            PathFilter::regexp(["^acme/"]).with_excludes(["hackathon"])
        );
        assert_eq!(resolved.effective.required_go_version(), "1.21.x");

        let decide =
            |name: &str| resolved.policy.decide(&FindingKey::new(FindingKind::NpmDependency, name));
        assert_eq!(decide("left-pad"), PolicyDecision::Forbidden);
        assert_eq!(decide("react"), PolicyDecision::Allowed);
        assert_eq!(decide("@types/node"), PolicyDecision::Unreviewed);
        assert_eq!(decide("lodash"), PolicyDecision::Unreviewed);
    }

    #[test]
    fn override_wins_over_file() {
        let cfg = parse_config_toml("[scan]\nmax_results = 50\n").expect("parse");
        let resolved = resolve_config(
            cfg,
            Overrides {
                max_results: Some(3),
            },
        )
        .expect("resolve");
        assert_eq!(resolved.effective.max_results, 3);
    }

    #[test]
    fn disabling_a_kind_removes_it_from_enabled_kinds() {
        let resolved = resolve("[checks.npm_dependency]\nenabled = false\n").expect("resolve");
        let kinds: Vec<_> = resolved.effective.enabled_kinds().collect();
        assert_eq!(kinds, vec![FindingKind::TravisGoVersion]);
    }

    #[test]
    fn invalid_values_are_rejected_with_context() {
        let cases = [
            ("schema = \"other.v9\"", "unsupported config schema"),
            ("[scan]\ncache_capacity = 0", "cache_capacity"),
            ("[rules.cargo_dependency]\nserde = \"allow\"", "unknown kind"),
            ("[rules.npm_dependency]\nreact = \"maybe\"", "unknown decision"),
            ("[scan.repositories]\nincludes = [\"(\"]", "invalid regexp"),
            (
                "[scan.repositories]\nkind = \"glob\"\nincludes = [\"a[\"]",
                "invalid glob",
            ),
            (
                "[checks.npm_dependency]\nrequired_version = \"1\"",
                "not supported",
            ),
        ];
        for (input, needle) in cases {
            let err = resolve(input).expect_err(input);
            let chain = format!("{err:#}");
            assert!(chain.contains(needle), "{input}: {chain}");
        }
    }
}
