use anyhow::Context;
use policyscan_domain::policy::{FindingKey, PolicyDecision};
use toml_edit::{DocumentMut, Item, Table, value};

/// Merge-patch one policy decision into `policyscan.toml` text.
///
/// Only `[rules.<kind>]` is touched; other tables, comments and formatting are preserved. An
/// existing entry for the same name is overwritten.
pub fn apply_policy_patch(
    input: &str,
    key: &FindingKey,
    decision: PolicyDecision,
) -> anyhow::Result<String> {
    let mut doc = input
        .parse::<DocumentMut>()
        .context("parse policyscan.toml for patching")?;

    let rules = doc
        .entry("rules")
        .or_insert_with(implicit_table)
        .as_table_like_mut()
        .context("`rules` is not a table")?;
    let section = rules
        .entry(key.kind.id())
        .or_insert(Item::Table(Table::new()))
        .as_table_like_mut()
        .with_context(|| format!("`rules.{}` is not a table", key.kind.id()))?;
    section.insert(&key.name, value(decision.as_str()));

    Ok(doc.to_string())
}

fn implicit_table() -> Item {
    let mut t = Table::new();
    t.set_implicit(true);
    Item::Table(t)
}
