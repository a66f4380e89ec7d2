use serde_json::Value;

const TIMESTAMP: &str = "__TIMESTAMP__";

/// Normalize non-deterministic report fields for golden comparison.
///
/// `tool.version` is replaced only when the root looks like a scan report (`schema`, `tool`,
/// `run`, `summary` and `diagnostics` all present). Timestamps and `duration_ms` are replaced
/// at any depth.
pub fn normalize_nondeterministic(mut value: Value) -> Value {
    if let Some(obj) = value.as_object_mut() {
        let is_report = ["schema", "tool", "run", "summary", "diagnostics"]
            .iter()
            .all(|k| obj.contains_key(*k));
        if is_report
            && let Some(tool) = obj.get_mut("tool").and_then(Value::as_object_mut)
            && tool.contains_key("version")
        {
            tool.insert(
                "version".to_string(),
                Value::String("__VERSION__".to_string()),
            );
        }
    }
    normalize_timestamps(&mut value);
    value
}

fn normalize_timestamps(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for key in ["started_at", "ended_at"] {
                if let Some(v) = map.get_mut(key) {
                    *v = Value::String(TIMESTAMP.to_string());
                }
            }
            if let Some(v) = map.get_mut("duration_ms") {
                *v = Value::Number(0.into());
            }
            for val in map.values_mut() {
                normalize_timestamps(val);
            }
        }
        Value::Array(arr) => arr.iter_mut().for_each(normalize_timestamps),
        _ => {}
    }
}
