use serde_json::Value;

/// Print just the key answer value from the output.
///
/// Looks for well-known result fields in order of priority; a frontier
/// scan reports its solved point count.
pub fn print_minimal(value: &Value) {
    println!("{}", minimal_answer(value));
}

fn minimal_answer(value: &Value) -> String {
    let result = value.get("result").unwrap_or(value);

    if let Some(Value::Array(points)) = result.pointer("/profile/points") {
        let skipped = result
            .get("diagnostics")
            .and_then(Value::as_array)
            .map_or(0, |d| d.len());
        return format!("{} points, {} skipped", points.len(), skipped);
    }

    let priority_keys = [
        "sharpe_ratio",
        "standard_deviation",
        "expected_return",
        "min_variance_sample",
        "lowest_risk",
    ];

    if let Value::Object(map) = result {
        for key in &priority_keys {
            if let Some(val) = map.get(*key) {
                if !val.is_null() {
                    return format_minimal(val);
                }
            }
        }
        if let Some((key, val)) = map.iter().next() {
            return format!("{}: {}", key, format_minimal(val));
        }
    }

    format_minimal(result)
}

fn format_minimal(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        // Mixes and samples print as "risk return"
        Value::Object(map) if map.contains_key("standard_deviation") => format!(
            "{} {}",
            format_minimal(&map["standard_deviation"]),
            format_minimal(map.get("expected_return").unwrap_or(&Value::Null))
        ),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}
