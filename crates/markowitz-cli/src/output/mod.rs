pub mod csv_out;
pub mod minimal;
pub mod table;

use crate::OutputFormat;
use serde_json::Value;

/// Dispatch output to the appropriate formatter.
pub fn format_output(format: &OutputFormat, value: &Value) {
    match format {
        OutputFormat::Json => match serde_json::to_string_pretty(value) {
            Ok(s) => println!("{}", s),
            Err(e) => eprintln!("JSON serialization error: {}", e),
        },
        OutputFormat::Table => table::print_table(value),
        OutputFormat::Csv => csv_out::print_csv(value),
        OutputFormat::Minimal => minimal::print_minimal(value),
    }
}

/// The record list a result is "about": frontier points, portfolio
/// weights, or the hull of a point cloud.
pub fn primary_rows(result: &Value) -> Option<&Vec<Value>> {
    let candidates = [
        result.pointer("/profile/points"),
        result.pointer("/weights"),
        result.pointer("/portfolio/weights"),
        result.pointer("/hull"),
        result.pointer("/datasets"),
    ];
    candidates
        .into_iter()
        .flatten()
        .filter_map(Value::as_array)
        .find(|rows| rows.iter().all(Value::is_object))
}

/// Scalar rendering shared by the table and CSV writers. Arrays of scalars
/// (weight vectors) are joined with `sep`.
pub fn format_value(value: &Value, sep: &str) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        Value::Array(arr) if arr.iter().all(|v| !v.is_object() && !v.is_array()) => arr
            .iter()
            .map(|v| format_value(v, sep))
            .collect::<Vec<_>>()
            .join(sep),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_primary_rows_prefers_frontier_points() {
        let v = json!({
            "diagnostics": [{"message": "x"}],
            "profile": {"points": [{"kind": "SCAN"}, {"kind": "MIN_VARIANCE"}]}
        });
        assert_eq!(primary_rows(&v).map(|r| r.len()), Some(2));
    }

    #[test]
    fn test_primary_rows_falls_back_to_weights() {
        let v = json!({"weights": [{"name": "A", "weight": "1"}], "variance": "0.1"});
        assert_eq!(primary_rows(&v).map(|r| r.len()), Some(1));
        assert!(primary_rows(&json!({"weights": ["0.5", "0.5"]})).is_none());
    }

    #[test]
    fn test_format_value_joins_weight_vectors() {
        assert_eq!(format_value(&json!(["0.25", "0.75"]), "; "), "0.25; 0.75");
        assert_eq!(format_value(&Value::Null, ","), "");
    }
}
