use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

use super::{format_value, primary_rows};

/// Format output as tables using the tabled crate: a field/value table of
/// the scalar result fields, then one table per record list.
pub fn print_table(value: &Value) {
    match value {
        Value::Object(map) => {
            if let Some(result) = map.get("result") {
                print_result_tables(result, map);
            } else if let Some(rows) = primary_rows(value) {
                print_rows(rows);
            } else {
                print_fields(map);
            }
        }
        Value::Array(arr) => print_rows(arr),
        _ => println!("{}", value),
    }
}

fn print_result_tables(result: &Value, envelope: &Map<String, Value>) {
    let Value::Object(res_map) = result else {
        println!("{}", format_value(result, ", "));
        return;
    };

    let scalars: Map<String, Value> = res_map
        .iter()
        .filter(|(_, v)| !is_record_list(v) && !v.is_object())
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    if !scalars.is_empty() {
        print_fields(&scalars);
    }

    // Nested single records (coefficients, a lowest-risk mix, ...)
    for (key, val) in res_map {
        if let Value::Object(inner) = val {
            if inner.values().all(|v| !v.is_object() && !is_record_list(v)) {
                println!("\n{}:", key);
                print_fields(inner);
            }
        }
    }

    if let Some(rows) = primary_rows(result) {
        println!();
        print_rows(rows);
    }

    if let Some(Value::Array(diagnostics)) = res_map.get("diagnostics") {
        if !diagnostics.is_empty() {
            println!("\nSkipped points:");
            print_rows(diagnostics);
        }
    }

    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings.iter().filter_map(Value::as_str) {
                println!("  - {}", w);
            }
        }
    }

    if let Some(Value::String(meth)) = envelope.get("methodology") {
        println!("\nMethodology: {}", meth);
    }
}

fn is_record_list(value: &Value) -> bool {
    matches!(value, Value::Array(arr) if arr.iter().any(Value::is_object))
}

fn print_fields(map: &Map<String, Value>) {
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    for (key, val) in map {
        builder.push_record([key.as_str(), &format_value(val, ", ")]);
    }
    println!("{}", Table::from(builder));
}

fn print_rows(rows: &[Value]) {
    let Some(Value::Object(first)) = rows.first() else {
        println!("(empty)");
        return;
    };

    let headers: Vec<String> = first.keys().cloned().collect();
    let mut builder = Builder::default();
    builder.push_record(&headers);
    for item in rows {
        if let Value::Object(map) = item {
            let row: Vec<String> = headers
                .iter()
                .map(|h| map.get(h).map(|v| format_value(v, ", ")).unwrap_or_default())
                .collect();
            builder.push_record(row);
        }
    }
    println!("{}", Table::from(builder));
}
