use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Load a request from `--input <file>`, else from the request built out of
/// command-line flags (a `--dataset`), else from piped stdin.
pub fn load_request<T, F>(path: Option<&str>, from_flags: F, what: &str) -> CliResult<T>
where
    T: DeserializeOwned,
    F: FnOnce() -> Option<T>,
{
    if let Some(path) = path {
        return read_json(path);
    }
    if let Some(request) = from_flags() {
        return Ok(request);
    }
    if let Some(data) = read_stdin()? {
        return Ok(serde_json::from_value(data)?);
    }
    Err(format!("--input <file.json>, --dataset or stdin required for {}", what).into())
}

/// Read a JSON request file and deserialise into a typed struct.
pub fn read_json<T: DeserializeOwned>(path: &str) -> CliResult<T> {
    let canonical = resolve_path(path)?;
    let contents = fs::read_to_string(&canonical)
        .map_err(|e| format!("Failed to read '{}': {}", canonical.display(), e))?;
    let value: T = serde_json::from_str(&contents)
        .map_err(|e| format!("Failed to parse '{}': {}", canonical.display(), e))?;
    tracing::debug!(path = %canonical.display(), "loaded request file");
    Ok(value)
}

/// Piped JSON from stdin; None when stdin is a TTY or empty.
fn read_stdin() -> CliResult<Option<Value>> {
    if atty::is(atty::Stream::Stdin) {
        return Ok(None);
    }

    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer)?;

    let trimmed = buffer.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    tracing::debug!(bytes = trimmed.len(), "read request from stdin");
    Ok(Some(serde_json::from_str(trimmed)?))
}

fn resolve_path(path: &str) -> CliResult<PathBuf> {
    let p = Path::new(path);
    let canonical = if p.is_absolute() {
        p.to_path_buf()
    } else {
        std::env::current_dir()?.join(p)
    };

    if !canonical.is_file() {
        return Err(format!("File not found: {}", canonical.display()).into());
    }
    Ok(canonical)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_win_over_stdin() {
        let v: Value = load_request(None, || Some(serde_json::json!({"k": 1})), "test").unwrap();
        assert_eq!(v["k"], 1);
    }

    #[test]
    fn test_missing_file_reported() {
        let err = read_json::<Value>("/definitely/not/here.json").unwrap_err();
        assert!(err.to_string().contains("File not found"));
    }

    #[test]
    fn test_reads_request_file() {
        let path = std::env::temp_dir().join("mpt_input_test.json");
        fs::write(&path, r#"{"expected_returns": ["0.1"]}"#).unwrap();
        let v: Value = read_json(path.to_str().unwrap()).unwrap();
        assert_eq!(v["expected_returns"][0], "0.1");
        let _ = fs::remove_file(path);
    }
}
