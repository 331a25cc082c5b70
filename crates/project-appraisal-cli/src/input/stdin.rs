use serde_json::Value;
use std::io::{self, Read};

/// Read piped input from stdin as JSON, falling back to YAML.
///
/// Returns None when stdin is an interactive terminal or the pipe is empty.
pub fn read_stdin() -> Result<Option<Value>, Box<dyn std::error::Error>> {
    if atty::is(atty::Stream::Stdin) {
        return Ok(None);
    }

    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer)?;

    let trimmed = buffer.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    let value = match serde_json::from_str::<Value>(trimmed) {
        Ok(value) => value,
        Err(json_err) => serde_yaml::from_str::<Value>(trimmed).map_err(|yaml_err| {
            format!("stdin is neither JSON ({json_err}) nor YAML ({yaml_err})")
        })?,
    };
    log::debug!("read {} bytes of piped input", trimmed.len());
    Ok(Some(value))
}
