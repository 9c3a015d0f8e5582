use serde::de::DeserializeOwned;
use std::io::{self, Read};

/// Piped stdin as text. Returns None if stdin is a TTY (interactive) or the
/// pipe is empty.
pub fn read_stdin_text() -> Result<Option<String>, Box<dyn std::error::Error>> {
    if atty::is(atty::Stream::Stdin) {
        return Ok(None);
    }

    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer)?;

    if buffer.trim().is_empty() {
        return Ok(None);
    }
    Ok(Some(buffer))
}

/// Piped stdin parsed as JSON into `T`.
pub fn read_stdin_json<T: DeserializeOwned>() -> Result<Option<T>, Box<dyn std::error::Error>> {
    match read_stdin_text()? {
        Some(text) => {
            let value: T = serde_json::from_str(text.trim())
                .map_err(|e| format!("Failed to parse stdin: {}", e))?;
            Ok(Some(value))
        }
        None => Ok(None),
    }
}
