use libregent::{RegentError, Response, StatusCode};
use owo_colors::OwoColorize;
use std::io::IsTerminal;

/// When to color output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorChoice {
    Auto,
    Always,
    Never,
}

impl From<&str> for ColorChoice {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "always" => ColorChoice::Always,
            "never" => ColorChoice::Never,
            _ => ColorChoice::Auto,
        }
    }
}

impl ColorChoice {
    /// Resolves the choice against the environment.
    pub fn enabled(self) -> bool {
        match self {
            ColorChoice::Always => true,
            ColorChoice::Never => false,
            ColorChoice::Auto => should_color(),
        }
    }
}

/// Check if we should use colors in output
pub fn should_color() -> bool {
    std::io::stdout().is_terminal() && std::env::var("NO_COLOR").is_err()
}

/// Print an error message to stderr
pub fn error(message: &str) {
    if std::io::stderr().is_terminal() && std::env::var("NO_COLOR").is_err() {
        eprintln!("{} {}", "✗".red().bold(), message);
    } else {
        eprintln!("✗ {}", message);
    }
}

/// Formats the status line, e.g. `HTTP 200 OK`.
pub fn status_line(status: StatusCode, color: bool) -> String {
    let line = format!(
        "HTTP {} {}",
        status.as_u16(),
        status.canonical_reason().unwrap_or_default()
    );
    let line = line.trim_end().to_string();

    if !color {
        return line;
    }
    if status.is_success() {
        format!("{}", line.green().bold())
    } else if status.is_redirection() {
        format!("{}", line.yellow().bold())
    } else {
        format!("{}", line.red().bold())
    }
}

/// Formats response headers as `name: value` lines.
pub fn header_lines(response: &Response, color: bool) -> Vec<String> {
    response
        .headers()
        .iter()
        .map(|(name, value)| {
            let value = String::from_utf8_lossy(value.as_bytes());
            if color {
                format!("{}: {}", name.as_str().cyan(), value)
            } else {
                format!("{}: {}", name, value)
            }
        })
        .collect()
}

/// Formats the Location header, if any.
pub fn location_line(response: &Response, color: bool) -> Option<String> {
    let location = response.absolute_location();
    if location.is_empty() {
        return None;
    }
    let label = if color {
        format!("{}", "Location:".bold())
    } else {
        "Location:".to_string()
    };
    Some(format!("{} {}", label, location))
}

/// Formats the registry error list of a response.
pub fn error_lines(response: &Response) -> Result<Vec<String>, String> {
    match response.errors() {
        Ok(errors) => Ok(errors.iter().map(|e| format!("  - {}", e)).collect()),
        Err(RegentError::MalformedErrorBody { source }) => {
            Err(format!("Response has no registry error list: {}", source))
        }
        Err(e) => Err(e.to_string()),
    }
}

/// Describes why a response failed, e.g. `Not found: <url>`.
///
/// Returns `None` for a success status.
pub fn failure_summary(response: &Response) -> Option<String> {
    let error = response.clone().check_status().err()?;
    Some(match &error {
        RegentError::RateLimit {
            retry_after: Some(seconds),
            ..
        } => format!("{} (retry after {}s)", error, seconds),
        _ => error.to_string(),
    })
}

/// Formats a response body; JSON is pretty-printed.
///
/// Returns `None` for an empty body.
pub fn body_text(body: &[u8]) -> Option<String> {
    if body.is_empty() {
        return None;
    }
    match serde_json::from_slice::<serde_json::Value>(body) {
        Ok(value) => serde_json::to_string_pretty(&value).ok(),
        Err(_) => Some(String::from_utf8_lossy(body).into_owned()),
    }
}

#[cfg(test)]
#[path = "tests.rs"]
mod tests;
