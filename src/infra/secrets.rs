use std::{fmt, fs, panic, path::Path};

use serde::Deserialize;

use crate::infra::error::AppError;

const REDACTED: &str = "[REDACTED]";

const SENSITIVE_MARKERS: [&str; 5] = ["token", "bearer", "secret", "session", "authorization"];

/// Gateway credential. Never printed, not even through `Debug`.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    pub(crate) fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionToken({REDACTED})")
    }
}

#[derive(Deserialize)]
struct SessionFile {
    token: String,
}

pub fn read_session_token(path: &Path) -> Result<SessionToken, AppError> {
    if !path.exists() {
        return Err(AppError::SessionMissing {
            path: path.to_path_buf(),
        });
    }

    let raw = fs::read_to_string(path).map_err(|source| AppError::SessionRead {
        path: path.to_path_buf(),
        source,
    })?;
    let session: SessionFile =
        serde_json::from_str(&raw).map_err(|source| AppError::SessionParse {
            path: path.to_path_buf(),
            source,
        })?;

    let token = session.token.trim();
    if token.is_empty() {
        return Err(AppError::SessionEmpty {
            path: path.to_path_buf(),
        });
    }

    Ok(SessionToken::new(token))
}

pub fn redact_text(input: &str) -> String {
    input
        .split_whitespace()
        .map(redact_chunk)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Panic messages go to stderr, which may be captured by the MCP host.
pub fn install_panic_redaction_hook() {
    panic::set_hook(Box::new(|panic_info| {
        let payload = panic_info
            .payload()
            .downcast_ref::<&str>()
            .map(ToString::to_string)
            .or_else(|| panic_info.payload().downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "panic payload omitted".to_owned());

        let scrubbed = redact_text(&payload);

        match panic_info.location() {
            Some(location) => eprintln!(
                "telegram-mcp panic: {scrubbed} at {}:{}",
                location.file(),
                location.line()
            ),
            None => eprintln!("telegram-mcp panic: {scrubbed}"),
        }
    }));
}

fn redact_chunk(chunk: &str) -> String {
    let lowered = chunk.to_ascii_lowercase();
    if SENSITIVE_MARKERS.iter().any(|marker| lowered.contains(marker)) || looks_like_token(chunk) {
        REDACTED.to_owned()
    } else {
        chunk.to_owned()
    }
}

fn looks_like_token(value: &str) -> bool {
    let cleaned = value.trim_matches(|ch: char| !ch.is_ascii_alphanumeric());

    cleaned.len() >= 24
        && cleaned.chars().any(|ch| ch.is_ascii_alphabetic())
        && cleaned.chars().any(|ch| ch.is_ascii_digit())
}
