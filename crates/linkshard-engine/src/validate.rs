use crate::error::{EngineError, Result};
use url::Url;

/// Longest accepted long URL, in bytes.
pub const MAX_URL_LEN: usize = 2048;
pub const MIN_DAYS_TO_LIVE: u32 = 1;
pub const MAX_DAYS_TO_LIVE: u32 = 365;

/// Validates that `raw` is an absolute `http`/`https` URL with a host.
pub fn long_url(raw: &str) -> Result<()> {
    if raw.is_empty() {
        return Err(EngineError::InvalidInput("URL cannot be empty".to_string()));
    }
    if raw.len() > MAX_URL_LEN {
        return Err(EngineError::InvalidInput(format!(
            "URL must be at most {MAX_URL_LEN} bytes, got {}",
            raw.len()
        )));
    }

    let parsed = Url::parse(raw)
        .map_err(|e| EngineError::InvalidInput(format!("invalid URL '{raw}': {e}")))?;

    match parsed.scheme() {
        "http" | "https" => {}
        other => {
            return Err(EngineError::InvalidInput(format!(
                "URL scheme must be http or https: {other}"
            )))
        }
    }

    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(EngineError::InvalidInput(format!("URL has no host: {raw}")));
    }

    Ok(())
}

pub fn days_to_live(days: u32) -> Result<()> {
    if !(MIN_DAYS_TO_LIVE..=MAX_DAYS_TO_LIVE).contains(&days) {
        return Err(EngineError::InvalidInput(format!(
            "days to live must be between {MIN_DAYS_TO_LIVE} and {MAX_DAYS_TO_LIVE}, got {days}"
        )));
    }
    Ok(())
}
