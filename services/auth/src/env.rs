//! Helpers for reading typed settings out of the process environment

use anyhow::{Context, Result, anyhow};
use std::time::Duration;

/// Read a required, non-empty variable
pub fn required(name: &str) -> Result<String> {
    let value = std::env::var(name)
        .map_err(|_| anyhow!("{} environment variable not set", name))?;

    if value.trim().is_empty() {
        return Err(anyhow!("{} environment variable is empty", name));
    }

    Ok(value)
}

/// Read an optional variable, falling back to `default`
pub fn string(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

/// Read a humantime duration such as `15m` or `720h`, falling back to `default`
pub fn duration(name: &str, default: &str) -> Result<Duration> {
    let raw = std::env::var(name).unwrap_or_else(|_| default.to_string());
    humantime::parse_duration(raw.trim())
        .with_context(|| format!("{} is not a valid duration: {:?}", name, raw))
}

/// Read a boolean flag (`true`/`false`/`1`/`0`)
pub fn flag(name: &str, default: bool) -> Result<bool> {
    match std::env::var(name) {
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" => Ok(false),
            other => Err(anyhow!("{} is not a boolean: {:?}", name, other)),
        },
        Err(_) => Ok(default),
    }
}

/// Read a number, falling back to `default` when unset
pub fn number<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} is not a valid number", name)),
        Err(_) => Ok(default),
    }
}
