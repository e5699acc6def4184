//! Environment variable utilities
//!
//! Runtime overrides for the engine configuration are read through these
//! helpers. Unset or unparsable variables fall back to the given default.
//!
//! ```ignore
//! use mwait_core::env::{env_get, env_get_bool};
//!
//! let cpu: usize = env_get("MW_MONITOR_CPU", 0);
//! let pin = env_get_bool("MW_PIN_THREADS", true);
//! ```

use std::str::FromStr;

/// Get environment variable parsed as `T`, or return `default`
#[inline]
pub fn env_get<T>(key: &str, default: T) -> T
where
    T: FromStr,
{
    env_get_opt(key).unwrap_or(default)
}

/// Get environment variable as boolean
///
/// "1", "true", "yes", "on" (any case) are true; "0", "false", "no", "off"
/// are false. Unset or anything else returns `default`.
#[inline]
pub fn env_get_bool(key: &str, default: bool) -> bool {
    match std::env::var(key) {
        Ok(val) => match val.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => default,
        },
        Err(_) => default,
    }
}

/// Get environment variable as optional value
///
/// Accepts a `0x` prefix for hexadecimal integers.
#[inline]
pub fn env_get_opt<T>(key: &str) -> Option<T>
where
    T: FromStr,
{
    let raw = std::env::var(key).ok()?;
    let raw = raw.trim();
    raw.parse().ok().or_else(|| parse_hex(raw))
}

fn parse_hex<T: FromStr>(raw: &str) -> Option<T> {
    let digits = raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X"))?;
    let value = u64::from_str_radix(digits, 16).ok()?;
    value.to_string().parse().ok()
}

/// Get environment variable as string, or return default
#[inline]
pub fn env_get_str(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Check if environment variable is set (regardless of value)
#[inline]
pub fn env_is_set(key: &str) -> bool {
    std::env::var_os(key).is_some()
}
