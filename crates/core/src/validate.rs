//! Field-level validation helpers shared by the domain crates.
//!
//! Every helper reports the offending field name in the `Validation` message so
//! callers can surface it unchanged.

use crate::error::{DomainError, DomainResult};

/// Require `value` to be between `min` and `max` characters (inclusive).
pub fn length(field: &str, value: &str, min: usize, max: usize) -> DomainResult<()> {
    let len = value.chars().count();
    if len < min {
        return Err(DomainError::validation(format!(
            "{field} must be at least {min} characters"
        )));
    }
    if len > max {
        return Err(DomainError::validation(format!(
            "{field} must be at most {max} characters"
        )));
    }
    Ok(())
}

/// Require `value` to be at least `min` characters.
pub fn min_length(field: &str, value: &str, min: usize) -> DomainResult<()> {
    length(field, value, min, usize::MAX)
}

/// Like [`length`], skipped when the value is absent.
pub fn optional_max_length(field: &str, value: Option<&str>, max: usize) -> DomainResult<()> {
    match value {
        Some(v) => length(field, v, 0, max),
        None => Ok(()),
    }
}

/// Basis points must stay within 0..=10000 (0–100%).
pub fn basis_points(field: &str, bps: u32) -> DomainResult<()> {
    if bps > 10_000 {
        return Err(DomainError::validation(format!(
            "{field} must be between 0 and 10000 basis points"
        )));
    }
    Ok(())
}

/// Minimal e-mail shape check: `local@domain.tld`, no whitespace.
pub fn email(field: &str, value: &str) -> DomainResult<()> {
    let shaped = !value.chars().any(char::is_whitespace)
        && match value.split_once('@') {
            Some((local, domain)) => {
                !local.is_empty()
                    && !domain.contains('@')
                    && domain
                        .split_once('.')
                        .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
                    && !domain.ends_with('.')
            }
            None => false,
        };
    if !shaped {
        return Err(DomainError::validation(format!("{field} must be a valid e-mail address")));
    }
    Ok(())
}

/// Absolute URLs only (`http://` or `https://`).
pub fn url(field: &str, value: &str) -> DomainResult<()> {
    let rest = value
        .strip_prefix("https://")
        .or_else(|| value.strip_prefix("http://"));
    match rest {
        Some(host) if !host.is_empty() && !host.starts_with('/') => Ok(()),
        _ => Err(DomainError::validation(format!("{field} must be an absolute URL"))),
    }
}
