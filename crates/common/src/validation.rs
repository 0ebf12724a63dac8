//! Structural checks run before any store call.
//!
//! Every failure is [`VaultError::InvalidInput`]; nothing here touches a store.

use std::collections::HashSet;

use time::Duration;

use crate::error::{Result, VaultError};

pub const HANDLE_MIN: usize = 3;
pub const HANDLE_MAX: usize = 25;
pub const NAME_MAX: usize = 64;
pub const KEY_MAX: usize = 20;
pub const VALUE_MAX: usize = 64 * 1024;
pub const PASSWORD_MIN: usize = 8;
pub const PASSWORD_MAX: usize = 128;
pub const SHARE_TARGETS_MAX: usize = 64;
/// Longest relative lifetime a share may be given.
pub const SHARE_DURATION_MAX: Duration = Duration::days(100 * 365);

/// Keys starting with this prefix belong to the system.
pub const RESERVED_PREFIX: &str = "__";

fn invalid(msg: impl Into<String>) -> VaultError {
    VaultError::InvalidInput(msg.into())
}

pub fn handle(handle: &str) -> Result<()> {
    if !(HANDLE_MIN..=HANDLE_MAX).contains(&handle.len()) {
        return Err(invalid(format!(
            "handle must be {HANDLE_MIN} to {HANDLE_MAX} characters"
        )));
    }
    if !handle
        .bytes()
        .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-' || b == b'_')
    {
        return Err(invalid(
            "handle may only contain lowercase letters, digits, '-' and '_'",
        ));
    }
    Ok(())
}

pub fn is_handle(candidate: &str) -> bool {
    handle(candidate).is_ok()
}

pub fn name(name: &str) -> Result<()> {
    let len = name.chars().count();
    if len == 0 || len > NAME_MAX {
        return Err(invalid(format!("name must be 1 to {NAME_MAX} characters")));
    }
    if name.chars().any(char::is_control) {
        return Err(invalid("name may not contain control characters"));
    }
    Ok(())
}

/// A caller-supplied secret key. Rejects the reserved namespace.
pub fn key(key: &str) -> Result<()> {
    if key.is_empty() || key.len() > KEY_MAX {
        return Err(invalid(format!("key must be 1 to {KEY_MAX} characters")));
    }
    if !key
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b':'))
    {
        return Err(invalid(
            "key may only contain letters, digits, '-', '_' and ':'",
        ));
    }
    if key.starts_with(RESERVED_PREFIX) {
        return Err(invalid(format!("key {key} is reserved")));
    }
    Ok(())
}

pub fn value(value: &str) -> Result<()> {
    if value.is_empty() || value.len() > VALUE_MAX {
        return Err(invalid(format!("value must be 1 to {VALUE_MAX} bytes")));
    }
    Ok(())
}

pub fn password(password: &str) -> Result<()> {
    if !(PASSWORD_MIN..=PASSWORD_MAX).contains(&password.len()) {
        return Err(invalid(format!(
            "password must be {PASSWORD_MIN} to {PASSWORD_MAX} bytes"
        )));
    }
    Ok(())
}

/// Targets of a share request from `owner`.
pub fn share_targets(owner: &str, targets: &[String]) -> Result<()> {
    if targets.is_empty() {
        return Err(invalid("a share needs at least one target"));
    }
    if targets.len() > SHARE_TARGETS_MAX {
        return Err(invalid(format!(
            "a share may have at most {SHARE_TARGETS_MAX} targets"
        )));
    }
    let mut seen = HashSet::with_capacity(targets.len());
    for target in targets {
        handle(target)?;
        if target == owner {
            return Err(invalid("cannot share a secret with yourself"));
        }
        if !seen.insert(target.as_str()) {
            return Err(invalid(format!("{target} is listed twice")));
        }
    }
    Ok(())
}

pub fn duration(duration: Duration) -> Result<()> {
    if !duration.is_positive() {
        return Err(invalid("duration must be positive"));
    }
    if duration > SHARE_DURATION_MAX {
        return Err(invalid(format!(
            "duration may be at most {} days",
            SHARE_DURATION_MAX.whole_days()
        )));
    }
    Ok(())
}
