//! Naming rules for shortcuts: reserved keys, uniqueness, ordering
//!
//! Pure validation over loaded records; holds no state of its own. Keys in
//! the reserved set belong to the interactive surface (navigation, global
//! actions, quick-jump slots) and can never be bound to a shortcut.

use thiserror::Error;

use crate::data::Shortcut;

/// Keys that can never be assigned to a shortcut:
/// hjkl navigation, global actions, their shifted forms, and quick-jump digits.
pub const RESERVED_KEYS: &[&str] = &[
    "h", "j", "k", "l", // navigation
    "n", "d", "r", "f", "g", "m", "q", // global actions
    "R", "F", "S", // shifted actions
    "1", "2", "3", "4", "5", "6", "7", "8", "9", // quick-jump slots
];

/// Longest accepted display name
pub const MAX_NAME_LEN: usize = 64;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("key \"{0}\" is reserved")]
    ReservedKey(String),
    #[error("key \"{0}\" is already bound to another shortcut")]
    DuplicateKey(String),
    #[error("{0} must not be empty")]
    EmptyField(&'static str),
    #[error("key must be 1-2 printable characters")]
    InvalidKey,
    #[error("name is too long (max {MAX_NAME_LEN} characters)")]
    NameTooLong,
}

/// Check a launch key against the reserved set and the existing catalog.
///
/// When editing, callers filter the shortcut's own row out of `existing`
/// before calling.
pub fn validate_key(key: &str, existing: &[Shortcut]) -> Result<(), ValidationError> {
    if key.is_empty() {
        return Err(ValidationError::EmptyField("key"));
    }
    let printable = key.chars().all(|c| !c.is_control() && !c.is_whitespace());
    if key.chars().count() > 2 || !printable {
        return Err(ValidationError::InvalidKey);
    }
    if RESERVED_KEYS.contains(&key) {
        return Err(ValidationError::ReservedKey(key.to_string()));
    }
    if existing.iter().any(|s| s.key == key) {
        return Err(ValidationError::DuplicateKey(key.to_string()));
    }
    Ok(())
}

/// Validate a whole shortcut record before it is saved
pub fn validate_shortcut(
    shortcut: &Shortcut,
    existing: &[Shortcut],
) -> Result<(), ValidationError> {
    let others: Vec<Shortcut> = existing
        .iter()
        .filter(|s| s.id != shortcut.id)
        .cloned()
        .collect();
    validate_key(&shortcut.key, &others)?;

    if shortcut.name.trim().is_empty() {
        return Err(ValidationError::EmptyField("name"));
    }
    if shortcut.name.chars().count() > MAX_NAME_LEN {
        return Err(ValidationError::NameTooLong);
    }
    if shortcut.project_path.as_os_str().is_empty() {
        return Err(ValidationError::EmptyField("project path"));
    }
    Ok(())
}

/// Next sort position within a group: max existing order + 1
pub fn next_order(group_path: &str, existing: &[Shortcut]) -> i64 {
    existing
        .iter()
        .filter(|s| s.group_path == group_path)
        .map(|s| s.order)
        .max()
        .map(|max| max + 1)
        .unwrap_or(0)
}
