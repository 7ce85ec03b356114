//! Validation for CA and client names.
//!
//! Names become certificate common names and directory names, so they are
//! restricted to a character set that cannot escape a path component or be
//! interpreted by a shell.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{CertDeskError, Result};

pub const MAX_NAME_LEN: usize = 64;

static NAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]{0,63}$").expect("name pattern is valid")
});

/// Checks `name` against the allowed pattern; `what` names the field in the error.
pub fn validate_name(what: &str, name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(CertDeskError::InvalidInput(format!(
            "{what} must not be empty"
        )));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(CertDeskError::InvalidInput(format!(
            "{what} must be at most {MAX_NAME_LEN} characters"
        )));
    }
    if !NAME_PATTERN.is_match(name) {
        return Err(CertDeskError::InvalidInput(format!(
            "{what} may only contain letters, digits, '.', '_' and '-', and must start with a letter or digit"
        )));
    }
    Ok(())
}
