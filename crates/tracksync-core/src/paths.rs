use crate::error::{Result, SyncError};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const TRACKSYNC_DIR: &str = ".tracksync";
pub const CONFIG_FILE: &str = ".tracksync/config.yaml";
pub const DB_FILE: &str = ".tracksync/workflow.db";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn tracksync_dir(root: &Path) -> PathBuf {
    root.join(TRACKSYNC_DIR)
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

pub fn db_path(root: &Path) -> PathBuf {
    root.join(DB_FILE)
}

// ---------------------------------------------------------------------------
// Project identifier validation
// ---------------------------------------------------------------------------

static IDENTIFIER_RE: OnceLock<Regex> = OnceLock::new();

fn identifier_re() -> &'static Regex {
    IDENTIFIER_RE.get_or_init(|| {
        Regex::new(r"^[a-z0-9][a-z0-9\-]*[a-z0-9]$|^[a-z0-9]$").expect("identifier regex")
    })
}

pub fn validate_identifier(identifier: &str) -> Result<()> {
    if identifier.is_empty() || identifier.len() > 64 || !identifier_re().is_match(identifier) {
        return Err(SyncError::InvalidInput(format!(
            "invalid project identifier '{identifier}': must be lowercase alphanumeric with hyphens"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_identifiers() {
        for id in ["scrum-team", "a", "backend-2", "x1"] {
            validate_identifier(id).unwrap_or_else(|_| panic!("expected valid: {id}"));
        }
    }

    #[test]
    fn invalid_identifiers() {
        for id in ["", "-leading", "trailing-", "has space", "UPPER", "a_b"] {
            assert!(validate_identifier(id).is_err(), "expected invalid: {id}");
        }
    }

    #[test]
    fn path_helpers() {
        let root = Path::new("/tmp/proj");
        assert_eq!(
            config_path(root),
            PathBuf::from("/tmp/proj/.tracksync/config.yaml")
        );
        assert_eq!(db_path(root), PathBuf::from("/tmp/proj/.tracksync/workflow.db"));
    }
}
