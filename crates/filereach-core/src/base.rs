//! Validation of the mounted base image used during generation.

use std::path::Path;

use crate::error::{ReachError, Result};

/// Marker file every base snap carries.
pub const BASE_MARKER: &str = "meta/snap.yaml";

/// Library tree every base snap provides.
pub const BASE_USR_DIR: &str = "usr";

/// Check that `path` looks like a mounted base snap.
pub fn validate_mounted_base(path: &Path) -> Result<()> {
    let invalid = |reason: &str| ReachError::InvalidBase {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    };

    if !path.is_dir() {
        return Err(invalid("is not a directory"));
    }
    if !path.join(BASE_MARKER).exists() || !path.join(BASE_USR_DIR).is_dir() {
        return Err(invalid("does not look like a base snap"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_valid_base() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("meta")).unwrap();
        fs::create_dir_all(dir.path().join("usr")).unwrap();
        fs::write(dir.path().join("meta/snap.yaml"), "name: core22\n").unwrap();
        assert!(validate_mounted_base(dir.path()).is_ok());
    }

    #[test]
    fn test_not_a_directory() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("file");
        fs::write(&file, "").unwrap();
        let err = validate_mounted_base(&file).unwrap_err();
        assert!(err.to_string().contains("is not a directory"));
    }

    #[test]
    fn test_missing_marker() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("usr")).unwrap();
        let err = validate_mounted_base(dir.path()).unwrap_err();
        assert!(err.to_string().contains("does not look like a base snap"));
    }

    #[test]
    fn test_missing_usr() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("meta")).unwrap();
        fs::write(dir.path().join("meta/snap.yaml"), "").unwrap();
        assert!(validate_mounted_base(dir.path()).is_err());
    }
}
