//! Filesystem preconditions checked before any stage runs.
//!
//! A full chain run can take days, so every required directory, executable
//! and config file is validated up front. The primitives report missing
//! pieces with a printed diagnostic and a `false` result; unexpected
//! filesystem errors propagate instead of being swallowed.

use anyhow::{Context, Result};
use std::ffi::CString;
use std::io::ErrorKind;
use std::path::Path;

/// Check that `path` is an existing directory, optionally creating it.
///
/// Returns `Ok(false)` with a diagnostic when the directory is missing and
/// not creatable (or creation is denied); "already exists" counts as
/// success. Errors other than permission denial propagate.
pub fn ensure_dir(path: &Path, create: bool) -> Result<bool> {
    if path.is_dir() {
        return Ok(true);
    }
    if !create {
        eprintln!("[ERROR] Directory '{}' does not exist", path.display());
        return Ok(false);
    }
    println!(
        "Directory '{}' does not exist, it will be created now",
        path.display()
    );
    match std::fs::create_dir_all(path) {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == ErrorKind::PermissionDenied => {
            eprintln!(
                "[ERROR] You don't have the permission to create directories in '{}'",
                path.parent().unwrap_or(path).display()
            );
            Ok(false)
        }
        Err(err) if err.kind() == ErrorKind::AlreadyExists => Ok(true),
        Err(err) => Err(err).with_context(|| format!("create {}", path.display())),
    }
}

/// Check that `dir/name` is an existing file, with a diagnostic if not.
pub fn require_file(dir: &Path, name: &str) -> bool {
    let path = dir.join(name);
    if path.is_file() {
        true
    } else {
        eprintln!("[ERROR] The file '{}' does not exist!", path.display());
        false
    }
}

fn access(path: &Path, mode: libc::c_int) -> bool {
    let Some(bytes) = path.to_str().map(str::as_bytes) else {
        return false;
    };
    let Ok(c_path) = CString::new(bytes) else {
        return false;
    };
    // Mirrors os.access: consult real uid/gid rather than opening the file.
    unsafe { libc::access(c_path.as_ptr(), mode) == 0 }
}

pub fn is_readable(path: &Path) -> bool {
    path.is_dir() && access(path, libc::R_OK)
}

pub fn is_writable(path: &Path) -> bool {
    path.is_dir() && access(path, libc::W_OK)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn ensure_dir_accepts_existing() {
        let dir = TempDir::new().expect("tempdir");
        assert!(ensure_dir(dir.path(), false).expect("check"));
        assert!(ensure_dir(dir.path(), true).expect("check"));
    }

    #[test]
    fn ensure_dir_creates_missing_when_asked() {
        let dir = TempDir::new().expect("tempdir");
        let target = dir.path().join("a").join("b");
        assert!(ensure_dir(&target, true).expect("create"));
        assert!(target.is_dir());
    }

    #[test]
    fn ensure_dir_rejects_missing_without_create() {
        let dir = TempDir::new().expect("tempdir");
        let target = dir.path().join("missing");
        assert!(!ensure_dir(&target, false).expect("check"));
        assert!(!target.exists());
    }

    #[test]
    fn require_file_reports_presence() {
        let dir = TempDir::new().expect("tempdir");
        std::fs::write(dir.path().join("tool"), b"").expect("write");
        assert!(require_file(dir.path(), "tool"));
        assert!(!require_file(dir.path(), "absent"));
    }

    #[test]
    fn permission_probes_see_tempdir() {
        let dir = TempDir::new().expect("tempdir");
        assert!(is_readable(dir.path()));
        assert!(is_writable(dir.path()));
        assert!(!is_readable(&dir.path().join("missing")));
    }
}
