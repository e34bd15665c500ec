//! Lock probes for the roster file.
//!
//! A spreadsheet editor holding the file open is normal operation, not an
//! error. A lock is inferred from either a sibling `<file>.lock` marker
//! (written by some editors) or failure to acquire a shared advisory lock.
//! This component never takes a write lock on the source file.

use std::fs::File;
use std::path::{Path, PathBuf};

use fs4::FileExt;

/// Path of the sibling lock marker for a roster file
/// (`roster.xlsx` → `roster.xlsx.lock`).
pub fn lock_marker_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".lock");
    PathBuf::from(name)
}

/// Whether the roster file is currently locked by another writer.
///
/// Checks the lock marker first, then probes with a non-blocking shared
/// advisory lock. A file we cannot open (other than not existing) is
/// treated as busy.
pub fn is_locked(path: &Path) -> bool {
    if lock_marker_path(path).exists() {
        return true;
    }

    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return false,
        Err(_) => return true,
    };

    match file.try_lock_shared() {
        Ok(()) => {
            let _ = file.unlock();
            false
        }
        Err(_) => true,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
