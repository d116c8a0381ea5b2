//! Workspace snapshot and diff.
//!
//! Before and after each run the workspace is walked and every file hashed;
//! the two snapshots diff into `{added, modified, deleted}` path lists.
//! Paths are workspace-relative with forward slashes, so diffs are stable
//! across platforms.

use std::collections::BTreeMap;
use std::path::Path;

use sha2::{Digest, Sha256};

use gavel_contracts::{GavelError, GavelResult, WorkspaceDiff};

/// `relative path → SHA-256 hex` for every regular file under `root`.
///
/// Unreadable entries (dangling symlinks, permission failures) are skipped
/// rather than failing the snapshot — the sandbox may leave such debris.
pub fn snapshot(root: &Path) -> GavelResult<BTreeMap<String, String>> {
    let mut hashes = BTreeMap::new();
    walk(root, root, &mut hashes)?;
    Ok(hashes)
}

fn walk(
    root: &Path,
    dir: &Path,
    hashes: &mut BTreeMap<String, String>,
) -> GavelResult<()> {
    let entries = std::fs::read_dir(dir).map_err(|e| GavelError::Internal {
        reason: format!("failed to read workspace dir '{}': {e}", dir.display()),
    })?;

    for entry in entries {
        let Ok(entry) = entry else { continue };
        let path = entry.path();
        let Ok(file_type) = entry.file_type() else { continue };

        if file_type.is_dir() {
            walk(root, &path, hashes)?;
        } else if file_type.is_file() {
            let Ok(contents) = std::fs::read(&path) else {
                continue;
            };
            let relative = path
                .strip_prefix(root)
                .unwrap_or(&path)
                .to_string_lossy()
                .replace('\\', "/");
            hashes.insert(relative, hex::encode(Sha256::digest(&contents)));
        }
    }
    Ok(())
}

/// Classify every file across two snapshots. Paths come out sorted because
/// the snapshots are ordered maps.
pub fn diff(
    before: &BTreeMap<String, String>,
    after: &BTreeMap<String, String>,
) -> WorkspaceDiff {
    let mut out = WorkspaceDiff::default();

    for (path, digest) in after {
        match before.get(path) {
            None => out.added.push(path.clone()),
            Some(previous) if previous != digest => out.modified.push(path.clone()),
            Some(_) => {}
        }
    }
    for path in before.keys() {
        if !after.contains_key(path) {
            out.deleted.push(path.clone());
        }
    }

    out
}
