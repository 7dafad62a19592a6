// src/fs/ops.rs

//! Directory-tree mutations used while preparing and migrating a run.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, warn};

/// `mkdir -p`; an existing directory is fine.
pub fn ensure_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path).with_context(|| format!("creating dir {:?}", path))
}

/// Write a file, creating its parent directory first.
pub fn write_file(path: &Path, contents: impl AsRef<[u8]>) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    fs::write(path, contents).with_context(|| format!("writing file {:?}", path))
}

/// Create an empty marker file (or leave an existing one untouched).
pub fn touch(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("touching {:?}", path))?;
    Ok(())
}

pub fn copy_file(src: &Path, dst: &Path) -> Result<()> {
    if let Some(parent) = dst.parent() {
        ensure_dir(parent)?;
    }
    fs::copy(src, dst).with_context(|| format!("copying {:?} to {:?}", src, dst))?;
    Ok(())
}

/// Recursively copy `src` into `dst` (created if needed).
pub fn copy_dir_all(src: &Path, dst: &Path) -> Result<()> {
    for entry in walkdir::WalkDir::new(src) {
        let entry = entry.with_context(|| format!("walking {:?}", src))?;
        let rel = entry
            .path()
            .strip_prefix(src)
            .with_context(|| format!("{:?} is outside {:?}", entry.path(), src))?;
        let target = dst.join(rel);
        if entry.file_type().is_dir() {
            ensure_dir(&target)?;
        } else {
            copy_file(entry.path(), &target)?;
        }
    }
    Ok(())
}

/// Replace `dst` with a copy of `src`.
///
/// The copy lands in a sibling temp dir first and is renamed into place
/// once complete, so an interrupted copy never leaves a half-written `dst`.
pub fn replace_dir_with_copy(src: &Path, dst: &Path) -> Result<()> {
    let staging = staging_path(dst);
    remove_dir_if_exists(&staging)?;
    copy_dir_all(src, &staging)?;
    remove_dir_if_exists(dst)?;
    fs::rename(&staging, dst)
        .with_context(|| format!("renaming {:?} to {:?}", staging, dst))?;
    Ok(())
}

fn staging_path(dst: &Path) -> PathBuf {
    let name = dst
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    dst.with_file_name(format!(".{name}.migrating"))
}

pub fn remove_dir_if_exists(path: &Path) -> Result<()> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).with_context(|| format!("removing dir {:?}", path)),
    }
}

/// Remove a directory tree, logging instead of failing.
pub fn remove_dir_best_effort(path: &Path) {
    if let Err(err) = remove_dir_if_exists(path) {
        warn!(path = ?path, error = %err, "could not remove directory");
    }
}

/// Remove `start` and then its ancestors while they are empty directories,
/// never climbing above `stop` (which is itself removed if empty).
pub fn prune_empty_upward(start: &Path, stop: &Path) {
    let mut current = Some(start);
    while let Some(dir) = current {
        if !dir.starts_with(stop) {
            break;
        }
        let is_empty = fs::read_dir(dir)
            .map(|mut entries| entries.next().is_none())
            .unwrap_or(false);
        if !is_empty || fs::remove_dir(dir).is_err() {
            break;
        }
        debug!(dir = ?dir, "pruned empty directory");
        if dir == stop {
            break;
        }
        current = dir.parent();
    }
}

/// `chmod a+x`.
#[cfg(unix)]
pub fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut perms = fs::metadata(path)
        .with_context(|| format!("reading metadata of {:?}", path))?
        .permissions();
    perms.set_mode(perms.mode() | 0o111);
    fs::set_permissions(path, perms).with_context(|| format!("chmod +x {:?}", path))
}

#[cfg(not(unix))]
pub fn make_executable(_path: &Path) -> Result<()> {
    Ok(())
}
