//! File system utilities for staging.
//!
//! Copies create destination parents, preserve symlinks and unix permission
//! bits, and overwrite what is already there.

use crate::bundler::error::{Error, ErrorExt, Result};
use std::path::{Component, Path, PathBuf};
use tokio::fs;

/// Removes the directory and its contents if it exists.
pub async fn remove_dir_all(path: &Path) -> Result<()> {
    match fs::remove_dir_all(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).fs_context("removing directory", path),
    }
}

/// Ensures `path` exists as an empty directory.
pub async fn empty_dir(path: &Path) -> Result<()> {
    remove_dir_all(path).await?;
    fs::create_dir_all(path)
        .await
        .fs_context("creating directory", path)
}

/// Copies a regular file, creating the destination's parent directories.
///
/// Fails if the source path is a directory or doesn't exist.
pub async fn copy_file(from: &Path, to: &Path) -> Result<()> {
    let metadata = fs::metadata(from).await.fs_context("reading file metadata", from)?;
    if !metadata.is_file() {
        return Err(Error::GenericError(format!("{from:?} is not a file")));
    }
    if let Some(dest_dir) = to.parent() {
        fs::create_dir_all(dest_dir)
            .await
            .fs_context("creating directory", dest_dir)?;
    }
    fs::copy(from, to).await.fs_context("copying file", to)?;
    Ok(())
}

/// Recursively copies `from` into `to`, merging with and overwriting any
/// existing content.
///
/// Symlinks are recreated as symlinks with the same target.
pub async fn copy_dir(from: &Path, to: &Path) -> Result<()> {
    let metadata = fs::metadata(from).await.fs_context("reading directory metadata", from)?;
    if !metadata.is_dir() {
        return Err(Error::GenericError(format!("{from:?} is not a directory")));
    }
    fs::create_dir_all(to).await.fs_context("creating directory", to)?;

    for entry in walkdir::WalkDir::new(from).min_depth(1) {
        let entry = entry?;
        let rel_path = entry.path().strip_prefix(from)?;
        let dest_path = to.join(rel_path);

        if entry.file_type().is_symlink() {
            let target = fs::read_link(entry.path())
                .await
                .fs_context("reading symlink", entry.path())?;
            remove_existing(&dest_path).await?;
            symlink(&target, &dest_path).await?;
        } else if entry.file_type().is_dir() {
            fs::create_dir_all(&dest_path)
                .await
                .fs_context("creating directory", &dest_path)?;
        } else {
            if fs::symlink_metadata(&dest_path)
                .await
                .is_ok_and(|m| m.file_type().is_symlink())
            {
                remove_existing(&dest_path).await?;
            }
            fs::copy(entry.path(), &dest_path)
                .await
                .fs_context("copying file", &dest_path)?;
        }
    }

    Ok(())
}

/// Copies a file or a directory tree, whichever `from` is.
pub async fn copy_path(from: &Path, to: &Path) -> Result<()> {
    let metadata = fs::metadata(from).await.fs_context("reading metadata", from)?;
    if metadata.is_dir() {
        copy_dir(from, to).await
    } else {
        copy_file(from, to).await
    }
}

async fn remove_existing(path: &Path) -> Result<()> {
    match fs::symlink_metadata(path).await {
        Ok(m) if m.is_dir() => fs::remove_dir_all(path)
            .await
            .fs_context("removing directory", path),
        Ok(_) => fs::remove_file(path).await.fs_context("removing file", path),
        Err(_) => Ok(()),
    }
}

#[cfg(unix)]
async fn symlink(target: &Path, link: &Path) -> Result<()> {
    fs::symlink(target, link).await.fs_context("creating symlink", link)
}

#[cfg(not(unix))]
async fn symlink(target: &Path, link: &Path) -> Result<()> {
    let resolved = link.parent().map(|p| p.join(target)).unwrap_or_else(|| target.to_path_buf());
    copy_path(&resolved, link).await
}

/// Total size in bytes of the regular files under `dir`. Symlinks are not followed.
pub async fn dir_size(dir: &Path) -> Result<u64> {
    let dir = dir.to_path_buf();
    tokio::task::spawn_blocking(move || {
        let mut total = 0u64;
        for entry in walkdir::WalkDir::new(&dir).follow_links(false) {
            let entry = entry?;
            if entry.file_type().is_file() {
                total += entry.metadata()?.len();
            }
        }
        Ok(total)
    })
    .await
    .map_err(|e| Error::GenericError(format!("Join error: {}", e)))?
}

/// Installed size in KiB as Debian expects it: bytes / 1024 rounded to nearest.
pub fn bytes_to_kib(bytes: u64) -> u64 {
    (bytes + 512) / 1024
}

/// Files directly inside `dir` matching a glob `pattern` such as `*.rpm`.
///
/// Only `pattern` is interpreted; metacharacters in `dir` match literally.
pub fn matching_files(dir: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    let escaped = glob::Pattern::escape(&dir.to_string_lossy());
    let full = Path::new(&escaped).join(pattern);
    let mut files = Vec::new();
    for entry in glob::glob(&full.to_string_lossy())? {
        let path = entry?;
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Folds `.` and `..` components without touching the disk.
///
/// `..` above the root is dropped; leading `..` of a relative path is kept.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other),
        }
    }
    out
}

/// Absolute, normalized form of `path` with symlinks resolved in the longest
/// prefix that exists. The path itself need not exist.
pub async fn real_path(path: &Path) -> Result<PathBuf> {
    let absolute = std::path::absolute(path).fs_context("resolving path", path)?;
    let absolute = normalize(&absolute);

    let mut existing = absolute.as_path();
    let mut missing = Vec::new();
    loop {
        match fs::canonicalize(existing).await {
            Ok(real) => {
                return Ok(missing.iter().rev().fold(real, |acc, name| acc.join(name)));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                match (existing.parent(), existing.file_name()) {
                    (Some(parent), Some(name)) => {
                        missing.push(name.to_owned());
                        existing = parent;
                    }
                    _ => return Ok(absolute),
                }
            }
            Err(e) => return Err(e).fs_context("resolving path", existing),
        }
    }
}
