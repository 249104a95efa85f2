//! Test script discovery
//!
//! Turns the run's targets into a [`Discovery`]: the common root every report name is relative to, plus the scripts
//! found below it, sorted lexicographically by relative name and deduplicated by absolute path.
//!
//! ## Filtering
//!
//! - Files found by walking a directory must match the include pattern and must not match the exclude pattern.
//! - A file named directly as a target skips the include check. Naming it is the selection; exclusion still applies.
//! - Walks do not follow symlinks. A link is a candidate when it points at a regular file; broken links are skipped.
//!
//! Targets are made absolute and cleaned of `.` and `..` first, so two spellings of one directory find each script
//! once.
//!
//! ## Root selection
//!
//! - One target: the target itself when it is a directory, otherwise its parent.
//! - Several targets, exactly one script found: that script's parent (a common prefix of a single path would be
//!   the file itself).
//! - Several targets otherwise: the segment-wise common prefix of all found scripts.

use std::fs;
use std::path::{Component, Path, PathBuf};

use walkdir::WalkDir;

use super::errors::DiscoveryError;
use super::options::Filters;

/// A discovered test script.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct TestScript {
    /// Path relative to the discovery root, used as the report key
    pub name: String,
    /// Absolute path used to spawn the script
    pub path: PathBuf,
}

impl TestScript {
    /// Directory the script runs in.
    pub fn working_dir(&self) -> &Path {
        self.path.parent().unwrap_or(Path::new("/"))
    }
}

/// Result of discovery: common root and lexicographically sorted scripts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Discovery {
    pub root: PathBuf,
    pub scripts: Vec<TestScript>,
}

/// Discover test scripts below `targets`.
#[tracing::instrument(skip_all, fields(target_count = targets.len()))]
pub fn discover(targets: &[PathBuf], filters: &Filters) -> Result<Discovery, DiscoveryError> {
    let mut found: Vec<PathBuf> = Vec::new();
    // Absolute form and kind of every target, reused for root selection
    let mut resolved: Vec<(PathBuf, bool)> = Vec::with_capacity(targets.len());

    for target in targets {
        let absolute = std::path::absolute(target)
            .map(|path| clean(&path))
            .map_err(|source| DiscoveryError::Target {
                path: target.clone(),
                source,
            })?;
        let metadata = fs::metadata(&absolute).map_err(|source| DiscoveryError::Target {
            path: absolute.clone(),
            source,
        })?;

        if metadata.is_dir() {
            walk_directory(&absolute, filters, &mut found)?;
        } else if filters.accepts_explicit(&absolute.to_string_lossy()) {
            found.push(absolute.clone());
        } else {
            tracing::debug!(path = %absolute.display(), "explicit target excluded");
        }
        resolved.push((absolute, metadata.is_dir()));
    }

    found.sort();
    found.dedup();

    let root = select_root(&resolved, &found);
    let mut scripts = found
        .into_iter()
        .map(|path| {
            let name = relative_name(&path, &root)?;
            Ok(TestScript { name, path })
        })
        .collect::<Result<Vec<_>, DiscoveryError>>()?;
    scripts.sort();

    tracing::debug!(root = %root.display(), script_count = scripts.len(), "discovery complete");
    Ok(Discovery { root, scripts })
}

fn walk_directory(dir: &Path, filters: &Filters, found: &mut Vec<PathBuf>) -> Result<(), DiscoveryError> {
    // Links below the target are never descended into
    for entry in WalkDir::new(dir).follow_links(false) {
        let entry = entry.map_err(|source| DiscoveryError::Walk {
            path: dir.to_path_buf(),
            source,
        })?;
        let file_type = entry.file_type();
        if file_type.is_symlink() {
            if !links_to_file(entry.path()) {
                continue;
            }
        } else if !file_type.is_file() {
            continue;
        }
        if filters.accepts_walked(&entry.path().to_string_lossy()) {
            found.push(entry.into_path());
        }
    }
    Ok(())
}

/// Whether a symlink resolves to a regular file. Broken links are logged and skipped.
fn links_to_file(link: &Path) -> bool {
    match fs::metadata(link) {
        Ok(metadata) => metadata.is_file(),
        Err(e) => {
            tracing::warn!(path = %link.display(), error = %e, "skipping broken symlink");
            false
        }
    }
}

/// Resolve `.` and `..` lexically, without touching the filesystem.
///
/// `..` at the root stays at the root.
fn clean(path: &Path) -> PathBuf {
    let mut cleaned = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                cleaned.pop();
            }
            other => cleaned.push(other),
        }
    }
    cleaned
}

fn select_root(targets: &[(PathBuf, bool)], found: &[PathBuf]) -> PathBuf {
    match targets {
        [(path, true)] => path.clone(),
        [(path, false)] => parent_of(path),
        _ => match found {
            [only] => parent_of(only),
            _ => common_path_prefix(found),
        },
    }
}

fn parent_of(path: &Path) -> PathBuf {
    path.parent().map(Path::to_path_buf).unwrap_or_else(|| path.to_path_buf())
}

fn relative_name(path: &Path, root: &Path) -> Result<String, DiscoveryError> {
    let relative = path.strip_prefix(root).map_err(|_| DiscoveryError::OutsideRoot {
        path: path.to_path_buf(),
        root: root.to_path_buf(),
    })?;
    Ok(relative.to_string_lossy().into_owned())
}

/// Longest common path prefix of `paths`, compared component by component.
///
/// Stops at the first differing component or at the end of the shortest path. The root component is kept, so two
/// paths sharing nothing but `/` yield `/`. An empty input yields an empty path.
pub fn common_path_prefix<P: AsRef<Path>>(paths: &[P]) -> PathBuf {
    let Some((first, rest)) = paths.split_first() else {
        return PathBuf::new();
    };

    let mut prefix: Vec<Component<'_>> = first.as_ref().components().collect();
    for path in rest {
        let matching = prefix
            .iter()
            .zip(path.as_ref().components())
            .take_while(|(a, b)| *a == b)
            .count();
        prefix.truncate(matching);
    }

    prefix.iter().collect()
}
