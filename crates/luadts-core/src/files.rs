//! Source and overlay file discovery.
//!
//! Paths are returned relative to the scanned root, with `/` separators,
//! sorted and deduplicated so every run assigns the same order.

use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::Path;

use globset::{Glob, GlobSet, GlobSetBuilder};
use thiserror::Error;
use walkdir::WalkDir;

// ============================================================================
// Error Types
// ============================================================================

/// Error type for file operations.
#[derive(Debug, Error)]
pub enum FileError {
    /// File or directory not found.
    #[error("file not found: {path}")]
    NotFound { path: String },

    /// Invalid exclusion pattern.
    #[error("invalid exclude pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    /// IO error.
    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
}

/// Result type for file operations.
pub type FileResult<T> = Result<T, FileError>;

// ============================================================================
// Exclusion Filter
// ============================================================================

/// Gitignore-style exclusion over root-relative paths.
#[derive(Debug, Clone)]
pub struct ExcludeFilter {
    set: GlobSet,
    empty: bool,
}

impl ExcludeFilter {
    /// Build a filter from glob patterns.
    pub fn new(patterns: &[String]) -> FileResult<Self> {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            let glob = Glob::new(pattern).map_err(|e| FileError::InvalidPattern {
                pattern: pattern.clone(),
                message: e.to_string(),
            })?;
            builder.add(glob);
        }
        let set = builder.build().map_err(|e| FileError::InvalidPattern {
            pattern: patterns.join(", "),
            message: e.to_string(),
        })?;
        Ok(ExcludeFilter {
            set,
            empty: patterns.is_empty(),
        })
    }

    /// Filter that excludes nothing.
    pub fn none() -> Self {
        ExcludeFilter {
            set: GlobSet::empty(),
            empty: true,
        }
    }

    /// Check whether a relative path is excluded.
    pub fn is_excluded(&self, rel_path: &str) -> bool {
        !self.empty && self.set.is_match(rel_path)
    }
}

// ============================================================================
// File Collection
// ============================================================================

/// Collect files with `extension` under `root`.
///
/// When `subtrees` is non-empty only those top-level directories are walked;
/// a missing subtree is logged and skipped. Hidden path components are never
/// visited.
pub fn collect_files(
    root: &Path,
    subtrees: &[String],
    extension: &str,
    filter: &ExcludeFilter,
) -> FileResult<Vec<String>> {
    if !root.is_dir() {
        return Err(FileError::NotFound {
            path: root.display().to_string(),
        });
    }

    let starts: Vec<_> = if subtrees.is_empty() {
        vec![root.to_path_buf()]
    } else {
        subtrees
            .iter()
            .map(|subtree| root.join(subtree))
            .filter(|dir| {
                let exists = dir.is_dir();
                if !exists {
                    tracing::warn!("source subtree {} does not exist, skipping", dir.display());
                }
                exists
            })
            .collect()
    };

    let mut files = BTreeSet::new();
    for start in starts {
        for entry in WalkDir::new(&start)
            .follow_links(false)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if !entry.file_type().is_file() {
                continue;
            }
            if path.extension().is_none_or(|ext| ext != extension) {
                continue;
            }
            let rel_path = match path.strip_prefix(root) {
                Ok(p) => p,
                Err(_) => continue,
            };
            if rel_path
                .components()
                .any(|c| c.as_os_str().to_string_lossy().starts_with('.'))
            {
                continue;
            }
            let rel = rel_path
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/");
            if filter.is_excluded(&rel) {
                tracing::debug!("excluded {}", rel);
                continue;
            }
            files.insert(rel);
        }
    }

    Ok(files.into_iter().collect())
}

/// Read a file below `root` given its relative path.
pub fn read_relative(root: &Path, rel_path: &str) -> FileResult<String> {
    let path = root.join(rel_path);
    fs::read_to_string(&path).map_err(|source| {
        if source.kind() == io::ErrorKind::NotFound {
            FileError::NotFound {
                path: path.display().to_string(),
            }
        } else {
            FileError::Io {
                path: path.display().to_string(),
                source,
            }
        }
    })
}

/// Write `content` to `root/rel_path`, creating parent directories.
pub fn write_relative(root: &Path, rel_path: &str, content: &str) -> FileResult<()> {
    let path = root.join(rel_path);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| FileError::Io {
            path: parent.display().to_string(),
            source,
        })?;
    }
    fs::write(&path, content).map_err(|source| FileError::Io {
        path: path.display().to_string(),
        source,
    })
}

/// Remove `root/rel_path` if it exists.
pub fn remove_relative(root: &Path, rel_path: &str) -> FileResult<()> {
    let path = root.join(rel_path);
    match fs::remove_file(&path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(FileError::Io {
            path: path.display().to_string(),
            source,
        }),
    }
}
