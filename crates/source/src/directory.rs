//! Advisory corpus stored as YAML files under a directory tree

use crate::{AdvisoryIter, AdvisorySource};
use secscan_errors::{AdvisoryError, Error};
use secscan_types::Advisory;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Reads every `*.yaml` file below `root`, in file name order, skipping
/// hidden entries such as `.git` and `.github`.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl AdvisorySource for DirectorySource {
    fn advisories(&self) -> Result<AdvisoryIter<'_>, Error> {
        if !self.root.is_dir() {
            return Err(AdvisoryError::CorpusUnreadable {
                path: self.root.display().to_string(),
                message: "not a directory".to_string(),
            }
            .into());
        }

        let walker = WalkDir::new(&self.root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| !is_hidden(entry));

        let iter = walker.filter_map(|entry| match entry {
            Ok(entry) if entry.file_type().is_file() && is_advisory_file(entry.path()) => {
                Some(read_advisory(entry.path()))
            }
            Ok(_) => None,
            Err(err) => {
                let path = err
                    .path()
                    .map_or_else(String::new, |p| p.display().to_string());
                Some(Err(AdvisoryError::CorpusUnreadable {
                    path,
                    message: err.to_string(),
                }
                .into()))
            }
        });

        Ok(Box::new(iter))
    }
}

/// Dot entries below the root; the root itself may live in a hidden directory
fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0 && entry.file_name().to_string_lossy().starts_with('.')
}

fn is_advisory_file(path: &Path) -> bool {
    path.extension() == Some(OsStr::new("yaml"))
}

/// Decode a single advisory file
///
/// # Errors
///
/// Returns an error carrying the file path if the file cannot be read, is not
/// a valid advisory, or has no package reference.
pub fn read_advisory(path: &Path) -> Result<Advisory, Error> {
    let content = std::fs::read_to_string(path).map_err(|e| Error::io_with_path(&e, path))?;

    let advisory: Advisory =
        serde_yml::from_str(&content).map_err(|e| AdvisoryError::Decode {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

    if advisory.package_key().as_str().is_empty() {
        return Err(AdvisoryError::MissingReference {
            path: path.display().to_string(),
        }
        .into());
    }

    tracing::trace!(path = %path.display(), package = %advisory.package_key(), "decoded advisory");
    Ok(advisory)
}
