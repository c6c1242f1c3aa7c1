//! `composer.lock` decoding

use crate::reports::CheckItem;
use serde::Deserialize;

/// Locked package entry; everything except name and version is ignored
#[derive(Debug, Clone, Deserialize)]
pub struct LockedPackage {
    pub name: String,
    pub version: String,
}

/// The subset of a `composer.lock` document needed for checking
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ComposerLock {
    #[serde(rename = "content-hash", default)]
    pub content_hash: Option<String>,
    #[serde(default)]
    pub packages: Vec<LockedPackage>,
    #[serde(rename = "packages-dev", default)]
    pub packages_dev: Option<Vec<LockedPackage>>,
}

impl ComposerLock {
    /// Decode a lock file from JSON bytes
    ///
    /// # Errors
    ///
    /// Returns the JSON error when the document is not a valid lock file.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    /// Items to check, runtime packages first, then dev packages
    #[must_use]
    pub fn items(&self) -> Vec<CheckItem> {
        self.packages
            .iter()
            .chain(self.packages_dev.iter().flatten())
            .map(|p| CheckItem::new(p.name.clone(), p.version.clone()))
            .collect()
    }
}
