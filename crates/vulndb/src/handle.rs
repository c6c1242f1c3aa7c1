//! The current-database handle
//!
//! Exactly one snapshot is live at a time. Readers clone the `Arc` under a
//! read lock and then work lock-free on a database that can no longer change.
//! Publishing replaces the `Arc` under the write lock; snapshots already
//! handed out stay valid until their last reader drops them.

use crate::database::VulnDatabase;
use chrono::{DateTime, Utc};
use secscan_errors::Error;
use secscan_types::{Advisory, Fingerprint};
use std::sync::{Arc, PoisonError, RwLock};

/// A published database and what it was built from
#[derive(Debug)]
pub struct DatabaseSnapshot {
    database: VulnDatabase,
    fingerprint: Option<Fingerprint>,
    refreshed_at: Option<DateTime<Utc>>,
    records: usize,
}

impl DatabaseSnapshot {
    /// Snapshot of a freshly built database
    #[must_use]
    pub fn new(database: VulnDatabase, fingerprint: Fingerprint, records: usize) -> Self {
        Self {
            database,
            fingerprint: Some(fingerprint),
            refreshed_at: Some(Utc::now()),
            records,
        }
    }

    /// The database served before the first successful refresh
    #[must_use]
    pub fn empty() -> Self {
        Self {
            database: VulnDatabase::new(),
            fingerprint: None,
            refreshed_at: None,
            records: 0,
        }
    }

    #[must_use]
    pub fn database(&self) -> &VulnDatabase {
        &self.database
    }

    /// Corpus revision, `None` until the first refresh succeeds
    #[must_use]
    pub fn fingerprint(&self) -> Option<&Fingerprint> {
        self.fingerprint.as_ref()
    }

    #[must_use]
    pub fn refreshed_at(&self) -> Option<DateTime<Utc>> {
        self.refreshed_at
    }

    /// Source records consumed by the build
    #[must_use]
    pub fn records(&self) -> usize {
        self.records
    }
}

/// Shared pointer to the live [`DatabaseSnapshot`]
///
/// Cloning the handle is cheap; all clones observe the same snapshot.
#[derive(Debug, Clone)]
pub struct DatabaseHandle {
    current: Arc<RwLock<Arc<DatabaseSnapshot>>>,
}

impl Default for DatabaseHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl DatabaseHandle {
    /// Handle serving an empty database with no fingerprint
    #[must_use]
    pub fn new() -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::new(DatabaseSnapshot::empty()))),
        }
    }

    /// The live snapshot
    #[must_use]
    pub fn current(&self) -> Arc<DatabaseSnapshot> {
        // The lock only guards an Arc swap, so a poisoned lock still holds a
        // complete snapshot.
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    /// Replace the live snapshot and return the one it replaced
    pub fn publish(&self, snapshot: DatabaseSnapshot) -> Arc<DatabaseSnapshot> {
        let next = Arc::new(snapshot);
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *guard, next)
    }

    #[must_use]
    pub fn fingerprint(&self) -> Option<Fingerprint> {
        self.current().fingerprint().cloned()
    }

    /// Single lookup against the live database
    ///
    /// # Errors
    ///
    /// Returns `Error::Version` if `version` cannot be parsed.
    pub fn lookup(&self, package: &str, version: &str) -> Result<Vec<Arc<Advisory>>, Error> {
        self.current().database().lookup(package, version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::build;
    use secscan_types::{Branch, VersionSpec};

    fn database(references: &[&str]) -> VulnDatabase {
        build(references.iter().map(|reference| {
            Ok(Advisory {
                title: "t".into(),
                link: "l".into(),
                cve: "CVE-0".into(),
                branches: vec![Branch::new("master", "<2.0".parse::<VersionSpec>().unwrap())],
                reference: (*reference).to_string(),
            })
        }))
        .unwrap()
        .database
    }

    #[test]
    fn test_starts_empty() {
        let handle = DatabaseHandle::new();
        assert!(handle.fingerprint().is_none());
        assert!(handle.current().database().is_empty());
        assert!(handle.current().refreshed_at().is_none());
        assert!(handle.lookup("vendor/pkg", "1.0").unwrap().is_empty());
    }

    #[test]
    fn test_publish_swaps_and_returns_previous() {
        let handle = DatabaseHandle::new();
        let clone = handle.clone();

        let previous = handle.publish(DatabaseSnapshot::new(
            database(&["composer://vendor/pkg"]),
            Fingerprint::new("aaa"),
            1,
        ));
        assert!(previous.fingerprint().is_none());
        assert_eq!(clone.fingerprint(), Some(Fingerprint::new("aaa")));
        assert_eq!(clone.lookup("vendor/pkg", "1.0").unwrap().len(), 1);
    }

    #[test]
    fn test_old_snapshot_survives_publish() {
        let handle = DatabaseHandle::new();
        handle.publish(DatabaseSnapshot::new(
            database(&["composer://old/pkg"]),
            Fingerprint::new("old"),
            1,
        ));
        let held = handle.current();

        handle.publish(DatabaseSnapshot::new(
            database(&["composer://new/pkg"]),
            Fingerprint::new("new"),
            1,
        ));

        assert_eq!(held.fingerprint().map(Fingerprint::as_str), Some("old"));
        assert!(held.database().contains_package("old/pkg"));
        assert!(!handle.current().database().contains_package("old/pkg"));
    }
}
