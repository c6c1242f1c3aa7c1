//! In-memory vulnerability database

use dashmap::DashMap;
use secscan_errors::Error;
use secscan_types::{parse_version, Advisory, PackageKey, Version};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Mapping from package key to its advisories in insertion order.
///
/// Only the builder inserts. Once a database has been published it is shared
/// read-only through an `Arc` and never mutated again.
#[derive(Debug, Default)]
pub struct VulnDatabase {
    entries: DashMap<PackageKey, Vec<Arc<Advisory>>>,
    advisories: AtomicUsize,
}

impl VulnDatabase {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `advisory` under `key`, creating the entry if absent
    pub fn insert(&self, key: PackageKey, advisory: Arc<Advisory>) {
        self.entries.entry(key).or_default().push(advisory);
        self.advisories.fetch_add(1, Ordering::Relaxed);
    }

    /// Advisories under `package` that affect `version`.
    ///
    /// An unknown package yields an empty list. A version that does not parse
    /// is an error: the caller cannot tell whether the package is affected.
    ///
    /// # Errors
    ///
    /// Returns `Error::Version` if `version` cannot be parsed.
    pub fn lookup(&self, package: &str, version: &str) -> Result<Vec<Arc<Advisory>>, Error> {
        let version = parse_version(version)?;
        Ok(self.lookup_version(package, &version))
    }

    /// Same as [`lookup`](Self::lookup) for an already parsed version
    #[must_use]
    pub fn lookup_version(&self, package: &str, version: &Version) -> Vec<Arc<Advisory>> {
        self.entries
            .get(package)
            .map(|entry| {
                entry
                    .iter()
                    .filter(|advisory| advisory.affects(version))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Every advisory recorded for `package`, matching or not
    #[must_use]
    pub fn advisories(&self, package: &str) -> Vec<Arc<Advisory>> {
        self.entries
            .get(package)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn contains_package(&self, package: &str) -> bool {
        self.entries.contains_key(package)
    }

    /// Number of advisories
    #[must_use]
    pub fn len(&self) -> usize {
        self.advisories.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of distinct package keys
    #[must_use]
    pub fn package_count(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secscan_types::{Branch, VersionSpec};

    fn advisory(cve: &str, reference: &str, branches: &[(&str, &str)]) -> Arc<Advisory> {
        Arc::new(Advisory {
            title: format!("{cve} title"),
            link: format!("https://example.com/{cve}"),
            cve: cve.to_string(),
            branches: branches
                .iter()
                .map(|(name, spec)| Branch::new(*name, spec.parse::<VersionSpec>().unwrap()))
                .collect(),
            reference: reference.to_string(),
        })
    }

    fn single(spec: &str) -> VulnDatabase {
        let db = VulnDatabase::new();
        let adv = advisory("CVE-1", "composer://vendor/pkg", &[("master", spec)]);
        db.insert(adv.package_key(), adv);
        db
    }

    fn matched(db: &VulnDatabase, version: &str) -> bool {
        !db.lookup("vendor/pkg", version).unwrap().is_empty()
    }

    #[test]
    fn test_range_boundaries() {
        let db = single(">=1.0,<1.9");
        assert!(!matched(&db, "0.9999"));
        assert!(matched(&db, "1.0"));
        assert!(matched(&db, "1.2.3"));
        assert!(matched(&db, "1.8"));
        assert!(!matched(&db, "1.9"));
        assert!(!matched(&db, "1.89"));
    }

    #[test]
    fn test_single_sided_constraint() {
        let db = single("<1.9");
        assert!(matched(&db, "1.8"));
        assert!(!matched(&db, "1.9"));
    }

    #[test]
    fn test_unknown_package_is_empty() {
        let db = single("<1.9");
        assert!(db.lookup("other/pkg", "1.0").unwrap().is_empty());
        assert!(!db.contains_package("other/pkg"));
    }

    #[test]
    fn test_unparseable_version_fails_closed() {
        let db = single("<1.9");
        let err = db.lookup("vendor/pkg", "dev-master").unwrap_err();
        assert!(err.is_version_error());
    }

    #[test]
    fn test_empty_branch_never_matches() {
        let db = VulnDatabase::new();
        let adv = Arc::new(Advisory {
            title: "t".into(),
            link: "l".into(),
            cve: String::new(),
            branches: vec![Branch::new("master", VersionSpec::default())],
            reference: "composer://vendor/pkg".into(),
        });
        db.insert(adv.package_key(), adv);
        assert!(db.lookup("vendor/pkg", "0.0.1").unwrap().is_empty());
        assert_eq!(db.advisories("vendor/pkg").len(), 1);
    }

    #[test]
    fn test_advisory_reported_once_across_branches() {
        let db = VulnDatabase::new();
        let adv = advisory(
            "CVE-1",
            "composer://vendor/pkg",
            &[("master", "<2.0"), ("1.x", ">=1.0,<1.5")],
        );
        db.insert(adv.package_key(), adv);
        assert_eq!(db.lookup("vendor/pkg", "1.2").unwrap().len(), 1);
    }

    #[test]
    fn test_lookup_preserves_insertion_order() {
        let db = VulnDatabase::new();
        for cve in ["CVE-3", "CVE-1", "CVE-2"] {
            let adv = advisory(cve, "composer://vendor/pkg", &[("master", "<2.0")]);
            db.insert(adv.package_key(), adv);
        }

        let first: Vec<_> = db
            .lookup("vendor/pkg", "1.0")
            .unwrap()
            .iter()
            .map(|a| a.cve.clone())
            .collect();
        assert_eq!(first, ["CVE-3", "CVE-1", "CVE-2"]);

        let second: Vec<_> = db
            .lookup("vendor/pkg", "1.0")
            .unwrap()
            .iter()
            .map(|a| a.cve.clone())
            .collect();
        assert_eq!(first, second);
        assert_eq!(db.len(), 3);
        assert_eq!(db.package_count(), 1);
    }
}
