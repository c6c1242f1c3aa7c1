//! Check input and report types

use crate::advisory::{Advisory, Fingerprint, PackageKey};
use serde::{Deserialize, Serialize};

/// One `(package, version)` pair to check
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckItem {
    pub package: PackageKey,
    pub version: String,
}

impl CheckItem {
    pub fn new(package: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            package: PackageKey::new(package),
            version: version.into(),
        }
    }
}

/// Advisory as shown to callers
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvisorySummary {
    /// CVE identifier, empty when the advisory has none
    pub id: String,
    pub title: String,
    pub link: String,
}

impl From<&Advisory> for AdvisorySummary {
    fn from(advisory: &Advisory) -> Self {
        Self {
            id: advisory.cve.clone(),
            title: advisory.title.clone(),
            link: advisory.link.clone(),
        }
    }
}

/// A checked item with at least one matching advisory
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageFinding {
    pub package: PackageKey,
    pub version: String,
    pub vulnerable: bool,
    #[serde(rename = "cve")]
    pub advisories: Vec<AdvisorySummary>,
}

/// An item that could not be checked
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedItem {
    pub package: PackageKey,
    pub version: String,
    pub reason: String,
}

/// Result of checking a batch of items against one database snapshot
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckReport {
    /// True iff at least one item matched at least one advisory
    pub vulnerable: bool,
    /// Advisory corpus revision the answer was computed against
    #[serde(rename = "version")]
    pub fingerprint: Option<Fingerprint>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub vulnerabilities: Vec<PackageFinding>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<SkippedItem>,
}

impl CheckReport {
    /// Total number of matched advisories across all findings
    #[must_use]
    pub fn advisory_count(&self) -> usize {
        self.vulnerabilities.iter().map(|f| f.advisories.len()).sum()
    }
}
