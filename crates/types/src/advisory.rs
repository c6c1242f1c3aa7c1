//! Security advisory data model
//!
//! Advisories follow the layout of the FriendsOfPHP security-advisories
//! corpus:
//!
//! ```yaml
//! title:     HTTP Proxy header vulnerability
//! link:      https://github.com/guzzle/guzzle/releases/tag/6.2.1
//! cve:       CVE-2016-5385
//! branches:
//!     master:
//!         time:     2015-07-15 17:14:23
//!         versions: ['>=6', '<6.2.1']
//!     4.x:
//!         time:     2015-07-15 17:36:08
//!         versions: ['>=4.0.0-rc2', '<4.2.4']
//! reference: composer://guzzlehttp/guzzle
//! ```

use crate::version::{Version, VersionSpec};
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Normalized package identifier used as the database lookup key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PackageKey(String);

impl PackageKey {
    /// Create a key from an already-normalized package name
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Derive a key from an advisory reference such as `composer://vendor/pkg`.
    ///
    /// Only a leading `scheme://` is removed; the remainder is kept verbatim
    /// and stays case-sensitive.
    #[must_use]
    pub fn from_reference(reference: &str) -> Self {
        let reference = reference.trim();
        let stripped = match reference.split_once("://") {
            Some((scheme, rest))
                if !scheme.is_empty()
                    && scheme
                        .chars()
                        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.')) =>
            {
                rest
            }
            _ => reference,
        };
        Self(stripped.to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for PackageKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PackageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque identifier of the advisory corpus revision (a commit id)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Abbreviated form for log lines
    #[must_use]
    pub fn short(&self) -> &str {
        self.0.get(..12).unwrap_or(&self.0)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A named development line with its own vulnerable range
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Branch {
    pub name: String,
    /// Publication time as written in the advisory, if any
    pub time: Option<String>,
    pub versions: VersionSpec,
}

impl Branch {
    pub fn new(name: impl Into<String>, versions: VersionSpec) -> Self {
        Self {
            name: name.into(),
            time: None,
            versions,
        }
    }

    /// True when `version` satisfies every constraint of this branch.
    /// A branch without constraints never matches.
    #[must_use]
    pub fn matches(&self, version: &Version) -> bool {
        self.versions.matches(version)
    }
}

/// One published vulnerability record
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Advisory {
    pub title: String,
    pub link: String,
    /// CVE-style identifier; empty when the advisory has none
    #[serde(default, deserialize_with = "nullable_string")]
    pub cve: String,
    #[serde(default, deserialize_with = "ordered_branches")]
    pub branches: Vec<Branch>,
    pub reference: String,
}

impl Advisory {
    /// Package key this advisory is indexed under
    #[must_use]
    pub fn package_key(&self) -> PackageKey {
        PackageKey::from_reference(&self.reference)
    }

    /// True when any branch range contains `version`
    #[must_use]
    pub fn affects(&self, version: &Version) -> bool {
        self.branches.iter().any(|branch| branch.matches(version))
    }

    /// Branches whose range contains `version`
    pub fn matching_branches<'a>(&'a self, version: &'a Version) -> impl Iterator<Item = &'a Branch> {
        self.branches.iter().filter(move |branch| branch.matches(version))
    }
}

fn nullable_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Deserialize)]
struct RawBranch {
    #[serde(default, deserialize_with = "nullable_string")]
    time: String,
    #[serde(default)]
    versions: Option<Vec<String>>,
}

/// Decode the `branches` mapping into a `Vec`, keeping the order in which
/// branches appear in the source document.
fn ordered_branches<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Branch>, D::Error> {
    struct BranchesVisitor;

    impl<'de> Visitor<'de> for BranchesVisitor {
        type Value = Vec<Branch>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a mapping of branch name to branch details")
        }

        fn visit_unit<E: serde::de::Error>(self) -> Result<Self::Value, E> {
            Ok(Vec::new())
        }

        fn visit_none<E: serde::de::Error>(self) -> Result<Self::Value, E> {
            Ok(Vec::new())
        }

        fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
            let mut branches = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some((name, raw)) = map.next_entry::<BranchName, RawBranch>()? {
                let versions = VersionSpec::from_exprs(raw.versions.unwrap_or_default())
                    .map_err(serde::de::Error::custom)?;
                branches.push(Branch {
                    name: name.0,
                    time: (!raw.time.is_empty()).then_some(raw.time),
                    versions,
                });
            }
            Ok(branches)
        }
    }

    deserializer.deserialize_any(BranchesVisitor)
}

/// Branch names are usually strings but YAML happily types `5.3` as a float.
/// Read as a string, the scalar keeps its text, so `5.10` stays `5.10`.
struct BranchName(String);

impl<'de> Deserialize<'de> for BranchName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct BranchNameVisitor;

        impl Visitor<'_> for BranchNameVisitor {
            type Value = BranchName;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a branch name")
            }

            fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<Self::Value, E> {
                Ok(BranchName(v.to_string()))
            }

            fn visit_string<E: serde::de::Error>(self, v: String) -> Result<Self::Value, E> {
                Ok(BranchName(v))
            }

            fn visit_i64<E: serde::de::Error>(self, v: i64) -> Result<Self::Value, E> {
                Ok(BranchName(v.to_string()))
            }

            fn visit_u64<E: serde::de::Error>(self, v: u64) -> Result<Self::Value, E> {
                Ok(BranchName(v.to_string()))
            }

            fn visit_f64<E: serde::de::Error>(self, v: f64) -> Result<Self::Value, E> {
                Ok(BranchName(v.to_string()))
            }
        }

        deserializer.deserialize_str(BranchNameVisitor)
    }
}
