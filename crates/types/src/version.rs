//! Version parsing and constraint matching
//!
//! Advisory corpora and lock files rarely carry strict semver strings, so
//! versions are parsed leniently into [`Version`]:
//! - `1`, `1.0`, `1.0.0` - missing segments are zero
//! - `1.9.4.2` - any number of dotted numeric segments
//! - `v1.2.3` - leading `v` is ignored
//! - `4.0.0-rc2`, `1.9rc2` - pre-release tag, with or without a hyphen
//! - `1.2.3+build.5` - build metadata
//!
//! Constraints are a comparator immediately followed by a version:
//! - `==1.2.3` / `=1.2.3` / `1.2.3` - Exact version
//! - `>=1.2.0` - Minimum version
//! - `<=2.0.0` - Maximum version
//! - `>1.0` / `<2.0` - Strict bounds
//! - `!=1.5.0` - Exclude version
//! - Multiple constraints: `>=1.2,<2.0,!=1.5.0`

use semver::{BuildMetadata, Prerelease};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use secscan_errors::VersionError;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Release segments every parsed version is padded to
const MIN_SEGMENTS: usize = 3;

/// A dotted numeric release with optional pre-release and build tags
///
/// Release segments compare numerically, the shorter side padded with zeros,
/// so `1.9.4` equals `1.9.4.0` and sorts below `1.9.4.3`. Pre-releases sort
/// before their release and follow semver ordering among themselves. Build
/// metadata never takes part in comparison or equality.
#[derive(Debug, Clone)]
pub struct Version {
    release: Vec<u64>,
    pub pre: Prerelease,
    pub build: BuildMetadata,
}

impl Version {
    /// A plain `major.minor.patch` release
    #[must_use]
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self::from_segments(vec![major, minor, patch])
    }

    /// A release from its numeric segments, padded to `major.minor.patch`
    #[must_use]
    pub fn from_segments(mut release: Vec<u64>) -> Self {
        if release.len() < MIN_SEGMENTS {
            release.resize(MIN_SEGMENTS, 0);
        }
        Self {
            release,
            pre: Prerelease::EMPTY,
            build: BuildMetadata::EMPTY,
        }
    }

    /// Numeric release segments
    #[must_use]
    pub fn segments(&self) -> &[u64] {
        &self.release
    }

    fn cmp_release(&self, other: &Self) -> Ordering {
        let len = self.release.len().max(other.release.len());
        let segment = |v: &Self, i: usize| v.release.get(i).copied().unwrap_or(0);
        (0..len)
            .map(|i| segment(self, i).cmp(&segment(other, i)))
            .find(|ord| ord.is_ne())
            .unwrap_or(Ordering::Equal)
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.cmp_release(other).then_with(|| self.pre.cmp(&other.pre))
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other).is_eq()
    }
}

impl Eq for Version {}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let release: Vec<_> = self.release.iter().map(ToString::to_string).collect();
        f.write_str(&release.join("."))?;
        if !self.pre.is_empty() {
            write!(f, "-{}", self.pre)?;
        }
        if !self.build.is_empty() {
            write!(f, "+{}", self.build)?;
        }
        Ok(())
    }
}

impl FromStr for Version {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_version(s)
    }
}

/// Parse a version string leniently into a [`Version`].
///
/// # Errors
///
/// Returns `VersionError::InvalidVersion` when the input has no numeric core,
/// an empty or non-numeric segment, or an invalid pre-release/build tag.
pub fn parse_version(input: &str) -> Result<Version, VersionError> {
    let invalid = || VersionError::InvalidVersion {
        input: input.to_string(),
    };

    let s = input.trim();
    let s = s
        .strip_prefix('v')
        .or_else(|| s.strip_prefix('V'))
        .unwrap_or(s);

    let (s, build) = match s.split_once('+') {
        Some((rest, build)) => (rest, Some(build)),
        None => (s, None),
    };

    let core_len = s
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(s.len());
    let (core, rest) = s.split_at(core_len);

    if core.is_empty() {
        return Err(invalid());
    }

    let release = core
        .split('.')
        .map(|part| part.parse::<u64>().map_err(|_| invalid()))
        .collect::<Result<Vec<_>, _>>()?;

    let pre = if rest.is_empty() {
        Prerelease::EMPTY
    } else {
        let tag = rest.strip_prefix('-').unwrap_or(rest);
        if tag.is_empty() || !tag.starts_with(|c: char| c.is_ascii_alphanumeric()) {
            return Err(invalid());
        }
        Prerelease::new(tag).map_err(|_| invalid())?
    };

    let build = match build {
        Some(meta) => BuildMetadata::new(meta).map_err(|_| invalid())?,
        None => BuildMetadata::EMPTY,
    };

    Ok(Version {
        pre,
        build,
        ..Version::from_segments(release)
    })
}

/// A single version constraint
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionConstraint {
    Exact(Version),
    GreaterEqual(Version),
    LessEqual(Version),
    Greater(Version),
    Less(Version),
    NotEqual(Version),
}

impl VersionConstraint {
    /// Check if a version satisfies this constraint
    #[must_use]
    pub fn matches(&self, version: &Version) -> bool {
        match self {
            Self::Exact(v) => version == v,
            Self::GreaterEqual(v) => version >= v,
            Self::LessEqual(v) => version <= v,
            Self::Greater(v) => version > v,
            Self::Less(v) => version < v,
            Self::NotEqual(v) => version != v,
        }
    }

    /// The version this constraint compares against
    #[must_use]
    pub fn version(&self) -> &Version {
        match self {
            Self::Exact(v)
            | Self::GreaterEqual(v)
            | Self::LessEqual(v)
            | Self::Greater(v)
            | Self::Less(v)
            | Self::NotEqual(v) => v,
        }
    }
}

impl FromStr for VersionConstraint {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = || VersionError::InvalidConstraint {
            input: s.to_string(),
        };

        let (build, version_str): (fn(Version) -> Self, &str) =
            if let Some(rest) = s.strip_prefix(">=") {
                (Self::GreaterEqual, rest)
            } else if let Some(rest) = s.strip_prefix("<=") {
                (Self::LessEqual, rest)
            } else if let Some(rest) = s.strip_prefix("!=") {
                (Self::NotEqual, rest)
            } else if let Some(rest) = s.strip_prefix("==") {
                (Self::Exact, rest)
            } else if let Some(rest) = s.strip_prefix('>') {
                (Self::Greater, rest)
            } else if let Some(rest) = s.strip_prefix('<') {
                (Self::Less, rest)
            } else if let Some(rest) = s.strip_prefix('=') {
                (Self::Exact, rest)
            } else {
                (Self::Exact, s)
            };

        if version_str.trim().is_empty() {
            return Err(invalid());
        }

        let version = parse_version(version_str).map_err(|_| invalid())?;
        Ok(build(version))
    }
}

impl fmt::Display for VersionConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(v) => write!(f, "=={v}"),
            Self::GreaterEqual(v) => write!(f, ">={v}"),
            Self::LessEqual(v) => write!(f, "<={v}"),
            Self::Greater(v) => write!(f, ">{v}"),
            Self::Less(v) => write!(f, "<{v}"),
            Self::NotEqual(v) => write!(f, "!={v}"),
        }
    }
}

impl Serialize for VersionConstraint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for VersionConstraint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// A version specification that can contain multiple constraints
///
/// All constraints must hold. A specification without constraints matches
/// nothing: an advisory range with no bounds carries no information.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionSpec {
    constraints: Vec<VersionConstraint>,
}

impl VersionSpec {
    /// Create a version spec from a list of constraints
    #[must_use]
    pub fn new(constraints: Vec<VersionConstraint>) -> Self {
        Self { constraints }
    }

    /// Check if a version satisfies all constraints
    #[must_use]
    pub fn matches(&self, version: &Version) -> bool {
        !self.constraints.is_empty() && self.constraints.iter().all(|c| c.matches(version))
    }

    /// Get the constraints
    #[must_use]
    pub fn constraints(&self) -> &[VersionConstraint] {
        &self.constraints
    }

    /// Check if this spec has no constraints
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    /// Parse every expression in `exprs`, each of which may itself hold
    /// comma-separated constraints, into one specification.
    ///
    /// # Errors
    ///
    /// Returns `VersionError::InvalidConstraint` for the first expression that
    /// does not parse.
    pub fn from_exprs<I, S>(exprs: I) -> Result<Self, VersionError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut constraints = Vec::new();
        for expr in exprs {
            for part in expr.as_ref().split(',') {
                if part.trim().is_empty() {
                    continue;
                }
                constraints.push(part.parse()?);
            }
        }
        Ok(Self { constraints })
    }
}

impl FromStr for VersionSpec {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_exprs([s])
    }
}

impl fmt::Display for VersionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let strs: Vec<_> = self.constraints.iter().map(ToString::to_string).collect();
        write!(f, "{}", strs.join(","))
    }
}
