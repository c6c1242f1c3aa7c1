#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Core type definitions for secscan
//!
//! This crate provides the fundamental types used throughout the system:
//! lenient version parsing and constraint matching, the advisory data model,
//! check reports, and the `composer.lock` input format.

pub mod advisory;
pub mod lockfile;
pub mod reports;
pub mod version;

// Re-export commonly used types
pub use advisory::{Advisory, Branch, Fingerprint, PackageKey};
pub use lockfile::{ComposerLock, LockedPackage};
pub use reports::{AdvisorySummary, CheckItem, CheckReport, PackageFinding, SkippedItem};
pub use version::{parse_version, Version, VersionConstraint, VersionSpec};
