#![warn(mismatched_lifetime_syntaxes)]
#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Vulnerability database core for secscan
//!
//! - [`VulnDatabase`]: package key to advisories, with version range lookup
//! - [`build`]: populate a database from decoded advisory records
//! - [`DatabaseHandle`]: the single live snapshot, swapped atomically
//! - [`RefreshScheduler`]: sync, rebuild and publish on an interval
//! - [`QueryEngine`]: check batches of `(package, version)` items

mod builder;
mod database;
mod handle;
mod query;
mod refresh;

pub use builder::{build, BuiltDatabase};
pub use database::VulnDatabase;
pub use handle::{DatabaseHandle, DatabaseSnapshot};
pub use query::QueryEngine;
pub use refresh::{RefreshConfig, RefreshOutcome, RefreshScheduler};
