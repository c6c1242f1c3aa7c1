//! Database construction from decoded advisory records

use crate::database::VulnDatabase;
use secscan_errors::Error;
use secscan_types::Advisory;
use std::sync::Arc;

/// A fully populated database together with the number of records consumed
#[derive(Debug)]
pub struct BuiltDatabase {
    pub database: VulnDatabase,
    pub records: usize,
}

/// Populate a fresh database from `records`.
///
/// Each advisory is stored whole under the key derived from its reference.
/// Advisories without branches, or with branches that carry no constraints,
/// are kept; they simply never match.
///
/// # Errors
///
/// Returns the first record error. The partially filled database is dropped.
pub fn build<I>(records: I) -> Result<BuiltDatabase, Error>
where
    I: IntoIterator<Item = Result<Advisory, Error>>,
{
    let database = VulnDatabase::new();
    let mut count = 0usize;

    for record in records {
        let advisory = record?;
        database.insert(advisory.package_key(), Arc::new(advisory));
        count += 1;
    }

    tracing::debug!(
        records = count,
        packages = database.package_count(),
        "built vulnerability database"
    );

    Ok(BuiltDatabase {
        database,
        records: count,
    })
}
