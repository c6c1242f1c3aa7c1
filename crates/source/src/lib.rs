#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Advisory corpus access for secscan
//!
//! Two narrow seams sit between the vulnerability database and the outside
//! world:
//!
//! - [`Synchronizer`] brings a local copy of the advisory corpus up to date
//!   and reports the revision it now holds.
//! - [`AdvisorySource`] yields decoded advisory records from that copy.
//!
//! [`GitSynchronizer`] and [`DirectorySource`] are the production
//! implementations; tests substitute in-memory ones.

mod directory;
mod git;

pub use directory::{read_advisory, DirectorySource};
pub use git::GitSynchronizer;

use async_trait::async_trait;
use secscan_errors::Error;
use secscan_types::{Advisory, Fingerprint};
use std::path::Path;

/// Lazy stream of decoded advisories; the first `Err` should end consumption
pub type AdvisoryIter<'a> = Box<dyn Iterator<Item = Result<Advisory, Error>> + Send + 'a>;

/// Keeps a local copy of the advisory corpus current
#[async_trait]
pub trait Synchronizer: Send + Sync {
    /// Bring the local copy up to date and return its revision.
    ///
    /// On failure the local copy is left as it was before the call.
    async fn sync(&self) -> Result<Fingerprint, Error>;

    /// Directory holding the local copy
    fn root(&self) -> &Path;
}

/// Produces decoded advisory records
pub trait AdvisorySource: Send + Sync {
    /// Start a fresh pass over the corpus.
    ///
    /// # Errors
    ///
    /// Returns an error if the corpus cannot be opened at all. Errors for
    /// individual records are yielded by the iterator.
    fn advisories(&self) -> Result<AdvisoryIter<'_>, Error>;
}

/// In-memory corpus, mostly useful for tests and fixtures
impl AdvisorySource for Vec<Advisory> {
    fn advisories(&self) -> Result<AdvisoryIter<'_>, Error> {
        Ok(Box::new(self.iter().cloned().map(Ok)))
    }
}
