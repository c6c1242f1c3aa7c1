//! Git-backed synchronizer
//!
//! The first sync clones the configured branch into the checkout directory.
//! Later syncs fetch that branch into `refs/remotes/origin/<branch>` and hard
//! reset the working tree onto it. All git work happens on the blocking pool.

use crate::Synchronizer;
use async_trait::async_trait;
use git2::build::{CheckoutBuilder, RepoBuilder};
use git2::{Repository, ResetType};
use secscan_errors::{Error, SyncError};
use secscan_types::Fingerprint;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, TryLockError};
use std::time::Instant;

const REMOTE_NAME: &str = "origin";

/// Keeps a git checkout of the advisory corpus on one branch
#[derive(Debug, Clone)]
pub struct GitSynchronizer {
    url: String,
    branch: String,
    checkout: PathBuf,
    // Held for the whole blocking sync. A sync abandoned by a timeout keeps
    // running on the blocking pool and must not race the next one.
    busy: Arc<Mutex<()>>,
}

impl GitSynchronizer {
    pub fn new(url: impl Into<String>, branch: impl Into<String>, checkout: impl Into<PathBuf>) -> Self {
        Self {
            url: url.into(),
            branch: branch.into(),
            checkout: checkout.into(),
            busy: Arc::new(Mutex::new(())),
        }
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    #[must_use]
    pub fn branch(&self) -> &str {
        &self.branch
    }
}

#[async_trait]
impl Synchronizer for GitSynchronizer {
    async fn sync(&self) -> Result<Fingerprint, Error> {
        let url = self.url.clone();
        let branch = self.branch.clone();
        let checkout = self.checkout.clone();
        let busy = Arc::clone(&self.busy);

        tokio::task::spawn_blocking(move || {
            let _guard = match busy.try_lock() {
                Ok(guard) => guard,
                Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
                Err(TryLockError::WouldBlock) => {
                    return Err(SyncError::Repository {
                        message: "a previous synchronization is still running".to_string(),
                    }
                    .into())
                }
            };
            sync_checkout(&url, &branch, &checkout)
        })
        .await
        .map_err(|e| Error::internal(format!("sync task failed: {e}")))?
    }

    fn root(&self) -> &Path {
        &self.checkout
    }
}

fn sync_checkout(url: &str, branch: &str, checkout: &Path) -> Result<Fingerprint, Error> {
    let started = Instant::now();
    let fingerprint = if checkout.join(".git").exists() {
        fetch_and_reset(url, branch, checkout)?
    } else {
        clone(url, branch, checkout)?
    };
    tracing::debug!(
        revision = %fingerprint.short(),
        elapsed_ms = started.elapsed().as_millis(),
        "advisory checkout up to date"
    );
    Ok(fingerprint)
}

fn clone(url: &str, branch: &str, checkout: &Path) -> Result<Fingerprint, Error> {
    std::fs::create_dir_all(checkout).map_err(|e| Error::io_with_path(&e, checkout))?;
    tracing::info!(%url, %branch, path = %checkout.display(), "cloning advisory repository");

    let repo = RepoBuilder::new()
        .branch(branch)
        .clone(url, checkout)
        .map_err(|e| SyncError::CloneFailed {
            url: url.to_string(),
            message: e.message().to_string(),
        })?;

    let commit = repo
        .head()
        .and_then(|head| head.peel_to_commit())
        .map_err(|_| SyncError::BranchNotFound {
            branch: branch.to_string(),
        })?;
    Ok(Fingerprint::new(commit.id().to_string()))
}

fn fetch_and_reset(url: &str, branch: &str, checkout: &Path) -> Result<Fingerprint, Error> {
    let repo = Repository::open(checkout).map_err(repository_error)?;

    let mut remote = match repo.find_remote(REMOTE_NAME) {
        Ok(remote) if remote.url() == Some(url) => remote,
        Ok(_) => {
            tracing::info!(%url, "advisory repository URL changed, updating remote");
            repo.remote_set_url(REMOTE_NAME, url)
                .map_err(repository_error)?;
            repo.find_remote(REMOTE_NAME).map_err(repository_error)?
        }
        Err(_) => repo.remote(REMOTE_NAME, url).map_err(repository_error)?,
    };

    let refspec = format!("+refs/heads/{branch}:refs/remotes/{REMOTE_NAME}/{branch}");
    remote
        .fetch(&[refspec.as_str()], None, None)
        .map_err(|e| SyncError::FetchFailed {
            remote: url.to_string(),
            message: e.message().to_string(),
        })?;

    let tracking = format!("refs/remotes/{REMOTE_NAME}/{branch}");
    let commit = repo
        .find_reference(&tracking)
        .and_then(|reference| reference.peel_to_commit())
        .map_err(|_| SyncError::BranchNotFound {
            branch: branch.to_string(),
        })?;

    let mut options = CheckoutBuilder::new();
    options.force();
    repo.reset(commit.as_object(), ResetType::Hard, Some(&mut options))
        .map_err(|e| SyncError::CheckoutFailed {
            revision: commit.id().to_string(),
            message: e.message().to_string(),
        })?;

    Ok(Fingerprint::new(commit.id().to_string()))
}

fn repository_error(e: git2::Error) -> Error {
    SyncError::Repository {
        message: e.message().to_string(),
    }
    .into()
}
