//! Integration tests for the git synchronizer and directory source

#[cfg(test)]
mod tests {
    use git2::{Commit, Oid, Repository, RepositoryInitOptions, Signature};
    use secscan_errors::{Error, SyncError};
    use secscan_source::*;
    use std::fs;
    use std::path::Path;

    const GUZZLE: &str = "title: HTTP Proxy header vulnerability
link: https://github.com/guzzle/guzzle/releases/tag/6.2.1
cve: CVE-2016-5385
branches:
    master:
        time: 2015-07-15 17:14:23
        versions: ['>=6', '<6.2.1']
reference: composer://guzzlehttp/guzzle
";

    const TWIG: &str = "title: Sandbox bypass
link: https://symfony.com/blog/twig-sandbox
cve: CVE-2019-9942
branches:
    1.x:
        time: 2019-03-12 12:00:00
        versions: ['<1.38.0']
reference: composer://twig/twig
";

    fn init_upstream(path: &Path) -> Repository {
        let mut opts = RepositoryInitOptions::new();
        opts.initial_head("master");
        Repository::init_opts(path, &opts).unwrap()
    }

    fn commit_file(repo: &Repository, rel: &str, content: &str) -> Oid {
        let workdir = repo.workdir().unwrap();
        let full = workdir.join(rel);
        fs::create_dir_all(full.parent().unwrap()).unwrap();
        fs::write(&full, content).unwrap();

        let mut index = repo.index().unwrap();
        index.add_path(Path::new(rel)).unwrap();
        index.write().unwrap();
        let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();

        let sig = Signature::now("advisories", "advisories@example.com").unwrap();
        let parent = repo.head().ok().and_then(|h| h.peel_to_commit().ok());
        let parents: Vec<&Commit> = parent.iter().collect();
        repo.commit(Some("HEAD"), &sig, &sig, &format!("add {rel}"), &tree, &parents)
            .unwrap()
    }

    fn url(path: &Path) -> String {
        path.to_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_clone_then_fetch_new_revision() {
        let upstream_dir = tempfile::tempdir().unwrap();
        let upstream = init_upstream(upstream_dir.path());
        let first = commit_file(&upstream, "guzzlehttp/guzzle/CVE-2016-5385.yaml", GUZZLE);

        let checkout_dir = tempfile::tempdir().unwrap();
        let checkout = checkout_dir.path().join("advisories");
        let sync = GitSynchronizer::new(url(upstream_dir.path()), "master", &checkout);

        let fingerprint = sync.sync().await.unwrap();
        assert_eq!(fingerprint.as_str(), first.to_string());
        assert!(checkout.join("guzzlehttp/guzzle/CVE-2016-5385.yaml").exists());
        assert_eq!(sync.root(), checkout.as_path());

        let second = commit_file(&upstream, "twig/twig/CVE-2019-9942.yaml", TWIG);
        let fingerprint = sync.sync().await.unwrap();
        assert_eq!(fingerprint.as_str(), second.to_string());
        assert!(checkout.join("twig/twig/CVE-2019-9942.yaml").exists());

        let advisories: Vec<_> = DirectorySource::new(sync.root())
            .advisories()
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(advisories.len(), 2);
    }

    #[tokio::test]
    async fn test_sync_without_changes_is_stable() {
        let upstream_dir = tempfile::tempdir().unwrap();
        let upstream = init_upstream(upstream_dir.path());
        commit_file(&upstream, "guzzlehttp/guzzle/CVE-2016-5385.yaml", GUZZLE);

        let checkout_dir = tempfile::tempdir().unwrap();
        let sync = GitSynchronizer::new(url(upstream_dir.path()), "master", checkout_dir.path());

        let first = sync.sync().await.unwrap();
        let second = sync.sync().await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_local_edits_are_discarded() {
        let upstream_dir = tempfile::tempdir().unwrap();
        let upstream = init_upstream(upstream_dir.path());
        commit_file(&upstream, "guzzlehttp/guzzle/CVE-2016-5385.yaml", GUZZLE);

        let checkout_dir = tempfile::tempdir().unwrap();
        let sync = GitSynchronizer::new(url(upstream_dir.path()), "master", checkout_dir.path());
        sync.sync().await.unwrap();

        let tracked = checkout_dir.path().join("guzzlehttp/guzzle/CVE-2016-5385.yaml");
        fs::write(&tracked, "garbage").unwrap();
        sync.sync().await.unwrap();
        assert_eq!(fs::read_to_string(&tracked).unwrap(), GUZZLE);
    }

    #[tokio::test]
    async fn test_failed_fetch_leaves_checkout_untouched() {
        let upstream_dir = tempfile::tempdir().unwrap();
        let upstream = init_upstream(upstream_dir.path());
        commit_file(&upstream, "guzzlehttp/guzzle/CVE-2016-5385.yaml", GUZZLE);
        drop(upstream);

        let checkout_dir = tempfile::tempdir().unwrap();
        let sync = GitSynchronizer::new(url(upstream_dir.path()), "master", checkout_dir.path());
        sync.sync().await.unwrap();

        upstream_dir.close().unwrap();
        let err = sync.sync().await.unwrap_err();
        assert!(matches!(err, Error::Sync(SyncError::FetchFailed { .. })));
        assert!(checkout_dir
            .path()
            .join("guzzlehttp/guzzle/CVE-2016-5385.yaml")
            .exists());
    }

    #[tokio::test]
    async fn test_clone_unknown_branch_fails() {
        let upstream_dir = tempfile::tempdir().unwrap();
        let upstream = init_upstream(upstream_dir.path());
        commit_file(&upstream, "guzzlehttp/guzzle/CVE-2016-5385.yaml", GUZZLE);

        let checkout_dir = tempfile::tempdir().unwrap();
        let sync = GitSynchronizer::new(
            url(upstream_dir.path()),
            "no-such-branch",
            checkout_dir.path().join("advisories"),
        );
        assert!(sync.sync().await.is_err());
    }
}
