//! Integration tests for config

#[cfg(test)]
mod tests {
    use secscan_config::*;
    use std::io::Write;
    use std::sync::Mutex;
    use tempfile::NamedTempFile;

    // Mutex to ensure env var tests don't run concurrently
    static ENV_TEST_MUTEX: Mutex<()> = Mutex::new(());

    #[tokio::test]
    async fn test_load_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
[source]
repository = "https://git.example.com/advisories.git"
branch = "main"
checkout_dir = "/srv/advisories"

[refresh]
interval = 120
jitter = 15

[server]
port = 9000
        "#
        )
        .unwrap();

        let config = Config::load_from_file(temp_file.path()).await.unwrap();
        assert_eq!(config.source.repository, "https://git.example.com/advisories.git");
        assert_eq!(config.source.branch, "main");
        assert_eq!(config.refresh.interval, 120);
        assert_eq!(config.refresh.jitter, 15);
        // Unset values keep their defaults
        assert_eq!(config.refresh.sync_timeout, 120);
        assert_eq!(config.server.bind, "0.0.0.0");
        assert_eq!(config.server.port, 9000);
        assert!(config.metrics.statsd.is_none());
    }

    #[tokio::test]
    async fn test_load_invalid_toml() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "[refresh\ninterval = ").unwrap();

        assert!(Config::load_from_file(temp_file.path()).await.is_err());
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(Config::load_or_default(Some(missing.as_path())).await.is_err());
    }

    #[test]
    fn test_merge_env() {
        let _guard = ENV_TEST_MUTEX.lock().unwrap();

        std::env::set_var("SECSCAN_REPO", "https://mirror.example.com/advisories.git");
        std::env::set_var("SECSCAN_JITTER", "5");

        let mut config = Config::default();
        let result = config.merge_env();

        std::env::remove_var("SECSCAN_REPO");
        std::env::remove_var("SECSCAN_JITTER");

        result.unwrap();
        assert_eq!(
            config.source.repository,
            "https://mirror.example.com/advisories.git"
        );
        assert_eq!(config.refresh.jitter, 5);
    }
}
