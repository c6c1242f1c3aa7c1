//! Integration tests for the secscan CLI

use git2::{Repository, RepositoryInitOptions, Signature};
use std::fs;
use std::path::Path;
use std::process::{Command, Output};

const GUZZLE: &str = "title: HTTP Proxy header vulnerability
link: https://github.com/guzzle/guzzle/releases/tag/6.2.1
cve: CVE-2016-5385
branches:
    master:
        time: 2016-07-18 21:01:00
        versions: ['>=6', '<6.2.1']
    5.3:
        time: 2016-07-18 21:01:00
        versions: ['>=4.0.0-rc2', '<5.3.1']
reference: composer://guzzlehttp/guzzle
";

fn lock(packages: &[(&str, &str)]) -> String {
    let packages: Vec<_> = packages
        .iter()
        .map(|(name, version)| serde_json::json!({"name": name, "version": version}))
        .collect();
    serde_json::json!({ "packages": packages, "packages-dev": [] }).to_string()
}

/// Local advisory repository with a single guzzle advisory on `master`
fn upstream(path: &Path) {
    let mut opts = RepositoryInitOptions::new();
    opts.initial_head("master");
    let repo = Repository::init_opts(path, &opts).unwrap();

    let rel = "guzzlehttp/guzzle/CVE-2016-5385.yaml";
    fs::create_dir_all(path.join("guzzlehttp/guzzle")).unwrap();
    fs::write(path.join(rel), GUZZLE).unwrap();

    let mut index = repo.index().unwrap();
    index.add_path(Path::new(rel)).unwrap();
    index.write().unwrap();
    let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
    let sig = Signature::now("advisories", "advisories@example.com").unwrap();
    repo.commit(Some("HEAD"), &sig, &sig, "add guzzle", &tree, &[])
        .unwrap();
}

fn secscan(workdir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_secscan"))
        .args(args)
        .env("XDG_CONFIG_HOME", workdir)
        .env("HOME", workdir)
        .env_remove("RUST_LOG")
        .env_remove("SECSCAN_REPO")
        .env_remove("SECSCAN_BRANCH")
        .env_remove("SECSCAN_GITDIR")
        .output()
        .expect("Failed to execute secscan")
}

struct Fixture {
    dir: tempfile::TempDir,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        upstream(&dir.path().join("upstream"));
        Self { dir }
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    fn repo(&self) -> String {
        self.path().join("upstream").to_str().unwrap().to_string()
    }

    fn lockfile(&self, packages: &[(&str, &str)]) -> String {
        let path = self.path().join("composer.lock");
        fs::write(&path, lock(packages)).unwrap();
        path.to_str().unwrap().to_string()
    }

    fn check(&self, lockfile: &str, extra: &[&str]) -> Output {
        let repo = self.repo();
        let mut args = vec!["--repo", repo.as_str()];
        args.extend_from_slice(extra);
        args.extend_from_slice(&["check", lockfile]);
        secscan(self.path(), &args)
    }
}

#[test]
fn test_cli_version() {
    let output = secscan(Path::new("."), &["--version"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("secscan"));
}

#[test]
fn test_cli_help() {
    let output = secscan(Path::new("."), &["--help"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("security advisories"));
    assert!(stdout.contains("check"));
    assert!(stdout.contains("serve"));
}

#[test]
fn test_cli_invalid_command() {
    let output = secscan(Path::new("."), &["invalid-command"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("unrecognized subcommand"));
}

#[test]
fn test_check_vulnerable_lock_exits_one() {
    let fixture = Fixture::new();
    let lockfile = fixture.lockfile(&[("guzzlehttp/guzzle", "6.2.0"), ("twig/twig", "v2.4.4")]);

    let output = fixture.check(&lockfile, &[]);
    assert_eq!(output.status.code(), Some(1));

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("package guzzlehttp/guzzle (6.2.0) is"));
    assert!(stdout.contains("CVE-2016-5385"));
    assert!(!stdout.contains("twig/twig"));
}

#[test]
fn test_check_clean_lock_exits_zero() {
    let fixture = Fixture::new();
    let lockfile = fixture.lockfile(&[("guzzlehttp/guzzle", "6.2.1")]);

    let output = fixture.check(&lockfile, &[]);
    assert_eq!(output.status.code(), Some(0));
}

#[test]
fn test_check_json_report() {
    let fixture = Fixture::new();
    let lockfile = fixture.lockfile(&[("guzzlehttp/guzzle", "5.3.0")]);

    let output = fixture.check(&lockfile, &["--json"]);
    assert_eq!(output.status.code(), Some(1));

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["vulnerable"], true);
    assert_eq!(report["vulnerabilities"][0]["cve"][0]["id"], "CVE-2016-5385");
    assert!(report["version"].is_string());
}

#[test]
fn test_check_reuses_gitdir() {
    let fixture = Fixture::new();
    let lockfile = fixture.lockfile(&[("guzzlehttp/guzzle", "6.0.0")]);
    let gitdir = fixture.path().join("checkout");
    let gitdir = gitdir.to_str().unwrap();

    for _ in 0..2 {
        let output = fixture.check(&lockfile, &["--gitdir", gitdir]);
        assert_eq!(output.status.code(), Some(1));
    }
    assert!(fixture
        .path()
        .join("checkout/guzzlehttp/guzzle/CVE-2016-5385.yaml")
        .exists());
}

#[test]
fn test_check_unreachable_repository_exits_two() {
    let fixture = Fixture::new();
    let lockfile = fixture.lockfile(&[("guzzlehttp/guzzle", "6.2.0")]);
    let missing = fixture.path().join("no-such-repo");

    let output = secscan(
        fixture.path(),
        &["--repo", missing.to_str().unwrap(), "check", &lockfile],
    );
    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Error:"));
}

#[test]
fn test_check_malformed_lockfile_exits_two() {
    let fixture = Fixture::new();
    let path = fixture.path().join("composer.lock");
    fs::write(&path, "not json").unwrap();

    let output = fixture.check(path.to_str().unwrap(), &[]);
    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Unable to read lock file"));
}

#[test]
fn test_config_file_supplies_repository() {
    let fixture = Fixture::new();
    let lockfile = fixture.lockfile(&[("guzzlehttp/guzzle", "6.2.0")]);
    let config = fixture.path().join("secscan.toml");
    fs::write(
        &config,
        format!("[source]\nrepository = {:?}\n", fixture.repo()),
    )
    .unwrap();

    let output = secscan(
        fixture.path(),
        &["--config", config.to_str().unwrap(), "check", &lockfile],
    );
    assert_eq!(output.status.code(), Some(1));
}
