//! Integration tests for the `selfup` CLI binary.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

/// Isolated temp directory and manifest location for one selfup invocation
struct TestContext {
    temp_dir: TempDir,
    manifest: PathBuf,
}

impl TestContext {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let manifest = temp_dir.path().join("package.json");
        Self { temp_dir, manifest }
    }

    fn write_manifest(&self, version: &str, manifest_url: &str) {
        let body = format!(
            r#"{{
                "name": "myapp",
                "version": "{version}",
                "manifestUrl": "{manifest_url}",
                "packages": {{
                    "linux64": {{ "url": "https://example.com/myapp-linux64.tar.gz" }},
                    "win64": {{ "url": "https://example.com/dl/myapp-win64.zip?sig=abc" }}
                }}
            }}"#
        );
        std::fs::write(&self.manifest, body).expect("failed to write manifest");
    }

    fn work_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    fn selfup(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_selfup"));
        cmd.env("SELFUP_MANIFEST", &self.manifest);
        cmd.env("SELFUP_TEMP_DIR", self.work_dir().join("tmp"));
        cmd.env_remove("RUST_LOG");
        cmd
    }
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn published(version: &str, server_url: &str) -> String {
    format!(
        r#"{{"name":"myapp","version":"{version}","manifestUrl":"{server_url}/manifest.json",
            "packages":{{"win64":{{"url":"{server_url}/dl/myapp-{version}.zip?sig=abc"}},
                         "linux64":{{"url":"{server_url}/dl/myapp-{version}.tar.gz"}}}}}}"#
    )
}

#[test]
fn test_help_command() {
    let ctx = TestContext::new();
    let output = ctx.selfup().arg("--help").output().expect("failed to run selfup");
    assert!(output.status.success());
    assert!(stdout(&output).contains("Usage:"));
}

#[test]
fn test_version_command() {
    let ctx = TestContext::new();
    let output = ctx.selfup().arg("--version").output().expect("failed to run selfup");
    assert!(output.status.success());
    assert!(stdout(&output).starts_with("selfup "));
}

#[test]
fn test_platform_reports_host_key() {
    let ctx = TestContext::new();
    let output = ctx.selfup().arg("platform").output().expect("failed to run selfup");
    assert!(output.status.success());

    let key = stdout(&output);
    let key = key.trim();
    assert!(
        ["mac32", "mac64", "win32", "win64", "linux32", "linux64"].contains(&key),
        "unexpected platform key {key:?}"
    );
}

#[test]
fn test_platform_override() {
    let ctx = TestContext::new();
    let output = ctx
        .selfup()
        .args(["--platform", "win32", "platform"])
        .output()
        .expect("failed to run selfup");
    assert!(output.status.success());
    assert_eq!(stdout(&output).trim(), "win32");
}

#[test]
fn test_unknown_platform_is_rejected() {
    let ctx = TestContext::new();
    let output = ctx
        .selfup()
        .args(["--platform", "amiga", "platform"])
        .output()
        .expect("failed to run selfup");
    assert!(!output.status.success());
}

#[test]
fn test_check_reports_newer_version() {
    let mut server = mockito::Server::new();
    let _m = server
        .mock("GET", "/manifest.json")
        .with_header("content-type", "application/json")
        .with_body(published("1.2.0", &server.url()))
        .create();

    let ctx = TestContext::new();
    ctx.write_manifest("1.1.9", &format!("{}/manifest.json", server.url()));

    let output = ctx.selfup().arg("check").output().expect("failed to run selfup");
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(stdout(&output).trim(), "update available: 1.1.9 -> 1.2.0");
}

#[test]
fn test_check_up_to_date() {
    let mut server = mockito::Server::new();
    let _m = server
        .mock("GET", "/manifest.json")
        .with_body(published("1.1.9", &server.url()))
        .create();

    let ctx = TestContext::new();
    ctx.write_manifest("1.2.0", &format!("{}/manifest.json", server.url()));

    let output = ctx.selfup().arg("check").output().expect("failed to run selfup");
    assert!(output.status.success());
    assert_eq!(stdout(&output).trim(), "up to date: 1.2.0");
}

#[test]
fn test_check_fails_on_server_error() {
    let mut server = mockito::Server::new();
    let _m = server.mock("GET", "/manifest.json").with_status(500).create();

    let ctx = TestContext::new();
    ctx.write_manifest("1.0.0", &format!("{}/manifest.json", server.url()));

    let output = ctx.selfup().arg("check").output().expect("failed to run selfup");
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("500"));
}

#[test]
fn test_missing_manifest_fails() {
    let ctx = TestContext::new();
    let output = ctx.selfup().arg("check").output().expect("failed to run selfup");
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("package.json"));
}

#[test]
fn test_download_dry_run_prints_destination() {
    let mut server = mockito::Server::new();
    let _m = server
        .mock("GET", "/manifest.json")
        .with_body(published("2.0.0", &server.url()))
        .create();
    let package = server.mock("GET", "/dl/myapp-2.0.0.zip").expect(0).create();

    let ctx = TestContext::new();
    ctx.write_manifest("1.0.0", &format!("{}/manifest.json", server.url()));

    let output = ctx
        .selfup()
        .args(["--platform", "win64", "--dry-run", "download"])
        .output()
        .expect("failed to run selfup");
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let expected = ctx.work_dir().join("tmp").join("myapp-2.0.0.zip");
    assert_eq!(PathBuf::from(stdout(&output).trim()), expected);
    assert!(!expected.exists());
    package.assert();
}

#[test]
fn test_download_fetches_package() {
    let mut server = mockito::Server::new();
    let _m = server
        .mock("GET", "/manifest.json")
        .with_body(published("2.0.0", &server.url()))
        .create();
    let _pkg = server
        .mock("GET", "/dl/myapp-2.0.0.tar.gz")
        .with_body("not really gzip")
        .create();

    let ctx = TestContext::new();
    ctx.write_manifest("1.0.0", &format!("{}/manifest.json", server.url()));

    let output = ctx
        .selfup()
        .args(["--platform", "linux64", "download"])
        .output()
        .expect("failed to run selfup");
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let path = PathBuf::from(stdout(&output).trim());
    assert_eq!(path, ctx.work_dir().join("tmp").join("myapp-2.0.0.tar.gz"));
    assert_eq!(std::fs::read_to_string(path).unwrap(), "not really gzip");
}

#[test]
fn test_download_missing_platform_fails() {
    let mut server = mockito::Server::new();
    let _m = server
        .mock("GET", "/manifest.json")
        .with_body(published("2.0.0", &server.url()))
        .create();

    let ctx = TestContext::new();
    ctx.write_manifest("1.0.0", &format!("{}/manifest.json", server.url()));

    let output = ctx
        .selfup()
        .args(["--platform", "mac64", "download"])
        .output()
        .expect("failed to run selfup");
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("mac64"));
}

#[test]
fn test_debug_logging_goes_to_stderr() {
    let mut server = mockito::Server::new();
    let _m = server
        .mock("GET", "/manifest.json")
        .with_body(published("1.2.0", &server.url()))
        .create();

    let ctx = TestContext::new();
    ctx.write_manifest("1.1.9", &format!("{}/manifest.json", server.url()));

    let output = ctx
        .selfup()
        .env("RUST_LOG", "selfup_cli=debug")
        .arg("check")
        .output()
        .expect("failed to run selfup");
    assert!(output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Resolved context"), "{stderr}");
    assert!(stderr.contains("Compared versions"), "{stderr}");
    assert_eq!(stdout(&output).trim(), "update available: 1.1.9 -> 1.2.0");
}
