//! Update rounds driven through the compiled `qup` binary.

use std::collections::HashMap;

use predicates::prelude::*;
use tempfile::tempdir;

use crate::common::{qup_command, ManifestBuilder, TestServer};

#[test]
fn check_then_install_round_trips() {
    let server = TestServer::start(HashMap::from([(
        "/app.bin".to_string(),
        b"cli-binary".to_vec(),
    )]));
    let manifest = ManifestBuilder::new()
        .general()
        .file("app.bin")
        .url(server.base_url())
        .build();
    server.set_route("/instructions.txt", manifest);

    let home = tempdir().unwrap();
    let destination = tempdir().unwrap();
    let staging = std::env::temp_dir().join("qup-cli-check-product");
    let _ = std::fs::remove_dir_all(&staging);

    qup_command(home.path())
        .args(["check", "--product", "cli-check-product"])
        .args(["--url", &server.url("/instructions.txt")])
        .arg("--dir")
        .arg(destination.path())
        .args(["--platform", "debian_amd64"])
        .assert()
        .success()
        // The staged tree holds the fetched instructions document plus the
        // one described file; neither is installed yet.
        .stdout(predicate::str::contains("2 of 2 files differ"))
        .stdout(predicate::str::contains("staged files are ready"));

    // check never writes the destination.
    assert!(!destination.path().join("app.bin").exists());

    qup_command(home.path())
        .args(["install", "--skip-download", "--product", "cli-check-product"])
        .args(["--url", &server.url("/instructions.txt")])
        .arg("--dir")
        .arg(destination.path())
        .args(["--platform", "debian_amd64"])
        .assert()
        .success()
        .stdout(predicate::str::contains("installed into"));

    assert_eq!(
        std::fs::read(destination.path().join("app.bin")).unwrap(),
        b"cli-binary"
    );
}

#[test]
fn install_uses_a_saved_favorite() {
    let server = TestServer::start(HashMap::from([(
        "/tool.bin".to_string(),
        b"favorite-binary".to_vec(),
    )]));
    let manifest = ManifestBuilder::new()
        .general()
        .file("tool.bin")
        .url(server.base_url())
        .build();
    server.set_route("/instructions.txt", manifest);

    let home = tempdir().unwrap();
    let destination = tempdir().unwrap();
    let staging = std::env::temp_dir().join("qup-cli-fav-product");
    let _ = std::fs::remove_dir_all(&staging);

    qup_command(home.path())
        .args(["favorite", "add", "cli-fav-product"])
        .args(["--url", &server.url("/instructions.txt")])
        .arg("--dir")
        .arg(destination.path())
        .args(["--platform", "debian_amd64"])
        .assert()
        .success();

    qup_command(home.path())
        .args(["install", "--favorite", "cli-fav-product", "--quiet"])
        .assert()
        .success();

    assert_eq!(
        std::fs::read(destination.path().join("tool.bin")).unwrap(),
        b"favorite-binary"
    );
}

#[test]
fn check_json_emits_the_diff_report() {
    let server = TestServer::start(HashMap::from([(
        "/app.bin".to_string(),
        b"json-binary".to_vec(),
    )]));
    let manifest = ManifestBuilder::new()
        .general()
        .file("app.bin")
        .url(server.base_url())
        .build();
    server.set_route("/instructions.txt", manifest);

    let home = tempdir().unwrap();
    let destination = tempdir().unwrap();
    let staging = std::env::temp_dir().join("qup-cli-json-product");
    let _ = std::fs::remove_dir_all(&staging);

    qup_command(home.path())
        .args(["check", "--json", "--product", "cli-json-product"])
        .args(["--url", &server.url("/instructions.txt")])
        .arg("--dir")
        .arg(destination.path())
        .args(["--platform", "debian_amd64"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"aggregate\": \"sha256:"))
        .stdout(predicate::str::contains("app.bin"));
}

#[test]
fn missing_parameters_are_rejected_up_front() {
    let home = tempdir().unwrap();
    qup_command(home.path())
        .args(["check"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("a product is required"));
}

#[test]
fn truncated_manifest_fails_the_command() {
    let server = TestServer::start(HashMap::new());
    let manifest = ManifestBuilder::new()
        .general()
        .file("app.bin")
        .url(server.base_url())
        .build_truncated();
    server.set_route("/instructions.txt", manifest);

    let home = tempdir().unwrap();
    let destination = tempdir().unwrap();
    let staging = std::env::temp_dir().join("qup-cli-trunc-product");
    let _ = std::fs::remove_dir_all(&staging);

    qup_command(home.path())
        .args(["check", "--product", "cli-trunc-product"])
        .args(["--url", &server.url("/instructions.txt")])
        .arg("--dir")
        .arg(destination.path())
        .args(["--platform", "debian_amd64"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("trailer"));
}

#[cfg(unix)]
#[test]
fn run_interrupts_cleanly_during_the_first_round() {
    use std::io::Read;
    use std::process::{Command, Stdio};
    use std::time::{Duration, Instant};

    // A listener that never accepts: connections succeed via the backlog
    // but no response ever comes, so the first round stays in flight.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("http://{}/instructions.txt", listener.local_addr().unwrap());

    let home = tempdir().unwrap();
    let destination = tempdir().unwrap();
    let staging = std::env::temp_dir().join("qup-cli-sigint-product");
    let _ = std::fs::remove_dir_all(&staging);

    let mut child = Command::new(assert_cmd::cargo::cargo_bin("qup"))
        .arg("--home")
        .arg(home.path())
        .args(["run", "--product", "cli-sigint-product"])
        .args(["--url", &url])
        .arg("--dir")
        .arg(destination.path())
        .args(["--platform", "debian_amd64"])
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .unwrap();

    // Give the round time to get stuck on the silent server.
    std::thread::sleep(Duration::from_millis(500));
    Command::new("kill")
        .args(["-INT", &child.id().to_string()])
        .status()
        .unwrap();

    let deadline = Instant::now() + Duration::from_secs(10);
    let status = loop {
        if let Some(status) = child.try_wait().unwrap() {
            break status;
        }
        assert!(Instant::now() < deadline, "qup did not exit after SIGINT");
        std::thread::sleep(Duration::from_millis(50));
    };
    assert!(status.success(), "interrupt must exit cleanly, got {status}");

    let mut stdout = String::new();
    child.stdout.take().unwrap().read_to_string(&mut stdout).unwrap();
    assert!(stdout.contains("stopped"));
}

#[test]
fn help_and_version_smoke() {
    assert_cmd::Command::cargo_bin("qup")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("instructions document"));

    assert_cmd::Command::cargo_bin("qup")
        .unwrap()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("qup"));
}
