//! Full update rounds through the library API.

use std::collections::HashMap;

use tempfile::tempdir;

use qup_cli::core::QupError;
use qup_cli::platform::Platform;
use qup_cli::session::{Session, SessionEvent, SessionParams, SessionState};

use crate::common::{ManifestBuilder, TestServer};

fn session_for(
    product: &str,
    manifest_url: String,
    destination: &std::path::Path,
) -> (Session, tokio::sync::mpsc::UnboundedReceiver<SessionEvent>) {
    let (session, events) = Session::new(SessionParams {
        product: product.to_string(),
        manifest_url,
        destination: destination.to_path_buf(),
        platform: Platform::DebianAmd64,
    })
    .expect("valid session parameters");
    // Staging persists between runs; tests start clean.
    let _ = std::fs::remove_dir_all(session.staging_dir());
    (session, events)
}

fn drain(
    events: &mut tokio::sync::mpsc::UnboundedReceiver<SessionEvent>,
) -> Vec<SessionEvent> {
    let mut collected = Vec::new();
    while let Ok(event) = events.try_recv() {
        collected.push(event);
    }
    collected
}

#[tokio::test]
async fn publisher_update_cycle_round_trips() {
    let server = TestServer::start(HashMap::from([
        ("/app.bin".to_string(), b"version-one".to_vec()),
        ("/docs/guide.txt".to_string(), b"read me".to_vec()),
    ]));
    let manifest = ManifestBuilder::new()
        .general()
        .file("app.bin")
        .file("docs/guide.txt")
        .url(server.base_url())
        .build();
    server.set_route("/instructions.txt", manifest);

    let destination = tempdir().unwrap();
    let (session, mut events) = session_for(
        "cycle-product",
        server.url("/instructions.txt"),
        destination.path(),
    );

    // First round: everything is new.
    session.start().await.unwrap();
    assert_eq!(session.state(), SessionState::ReadyToSync);
    session.install().await.unwrap();
    assert_eq!(
        std::fs::read(destination.path().join("app.bin")).unwrap(),
        b"version-one"
    );
    assert_eq!(
        std::fs::read(destination.path().join("docs/guide.txt")).unwrap(),
        b"read me"
    );
    drain(&mut events);

    // The publisher ships a new app.bin; the next round reports exactly
    // that one file as changed.
    server.set_route("/app.bin", b"version-two".to_vec());
    session.start().await.unwrap();
    let collected = drain(&mut events);
    let report = collected
        .iter()
        .find_map(|e| match e {
            SessionEvent::FilesDiffered(report) => Some(report),
            _ => None,
        })
        .expect("changed round must report a diff");
    let changed: Vec<_> = report.records.iter().filter(|r| r.differs()).collect();
    assert_eq!(changed.len(), 1);
    assert!(changed[0].staged_path.ends_with("app.bin"));

    // Installing converges the trees again.
    session.install().await.unwrap();
    assert_eq!(
        std::fs::read(destination.path().join("app.bin")).unwrap(),
        b"version-two"
    );
    let collected = drain(&mut events);
    assert!(collected.iter().any(|e| matches!(
        e,
        SessionEvent::FilesDiffered(r) if r.records.iter().all(|x| !x.differs())
    )));
}

#[tokio::test]
async fn any_failed_job_blocks_the_round() {
    let server =
        TestServer::start(HashMap::from([("/present.bin".to_string(), b"here".to_vec())]));
    let manifest = ManifestBuilder::new()
        .general()
        .file("present.bin")
        .file("absent.bin")
        .url(server.base_url())
        .build();
    server.set_route("/instructions.txt", manifest);

    let destination = tempdir().unwrap();
    let (session, mut events) = session_for(
        "partial-product",
        server.url("/instructions.txt"),
        destination.path(),
    );

    // One job failing fails the whole round: no install happens off a
    // half-staged tree. The file that did stage is kept for the next try.
    let err = session.start().await.unwrap_err();
    assert!(err.to_string().contains("1 of 2 downloads failed"));
    assert_eq!(session.state(), SessionState::Error);
    assert!(session.staging_dir().join("present.bin").is_file());
    assert!(!session.staging_dir().join("absent.bin").exists());

    let collected = drain(&mut events);
    assert!(collected.iter().any(|e| matches!(
        e,
        SessionEvent::Log { line, .. } if line.contains("transfer failed for 'absent.bin'")
    )));

    // The publisher fixes the missing file; the next round succeeds.
    server.set_route("/absent.bin", b"late".to_vec());
    session.start().await.unwrap();
    assert_eq!(session.state(), SessionState::ReadyToSync);
}

#[tokio::test]
async fn fully_failed_round_is_an_error() {
    let server = TestServer::start(HashMap::new());
    let manifest = ManifestBuilder::new()
        .general()
        .file("absent.bin")
        .url(server.base_url())
        .build();
    server.set_route("/instructions.txt", manifest);

    let destination = tempdir().unwrap();
    let (session, _events) = session_for(
        "failed-product",
        server.url("/instructions.txt"),
        destination.path(),
    );

    let err = session.start().await.unwrap_err();
    assert!(matches!(err, QupError::Transfer { .. }));
    assert_eq!(session.state(), SessionState::Error);
}

#[tokio::test]
async fn unix_section_ships_an_executable_and_patched_wrapper() {
    let wrapper = "#!/bin/sh\n# qup launch stanza\nexec ./fallback \"$@\"\n";
    let server = TestServer::start(HashMap::from([
        ("/wrapped".to_string(), b"binary".to_vec()),
        ("/wrapped.sh".to_string(), wrapper.as_bytes().to_vec()),
    ]));
    let manifest = ManifestBuilder::new()
        .unix()
        .executable("debian_amd64", "wrapped")
        .shell("wrapped.sh")
        .url(server.base_url())
        .build();
    server.set_route("/instructions.txt", manifest);

    let destination = tempdir().unwrap();
    let (session, _events) = session_for(
        "wrapped",
        server.url("/instructions.txt"),
        destination.path(),
    );

    session.start().await.unwrap();
    session.install().await.unwrap();

    let installed = std::fs::read_to_string(destination.path().join("wrapped.sh")).unwrap();
    assert!(installed.contains("# qup launch stanza"));
    assert!(installed.contains("if [ -x"));
    assert!(installed.contains("exec ./fallback"));

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        for name in ["wrapped", "wrapped.sh"] {
            let mode = std::fs::metadata(destination.path().join(name))
                .unwrap()
                .permissions()
                .mode();
            assert_eq!(mode & 0o111, 0o111, "{name} must be executable");
        }
    }
}

#[tokio::test]
async fn truncated_manifest_never_dispatches_downloads() {
    let server = TestServer::start(HashMap::new());
    let manifest = ManifestBuilder::new()
        .general()
        .file("app.bin")
        .url(server.base_url())
        .build_truncated();
    server.set_route("/instructions.txt", manifest);

    let destination = tempdir().unwrap();
    let (session, mut events) = session_for(
        "truncated-product",
        server.url("/instructions.txt"),
        destination.path(),
    );

    let err = session.start().await.unwrap_err();
    assert!(matches!(err, QupError::Manifest { .. }));
    let collected = drain(&mut events);
    assert!(!collected
        .iter()
        .any(|e| matches!(e, SessionEvent::StateChanged(SessionState::Downloading))));
}
