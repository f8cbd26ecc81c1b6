//! Favorites management through the compiled `qup` binary.

use predicates::prelude::*;
use tempfile::tempdir;

use crate::common::qup_command;

#[test]
fn add_list_show_remove_round_trip() {
    let home = tempdir().unwrap();

    qup_command(home.path())
        .args(["favorite", "add", "BiblioteQ"])
        .args(["--url", "https://example.org/biblioteq.txt"])
        .args(["--dir", "/opt/biblioteq"])
        .args(["--platform", "debian_amd64"])
        .args(["--every", "30"])
        .arg("--auto-install")
        .assert()
        .success()
        .stdout(predicate::str::contains("saved favorite 'BiblioteQ'"));

    qup_command(home.path())
        .args(["favorite", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("BiblioteQ"));

    qup_command(home.path())
        .args(["favorite", "show", "BiblioteQ"])
        .assert()
        .success()
        .stdout(predicate::str::contains("https://example.org/biblioteq.txt"))
        .stdout(predicate::str::contains("Debian AMD64"))
        .stdout(predicate::str::contains("every 30 minutes"))
        .stdout(predicate::str::contains("yes"));

    qup_command(home.path())
        .args(["favorite", "remove", "BiblioteQ"])
        .assert()
        .success()
        .stdout(predicate::str::contains("removed favorite 'BiblioteQ'"));

    qup_command(home.path())
        .args(["favorite", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("no favorites saved yet"));
}

#[test]
fn add_replaces_an_existing_favorite() {
    let home = tempdir().unwrap();

    for url in ["https://one.example.org/p.txt", "https://two.example.org/p.txt"] {
        qup_command(home.path())
            .args(["favorite", "add", "Product"])
            .args(["--url", url])
            .args(["--dir", "/opt/product"])
            .args(["--platform", "macos"])
            .assert()
            .success();
    }

    qup_command(home.path())
        .args(["favorite", "show", "Product"])
        .assert()
        .success()
        .stdout(predicate::str::contains("https://two.example.org/p.txt"))
        .stdout(predicate::str::contains("https://one.example.org").not());
}

#[test]
fn unknown_names_are_reported() {
    let home = tempdir().unwrap();

    qup_command(home.path())
        .args(["favorite", "show", "Ghost"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no favorite named 'Ghost'"));

    qup_command(home.path())
        .args(["favorite", "remove", "Ghost"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no favorite named 'Ghost'"));
}

#[test]
fn invalid_platform_labels_are_rejected() {
    let home = tempdir().unwrap();

    qup_command(home.path())
        .args(["favorite", "add", "Product"])
        .args(["--url", "https://example.org/p.txt"])
        .args(["--dir", "/opt/product"])
        .args(["--platform", "Amiga"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown platform"));
}
