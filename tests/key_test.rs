use assert_cmd::cargo::cargo_bin_cmd;
use assert_fs::prelude::*;
use predicates::prelude::*;

const FPR_A: &str = "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";
const FPR_B: &str = "BBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBB";

/// Run keyward against `dir` with a gpg path that never exists, so no test
/// depends on (or touches) the machine's keyring.
fn keyward(dir: &assert_fs::TempDir) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("keyward");
    cmd.env_remove("KEYWARD_DIR")
        .env_remove("KEYWARD_LOG")
        .arg("--dir")
        .arg(dir.path())
        .arg("--gpg")
        .arg(dir.path().join("no-such-gpg"));
    cmd
}

fn seed_two_keys(dir: &assert_fs::TempDir) {
    dir.child("db.json")
        .write_str(&format!(
            r#"{{
  "keys_imported": [{{"fingerprint": "{FPR_A}"}}, {{"fingerprint": "{FPR_B}"}}],
  "last_actions": {{}},
  "join_requests": []
}}"#
        ))
        .unwrap();
}

// ─── key list ───────────────────────────────────────────────────

#[test]
fn list_on_empty_profile() {
    let dir = assert_fs::TempDir::new().unwrap();

    keyward(&dir)
        .args(["key", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No keys managed yet"));

    // Reading must not create the database.
    dir.child("db.json").assert(predicate::path::missing());
}

#[test]
fn list_reports_keys_gpg_cannot_load() {
    let dir = assert_fs::TempDir::new().unwrap();
    seed_two_keys(&dir);

    keyward(&dir)
        .args(["key", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("AAAA AAAA AAAA AAAA AAAA  AAAA"))
        .stdout(predicate::str::contains("BBBB BBBB BBBB BBBB BBBB  BBBB"));
}

#[test]
fn corrupt_database_is_an_error() {
    let dir = assert_fs::TempDir::new().unwrap();
    dir.child("db.json").write_str("{ not json").unwrap();

    keyward(&dir)
        .args(["key", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Could not use the key database"));
}

// ─── key rotate ─────────────────────────────────────────────────

#[test]
fn rotate_dry_run_on_empty_profile() {
    let dir = assert_fs::TempDir::new().unwrap();

    keyward(&dir)
        .args(["key", "rotate", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No keys managed yet"));
}

#[test]
fn rotate_reports_every_failing_key_and_exits_non_zero() {
    let dir = assert_fs::TempDir::new().unwrap();
    seed_two_keys(&dir);
    let before = std::fs::read_to_string(dir.child("db.json").path()).unwrap();

    keyward(&dir)
        .args(["key", "rotate", "--dry-run"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("Checking 2 keys"))
        .stderr(predicate::str::contains("AAAA AAAA AAAA AAAA AAAA  AAAA"))
        .stderr(predicate::str::contains("BBBB BBBB BBBB BBBB BBBB  BBBB"))
        .stderr(predicate::str::contains("Maintenance failed for 2 key(s)"));

    let after = std::fs::read_to_string(dir.child("db.json").path()).unwrap();
    assert_eq!(after, before, "a dry run must not touch the database");
}

#[test]
fn automatic_rotation_skips_keys_not_opted_in() {
    let dir = assert_fs::TempDir::new().unwrap();
    seed_two_keys(&dir);

    keyward(&dir)
        .args(["key", "rotate", "automatic", "--cron-output"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[test]
fn automatic_rotation_reports_opted_in_failures() {
    let dir = assert_fs::TempDir::new().unwrap();
    seed_two_keys(&dir);
    dir.child("config.toml")
        .write_str(&format!("[keys.\"{FPR_B}\"]\nrotate_automatically = true\n"))
        .unwrap();

    keyward(&dir)
        .args(["key", "rotate", "automatic", "--cron-output"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("BBBB BBBB"))
        .stderr(predicate::str::contains("AAAA AAAA").not())
        .stderr(predicate::str::contains("Maintenance failed for 1 key(s)"));
}

// ─── key from-gpg ───────────────────────────────────────────────

#[test]
fn from_gpg_rejects_bad_fingerprint() {
    let dir = assert_fs::TempDir::new().unwrap();

    keyward(&dir)
        .args(["key", "from-gpg", "not-a-fingerprint"])
        .assert()
        .failure();

    dir.child("db.json").assert(predicate::path::missing());
}

#[test]
fn from_gpg_without_gpg_fails() {
    let dir = assert_fs::TempDir::new().unwrap();

    keyward(&dir)
        .args(["key", "from-gpg", FPR_A])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no-such-gpg"));
}

// ─── key import / export ────────────────────────────────────────

#[test]
fn import_rejects_file_without_secret_key() {
    let dir = assert_fs::TempDir::new().unwrap();
    let file = dir.child("public.asc");
    file.write_str(
        "-----BEGIN PGP PUBLIC KEY BLOCK-----\n\nmQ==\n-----END PGP PUBLIC KEY BLOCK-----\n",
    )
    .unwrap();

    keyward(&dir)
        .args(["key", "import"])
        .arg(file.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not contain an armored secret key"));
}

#[test]
fn export_refuses_unmanaged_key() {
    let dir = assert_fs::TempDir::new().unwrap();
    seed_two_keys(&dir);

    keyward(&dir)
        .args(["key", "export", "1234567890ABCDEF1234567890ABCDEF12345678"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("90ABCDEF12345678 is not managed"));
}

// ─── config ─────────────────────────────────────────────────────

#[test]
fn newer_profile_format_is_rejected() {
    let dir = assert_fs::TempDir::new().unwrap();
    dir.child("config.toml")
        .write_str("[keyward]\nformat_version = 99\n")
        .unwrap();

    keyward(&dir)
        .args(["key", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("format version 99"));
}

#[test]
fn inconsistent_policy_is_rejected() {
    let dir = assert_fs::TempDir::new().unwrap();
    dir.child("config.toml")
        .write_str("[policy]\nurgent_window_days = 40\n")
        .unwrap();

    keyward(&dir)
        .args(["key", "rotate", "--dry-run"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid configuration"));
}

#[test]
fn help_lists_commands() {
    cargo_bin_cmd!("keyward")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("key"))
        .stdout(predicate::str::contains("schedule"))
        .stdout(predicate::str::contains("team"));
}
