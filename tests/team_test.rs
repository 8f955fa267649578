use assert_cmd::cargo::cargo_bin_cmd;
use assert_fs::prelude::*;
use predicates::prelude::*;

const TEAM_A: &str = "7f3c1f2e-6a0b-4c5d-9e8f-0123456789ab";
const TEAM_B: &str = "0a1b2c3d-4e5f-4a6b-8c7d-9e0f1a2b3c4d";
const FPR: &str = "DC7D1C9556D96AA9294910E7F6D53D6649083EA9";

fn keyward(dir: &assert_fs::TempDir) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("keyward");
    cmd.env_remove("KEYWARD_DIR").arg("--dir").arg(dir.path());
    cmd
}

/// Two requests to join Kiln (the later one wins) and one to join Forge.
fn seed_requests(dir: &assert_fs::TempDir) {
    dir.child("db.json")
        .write_str(&format!(
            r#"{{
  "keys_imported": [{{"fingerprint": "{FPR}"}}],
  "join_requests": [
    {{"team_uuid": "{TEAM_A}", "team_name": "Kiln", "fingerprint": "{FPR}", "requested_at": "2026-03-01T10:00:00Z"}},
    {{"team_uuid": "{TEAM_B}", "team_name": "Forge", "fingerprint": "{FPR}", "requested_at": "2026-02-01T10:00:00Z"}},
    {{"team_uuid": "{TEAM_A}", "team_name": "Kiln", "fingerprint": "{FPR}", "requested_at": "2026-04-01T10:00:00Z"}}
  ],
  "teams": {{"kept": true}}
}}"#
        ))
        .unwrap();
}

#[test]
fn requests_on_empty_profile() {
    let dir = assert_fs::TempDir::new().unwrap();

    keyward(&dir)
        .args(["team", "requests"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No pending requests"));
}

#[test]
fn requests_show_only_the_newest_per_team_and_key() {
    let dir = assert_fs::TempDir::new().unwrap();
    seed_requests(&dir);

    keyward(&dir)
        .args(["team", "requests"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Requests to join teams (2 requests)"))
        .stdout(predicate::str::contains("Requested 1 Apr 2026"))
        .stdout(predicate::str::contains("Requested 1 Mar 2026").not())
        .stdout(predicate::str::is_match("(?s)Kiln.*Forge").unwrap());
}

#[test]
fn cancel_removes_every_request_for_the_pair() {
    let dir = assert_fs::TempDir::new().unwrap();
    seed_requests(&dir);

    keyward(&dir)
        .args(["team", "cancel", TEAM_A, FPR])
        .assert()
        .success()
        .stdout(predicate::str::contains("Cancelled request to join Kiln"));

    keyward(&dir)
        .args(["team", "requests"])
        .assert()
        .success()
        .stdout(predicate::str::contains("(1 request)"))
        .stdout(predicate::str::contains("Kiln").not());

    // Fields this version doesn't know about survive the rewrite.
    dir.child("db.json")
        .assert(predicate::str::contains("\"kept\": true"));
}

#[test]
fn cancel_accepts_spaced_lowercase_fingerprint() {
    let dir = assert_fs::TempDir::new().unwrap();
    seed_requests(&dir);

    keyward(&dir)
        .args([
            "team",
            "cancel",
            TEAM_B,
            "dc7d 1c95 56d9 6aa9 2949  10e7 f6d5 3d66 4908 3ea9",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Cancelled request to join Forge"));
}

#[test]
fn cancel_unknown_request_is_a_warning() {
    let dir = assert_fs::TempDir::new().unwrap();
    seed_requests(&dir);

    keyward(&dir)
        .args(["team", "cancel", TEAM_A, "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No request found"));
}

#[test]
fn cancel_rejects_bad_team_uuid() {
    let dir = assert_fs::TempDir::new().unwrap();

    keyward(&dir)
        .args(["team", "cancel", "not-a-uuid", FPR])
        .assert()
        .failure()
        .stderr(predicate::str::contains("is not a team UUID"));
}
