use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::{LazyLock, OnceLock};

use chrono::{DateTime, Utc};
use regex::Regex;
use tracing::{debug, warn};

use super::colons::parse_key_listing;
use crate::core::errors::{KeywardError, Result};
use crate::core::models::fingerprint::Fingerprint;
use crate::core::models::managed_key::ManagedKey;
use crate::core::traits::keyring::Keyring;

/// Where to look for a GnuPG 2.x binary, in order.
const GPG_BINARY_LOCATIONS: &[&str] = &[
    "/usr/bin/gpg2",
    "/usr/bin/gpg",
    "/usr/local/bin/gpg2",
    "/usr/local/bin/gpg",
    "/opt/homebrew/bin/gpg",
    "/usr/local/MacGPG2/bin/gpg2",
    "gpg2",
    "gpg",
];

const PUBLIC_HEADER: &str = "-----BEGIN PGP PUBLIC KEY BLOCK-----";
const PUBLIC_FOOTER: &str = "-----END PGP PUBLIC KEY BLOCK-----";
const NOTHING_EXPORTED: &str = "WARNING: nothing exported";
const NO_SECRET_KEY: &str = "No secret key";
const KEY_CREATED_STATUS: &str = "[GNUPG:] KEY_CREATED";

static VERSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"gpg \(GnuPG[^)]*\) (\d+\.\d+\.\d+)").expect("version regex is valid")
});

/// Keyring backed by the user's GnuPG installation.
///
/// Shells out to the system `gpg` binary in batch mode. The binary is
/// located lazily on first use, so commands that never touch GnuPG work
/// on machines without it.
#[derive(Debug, Clone)]
pub struct GpgKeyring {
    /// Binary given by the user, used as-is.
    explicit_path: Option<PathBuf>,
    /// Binary found by searching `GPG_BINARY_LOCATIONS`.
    located: OnceLock<PathBuf>,
    /// Optional `--homedir` for an alternative keyring.
    home_dir: Option<PathBuf>,
}

impl GpgKeyring {
    /// Create a keyring that searches for gpg on first use.
    pub fn new() -> Self {
        Self {
            explicit_path: None,
            located: OnceLock::new(),
            home_dir: None,
        }
    }

    /// Create a keyring with a custom gpg binary path.
    pub fn with_path(gpg_path: PathBuf) -> Self {
        Self {
            explicit_path: Some(gpg_path),
            ..Self::new()
        }
    }

    /// Use an alternative GnuPG home directory.
    pub fn with_home_dir(mut self, home_dir: PathBuf) -> Self {
        self.home_dir = Some(home_dir);
        self
    }

    /// GnuPG version string, e.g. "2.4.5".
    pub fn version(&self) -> Result<String> {
        let binary = self.binary()?;
        version_of(binary).ok_or_else(|| KeywardError::Keyring {
            reason: format!("could not read version from {}", binary.display()),
        })
    }

    fn binary(&self) -> Result<&Path> {
        if let Some(path) = &self.explicit_path {
            return Ok(path.as_path());
        }
        if let Some(path) = self.located.get() {
            return Ok(path.as_path());
        }

        let found = locate_gpg2().ok_or_else(|| KeywardError::GpgNotFound {
            searched: GPG_BINARY_LOCATIONS.join("\n    "),
        })?;
        Ok(self.located.get_or_init(|| found).as_path())
    }

    /// Arguments passed on every invocation, before the command's own.
    fn global_args(&self) -> Vec<String> {
        let mut args: Vec<String> = ["--keyid-format", "0xlong", "--batch", "--no-tty"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        if let Some(home) = &self.home_dir {
            args.push("--homedir".into());
            args.push(home.display().to_string());
        }
        args
    }

    /// Run a gpg command, optionally feeding `stdin_data`, and return
    /// `(stdout, stderr)` on success.
    fn run_gpg(&self, args: &[&str], stdin_data: Option<&str>) -> Result<(String, String)> {
        let binary = self.binary()?;
        let mut cmd = Command::new(binary);
        cmd.args(self.global_args())
            .args(args)
            .stdin(if stdin_data.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        debug!(gpg = %binary.display(), ?args, "running gpg");

        let mut child = cmd.spawn().map_err(|e| KeywardError::Keyring {
            reason: format!("Failed to run {}: {e}", binary.display()),
        })?;

        if let Some(data) = stdin_data
            && let Some(mut stdin) = child.stdin.take()
        {
            stdin
                .write_all(data.as_bytes())
                .map_err(|e| KeywardError::Keyring {
                    reason: format!("Failed to write to gpg stdin: {e}"),
                })?;
        }

        let output = child.wait_with_output().map_err(|e| KeywardError::Keyring {
            reason: format!("gpg process failed: {e}"),
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            warn!(?args, status = %output.status, "gpg command failed");
            for line in stderr.lines() {
                warn!(target: "keyward::gpg", "{line}");
            }
            return Err(KeywardError::Keyring {
                reason: summarize_failure(&output.status.to_string(), &stderr),
            });
        }

        Ok((stdout, stderr))
    }

    fn list_secret(&self, selector: Option<&str>) -> Result<Vec<ManagedKey>> {
        let mut args = vec![
            "--with-colons",
            "--with-fingerprint",
            "--fixed-list-mode",
            "--list-secret-keys",
        ];
        args.extend(selector);
        let (stdout, _) = self.run_gpg(&args, None)?;
        parse_key_listing(&stdout)
    }
}

impl Default for GpgKeyring {
    fn default() -> Self {
        Self::new()
    }
}

impl Keyring for GpgKeyring {
    fn list_secret_keys(&self) -> Result<Vec<ManagedKey>> {
        self.list_secret(None)
    }

    fn key_metadata(&self, fingerprint: &Fingerprint) -> Result<ManagedKey> {
        let not_found = || KeywardError::KeyNotFound {
            fingerprint: fingerprint.to_string(),
        };

        let keys = self
            .list_secret(Some(fingerprint.hex()))
            .map_err(|e| match e {
                KeywardError::Keyring { reason } if reason.contains(NO_SECRET_KEY) => not_found(),
                other => other,
            })?;

        keys.into_iter()
            .find(|k| &k.fingerprint == fingerprint)
            .ok_or_else(not_found)
    }

    fn export_public_key(&self, fingerprint: &Fingerprint) -> Result<String> {
        let args = [
            "--export-options",
            "export-minimal",
            "--armor",
            "--export",
            fingerprint.hex(),
        ];
        let (stdout, stderr) = self.run_gpg(&args, None)?;
        check_single_public_key(&stdout, &stderr)?;
        Ok(stdout)
    }

    fn import_armored_key(&self, armored: &str) -> Result<()> {
        self.run_gpg(&["--import"], Some(armored))?;
        Ok(())
    }

    fn rotate(&self, fingerprint: &Fingerprint, new_expiry: DateTime<Utc>) -> Result<()> {
        let expiry = format_expiry(new_expiry);

        // Primary key first, then every subkey.
        self.run_gpg(&["--quick-set-expire", fingerprint.hex(), expiry.as_str()], None)?;
        self.run_gpg(
            &["--quick-set-expire", fingerprint.hex(), expiry.as_str(), "*"],
            None,
        )?;
        Ok(())
    }

    fn generate_key(&self, email: &str, expiry: DateTime<Utc>) -> Result<Fingerprint> {
        let expiry = format_expiry(expiry);
        let args = [
            "--status-fd",
            "1",
            "--pinentry-mode",
            "loopback",
            "--passphrase",
            "",
            "--quick-generate-key",
            email,
            "default",
            "default",
            expiry.as_str(),
        ];
        let (stdout, _) = self.run_gpg(&args, None)?;
        parse_key_created(&stdout)
    }

    /// Needs GnuPG 2.1 or later for loopback pinentry. The key must not
    /// have a passphrase yet, so gpg only prompts for the new one.
    fn set_passphrase(&self, fingerprint: &Fingerprint, passphrase: &str) -> Result<()> {
        let args = [
            "--pinentry-mode",
            "loopback",
            "--command-fd",
            "0",
            "--passwd",
            fingerprint.hex(),
        ];
        let answers = passwd_answers(passphrase)?;
        self.run_gpg(&args, Some(&answers))?;
        Ok(())
    }
}

/// Lines answering the `passphrase.enter` prompts gpg reads from
/// `--command-fd` during `--passwd`.
///
/// Older 2.x releases ask for the new passphrase a second time to confirm
/// it; a release that asks once leaves the extra line unread.
fn passwd_answers(passphrase: &str) -> Result<String> {
    if passphrase.contains(['\n', '\r']) {
        return Err(KeywardError::InvalidArgument {
            detail: "A passphrase cannot contain line breaks".into(),
        });
    }
    Ok(format!("{passphrase}\n{passphrase}\n"))
}

/// First GnuPG 2.x binary that answers `--version`.
fn locate_gpg2() -> Option<PathBuf> {
    GPG_BINARY_LOCATIONS.iter().find_map(|candidate| {
        let path = PathBuf::from(candidate);
        match version_of(&path) {
            Some(version) if version.starts_with("2.") => {
                debug!(gpg = %path.display(), %version, "found working gpg2");
                Some(path)
            }
            Some(version) => {
                debug!(gpg = %path.display(), %version, "ignoring gpg, looking for 2.x");
                None
            }
            None => None,
        }
    })
}

fn version_of(binary: &Path) -> Option<String> {
    let output = Command::new(binary).arg("--version").output().ok()?;
    if !output.status.success() {
        return None;
    }
    parse_version(&String::from_utf8_lossy(&output.stdout))
}

fn parse_version(stdout: &str) -> Option<String> {
    VERSION_RE
        .captures(stdout)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// GnuPG accepts ISO 8601 basic format for `--quick-set-expire`.
fn format_expiry(at: DateTime<Utc>) -> String {
    at.format("%Y%m%dT%H%M%S").to_string()
}

/// One-line reason for a failed gpg run: exit status plus first stderr line.
fn summarize_failure(status: &str, stderr: &str) -> String {
    let lines: Vec<&str> = stderr
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    match lines.as_slice() {
        [] => format!("gpg {status}"),
        [only] => format!("gpg {status}, stderr: {only}"),
        [first, ..] => format!("gpg {status}, stderr: {first} [run with --verbose for more]"),
    }
}

/// Ensure an export produced exactly one armored public key.
fn check_single_public_key(stdout: &str, stderr: &str) -> Result<()> {
    if stdout.contains(NOTHING_EXPORTED) || stderr.contains(NOTHING_EXPORTED) {
        return Err(KeywardError::Keyring {
            reason: "GnuPG returned 'nothing exported'".into(),
        });
    }

    let headers = stdout.matches(PUBLIC_HEADER).count();
    let footers = stdout.matches(PUBLIC_FOOTER).count();
    if headers != 1 || footers != 1 {
        return Err(KeywardError::Keyring {
            reason: format!(
                "Expected exactly 1 ascii-armored public key, got {headers} headers and {footers} footers"
            ),
        });
    }
    Ok(())
}

/// Fingerprint from the `KEY_CREATED` status line.
fn parse_key_created(status_output: &str) -> Result<Fingerprint> {
    status_output
        .lines()
        .filter_map(|line| line.strip_prefix(KEY_CREATED_STATUS))
        .find_map(|rest| rest.split_whitespace().nth(1))
        .ok_or_else(|| KeywardError::Keyring {
            reason: "gpg did not report the created key".into(),
        })
        .and_then(Fingerprint::parse)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parses_gpg_version() {
        let out = "gpg (GnuPG) 2.4.5\nlibgcrypt 1.10.3\nHome: /home/jane/.gnupg\n";
        assert_eq!(parse_version(out).as_deref(), Some("2.4.5"));

        let mac = "gpg (GnuPG/MacGPG2) 2.2.41\n";
        assert_eq!(parse_version(mac).as_deref(), Some("2.2.41"));

        assert_eq!(parse_version("something else"), None);
    }

    #[test]
    fn passwd_answers_every_prompt_with_the_new_passphrase() {
        assert_eq!(
            passwd_answers("correct horse").unwrap(),
            "correct horse\ncorrect horse\n"
        );
        assert!(matches!(
            passwd_answers("two\nlines"),
            Err(KeywardError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn formats_expiry_for_gpg() {
        let at = Utc.with_ymd_and_hms(2026, 8, 19, 9, 5, 0).unwrap();
        assert_eq!(format_expiry(at), "20260819T090500");
    }

    #[test]
    fn single_public_key_is_accepted() {
        let armored = format!("{PUBLIC_HEADER}\n\nmQINBF...\n{PUBLIC_FOOTER}\n");
        assert!(check_single_public_key(&armored, "").is_ok());
    }

    #[test]
    fn nothing_exported_is_rejected() {
        assert!(check_single_public_key("", "gpg: WARNING: nothing exported").is_err());
    }

    #[test]
    fn multiple_public_keys_are_rejected() {
        let one = format!("{PUBLIC_HEADER}\nabc\n{PUBLIC_FOOTER}\n");
        assert!(check_single_public_key(&one.repeat(2), "").is_err());
    }

    #[test]
    fn parses_key_created_status() {
        let out = "[GNUPG:] KEY_CONSIDERED ABC 0\n\
                   [GNUPG:] KEY_CREATED P DC7D1C9556D96AA9294910E7F6D53D6649083EA9\n";
        assert_eq!(
            parse_key_created(out).unwrap().hex(),
            "DC7D1C9556D96AA9294910E7F6D53D6649083EA9"
        );
        assert!(parse_key_created("[GNUPG:] KEY_CONSIDERED ABC 0\n").is_err());
    }

    #[test]
    fn failure_summary_uses_first_stderr_line() {
        assert_eq!(summarize_failure("exit status: 2", ""), "gpg exit status: 2");
        assert_eq!(
            summarize_failure("exit status: 2", "gpg: oops\n"),
            "gpg exit status: 2, stderr: gpg: oops"
        );
        assert!(summarize_failure("exit status: 2", "one\ntwo\n").contains("--verbose"));
    }

    #[test]
    fn home_dir_is_passed_globally() {
        let keyring = GpgKeyring::new().with_home_dir(PathBuf::from("/tmp/gnupg-test"));
        let args = keyring.global_args();
        assert!(args.windows(2).any(|w| w == ["--homedir", "/tmp/gnupg-test"]));
        assert!(args.contains(&"--batch".to_string()));
    }

    #[test]
    fn missing_binary_fails_per_call() {
        let keyring = GpgKeyring::with_path(PathBuf::from("/nonexistent/gpg"));
        let fpr = Fingerprint::parse(&"A".repeat(40)).unwrap();
        assert!(matches!(
            keyring.key_metadata(&fpr),
            Err(KeywardError::Keyring { .. })
        ));
        assert!(keyring.export_public_key(&fpr).is_err());
    }
}
