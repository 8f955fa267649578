use std::sync::mpsc::{self, Receiver};
use std::thread::{self, JoinHandle};

use tracing::debug;

use crate::core::errors::{KeywardError, Result};

/// Result of work started in the background and collected exactly once.
///
/// Key generation can take a while, so it runs on its own thread while the
/// foreground asks for (and confirms) the passphrase.
pub struct PendingKey<T> {
    receiver: Receiver<Result<T>>,
    handle: Option<JoinHandle<()>>,
}

impl<T: Send + 'static> PendingKey<T> {
    /// Start `work` on a background thread.
    pub fn spawn<F>(work: F) -> Self
    where
        F: FnOnce() -> Result<T> + Send + 'static,
    {
        let (sender, receiver) = mpsc::sync_channel(1);
        let handle = thread::spawn(move || {
            debug!("background key generation started");
            // The receiver is only gone if the caller gave up on the result.
            let _ = sender.send(work());
        });

        Self {
            receiver,
            handle: Some(handle),
        }
    }

    /// Block until the background work is done and hand over its result.
    pub fn wait(mut self) -> Result<T> {
        match self.receiver.recv() {
            Ok(result) => {
                self.join();
                result
            }
            Err(_) => Err(self.join_failure()),
        }
    }

    fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }

    fn join_failure(&mut self) -> KeywardError {
        self.join();
        KeywardError::Keyring {
            reason: "background key generation stopped without a result".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc::channel;

    #[test]
    fn wait_returns_the_result() {
        let pending = PendingKey::spawn(|| Ok(42));
        assert_eq!(pending.wait().unwrap(), 42);
    }

    #[test]
    fn errors_are_handed_over() {
        let pending: PendingKey<()> = PendingKey::spawn(|| {
            Err(KeywardError::Keyring {
                reason: "no entropy".into(),
            })
        });
        let err = pending.wait().unwrap_err();
        assert!(err.to_string().contains("no entropy"));
    }

    #[test]
    fn foreground_runs_while_work_is_pending() {
        let (release, gate) = channel::<()>();
        let pending = PendingKey::spawn(move || {
            gate.recv().ok();
            Ok("done")
        });

        // The work is blocked until the foreground lets it go.
        release.send(()).unwrap();
        assert_eq!(pending.wait().unwrap(), "done");
    }

    #[test]
    fn panicking_work_is_an_error() {
        let pending: PendingKey<u8> = PendingKey::spawn(|| panic!("boom"));
        assert!(pending.wait().is_err());
    }
}
