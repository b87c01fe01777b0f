//! Debounce scheduler
//!
//! Coalesces a burst of "files changed" notifications into one rebuild
//! trigger once the stream has been quiet for the configured period.
//! A manual refresh bypasses the timer: it cancels whatever is pending and
//! fires at once with the snapshot it carries (or the latest one seen).
//! Snapshots are compared by identity, so a change notification for a
//! snapshot that was already flushed is dropped.

use crate::types::FileNode;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::debug;

/// Immutable view of the project tree
pub type Snapshot = Arc<Vec<FileNode>>;

/// Why a trigger fired
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerReason {
    /// Quiet period elapsed after the last change
    Debounced,
    /// `refresh()` was called
    Manual,
}

/// Request to rebuild from `snapshot`
#[derive(Debug, Clone)]
pub struct RebuildTrigger {
    /// Emission order, starting at 1
    pub sequence: u64,
    pub reason: TriggerReason,
    pub snapshot: Snapshot,
}

enum Command {
    Changed(Snapshot),
    Flush(Option<Snapshot>),
}

/// Handle to the running scheduler task
///
/// Dropping the handle stops the task.
#[derive(Debug)]
pub struct Debouncer {
    commands: mpsc::UnboundedSender<Command>,
    pending: watch::Receiver<bool>,
    task: JoinHandle<()>,
}

impl Debouncer {
    /// Spawn the scheduler; triggers are delivered on the returned receiver
    #[must_use]
    pub fn spawn(quiet_period: Duration, initial: Snapshot) -> (Self, mpsc::UnboundedReceiver<RebuildTrigger>) {
        let (commands, command_rx) = mpsc::unbounded_channel();
        let (trigger_tx, trigger_rx) = mpsc::unbounded_channel();
        let (pending_tx, pending) = watch::channel(false);

        let task = tokio::spawn(run(quiet_period, initial, command_rx, trigger_tx, pending_tx));
        (
            Self {
                commands,
                pending,
                task,
            },
            trigger_rx,
        )
    }

    /// Record a change and restart the quiet period
    pub fn notify(&self, snapshot: Snapshot) {
        // send only fails once the task is gone, which means we are shutting down
        let _ = self.commands.send(Command::Changed(snapshot));
    }

    /// Cancel any pending timer and fire immediately with the latest snapshot
    pub fn flush(&self) {
        let _ = self.commands.send(Command::Flush(None));
    }

    /// Cancel any pending timer and fire immediately with `snapshot`
    ///
    /// A later `notify` carrying the same snapshot is ignored.
    pub fn flush_with(&self, snapshot: Snapshot) {
        let _ = self.commands.send(Command::Flush(Some(snapshot)));
    }

    /// Whether a quiet-period timer is running
    #[must_use]
    pub fn is_pending(&self) -> bool {
        *self.pending.borrow()
    }

    /// Observe the pending flag
    #[must_use]
    pub fn pending_watch(&self) -> watch::Receiver<bool> {
        self.pending.clone()
    }

    /// Stop the task, dropping any pending trigger
    pub fn stop(&self) {
        self.task.abort();
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run(
    quiet_period: Duration,
    initial: Snapshot,
    mut commands: mpsc::UnboundedReceiver<Command>,
    triggers: mpsc::UnboundedSender<RebuildTrigger>,
    pending: watch::Sender<bool>,
) {
    let mut latest = initial;
    let mut deadline: Option<Instant> = None;
    let mut sequence = 0u64;

    let mut emit = |reason: TriggerReason, snapshot: &Snapshot| {
        sequence += 1;
        debug!(sequence, ?reason, "rebuild trigger");
        triggers
            .send(RebuildTrigger {
                sequence,
                reason,
                snapshot: Arc::clone(snapshot),
            })
            .is_ok()
    };

    loop {
        let timer = async move {
            match deadline {
                Some(at) => sleep_until(at).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            command = commands.recv() => match command {
                Some(Command::Changed(snapshot)) => {
                    if Arc::ptr_eq(&snapshot, &latest) {
                        debug!("snapshot already seen; ignoring change");
                        continue;
                    }
                    latest = snapshot;
                    if deadline.is_some() {
                        debug!("change during quiet period; restarting timer");
                    }
                    deadline = Some(Instant::now() + quiet_period);
                    pending.send_replace(true);
                }
                Some(Command::Flush(snapshot)) => {
                    if let Some(snapshot) = snapshot {
                        latest = snapshot;
                    }
                    deadline = None;
                    pending.send_replace(false);
                    if !emit(TriggerReason::Manual, &latest) {
                        break;
                    }
                }
                None => break,
            },
            () = timer => {
                deadline = None;
                pending.send_replace(false);
                if !emit(TriggerReason::Debounced, &latest) {
                    break;
                }
            }
        }
    }
    pending.send_replace(false);
}
