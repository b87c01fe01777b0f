//! Live preview pipeline
//!
//! Wires a [`FileSource`] to the render controller:
//! store change → debouncer → controller rebuild, with host events
//! (load and in-document render failures) fed to the same driver task so
//! triggers and signals are applied one at a time, in arrival order.

use crate::config::PreviewConfig;
use crate::controller::RenderController;
use crate::debounce::{Debouncer, RebuildTrigger, Snapshot};
use crate::host::{HostEvent, HostEventReceiver, RenderHost};
use crate::store::FileSource;
use crate::types::{BuildStatus, SessionStatus};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Running preview pipeline
///
/// Dropping it stops the background tasks and tears down the render host.
pub struct LivePreview {
    controller: Arc<RenderController>,
    debouncer: Arc<Debouncer>,
    snapshots: watch::Receiver<Snapshot>,
    tasks: Vec<JoinHandle<()>>,
}

impl LivePreview {
    /// Start the pipeline and schedule the initial build right away
    ///
    /// `events` is the host's signal stream; `None` for hosts that never
    /// report back, in which case sessions stay `pending` until rebuilt.
    #[must_use]
    pub fn spawn(
        source: &dyn FileSource,
        host: Arc<dyn RenderHost>,
        events: Option<HostEventReceiver>,
        config: PreviewConfig,
    ) -> Self {
        let quiet_period = config.quiet_period();
        let controller = Arc::new(RenderController::new(host, config));

        let snapshots = source.subscribe();
        let mut changes = snapshots.clone();
        let initial = changes.borrow_and_update().clone();
        let (debouncer, triggers) = Debouncer::spawn(quiet_period, initial);
        let debouncer = Arc::new(debouncer);

        let forwarder = {
            let debouncer = Arc::clone(&debouncer);
            tokio::spawn(async move {
                while changes.changed().await.is_ok() {
                    let snapshot = changes.borrow_and_update().clone();
                    debouncer.notify(snapshot);
                }
                debug!("file source closed");
            })
        };

        let driver = tokio::spawn(drive(Arc::clone(&controller), triggers, events));

        debouncer.flush();
        info!(quiet_period_ms = quiet_period.as_millis(), "live preview started");

        Self {
            controller,
            debouncer,
            snapshots,
            tasks: vec![forwarder, driver],
        }
    }

    /// Rebuild now from the source's current snapshot, cancelling any
    /// pending quiet period
    ///
    /// The snapshot is read here rather than taken from the debouncer, since
    /// the forwarder may not have delivered the latest change yet.
    pub fn refresh(&self) {
        let current = self.snapshots.borrow().clone();
        self.debouncer.flush_with(current);
    }

    /// Status for the interface layer
    #[must_use]
    pub fn status(&self) -> BuildStatus {
        BuildStatus::from_session(&self.controller.status(), self.debouncer.is_pending())
    }

    /// Observe session status changes
    #[must_use]
    pub fn subscribe_status(&self) -> watch::Receiver<SessionStatus> {
        self.controller.subscribe()
    }

    /// Observe the debounce pending flag
    #[must_use]
    pub fn subscribe_pending(&self) -> watch::Receiver<bool> {
        self.debouncer.pending_watch()
    }

    #[must_use]
    pub fn controller(&self) -> &Arc<RenderController> {
        &self.controller
    }

    /// Stop all tasks and release the live handle
    pub async fn shutdown(mut self) {
        self.debouncer.stop();
        for task in self.tasks.drain(..) {
            task.abort();
            // cancellation is the expected outcome here
            let _ = task.await;
        }
        self.controller.teardown();
        info!("live preview stopped");
    }
}

impl Drop for LivePreview {
    fn drop(&mut self) {
        self.debouncer.stop();
        for task in &self.tasks {
            task.abort();
        }
        self.controller.teardown();
    }
}

impl std::fmt::Debug for LivePreview {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LivePreview")
            .field("controller", &self.controller)
            .field("tasks", &self.tasks.len())
            .finish_non_exhaustive()
    }
}

async fn drive(
    controller: Arc<RenderController>,
    mut triggers: mpsc::UnboundedReceiver<RebuildTrigger>,
    mut events: Option<HostEventReceiver>,
) {
    loop {
        tokio::select! {
            trigger = triggers.recv() => {
                let Some(trigger) = trigger else { break };
                debug!(sequence = trigger.sequence, reason = ?trigger.reason, "applying trigger");
                controller.rebuild(&trigger.snapshot);
            }
            event = next_event(&mut events) => match event {
                Some(event) => {
                    controller.handle_event(event);
                }
                None => events = None,
            },
        }
    }
    debug!("trigger stream closed");
}

async fn next_event(events: &mut Option<HostEventReceiver>) -> Option<HostEvent> {
    match events {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}
