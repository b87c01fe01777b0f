//! Isolated render host seam
//!
//! The controller is the only writer of a render host. Document bytes are
//! published through move-only [`ResourceHandle`]s: `release` consumes the
//! handle, so a handle cannot be released twice and a dropped-but-unreleased
//! handle is visible in the host's outstanding count.

use crate::error::HostError;
use crate::types::Generation;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::mpsc;
use uuid::Uuid;

/// Revocable reference to published document bytes
///
/// Deliberately not `Clone`: exactly one owner releases it.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct ResourceHandle {
    url: String,
    generation: Generation,
}

impl ResourceHandle {
    /// New handle with a unique object-URL style address
    #[must_use]
    pub fn allocate(scheme_prefix: &str, generation: Generation) -> Self {
        Self {
            url: format!("{scheme_prefix}{}", Uuid::new_v4()),
            generation,
        }
    }

    #[inline]
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    #[inline]
    #[must_use]
    pub fn generation(&self) -> Generation {
        self.generation
    }
}

/// Asynchronous notifications from the embedded context
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    /// The context finished loading the document of `generation`
    Loaded { generation: Generation },
    /// The document of `generation` caught a render failure in place
    RenderFailed { generation: Generation, message: String },
}

impl HostEvent {
    #[must_use]
    pub fn generation(&self) -> Generation {
        match self {
            HostEvent::Loaded { generation } | HostEvent::RenderFailed { generation, .. } => *generation,
        }
    }
}

/// Sending half handed to hosts that report events
pub type HostEventSender = mpsc::UnboundedSender<HostEvent>;
/// Receiving half consumed by the preview pipeline
pub type HostEventReceiver = mpsc::UnboundedReceiver<HostEvent>;

/// Sandbox capabilities granted to the embedded context: scripts run, but
/// the document gets an opaque origin, no forms, popups or top navigation
pub const SANDBOX_POLICY: &str = "allow-scripts";

/// Sandboxed embedded browsing context owned by the controller
pub trait RenderHost: Send + Sync {
    /// Store `document` and return a handle addressing it
    fn allocate(&self, generation: Generation, document: &str) -> Result<ResourceHandle, HostError>;

    /// Point the isolated context at `handle`, replacing its previous content
    fn bind(&self, generation: Generation, handle: &ResourceHandle) -> Result<(), HostError>;

    /// Revoke `handle` and free its bytes
    fn release(&self, handle: ResourceHandle);

    /// Detach the context from any document
    fn clear(&self) {}

    /// Sandbox attribute the context is created with
    fn sandbox_policy(&self) -> &str {
        SANDBOX_POLICY
    }
}

/// One recorded host operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostOp {
    Allocate { generation: Generation, url: String },
    Bind { generation: Generation, url: String },
    Release { generation: Generation, url: String },
    Clear,
}

/// In-memory render host
///
/// Keeps published documents in a blob table, journals every operation,
/// and can signal `Loaded` straight after a successful bind.
#[derive(Debug)]
pub struct MemoryHost {
    blobs: DashMap<String, String>,
    bound: Mutex<Option<String>>,
    journal: Mutex<Vec<HostOp>>,
    events: Option<HostEventSender>,
    auto_load: bool,
    fail_allocations: AtomicUsize,
    fail_next_bind: AtomicBool,
}

impl MemoryHost {
    /// Blob address prefix, mirroring browser object URLs
    pub const URL_PREFIX: &'static str = "blob:live-preview/";

    /// Host that never emits events
    #[must_use]
    pub fn new() -> Self {
        Self {
            blobs: DashMap::new(),
            bound: Mutex::new(None),
            journal: Mutex::new(Vec::new()),
            events: None,
            auto_load: false,
            fail_allocations: AtomicUsize::new(0),
            fail_next_bind: AtomicBool::new(false),
        }
    }

    /// Host wired to an event channel; `auto_load` signals `Loaded` on bind
    #[must_use]
    pub fn with_events(auto_load: bool) -> (Self, HostEventReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        let host = Self {
            events: Some(tx),
            auto_load,
            ..Self::new()
        };
        (host, rx)
    }

    /// Clone of the event sender, for reporting load or render signals
    #[must_use]
    pub fn event_sender(&self) -> Option<HostEventSender> {
        self.events.clone()
    }

    /// Make the next `count` allocations fail
    pub fn fail_next_allocations(&self, count: usize) {
        self.fail_allocations.store(count, Ordering::SeqCst);
    }

    /// Make the next bind fail
    pub fn fail_next_bind(&self) {
        self.fail_next_bind.store(true, Ordering::SeqCst);
    }

    /// Handles allocated and not yet released
    #[must_use]
    pub fn outstanding(&self) -> usize {
        self.blobs.len()
    }

    /// URL currently shown by the context
    #[must_use]
    pub fn bound_url(&self) -> Option<String> {
        self.bound.lock().clone()
    }

    /// Document currently shown by the context
    #[must_use]
    pub fn bound_document(&self) -> Option<String> {
        let url = self.bound.lock().clone()?;
        self.blobs.get(&url).map(|doc| doc.value().clone())
    }

    /// Every operation so far, in order
    #[must_use]
    pub fn journal(&self) -> Vec<HostOp> {
        self.journal.lock().clone()
    }

    fn record(&self, op: HostOp) {
        self.journal.lock().push(op);
    }

    fn take_failure(&self) -> bool {
        self.fail_allocations
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

impl Default for MemoryHost {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderHost for MemoryHost {
    fn allocate(&self, generation: Generation, document: &str) -> Result<ResourceHandle, HostError> {
        if self.take_failure() {
            return Err(HostError::AllocationFailed {
                generation,
                reason: "blob storage unavailable".to_string(),
            });
        }
        let handle = ResourceHandle::allocate(Self::URL_PREFIX, generation);
        self.blobs.insert(handle.url.clone(), document.to_string());
        self.record(HostOp::Allocate {
            generation,
            url: handle.url.clone(),
        });
        Ok(handle)
    }

    fn bind(&self, generation: Generation, handle: &ResourceHandle) -> Result<(), HostError> {
        if self.fail_next_bind.swap(false, Ordering::SeqCst) {
            return Err(HostError::BindFailed {
                generation,
                reason: "embedded context rejected the document".to_string(),
            });
        }
        if !self.blobs.contains_key(&handle.url) {
            return Err(HostError::UnknownHandle(handle.url.clone()));
        }
        *self.bound.lock() = Some(handle.url.clone());
        self.record(HostOp::Bind {
            generation,
            url: handle.url.clone(),
        });
        if self.auto_load {
            if let Some(events) = &self.events {
                // receiver gone means the pipeline is shutting down
                let _ = events.send(HostEvent::Loaded { generation });
            }
        }
        Ok(())
    }

    fn release(&self, handle: ResourceHandle) {
        self.blobs.remove(&handle.url);
        {
            let mut bound = self.bound.lock();
            if bound.as_deref() == Some(handle.url.as_str()) {
                *bound = None;
            }
        }
        self.record(HostOp::Release {
            generation: handle.generation,
            url: handle.url,
        });
    }

    fn clear(&self) {
        *self.bound.lock() = None;
        self.record(HostOp::Clear);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocate_bind_release_cycle() {
        let host = MemoryHost::new();
        let handle = host.allocate(Generation(1), "<html></html>").unwrap();
        assert!(handle.url().starts_with(MemoryHost::URL_PREFIX));
        assert_eq!(host.outstanding(), 1);

        host.bind(Generation(1), &handle).unwrap();
        assert_eq!(host.bound_document().as_deref(), Some("<html></html>"));

        host.release(handle);
        assert_eq!(host.outstanding(), 0);
        assert!(host.bound_url().is_none());
        assert_eq!(host.journal().len(), 3);
    }

    #[test]
    fn handles_are_unique() {
        let host = MemoryHost::new();
        let a = host.allocate(Generation(1), "a").unwrap();
        let b = host.allocate(Generation(2), "b").unwrap();
        assert_ne!(a.url(), b.url());
        host.release(a);
        host.release(b);
    }

    #[test]
    fn injected_allocation_failures_are_consumed() {
        let host = MemoryHost::new();
        host.fail_next_allocations(1);
        assert!(matches!(
            host.allocate(Generation(1), "x"),
            Err(HostError::AllocationFailed { .. })
        ));
        let handle = host.allocate(Generation(2), "x").unwrap();
        host.release(handle);
        assert_eq!(host.outstanding(), 0);
    }

    #[test]
    fn bind_of_released_handle_is_rejected() {
        let host = MemoryHost::new();
        let handle = host.allocate(Generation(1), "x").unwrap();
        let ghost = ResourceHandle {
            url: handle.url().to_string(),
            generation: Generation(1),
        };
        host.release(handle);
        assert!(matches!(host.bind(Generation(1), &ghost), Err(HostError::UnknownHandle(_))));
    }

    #[tokio::test]
    async fn auto_load_emits_after_bind() {
        let (host, mut events) = MemoryHost::with_events(true);
        let handle = host.allocate(Generation(5), "x").unwrap();
        host.bind(Generation(5), &handle).unwrap();
        assert_eq!(events.recv().await, Some(HostEvent::Loaded { generation: Generation(5) }));
        host.release(handle);
    }

    #[test]
    fn context_only_grants_script_execution() {
        let host = MemoryHost::new();
        assert_eq!(host.sandbox_policy(), "allow-scripts");
        assert!(!host.sandbox_policy().contains("allow-same-origin"));
    }
}
