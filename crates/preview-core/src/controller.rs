//! Isolated render host controller
//!
//! Owns the render host and runs one [`RenderSession`] per generation.
//! Every rebuild starts a new generation, which invalidates the previous
//! session and releases its handle before anything new is allocated, so at
//! most one handle is ever outstanding. Host events are applied only when
//! they carry the current generation.

use crate::config::PreviewConfig;
use crate::document::DocumentSynthesizer;
use crate::error::PreviewError;
use crate::flatten::{find_by_name, flatten};
use crate::host::{HostEvent, RenderHost, ResourceHandle};
use crate::normalize::{normalize_source, resolve_entry, EntryBinding};
use crate::state_machine::validate_transition;
use crate::types::{BuildInput, FileNode, Generation, RenderStatus, SessionStatus};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Validate the project and derive the build input
///
/// Fails with the first applicable build error: missing entry, blank
/// entry, then unresolvable entry binding. A missing stylesheet is not an
/// error and yields empty stylesheet text.
pub fn prepare_build(
    files: &[FileNode],
    config: &PreviewConfig,
) -> Result<(BuildInput, EntryBinding), PreviewError> {
    let flat = flatten(files);

    let entry = find_by_name(&flat, &config.entry_file).ok_or_else(|| PreviewError::MissingEntryFile {
        name: config.entry_file.clone(),
    })?;

    if entry.content.trim().is_empty() {
        return Err(PreviewError::EmptyEntryFile {
            name: config.entry_file.clone(),
        });
    }

    let normalized_source = normalize_source(&entry.content, config.strip_imports);
    let binding = resolve_entry(&normalized_source).ok_or(PreviewError::EntryResolutionFailure)?;
    debug!(
        entry = %config.entry_file,
        binding = binding.identifier(),
        bytes = normalized_source.len(),
        "normalized entry source"
    );

    let stylesheet_text = find_by_name(&flat, &config.stylesheet_file)
        .map(|f| f.content.clone())
        .unwrap_or_default();

    Ok((
        BuildInput {
            normalized_source,
            stylesheet_text,
        },
        binding,
    ))
}

/// One generation of the render host
#[derive(Debug)]
struct RenderSession {
    status: SessionStatus,
    handle: Option<ResourceHandle>,
}

impl RenderSession {
    fn idle() -> Self {
        Self {
            status: SessionStatus::initial(),
            handle: None,
        }
    }
}

#[derive(Debug)]
struct ControllerState {
    current: RenderSession,
    torn_down: bool,
}

/// Controller of the single isolated render host
pub struct RenderController {
    host: Arc<dyn RenderHost>,
    config: PreviewConfig,
    synthesizer: DocumentSynthesizer,
    state: Mutex<ControllerState>,
    status_tx: watch::Sender<SessionStatus>,
}

impl RenderController {
    #[must_use]
    pub fn new(host: Arc<dyn RenderHost>, config: PreviewConfig) -> Self {
        let (status_tx, _) = watch::channel(SessionStatus::initial());
        Self {
            host,
            synthesizer: DocumentSynthesizer::new(&config),
            config,
            state: Mutex::new(ControllerState {
                current: RenderSession::idle(),
                torn_down: false,
            }),
            status_tx,
        }
    }

    /// Start a new generation from `files`
    ///
    /// Returns the generation started. After teardown this is a no-op that
    /// returns the last generation.
    pub fn rebuild(&self, files: &[FileNode]) -> Generation {
        let mut state = self.state.lock();
        if state.torn_down {
            warn!("rebuild requested after teardown; ignoring");
            return state.current.status.generation;
        }

        let generation = state.current.status.generation.next();
        if let Some(previous) = state.current.handle.take() {
            debug!(%generation, url = previous.url(), "releasing superseded handle");
            self.host.release(previous);
        }
        state.current = RenderSession {
            status: SessionStatus {
                generation,
                status: RenderStatus::Pending,
                error_message: None,
                content_error: None,
            },
            handle: None,
        };
        self.publish_status(&state);
        info!(%generation, "starting render generation");

        let outcome = prepare_build(files, &self.config).and_then(|(input, _)| {
            let document = self.synthesizer.synthesize(generation, &input);
            self.publish(generation, &document)
        });

        match outcome {
            Ok(handle) => {
                info!(
                    %generation,
                    url = handle.url(),
                    sandbox = self.host.sandbox_policy(),
                    "document published"
                );
                state.current.handle = Some(handle);
            }
            Err(err) => {
                warn!(%generation, kind = err.kind(), "build failed: {err}");
                self.settle(&mut state, RenderStatus::Error, Some(err.to_string()));
            }
        }
        generation
    }

    fn publish(&self, generation: Generation, document: &str) -> Result<ResourceHandle, PreviewError> {
        let handle = self.host.allocate(generation, document)?;
        if let Err(err) = self.host.bind(generation, &handle) {
            self.host.release(handle);
            return Err(err.into());
        }
        Ok(handle)
    }

    /// Apply an asynchronous host signal
    ///
    /// Returns `false` when the event was ignored: it belongs to a superseded
    /// generation, arrived after teardown, or would be an illegal transition.
    pub fn handle_event(&self, event: HostEvent) -> bool {
        let mut state = self.state.lock();
        let current = state.current.status.generation;
        if state.torn_down || event.generation() != current {
            debug!(event = %event.generation(), %current, "ignoring stale host event");
            return false;
        }

        match event {
            HostEvent::Loaded { .. } => {
                let from = state.current.status.status;
                if let Err(err) = validate_transition(from, RenderStatus::Ready) {
                    warn!(%current, "{err}");
                    return false;
                }
                info!(%current, "preview ready");
                self.settle(&mut state, RenderStatus::Ready, None);
                true
            }
            HostEvent::RenderFailed { message, .. } => {
                if state.current.status.status == RenderStatus::Error {
                    return false;
                }
                let failure = PreviewError::RenderFailure(message);
                warn!(%current, "{failure}");
                state.current.status.content_error = Some(failure.to_string());
                self.publish_status(&state);
                true
            }
        }
    }

    fn settle(&self, state: &mut ControllerState, to: RenderStatus, error_message: Option<String>) {
        state.current.status.status = to;
        state.current.status.error_message = error_message;
        self.publish_status(state);
    }

    fn publish_status(&self, state: &ControllerState) {
        self.status_tx.send_replace(state.current.status.clone());
    }

    /// Release the live handle and detach the host; idempotent
    pub fn teardown(&self) {
        let mut state = self.state.lock();
        if state.torn_down {
            return;
        }
        state.torn_down = true;
        if let Some(handle) = state.current.handle.take() {
            debug!(url = handle.url(), "releasing handle on teardown");
            self.host.release(handle);
        }
        self.host.clear();
        info!(generation = %state.current.status.generation, "render host torn down");
    }

    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.state.lock().current.status.clone()
    }

    /// Receiver that observes every status change
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionStatus> {
        self.status_tx.subscribe()
    }

    #[must_use]
    pub fn current_generation(&self) -> Generation {
        self.state.lock().current.status.generation
    }

    /// URL of the handle bound for the current generation
    #[must_use]
    pub fn live_handle_url(&self) -> Option<String> {
        self.state
            .lock()
            .current
            .handle
            .as_ref()
            .map(|h| h.url().to_string())
    }

    #[must_use]
    pub fn is_torn_down(&self) -> bool {
        self.state.lock().torn_down
    }

    #[must_use]
    pub fn config(&self) -> &PreviewConfig {
        &self.config
    }
}

impl Drop for RenderController {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl std::fmt::Debug for RenderController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderController")
            .field("config", &self.config)
            .field("state", &*self.state.lock())
            .finish_non_exhaustive()
    }
}
