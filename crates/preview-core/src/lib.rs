//! Live Preview Core
//!
//! Turns an editable project tree into a sandboxed, always-current preview:
//!
//! 1. **Flatten** the tree and pick the entry file and stylesheet by name
//! 2. **Normalize** the entry's export syntax into bare declarations
//! 3. **Synthesize** one self-contained document around it
//! 4. **Publish** it into the isolated render host as a new generation,
//!    releasing the previous generation's handle
//!
//! Rebuilds are debounced: a burst of edits yields one build once the
//! project has been quiet for the configured period.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use preview_core::prelude::*;
//!
//! let store = ProjectStore::with_default_project();
//! let (host, events) = MemoryHost::with_events(true);
//! let preview = LivePreview::spawn(&store, Arc::new(host), Some(events), PreviewConfig::default());
//!
//! preview.refresh();
//! println!("{:?}", preview.status());
//! preview.shutdown().await;
//! ```

pub mod config;
pub mod controller;
pub mod debounce;
pub mod document;
pub mod error;
pub mod flatten;
pub mod host;
pub mod logging;
pub mod normalize;
pub mod preview;
pub mod state_machine;
pub mod store;
pub mod types;

pub use config::PreviewConfig;
pub use controller::{prepare_build, RenderController};
pub use debounce::{Debouncer, RebuildTrigger, Snapshot, TriggerReason};
pub use document::DocumentSynthesizer;
pub use error::*;
pub use host::{HostEvent, MemoryHost, RenderHost, ResourceHandle, SANDBOX_POLICY};
pub use preview::LivePreview;
pub use store::{default_project, FileSource, ProjectStore};
pub use types::*;

/// Common imports for embedding the pipeline
pub mod prelude {
    pub use crate::config::PreviewConfig;
    pub use crate::host::{HostEvent, MemoryHost, RenderHost};
    pub use crate::preview::LivePreview;
    pub use crate::store::{FileSource, ProjectStore};
    pub use crate::types::{BuildStatus, FileNode, Generation, RenderStatus};
    pub use std::sync::Arc;
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
