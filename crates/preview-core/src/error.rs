//! Error types for the preview core
//!
//! `PreviewError` is the build taxonomy surfaced to the interface layer.
//! Its `Display` output is the user-facing message and must stay stable.

use crate::types::{Generation, NodeId};

/// Build errors surfaced through the status output
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PreviewError {
    /// No file matches the entry naming convention
    #[error("Missing entry file: no file named `{name}` in project")]
    MissingEntryFile { name: String },

    /// Entry file exists but holds only whitespace
    #[error(
        "Entry file `{name}` is empty. Define a component such as \
         `function App() {{ return <div />; }}` to see a preview"
    )]
    EmptyEntryFile { name: String },

    /// Normalized source defines neither `AppComponent` nor `App`
    #[error("No entry component found: define `App` or add an `export default` to the entry file")]
    EntryResolutionFailure,

    /// Failure raised inside the sandboxed document
    #[error("Render failed: {0}")]
    RenderFailure(String),

    /// Allocating or binding the document handle failed
    #[error("Could not publish preview: {0}")]
    ResourceAllocationFailure(String),
}

impl PreviewError {
    /// Stable machine-readable code
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingEntryFile { .. } => "missing_entry_file",
            Self::EmptyEntryFile { .. } => "empty_entry_file",
            Self::EntryResolutionFailure => "entry_resolution_failure",
            Self::RenderFailure(_) => "render_failure",
            Self::ResourceAllocationFailure(_) => "resource_allocation_failure",
        }
    }

    /// Whether an unchanged snapshot could succeed on the next attempt
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ResourceAllocationFailure(_))
    }
}

impl From<HostError> for PreviewError {
    fn from(value: HostError) -> Self {
        PreviewError::ResourceAllocationFailure(value.to_string())
    }
}

/// Failures of the isolated render host
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HostError {
    #[error("allocation failed for generation {generation}: {reason}")]
    AllocationFailed { generation: Generation, reason: String },

    #[error("bind failed for generation {generation}: {reason}")]
    BindFailed { generation: Generation, reason: String },

    #[error("unknown resource handle: {0}")]
    UnknownHandle(String),
}

/// File store mutation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("node {0} is not a folder")]
    NotAFolder(NodeId),

    #[error("node {0} is not a file")]
    NotAFile(NodeId),

    #[error("node name must not be empty")]
    EmptyName,
}

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}
