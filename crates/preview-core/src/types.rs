//! Core data model for the preview pipeline
//!
//! The file tree is owned by the file store and only read here. Everything
//! derived from it (flat files, build inputs, statuses) is recomputed per
//! build and carries no identity beyond its contents.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Stable identifier of a node in the project tree
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
    /// Fresh random identifier
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Borrow the raw identifier
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for NodeId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Kind of a tree node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// Leaf carrying text content
    File,
    /// Container carrying ordered children
    Folder,
}

/// One node of the project tree
///
/// Serialised in the same JSON shape the editor persists:
/// `{ "id", "name", "type", "content"?, "children"?, "isOpen"? }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileNode {
    /// Unique across the whole tree
    pub id: NodeId,
    /// Display name, also used for entry discovery
    pub name: String,
    /// File or folder
    #[serde(rename = "type")]
    pub kind: NodeKind,
    /// File text (always empty for folders)
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub content: String,
    /// Ordered children (always empty for files)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<FileNode>,
    /// Folder expansion state in the explorer
    #[serde(default)]
    pub is_open: bool,
}

impl FileNode {
    /// New file node with a fresh id
    pub fn file(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: NodeId::new(),
            name: name.into(),
            kind: NodeKind::File,
            content: content.into(),
            children: Vec::new(),
            is_open: false,
        }
    }

    /// New folder node with a fresh id
    pub fn folder(name: impl Into<String>, children: Vec<FileNode>) -> Self {
        Self {
            id: NodeId::new(),
            name: name.into(),
            kind: NodeKind::Folder,
            content: String::new(),
            children,
            is_open: false,
        }
    }

    /// Replace the generated id
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = NodeId(id.into());
        self
    }

    /// Mark a folder as expanded
    #[must_use]
    pub fn opened(mut self) -> Self {
        self.is_open = true;
        self
    }

    #[inline]
    #[must_use]
    pub fn is_file(&self) -> bool {
        self.kind == NodeKind::File
    }

    #[inline]
    #[must_use]
    pub fn is_folder(&self) -> bool {
        self.kind == NodeKind::Folder
    }
}

/// Projection of a file node used by the build
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatFile {
    pub name: String,
    pub content: String,
}

/// Normalized entry source plus raw stylesheet text for one build
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildInput {
    pub normalized_source: String,
    /// Empty when the project has no stylesheet
    pub stylesheet_text: String,
}

/// Monotonic render generation counter
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Generation(pub u64);

impl Generation {
    /// The generation that follows this one
    #[inline]
    #[must_use]
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle status of one render session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderStatus {
    Pending,
    Ready,
    Error,
}

impl fmt::Display for RenderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RenderStatus::Pending => "pending",
            RenderStatus::Ready => "ready",
            RenderStatus::Error => "error",
        };
        f.write_str(label)
    }
}

/// Observable state of the current render session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    pub generation: Generation,
    pub status: RenderStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Failure reported from inside the sandboxed document; never flips `status`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_error: Option<String>,
}

impl SessionStatus {
    /// Status before any build has started
    #[must_use]
    pub fn initial() -> Self {
        Self {
            generation: Generation::default(),
            status: RenderStatus::Pending,
            error_message: None,
            content_error: None,
        }
    }
}

/// Build status exposed to the interface layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildStatus {
    /// A debounce timer is running
    pub pending: bool,
    pub status: RenderStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub generation: Generation,
}

impl BuildStatus {
    /// Combine the session status with the scheduler's pending flag
    #[must_use]
    pub fn from_session(session: &SessionStatus, pending: bool) -> Self {
        Self {
            pending,
            status: session.status,
            error_message: session.error_message.clone(),
            generation: session.generation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_node_json_shape_matches_editor_format() {
        let json = r#"[{
            "id": "1", "name": "src", "type": "folder", "isOpen": true,
            "children": [{ "id": "2", "name": "App.tsx", "type": "file", "content": "x" }]
        }]"#;
        let tree: Vec<FileNode> = serde_json::from_str(json).unwrap();
        assert_eq!(tree[0].kind, NodeKind::Folder);
        assert!(tree[0].is_open);
        assert_eq!(tree[0].children[0].id, NodeId::from("2"));
        assert_eq!(tree[0].children[0].content, "x");
    }

    #[test]
    fn build_status_serialises_camel_case() {
        let session = SessionStatus {
            generation: Generation(3),
            status: RenderStatus::Error,
            error_message: Some("boom".into()),
            content_error: None,
        };
        let value = serde_json::to_value(BuildStatus::from_session(&session, true)).unwrap();
        assert_eq!(value["pending"], true);
        assert_eq!(value["status"], "error");
        assert_eq!(value["errorMessage"], "boom");
        assert_eq!(value["generation"], 3);
    }

    #[test]
    fn generation_advances_by_one() {
        assert_eq!(Generation(7).next(), Generation(8));
    }
}
