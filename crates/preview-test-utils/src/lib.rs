//! Testing utilities for the live preview workspace
//!
//! Shared project fixtures and small async helpers.

#![allow(missing_docs)]

use preview_core::{FileNode, FileSource, NodeId, ProjectStore, SessionStatus};
use std::sync::Arc;
use tokio::sync::watch;

pub const APP_SOURCE: &str = "function App() {\n  return <h1>Hello</h1>;\n}\n\nexport default App;";

pub const ARROW_APP_SOURCE: &str = "export default () => <div>arrow</div>;";

pub const NO_ENTRY_SOURCE: &str = "const helper = 1;\nfunction Widget() { return null; }";

pub const STYLESHEET: &str = "body { color: rebeccapurple; }";

/// `src/App.tsx` + `src/index.css`, with stable ids `src`, `app` and `css`
pub fn sample_project() -> Vec<FileNode> {
    project_with_entry(APP_SOURCE)
}

pub fn project_with_entry(source: &str) -> Vec<FileNode> {
    vec![FileNode::folder(
        "src",
        vec![
            FileNode::file("App.tsx", source).with_id("app"),
            FileNode::file("index.css", STYLESHEET).with_id("css"),
        ],
    )
    .with_id("src")
    .opened()]
}

pub fn project_without_entry() -> Vec<FileNode> {
    vec![FileNode::folder(
        "src",
        vec![
            FileNode::file("Main.tsx", APP_SOURCE).with_id("main"),
            FileNode::file("index.css", STYLESHEET).with_id("css"),
        ],
    )
    .with_id("src")]
}

pub fn app_id() -> NodeId {
    NodeId::from("app")
}

pub fn sample_store() -> Arc<ProjectStore> {
    Arc::new(ProjectStore::new(sample_project()))
}

/// Numbered variant of [`APP_SOURCE`] so edits can be told apart
pub fn app_source_version(version: usize) -> String {
    format!("function App() {{\n  return <h1>v{version}</h1>;\n}}\n\nexport default App;")
}

/// Content of `App.tsx` in the store's current snapshot
pub fn entry_content(source: &dyn FileSource) -> Option<String> {
    preview_core::flatten::find_by_name(&preview_core::flatten::flatten(&source.snapshot()), "App.tsx")
        .map(|f| f.content.clone())
}

/// Every status published on `rx` from now on, until the sender closes
pub fn record_statuses(mut rx: watch::Receiver<SessionStatus>) -> tokio::task::JoinHandle<Vec<SessionStatus>> {
    tokio::spawn(async move {
        let mut seen = vec![rx.borrow_and_update().clone()];
        while rx.changed().await.is_ok() {
            seen.push(rx.borrow_and_update().clone());
        }
        seen
    })
}
