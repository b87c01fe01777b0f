//! Project file store
//!
//! The tree is never mutated in place: every operation rebuilds the root
//! sequence and publishes the new snapshot to subscribers. Consumers get
//! the store injected as a [`FileSource`], never through a global.

use crate::debounce::Snapshot;
use crate::error::StoreError;
use crate::types::{FileNode, NodeId, NodeKind};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

const DEFAULT_APP: &str = r#"function App() {
  return (
    <div className="min-h-screen flex items-center justify-center bg-black">
      <div className="text-center text-white">
        <h1 className="text-5xl font-bold mb-4">Welcome to the live preview</h1>
        <p className="text-xl mb-4">Start coding your React app here!</p>
        <p className="text-sm opacity-80">Edit this code in the editor to see changes live!</p>
      </div>
    </div>
  );
}

export default App;"#;

const DEFAULT_INDEX: &str = r"import React from 'react';
import ReactDOM from 'react-dom/client';
import App from './App';
import './index.css';

ReactDOM.createRoot(document.getElementById('root')!).render(
  <React.StrictMode>
    <App />
  </React.StrictMode>
);";

const DEFAULT_CSS: &str = r"* {
  margin: 0;
  padding: 0;
  box-sizing: border-box;
}

body {
  font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', 'Roboto', sans-serif;
}";

/// Starter project: `src/` with `App.tsx`, `index.tsx` and `index.css`
#[must_use]
pub fn default_project() -> Vec<FileNode> {
    vec![FileNode::folder(
        "src",
        vec![
            FileNode::file("App.tsx", DEFAULT_APP),
            FileNode::file("index.tsx", DEFAULT_INDEX),
            FileNode::file("index.css", DEFAULT_CSS),
        ],
    )
    .opened()]
}

/// Read side of a file store, as consumed by the preview pipeline
pub trait FileSource: Send + Sync {
    /// Current tree
    fn snapshot(&self) -> Snapshot;

    /// Receiver notified on every published change
    fn subscribe(&self) -> watch::Receiver<Snapshot>;
}

/// In-memory project store with functional updates
#[derive(Debug)]
pub struct ProjectStore {
    tx: watch::Sender<Snapshot>,
    // serialises read-modify-publish so concurrent edits cannot lose updates
    write: Mutex<()>,
}

impl ProjectStore {
    #[must_use]
    pub fn new(root: Vec<FileNode>) -> Self {
        let (tx, _) = watch::channel(Arc::new(root));
        Self {
            tx,
            write: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn with_default_project() -> Self {
        Self::new(default_project())
    }

    /// Node with `id`, cloned out of the current snapshot
    #[must_use]
    pub fn find(&self, id: &NodeId) -> Option<FileNode> {
        find_in(&self.snapshot(), id).cloned()
    }

    /// Add an empty file under `parent` (or at the root)
    pub fn create_file(&self, parent: Option<&NodeId>, name: &str) -> Result<NodeId, StoreError> {
        self.insert(parent, FileNode::file(non_empty(name)?, ""))
    }

    /// Add a collapsed, empty folder under `parent` (or at the root)
    pub fn create_folder(&self, parent: Option<&NodeId>, name: &str) -> Result<NodeId, StoreError> {
        self.insert(parent, FileNode::folder(non_empty(name)?, Vec::new()))
    }

    /// Remove a node and its whole subtree
    pub fn delete_node(&self, id: &NodeId) -> Result<(), StoreError> {
        self.update(|root| {
            let mut removed = false;
            let next = remove_from(root, id, &mut removed);
            if removed {
                Ok(next)
            } else {
                Err(StoreError::NodeNotFound(id.clone()))
            }
        })
    }

    pub fn rename_node(&self, id: &NodeId, name: &str) -> Result<(), StoreError> {
        let name = non_empty(name)?;
        self.update(|root| {
            map_node(root, id, &mut |node| {
                node.name = name.to_string();
                Ok(())
            })
        })
    }

    pub fn update_file_content(&self, id: &NodeId, content: &str) -> Result<(), StoreError> {
        self.update(|root| {
            map_node(root, id, &mut |node| {
                if node.kind != NodeKind::File {
                    return Err(StoreError::NotAFile(node.id.clone()));
                }
                node.content = content.to_string();
                Ok(())
            })
        })
    }

    pub fn toggle_folder(&self, id: &NodeId) -> Result<(), StoreError> {
        self.update(|root| {
            map_node(root, id, &mut |node| {
                if node.kind != NodeKind::Folder {
                    return Err(StoreError::NotAFolder(node.id.clone()));
                }
                node.is_open = !node.is_open;
                Ok(())
            })
        })
    }

    /// Swap in a whole new tree (project import)
    pub fn replace_all(&self, root: Vec<FileNode>) {
        let _guard = self.write.lock();
        self.tx.send_replace(Arc::new(root));
        debug!("project replaced");
    }

    fn insert(&self, parent: Option<&NodeId>, node: FileNode) -> Result<NodeId, StoreError> {
        let id = node.id.clone();
        self.update(|root| match parent {
            None => {
                let mut next = root.to_vec();
                next.push(node.clone());
                Ok(next)
            }
            Some(parent_id) => map_node(root, parent_id, &mut |folder| {
                if folder.kind != NodeKind::Folder {
                    return Err(StoreError::NotAFolder(folder.id.clone()));
                }
                folder.children.push(node.clone());
                folder.is_open = true;
                Ok(())
            }),
        })?;
        Ok(id)
    }

    fn update(
        &self,
        f: impl FnOnce(&[FileNode]) -> Result<Vec<FileNode>, StoreError>,
    ) -> Result<(), StoreError> {
        let _guard = self.write.lock();
        let current = self.tx.borrow().clone();
        let next = f(&current)?;
        self.tx.send_replace(Arc::new(next));
        debug!("project updated");
        Ok(())
    }
}

impl FileSource for ProjectStore {
    fn snapshot(&self) -> Snapshot {
        self.tx.borrow().clone()
    }

    fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.tx.subscribe()
    }
}

fn non_empty(name: &str) -> Result<&str, StoreError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        Err(StoreError::EmptyName)
    } else {
        Ok(trimmed)
    }
}

fn find_in<'a>(nodes: &'a [FileNode], id: &NodeId) -> Option<&'a FileNode> {
    nodes.iter().find_map(|node| {
        if &node.id == id {
            Some(node)
        } else {
            find_in(&node.children, id)
        }
    })
}

/// Copy of `nodes` with `f` applied to the node matching `id`
fn map_node(
    nodes: &[FileNode],
    id: &NodeId,
    f: &mut dyn FnMut(&mut FileNode) -> Result<(), StoreError>,
) -> Result<Vec<FileNode>, StoreError> {
    let mut found = false;
    let next = map_rec(nodes, id, f, &mut found)?;
    if found {
        Ok(next)
    } else {
        Err(StoreError::NodeNotFound(id.clone()))
    }
}

fn map_rec(
    nodes: &[FileNode],
    id: &NodeId,
    f: &mut dyn FnMut(&mut FileNode) -> Result<(), StoreError>,
    found: &mut bool,
) -> Result<Vec<FileNode>, StoreError> {
    let mut out = Vec::with_capacity(nodes.len());
    for node in nodes {
        let mut copy = node.clone();
        if !*found && &node.id == id {
            *found = true;
            f(&mut copy)?;
        } else if !*found && !node.children.is_empty() {
            copy.children = map_rec(&node.children, id, &mut *f, found)?;
        }
        out.push(copy);
    }
    Ok(out)
}

fn remove_from(nodes: &[FileNode], id: &NodeId, removed: &mut bool) -> Vec<FileNode> {
    let mut out = Vec::with_capacity(nodes.len());
    for node in nodes {
        if &node.id == id {
            *removed = true;
            continue;
        }
        let mut copy = node.clone();
        copy.children = remove_from(&node.children, id, removed);
        out.push(copy);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> ProjectStore {
        ProjectStore::new(vec![FileNode::folder(
            "src",
            vec![FileNode::file("App.tsx", "a").with_id("app")],
        )
        .with_id("src")])
    }

    #[test]
    fn default_project_has_entry_and_stylesheet() {
        let store = ProjectStore::with_default_project();
        let names: Vec<String> = crate::flatten::flatten(&store.snapshot())
            .into_iter()
            .map(|f| f.name)
            .collect();
        assert_eq!(names, vec!["App.tsx", "index.tsx", "index.css"]);
    }

    #[test]
    fn updates_never_touch_previous_snapshots() {
        let store = store();
        let before = store.snapshot();
        store.update_file_content(&NodeId::from("app"), "b").unwrap();

        assert_eq!(before[0].children[0].content, "a");
        assert_eq!(store.snapshot()[0].children[0].content, "b");
    }

    #[test]
    fn create_in_folder_opens_it() {
        let store = store();
        let id = store.create_file(Some(&NodeId::from("src")), "index.css").unwrap();
        let src = store.find(&NodeId::from("src")).unwrap();
        assert!(src.is_open);
        assert_eq!(src.children.last().unwrap().id, id);
    }

    #[test]
    fn create_at_root_and_under_file() {
        let store = store();
        let folder = store.create_folder(None, "assets").unwrap();
        assert_eq!(store.snapshot().len(), 2);
        assert!(!store.find(&folder).unwrap().is_open);

        let err = store.create_file(Some(&NodeId::from("app")), "x.ts").unwrap_err();
        assert_eq!(err, StoreError::NotAFolder(NodeId::from("app")));
    }

    #[test]
    fn delete_removes_subtree() {
        let store = store();
        store.delete_node(&NodeId::from("src")).unwrap();
        assert!(store.snapshot().is_empty());
        assert!(store.find(&NodeId::from("app")).is_none());
        assert_eq!(
            store.delete_node(&NodeId::from("src")),
            Err(StoreError::NodeNotFound(NodeId::from("src")))
        );
    }

    #[test]
    fn rename_and_toggle() {
        let store = store();
        store.rename_node(&NodeId::from("app"), " Main.tsx ").unwrap();
        assert_eq!(store.find(&NodeId::from("app")).unwrap().name, "Main.tsx");

        store.toggle_folder(&NodeId::from("src")).unwrap();
        assert!(store.find(&NodeId::from("src")).unwrap().is_open);
        assert!(store.toggle_folder(&NodeId::from("app")).is_err());
        assert_eq!(store.rename_node(&NodeId::from("app"), "  "), Err(StoreError::EmptyName));
    }

    #[test]
    fn content_updates_reject_folders() {
        let store = store();
        assert_eq!(
            store.update_file_content(&NodeId::from("src"), "x"),
            Err(StoreError::NotAFile(NodeId::from("src")))
        );
    }

    #[tokio::test]
    async fn subscribers_see_changes() {
        let store = store();
        let mut rx = store.subscribe();
        store.update_file_content(&NodeId::from("app"), "next").unwrap();
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow()[0].children[0].content, "next");
    }

    #[test]
    fn failed_update_publishes_nothing() {
        let store = store();
        let rx = store.subscribe();
        let _ = store.delete_node(&NodeId::from("missing"));
        assert!(!rx.has_changed().unwrap());
    }
}
