//! File collection flattener
//!
//! Depth-first, pre-order projection of the project tree into the flat
//! file list the build works on. Folders contribute no entry of their own.

use crate::types::{FileNode, FlatFile};

/// Every file node of `roots`, node before children, children in order
#[must_use]
pub fn flatten(roots: &[FileNode]) -> Vec<FlatFile> {
    let mut out = Vec::new();
    collect(roots, &mut out);
    out
}

fn collect(nodes: &[FileNode], out: &mut Vec<FlatFile>) {
    for node in nodes {
        if node.is_file() {
            out.push(FlatFile {
                name: node.name.clone(),
                content: node.content.clone(),
            });
        }
        collect(&node.children, out);
    }
}

/// First flat file with exactly this name
#[must_use]
pub fn find_by_name<'a>(files: &'a [FlatFile], name: &str) -> Option<&'a FlatFile> {
    files.iter().find(|f| f.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn names(files: &[FlatFile]) -> Vec<&str> {
        files.iter().map(|f| f.name.as_str()).collect()
    }

    #[test]
    fn nested_folders_flatten_depth_first() {
        let tree = vec![
            FileNode::folder(
                "src",
                vec![
                    FileNode::file("a.ts", ""),
                    FileNode::folder("lib", vec![FileNode::file("b.ts", ""), FileNode::file("c.ts", "")]),
                    FileNode::file("d.ts", ""),
                ],
            ),
            FileNode::file("e.ts", ""),
            FileNode::folder("empty", vec![]),
        ];
        assert_eq!(names(&flatten(&tree)), vec!["a.ts", "b.ts", "c.ts", "d.ts", "e.ts"]);
    }

    #[test]
    fn empty_tree_yields_nothing() {
        assert!(flatten(&[]).is_empty());
    }

    #[test]
    fn find_by_name_is_exact_and_first_wins() {
        let tree = vec![
            FileNode::file("app.tsx", "lower"),
            FileNode::folder("x", vec![FileNode::file("App.tsx", "first")]),
            FileNode::file("App.tsx", "second"),
        ];
        let files = flatten(&tree);
        assert_eq!(find_by_name(&files, "App.tsx").unwrap().content, "first");
        assert!(find_by_name(&files, "App.jsx").is_none());
    }

    fn arb_tree() -> impl Strategy<Value = FileNode> {
        let leaf = "[a-z]{1,6}".prop_map(|n| FileNode::file(n, "x"));
        leaf.prop_recursive(4, 48, 6, |inner| {
            ("[a-z]{1,6}", prop::collection::vec(inner, 0..6))
                .prop_map(|(n, children)| FileNode::folder(n, children))
        })
    }

    fn count_files(nodes: &[FileNode]) -> usize {
        nodes
            .iter()
            .map(|n| usize::from(n.is_file()) + count_files(&n.children))
            .sum()
    }

    proptest! {
        #[test]
        fn prop_every_file_appears_exactly_once(roots in prop::collection::vec(arb_tree(), 0..5)) {
            let flat = flatten(&roots);
            prop_assert_eq!(flat.len(), count_files(&roots));
        }
    }
}
