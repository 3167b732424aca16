//! Media library listing for the browsing UI.
//!
//! The tree is built in an arena of directory nodes addressed by index and
//! only turned into nested [`Directory`] values at the end.

use std::path::{Component, Path};

use brakewatch_common::paths::ExtensionMatcher;
use serde::Serialize;
use walkdir::WalkDir;

/// A media file, with its path relative to the library root (leading `/`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SourceFile {
    pub name: String,
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Directory {
    pub name: String,
    pub files: Vec<SourceFile>,
    pub children: Vec<Directory>,
}

#[derive(Debug)]
struct Node {
    name: String,
    files: Vec<SourceFile>,
    children: Vec<usize>,
}

/// Arena-backed builder for a [`Directory`] tree.
#[derive(Debug)]
pub struct TreeBuilder {
    nodes: Vec<Node>,
}

const ROOT: usize = 0;

impl Default for TreeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                name: "/".to_string(),
                files: Vec::new(),
                children: Vec::new(),
            }],
        }
    }

    /// Add a file given by its path relative to the root, creating parent
    /// directories on demand.
    pub fn insert(&mut self, relative: &Path) {
        let Some(name) = relative.file_name() else {
            return;
        };

        let mut current = ROOT;
        if let Some(parent) = relative.parent() {
            for component in parent.components() {
                if let Component::Normal(part) = component {
                    current = self.child(current, &part.to_string_lossy());
                }
            }
        }

        let path = relative
            .components()
            .filter_map(|c| match c {
                Component::Normal(part) => Some(part.to_string_lossy()),
                _ => None,
            })
            .fold(String::new(), |mut acc, part| {
                acc.push('/');
                acc.push_str(&part);
                acc
            });

        self.nodes[current].files.push(SourceFile {
            name: name.to_string_lossy().to_string(),
            path,
        });
    }

    fn child(&mut self, parent: usize, name: &str) -> usize {
        if let Some(&idx) = self.nodes[parent]
            .children
            .iter()
            .find(|&&idx| self.nodes[idx].name == name)
        {
            return idx;
        }

        let idx = self.nodes.len();
        self.nodes.push(Node {
            name: name.to_string(),
            files: Vec::new(),
            children: Vec::new(),
        });
        self.nodes[parent].children.push(idx);
        idx
    }

    pub fn build(self) -> Directory {
        let mut slots: Vec<Option<Node>> = self.nodes.into_iter().map(Some).collect();
        take(&mut slots, ROOT)
    }
}

fn take(slots: &mut [Option<Node>], idx: usize) -> Directory {
    let Some(node) = slots[idx].take() else {
        return Directory {
            name: String::new(),
            files: Vec::new(),
            children: Vec::new(),
        };
    };
    Directory {
        name: node.name,
        files: node.files,
        children: node.children.into_iter().map(|c| take(slots, c)).collect(),
    }
}

/// Walk `root` recursively and collect its media files into a tree.
///
/// Unreadable entries are skipped; a missing root gives an empty tree.
pub fn scan_source_tree(root: &Path, matcher: &ExtensionMatcher) -> Directory {
    let mut builder = TreeBuilder::new();

    for entry in WalkDir::new(root)
        .min_depth(1)
        .follow_links(true)
        .sort_by_file_name()
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::debug!(error = %e, "Skipping unreadable library entry");
                continue;
            }
        };
        if !entry.file_type().is_file() || !matcher.matches_path(entry.path()) {
            continue;
        }
        if let Ok(relative) = entry.path().strip_prefix(root) {
            builder.insert(relative);
        }
    }

    builder.build()
}
