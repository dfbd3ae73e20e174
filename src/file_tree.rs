use crate::git::natural_cmp;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileTreeNode {
    /// Display name; a collapsed chain reads `a/b/c`.
    pub name: String,
    pub full_path: String,
    pub is_directory: bool,
    pub children: Vec<FileTreeNode>,
    /// Index into the input list; set on leaves only.
    pub file_index: Option<usize>,
    pub depth: usize,
}

impl FileTreeNode {
    fn root() -> Self {
        Self {
            name: String::new(),
            full_path: String::new(),
            is_directory: true,
            children: Vec::new(),
            file_index: None,
            depth: 0,
        }
    }

    fn insert(&mut self, segments: &[&str], file_index: usize) {
        let Some((first, rest)) = segments.split_first() else {
            return;
        };
        let is_leaf = rest.is_empty();

        let pos = self
            .children
            .iter()
            .position(|c| c.name == *first && c.is_directory != is_leaf);
        let child_idx = match pos {
            Some(i) => i,
            None => {
                let full_path = if self.full_path.is_empty() {
                    first.to_string()
                } else {
                    format!("{}/{}", self.full_path, first)
                };
                self.children.push(FileTreeNode {
                    name: first.to_string(),
                    full_path,
                    is_directory: !is_leaf,
                    children: Vec::new(),
                    file_index: is_leaf.then_some(file_index),
                    depth: 0,
                });
                self.children.len() - 1
            }
        };

        if !is_leaf {
            self.children[child_idx].insert(rest, file_index);
        }
    }

    /// Post-order merge of single-directory-child chains.
    fn collapse(&mut self, is_root: bool) {
        for child in &mut self.children {
            if child.is_directory {
                child.collapse(false);
            }
        }
        if is_root {
            return;
        }
        while self.children.len() == 1 && self.children[0].is_directory {
            let child = self.children.remove(0);
            self.name = format!("{}/{}", self.name, child.name);
            self.full_path = child.full_path;
            self.children = child.children;
        }
    }

    fn set_depths(&mut self, depth: usize) {
        for child in &mut self.children {
            child.depth = depth;
            child.set_depths(depth + 1);
        }
    }

    fn sort(&mut self) {
        self.children.sort_by(|a, b| {
            b.is_directory
                .cmp(&a.is_directory)
                .then_with(|| natural_cmp(&a.name, &b.name))
        });
        for child in &mut self.children {
            child.sort();
        }
    }
}

/// Builds the collapsed, sorted tree. The returned node is the unnamed root;
/// its children are the top level at depth 0.
pub fn build_file_tree<S: AsRef<str>>(paths: &[S]) -> FileTreeNode {
    let mut root = FileTreeNode::root();
    for (idx, path) in paths.iter().enumerate() {
        let segments: Vec<&str> = path
            .as_ref()
            .split('/')
            .filter(|s| !s.is_empty())
            .collect();
        root.insert(&segments, idx);
    }
    root.collapse(true);
    root.set_depths(0);
    root.sort();
    root
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TreeRowKind {
    Directory,
    File,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TreeRowItem {
    pub kind: TreeRowKind,
    pub name: String,
    pub full_path: String,
    pub depth: usize,
    pub is_last: bool,
    /// One flag per ancestor level; `len() == depth`.
    pub parent_is_last: Vec<bool>,
    pub file_index: Option<usize>,
}

impl TreeRowItem {
    /// Connector glyphs drawn in front of the name.
    pub fn prefix(&self) -> String {
        let mut out = String::new();
        for &last in &self.parent_is_last {
            out.push_str(if last { "   " } else { "│  " });
        }
        out.push_str(if self.is_last { "└─ " } else { "├─ " });
        out
    }
}

pub fn flatten_tree(root: &FileTreeNode) -> Vec<TreeRowItem> {
    let mut out = Vec::new();
    let mut stack = Vec::new();
    flatten_into(&root.children, &mut stack, &mut out);
    out
}

fn flatten_into(nodes: &[FileTreeNode], stack: &mut Vec<bool>, out: &mut Vec<TreeRowItem>) {
    let count = nodes.len();
    for (i, node) in nodes.iter().enumerate() {
        let is_last = i + 1 == count;
        out.push(TreeRowItem {
            kind: if node.is_directory {
                TreeRowKind::Directory
            } else {
                TreeRowKind::File
            },
            name: node.name.clone(),
            full_path: node.full_path.clone(),
            depth: stack.len(),
            is_last,
            parent_is_last: stack.clone(),
            file_index: node.file_index,
        });
        if node.is_directory {
            stack.push(is_last);
            flatten_into(&node.children, stack, out);
            stack.pop();
        }
    }
}

pub fn build_tree_rows<S: AsRef<str>>(paths: &[S]) -> Vec<TreeRowItem> {
    flatten_tree(&build_file_tree(paths))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_chain_collapses() {
        let root = build_file_tree(&["a/b/c/file.ts"]);
        assert_eq!(root.children.len(), 1);
        let top = &root.children[0];
        assert_eq!(top.name, "a/b/c");
        assert_eq!(top.full_path, "a/b/c");
        assert!(top.is_directory);
        assert_eq!(top.depth, 0);
        assert_eq!(top.children.len(), 1);
        assert_eq!(top.children[0].name, "file.ts");
        assert_eq!(top.children[0].depth, 1);
        assert_eq!(top.children[0].file_index, Some(0));
    }

    #[test]
    fn branching_directory_is_kept() {
        let root = build_file_tree(&["a/b/file1.ts", "a/c/file2.ts"]);
        let a = &root.children[0];
        assert_eq!(a.name, "a");
        let names: Vec<&str> = a.children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["b", "c"]);
        assert!(a.children.iter().all(|c| c.is_directory));
    }

    #[test]
    fn partial_chain_collapses_below_branch() {
        let root = build_file_tree(&["src/ui/tabs/diff.rs", "src/main.rs"]);
        let src = &root.children[0];
        assert_eq!(src.name, "src");
        assert_eq!(src.children[0].name, "ui/tabs");
        assert_eq!(src.children[0].depth, 1);
        assert_eq!(src.children[0].children[0].depth, 2);
        assert_eq!(src.children[1].name, "main.rs");
    }

    #[test]
    fn directories_sort_before_files() {
        let rows = build_tree_rows(&["zeta.rs", "Alpha/x.rs", "beta.rs", "alpha.rs"]);
        let names: Vec<&str> = rows.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Alpha", "x.rs", "alpha.rs", "beta.rs", "zeta.rs"]);
    }

    #[test]
    fn flatten_tracks_ancestor_last_flags() {
        let rows = build_tree_rows(&["a/x/1.rs", "a/y/2.rs", "b.rs"]);
        for row in &rows {
            assert_eq!(row.parent_is_last.len(), row.depth);
        }
        let one = rows.iter().find(|r| r.name == "1.rs").unwrap();
        assert_eq!(one.parent_is_last, vec![false, false]);
        assert!(one.is_last);
        assert_eq!(one.file_index, Some(0));
        assert_eq!(one.prefix(), "│  │  └─ ");
        let b = rows.last().unwrap();
        assert_eq!(b.name, "b.rs");
        assert!(b.is_last);
    }

    #[test]
    fn empty_input_is_empty() {
        let empty: [&str; 0] = [];
        assert!(build_tree_rows(&empty).is_empty());
    }
}
