//! Builds the virtual folder tree shown by a resource browser.
//!
//! The tree is derived on demand from the manifest, never stored.

use crate::manifest::ResourceEntry;
use crate::vpath::{self, SEPARATOR};

/// A folder in the derived tree. The root has an empty name and path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FolderNode {
    pub name: String,
    pub path: String,
    /// Sub folders, in case-insensitive alphabetical order.
    pub children: Vec<FolderNode>,
    /// Ids of resources directly inside this folder.
    pub resources: Vec<u32>,
}

impl FolderNode {
    fn new(name: &str, path: String) -> Self {
        Self {
            name: name.to_string(),
            path,
            children: Vec::new(),
            resources: Vec::new(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.path.is_empty()
    }

    /// Returns the child with this name, inserting it in sorted position if
    /// missing. Matching ignores case, the first seen casing is kept.
    fn child_mut(&mut self, name: &str) -> &mut FolderNode {
        let index = match self
            .children
            .iter()
            .position(|c| vpath::eq_ignore_case(&c.name, name))
        {
            Some(index) => index,
            None => {
                let index = self
                    .children
                    .partition_point(|c| vpath::cmp_ignore_case(&c.name, name).is_lt());
                let path = vpath::join_str(&self.path, name);
                self.children.insert(index, FolderNode::new(name, path));
                index
            }
        };
        &mut self.children[index]
    }

    fn walk_mut<'a>(&mut self, segments: impl IntoIterator<Item = &'a str>) -> &mut FolderNode {
        let mut node = self;
        for segment in segments {
            node = node.child_mut(segment);
        }
        node
    }

    /// Finds a folder by virtual path, ignoring case.
    pub fn find(&self, path: &str) -> Option<&FolderNode> {
        let mut node = self;
        for segment in vpath::segments(path) {
            node = node
                .children
                .iter()
                .find(|c| vpath::eq_ignore_case(&c.name, segment))?;
        }
        Some(node)
    }

    /// Depth-first, pre-order iteration over this node and all folders below
    /// it, together with their depth relative to this node.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &FolderNode)> {
        let mut stack = vec![(0usize, self)];
        std::iter::from_fn(move || {
            let (depth, node) = stack.pop()?;
            stack.extend(node.children.iter().rev().map(|c| (depth + 1, c)));
            Some((depth, node))
        })
    }

    /// Number of folders below this one.
    pub fn descendant_count(&self) -> usize {
        self.iter().count() - 1
    }
}

/// Derives the folder tree from the resources' virtual paths and the empty
/// folder markers.
///
/// Every segment of a resource path except the last becomes a folder, every
/// segment of a marker becomes a folder. Resources without a virtual path
/// sit in the root.
pub fn build(resources: &[ResourceEntry], empty_folders: &[String]) -> FolderNode {
    let mut root = FolderNode::default();

    for resource in resources {
        let Some(virtual_path) = resource.virtual_path.as_deref() else {
            root.resources.push(resource.id);
            continue;
        };
        let folder = virtual_path
            .rfind(SEPARATOR)
            .map_or("", |index| &virtual_path[..index]);
        root.walk_mut(vpath::segments(folder)).resources.push(resource.id);
    }

    for marker in empty_folders {
        root.walk_mut(vpath::segments(marker));
    }

    root
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::ResourceKind;

    fn entry(id: u32, vp: Option<&str>) -> ResourceEntry {
        ResourceEntry {
            id,
            storage_path: format!("Misc/{id}.bin"),
            virtual_path: vp.map(str::to_string),
            kind: ResourceKind::Texture,
        }
    }

    fn names(node: &FolderNode) -> Vec<&str> {
        node.children.iter().map(|c| c.name.as_str()).collect()
    }

    #[test]
    fn builds_sorted_folders_from_resources_and_markers() {
        let resources = vec![
            entry(1, Some("env/Trees/oak")),
            entry(2, Some("Characters/hero")),
            entry(3, Some("Env/rock")),
            entry(4, None),
        ];
        let markers = vec!["audio".to_string(), "Env/Empty".to_string()];

        let root = build(&resources, &markers);

        assert_eq!(names(&root), vec!["audio", "Characters", "env"]);
        let env = root.find("ENV").unwrap();
        assert_eq!(env.path, "env");
        assert_eq!(names(env), vec!["Empty", "Trees"]);
        assert_eq!(env.resources, vec![3]);
        assert_eq!(root.resources, vec![4]);
        assert_eq!(root.find("env/trees").unwrap().path, "env/Trees");
    }

    #[test]
    fn leaf_segments_are_not_folders() {
        let root = build(&[entry(1, Some("oak"))], &[]);
        assert!(root.children.is_empty());
        assert_eq!(root.resources, vec![1]);
    }

    #[test]
    fn malformed_paths_skip_empty_segments() {
        let root = build(&[entry(1, Some("a//b/c"))], &["/x/".to_string()]);
        assert_eq!(names(&root), vec!["a", "x"]);
        assert_eq!(names(root.find("a").unwrap()), vec!["b"]);
    }

    #[test]
    fn iteration_is_depth_first() {
        let markers = vec!["b/c".to_string(), "a".to_string()];
        let root = build(&[], &markers);
        let visited: Vec<(usize, &str)> = root.iter().map(|(d, n)| (d, n.path.as_str())).collect();
        assert_eq!(visited, vec![(0, ""), (1, "a"), (1, "b"), (2, "b/c")]);
        assert_eq!(root.descendant_count(), 3);
    }
}
