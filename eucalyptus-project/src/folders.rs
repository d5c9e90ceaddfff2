//! Folder operations over a [`ResourceManifest`].
//!
//! Folders are not stored. A folder exists because some resource's virtual
//! path passes through it or because an empty folder marker names it, so every
//! operation here is a prefix rewrite over the resources and the markers.

use crate::error::{PathError, Result};
use crate::manifest::{MarkerPruning, ResourceEntry, ResourceManifest};
use crate::vpath::{self, Segment, VirtualPath};

/// Result of [`ResourceManifest::create_folder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateOutcome {
    /// A marker was added for the new folder.
    Created(VirtualPath),
    /// The folder was already implied by a resource or a marker. Nothing
    /// changed.
    AlreadyExists(VirtualPath),
}

impl CreateOutcome {
    pub fn path(&self) -> &VirtualPath {
        match self {
            CreateOutcome::Created(path) | CreateOutcome::AlreadyExists(path) => path,
        }
    }
}

/// What a folder delete took out of the manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Removed {
    pub resources: Vec<ResourceEntry>,
    pub markers: Vec<String>,
}

/// Summary of a rename or move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rewrite {
    /// Where the folder lives now.
    pub new_path: VirtualPath,
    /// Number of resource paths rewritten.
    pub resources: usize,
    /// Number of markers rewritten.
    pub markers: usize,
}

impl Rewrite {
    fn unchanged(path: VirtualPath) -> Self {
        Self {
            new_path: path,
            resources: 0,
            markers: 0,
        }
    }

    pub fn is_noop(&self) -> bool {
        self.resources == 0 && self.markers == 0
    }
}

impl ResourceManifest {
    /// True if a resource or marker equals or is nested under `path`.
    pub fn folder_exists(&self, path: &str) -> bool {
        path.is_empty()
            || self.resources.iter().any(|r| {
                r.virtual_path
                    .as_deref()
                    .is_some_and(|vp| vpath::is_prefix_of(path, vp))
            })
            || self
                .empty_folders
                .iter()
                .any(|m| vpath::is_prefix_of(path, m))
    }

    /// Creates the folder `name` inside `parent`.
    ///
    /// The parent does not have to exist yet, it becomes implied by the new
    /// marker.
    pub fn create_folder(&mut self, parent: &str, name: &str) -> Result<CreateOutcome> {
        let parent = VirtualPath::normalize(parent)?;
        let name = Segment::new(name)?;
        let path = parent.join(&name);

        if self.folder_exists(path.as_str()) {
            return Ok(CreateOutcome::AlreadyExists(path));
        }
        self.empty_folders.push(path.as_str().to_string());
        Ok(CreateOutcome::Created(path))
    }

    /// Deletes a folder together with every resource and marker at or below
    /// it.
    pub fn delete_folder(&mut self, path: &str) -> Result<Removed> {
        let path = self.existing_folder(path)?;

        let (removed_resources, kept): (Vec<_>, Vec<_>) =
            self.resources.drain(..).partition(|r| {
                r.virtual_path
                    .as_deref()
                    .is_some_and(|vp| vpath::is_prefix_of(path.as_str(), vp))
            });
        self.resources = kept;

        let (removed_markers, kept): (Vec<_>, Vec<_>) = self
            .empty_folders
            .drain(..)
            .partition(|m| vpath::is_prefix_of(path.as_str(), m));
        self.empty_folders = kept;

        Ok(Removed {
            resources: removed_resources,
            markers: removed_markers,
        })
    }

    /// Renames the folder at `path`, keeping it in the same parent.
    pub fn rename_folder(
        &mut self,
        path: &str,
        new_name: &str,
        pruning: MarkerPruning,
    ) -> Result<Rewrite> {
        let path = self.existing_folder(path)?;
        let name = Segment::new(new_name)?;
        let new_path = path.parent().join(&name);
        self.rewrite(&path, new_path, pruning)
    }

    /// Moves the folder at `source` into `target_parent`, keeping its name.
    pub fn move_folder(
        &mut self,
        source: &str,
        target_parent: &str,
        pruning: MarkerPruning,
    ) -> Result<Rewrite> {
        let source = self.existing_folder(source)?;
        let target_parent = VirtualPath::normalize(target_parent)?;
        if source.is_prefix_of(target_parent.as_str()) {
            return Err(PathError::CyclicMove {
                source_path: source.into_string(),
                target: target_parent.into_string(),
            }
            .into());
        }
        let name = Segment::new(source.last_segment().unwrap_or_default())?;
        let new_path = target_parent.join(&name);
        self.rewrite(&source, new_path, pruning)
    }

    /// Moves a single resource into `target_parent`, keeping its name.
    ///
    /// The target's empty folder marker is removed if it has one. The folder
    /// the resource came from does not get a marker back.
    pub fn move_resource(
        &mut self,
        id: u32,
        target_parent: &str,
        pruning: MarkerPruning,
    ) -> Result<VirtualPath> {
        let target_parent = VirtualPath::normalize(target_parent)?;
        let entry = self
            .resource(id)
            .ok_or_else(|| PathError::NotFound(format!("resource {id}")))?;
        let name = Segment::new(&entry.slot_name())?;
        let new_path = target_parent.join(&name);

        if entry.virtual_path.as_deref() == Some(new_path.as_str()) {
            return Ok(new_path);
        }
        if self.slot_taken(new_path.as_str(), |other| other.id == id) {
            return Err(PathError::AlreadyExists(new_path.into_string()).into());
        }

        if let Some(entry) = self.resource_mut(id) {
            entry.virtual_path = Some(new_path.as_str().to_string());
        }
        self.prune_markers_for(new_path.as_str(), pruning);
        Ok(new_path)
    }

    fn existing_folder(&self, path: &str) -> Result<VirtualPath> {
        let path = VirtualPath::normalize(path)?;
        if path.is_root() {
            return Err(PathError::InvalidName(String::new()).into());
        }
        if !self.folder_exists(path.as_str()) {
            return Err(PathError::NotFound(path.into_string()).into());
        }
        Ok(path)
    }

    /// Whether a resource placed at `path` would clash with what is already
    /// there: another resource at the same path, a resource where one of its
    /// folders should be, or a folder (populated or marked) with that name.
    /// Entries matching `skip` are not considered.
    fn slot_taken(&self, path: &str, skip: impl Fn(&ResourceEntry) -> bool) -> bool {
        self.resources
            .iter()
            .filter(|r| !skip(r))
            .filter_map(|r| r.virtual_path.as_deref())
            .any(|vp| vpath::is_prefix_of(vp, path) || vpath::is_strictly_nested(path, vp))
            || self
                .empty_folders
                .iter()
                .any(|m| vpath::is_prefix_of(path, m))
    }

    /// Substitutes the `old` prefix with `new` in every resource path and
    /// marker. Collisions are checked before anything is changed.
    fn rewrite(
        &mut self,
        old: &VirtualPath,
        new: VirtualPath,
        pruning: MarkerPruning,
    ) -> Result<Rewrite> {
        if old.as_str() == new.as_str() {
            return Ok(Rewrite::unchanged(new));
        }

        let mut moved: Vec<(usize, String)> = Vec::new();
        for (index, entry) in self.resources.iter().enumerate() {
            if let Some(rebased) = entry
                .virtual_path
                .as_deref()
                .and_then(|vp| vpath::rebase(vp, old.as_str(), new.as_str()))
            {
                moved.push((index, rebased));
            }
        }

        let moved_markers: Vec<(usize, String)> = self
            .empty_folders
            .iter()
            .enumerate()
            .filter_map(|(index, m)| {
                vpath::rebase(m, old.as_str(), new.as_str()).map(|rebased| (index, rebased))
            })
            .collect();

        let staying = |index: usize| !moved.iter().any(|(m, _)| *m == index);
        let staying_marker = |index: usize| !moved_markers.iter().any(|(m, _)| *m == index);

        for (_, rebased) in &moved {
            let collides = self
                .resources
                .iter()
                .enumerate()
                .filter(|(other, _)| staying(*other))
                .filter_map(|(_, entry)| entry.virtual_path.as_deref())
                .any(|vp| {
                    vpath::is_prefix_of(vp, rebased) || vpath::is_strictly_nested(rebased, vp)
                })
                || self
                    .empty_folders
                    .iter()
                    .enumerate()
                    .filter(|(other, _)| staying_marker(*other))
                    .any(|(_, m)| vpath::is_prefix_of(rebased, m));
            if collides {
                return Err(PathError::AlreadyExists(rebased.clone()).into());
            }
        }
        for (_, rebased) in &moved_markers {
            let collides = self
                .resources
                .iter()
                .enumerate()
                .filter(|(other, _)| staying(*other))
                .filter_map(|(_, entry)| entry.virtual_path.as_deref())
                .any(|vp| vpath::is_prefix_of(vp, rebased));
            if collides {
                return Err(PathError::AlreadyExists(rebased.clone()).into());
            }
        }

        for (index, rebased) in &moved {
            self.resources[*index].virtual_path = Some(rebased.clone());
        }
        for (index, rebased) in &moved_markers {
            self.empty_folders[*index] = rebased.clone();
        }

        self.dedup_markers();
        for (_, rebased) in &moved {
            self.prune_markers_for(rebased, pruning);
        }
        let landed: Vec<String> = moved_markers.iter().map(|(_, m)| m.clone()).collect();
        self.prune_populated_markers(&landed, pruning);

        Ok(Rewrite {
            new_path: new,
            resources: moved.len(),
            markers: moved_markers.len(),
        })
    }
}
