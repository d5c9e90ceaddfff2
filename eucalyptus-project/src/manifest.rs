//! The resource manifest: a flat, id keyed list of resources plus the
//! explicit markers for folders that have nothing inside them.
//!
//! [`ResourceManifest`] is the plain document. [`ManifestStore`] owns one
//! loaded from disk and writes it back after every successful mutation.

use std::convert::Infallible;
use std::fmt::{self, Display, Formatter};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, IoError, PathError, Result};
use crate::folders::{CreateOutcome, Removed, Rewrite};
use crate::io::{self, SaveMode};
use crate::vpath::{self, VirtualPath};

pub const MANIFEST_FILE_NAME: &str = "resource_manifest.json";
pub const MANIFEST_VERSION: i32 = 1;
pub const FIRST_RESOURCE_ID: u32 = 5000;

/// The type of resource.
///
/// Stored as its name in the manifest. Names this crate does not know about
/// are kept as [`ResourceKind::Other`] so they survive a load/save cycle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ResourceKind {
    Texture,
    Model,
    Mesh,
    Material,
    Scene,
    SceneLevel,
    Shader,
    Light,
    Other(String),
}

impl ResourceKind {
    /// The package subdirectory imported files of this kind are stored in.
    pub fn storage_dir(&self) -> &'static str {
        match self {
            ResourceKind::Texture => "Textures",
            ResourceKind::Model => "Models",
            ResourceKind::Mesh => "Meshes",
            ResourceKind::Material => "Materials",
            ResourceKind::Scene | ResourceKind::SceneLevel => "Scenes",
            ResourceKind::Shader => "Shaders",
            ResourceKind::Light => "Lights",
            ResourceKind::Other(_) => "Misc",
        }
    }

    /// File extensions (lowercase, without the dot) that can be imported as
    /// this kind.
    pub fn supported_extensions(&self) -> &'static [&'static str] {
        match self {
            ResourceKind::Texture => &["png", "jpg", "jpeg", "bmp", "tga", "dds", "hdr", "exr"],
            ResourceKind::Model => &["fbx", "obj", "dae", "3ds", "blend", "gltf", "glb"],
            ResourceKind::Mesh => &["obj", "fbx", "dae"],
            ResourceKind::Shader => &["hlsl", "glsl", "vert", "frag", "comp"],
            ResourceKind::Scene | ResourceKind::SceneLevel => &["json"],
            _ => &[],
        }
    }

    /// Guesses a kind from a file's extension.
    pub fn detect(path: impl AsRef<Path>) -> Option<Self> {
        let ext = path.as_ref().extension()?.to_str()?.to_lowercase();
        [
            ResourceKind::Texture,
            ResourceKind::Model,
            ResourceKind::Shader,
            ResourceKind::Scene,
        ]
        .into_iter()
        .find(|kind| kind.supported_extensions().contains(&ext.as_str()))
    }

    /// Whether an entity's model component may reference this kind.
    pub fn is_model_like(&self) -> bool {
        matches!(self, ResourceKind::Model | ResourceKind::Mesh)
    }
}

impl Display for ResourceKind {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        let str = match self {
            ResourceKind::Texture => "Texture",
            ResourceKind::Model => "Model",
            ResourceKind::Mesh => "Mesh",
            ResourceKind::Material => "Material",
            ResourceKind::Scene => "Scene",
            ResourceKind::SceneLevel => "SceneLevel",
            ResourceKind::Shader => "Shader",
            ResourceKind::Light => "Light",
            ResourceKind::Other(name) => name.as_str(),
        };
        write!(f, "{}", str)
    }
}

impl FromStr for ResourceKind {
    type Err = Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s.to_lowercase().as_str() {
            "texture" => ResourceKind::Texture,
            "model" => ResourceKind::Model,
            "mesh" => ResourceKind::Mesh,
            "material" => ResourceKind::Material,
            "scene" => ResourceKind::Scene,
            "scenelevel" => ResourceKind::SceneLevel,
            "shader" => ResourceKind::Shader,
            "light" => ResourceKind::Light,
            _ => ResourceKind::Other(s.to_string()),
        })
    }
}

impl From<String> for ResourceKind {
    fn from(value: String) -> Self {
        match value.parse() {
            Ok(kind) => kind,
            Err(never) => match never {},
        }
    }
}

impl From<ResourceKind> for String {
    fn from(value: ResourceKind) -> Self {
        value.to_string()
    }
}

/// Which empty folder markers are dropped when a resource is placed in a
/// folder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarkerPruning {
    /// Only the marker of the folder the resource lands in.
    #[default]
    ImmediateParent,
    /// Every marker on the path from the root down to the resource.
    AllAncestors,
}

/// A single resource in the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceEntry {
    pub id: u32,
    /// Location relative to the package root.
    #[serde(rename = "path")]
    pub storage_path: String,
    #[serde(
        rename = "virtualPath",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub virtual_path: Option<String>,
    #[serde(rename = "type")]
    pub kind: ResourceKind,
}

impl ResourceEntry {
    /// The display name: the last virtual path segment, or the file stem of
    /// the storage path when no virtual path is set.
    pub fn name(&self) -> String {
        if let Some(name) = self.virtual_path.as_deref().and_then(vpath::last_segment) {
            return name.to_string();
        }
        Path::new(&self.storage_path)
            .file_stem()
            .map(|stem| stem.to_string_lossy().to_string())
            .unwrap_or_else(|| self.storage_path.clone())
    }

    /// The leaf name the resource keeps when it is moved between folders:
    /// the last virtual path segment, or the storage file name with its
    /// extension.
    pub fn slot_name(&self) -> String {
        if let Some(name) = self.virtual_path.as_deref().and_then(vpath::last_segment) {
            return name.to_string();
        }
        Path::new(&self.storage_path)
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| self.storage_path.clone())
    }

    /// The virtual path, falling back to the storage path.
    pub fn display_path(&self) -> &str {
        self.virtual_path.as_deref().unwrap_or(&self.storage_path)
    }
}

/// The manifest document.
///
/// # Location
/// This file is `resource_manifest.json` and is located at the package root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceManifest {
    pub version: i32,
    /// The next id handed out to an imported resource. Never reused.
    #[serde(rename = "nextID")]
    pub next_id: u32,
    pub resources: Vec<ResourceEntry>,
    /// Virtual paths of folders with no resource beneath them.
    #[serde(rename = "emptyFolders")]
    pub empty_folders: Vec<String>,
}

impl Default for ResourceManifest {
    fn default() -> Self {
        Self {
            version: MANIFEST_VERSION,
            next_id: FIRST_RESOURCE_ID,
            resources: Vec::new(),
            empty_folders: Vec::new(),
        }
    }
}

impl ResourceManifest {
    pub fn resource(&self, id: u32) -> Option<&ResourceEntry> {
        self.resources.iter().find(|r| r.id == id)
    }

    pub fn resource_mut(&mut self, id: u32) -> Option<&mut ResourceEntry> {
        self.resources.iter_mut().find(|r| r.id == id)
    }

    /// Finds the resource occupying a virtual leaf slot.
    pub fn resource_at(&self, virtual_path: &str) -> Option<&ResourceEntry> {
        self.resources.iter().find(|r| {
            r.virtual_path
                .as_deref()
                .is_some_and(|vp| vpath::eq_ignore_case(vp, virtual_path))
        })
    }

    /// The id [`ResourceManifest::allocate_id`] would hand out next.
    ///
    /// Fails once `nextID` is pinned at `u32::MAX` and that id is taken.
    pub fn peek_id(&self) -> Result<u32> {
        let id = self.next_id;
        if self.resources.iter().any(|r| r.id >= id) {
            return Err(PathError::IdsExhausted.into());
        }
        Ok(id)
    }

    /// Hands out the next resource id.
    pub fn allocate_id(&mut self) -> Result<u32> {
        let id = self.peek_id()?;
        self.next_id = id.saturating_add(1);
        Ok(id)
    }

    /// Raises `next_id` past the highest stored id. Returns true if it had to
    /// move.
    pub fn repair_next_id(&mut self) -> bool {
        let floor = self
            .resources
            .iter()
            .map(|r| r.id.saturating_add(1))
            .max()
            .unwrap_or(0);
        if self.next_id < floor {
            self.next_id = floor;
            true
        } else {
            false
        }
    }

    pub fn has_marker(&self, path: &str) -> bool {
        self.empty_folders
            .iter()
            .any(|m| vpath::eq_ignore_case(m, path))
    }

    /// Removes the marker equal to `path`, returning whether one was present.
    pub fn remove_marker(&mut self, path: &str) -> bool {
        let before = self.empty_folders.len();
        self.empty_folders.retain(|m| !vpath::eq_ignore_case(m, path));
        before != self.empty_folders.len()
    }

    /// Markers that sit on the path of some resource and therefore no longer
    /// denote an empty folder.
    pub fn stale_empty_folders(&self) -> Vec<&str> {
        self.empty_folders
            .iter()
            .filter(|marker| {
                self.resources.iter().any(|r| {
                    r.virtual_path
                        .as_deref()
                        .is_some_and(|vp| vpath::is_prefix_of(marker, vp))
                })
            })
            .map(String::as_str)
            .collect()
    }

    /// Drops the markers made redundant by a resource now living at
    /// `virtual_path`. Returns how many were removed.
    pub fn prune_markers_for(&mut self, virtual_path: &str, pruning: MarkerPruning) -> usize {
        let parent = vpath::parent_of(virtual_path);
        let before = self.empty_folders.len();
        self.empty_folders.retain(|marker| match pruning {
            MarkerPruning::ImmediateParent => {
                !(vpath::eq_ignore_case(marker, virtual_path)
                    || (!parent.is_empty() && vpath::eq_ignore_case(marker, parent)))
            }
            MarkerPruning::AllAncestors => !vpath::is_prefix_of(marker, virtual_path),
        });
        before - self.empty_folders.len()
    }

    /// Drops those of `markers` that now sit on a populated folder: the parent
    /// folder of some resource, or with [`MarkerPruning::AllAncestors`] any
    /// folder a resource is nested in. Returns how many were removed.
    pub fn prune_populated_markers(&mut self, markers: &[String], pruning: MarkerPruning) -> usize {
        let resources = &self.resources;
        let populated = |marker: &str| {
            resources.iter().filter_map(|r| r.virtual_path.as_deref()).any(|vp| match pruning {
                MarkerPruning::ImmediateParent => vpath::eq_ignore_case(vpath::parent_of(vp), marker),
                MarkerPruning::AllAncestors => vpath::is_strictly_nested(marker, vp),
            })
        };
        let before = self.empty_folders.len();
        self.empty_folders.retain(|marker| {
            !(markers.iter().any(|m| vpath::eq_ignore_case(m, marker)) && populated(marker))
        });
        before - self.empty_folders.len()
    }

    /// Collapses markers that are equal ignoring case, keeping the first.
    pub fn dedup_markers(&mut self) {
        let mut kept: Vec<String> = Vec::with_capacity(self.empty_folders.len());
        for marker in self.empty_folders.drain(..) {
            if !kept.iter().any(|k| vpath::eq_ignore_case(k, &marker)) {
                kept.push(marker);
            }
        }
        self.empty_folders = kept;
    }

    /// Inserts or replaces a resource entry.
    ///
    /// An existing entry with the same id, or occupying the same virtual slot,
    /// is replaced. `next_id` is raised past the entry's id and redundant
    /// markers are pruned.
    pub fn upsert(&mut self, entry: ResourceEntry, pruning: MarkerPruning) {
        let slot = entry.virtual_path.clone();
        let existing = self.resources.iter().position(|r| {
            r.id == entry.id
                || match (&r.virtual_path, &slot) {
                    (Some(a), Some(b)) => vpath::eq_ignore_case(a, b),
                    _ => false,
                }
        });
        self.next_id = self.next_id.max(entry.id.saturating_add(1));
        match existing {
            Some(index) => self.resources[index] = entry,
            None => self.resources.push(entry),
        }
        if let Some(slot) = slot {
            self.prune_markers_for(&slot, pruning);
        }
    }
}

/// Imports a file into the package on behalf of the manifest.
///
/// Implementations copy (or otherwise produce) the stored file and return its
/// location relative to the package root. Thumbnails, descriptors and engine
/// side processing live behind this trait.
pub trait ResourceImporter {
    fn import(&mut self, source: &Path, request: &ImportRequest<'_>) -> std::io::Result<String>;
}

/// What the manifest asks an importer to produce.
#[derive(Debug, Clone, Copy)]
pub struct ImportRequest<'a> {
    pub id: u32,
    pub virtual_path: &'a VirtualPath,
    pub kind: &'a ResourceKind,
}

/// Copies files into `{package}/{kind storage dir}/{file name}`.
#[derive(Debug, Clone)]
pub struct CopyImporter {
    package_dir: PathBuf,
}

impl CopyImporter {
    pub fn new(package_dir: impl AsRef<Path>) -> Self {
        Self {
            package_dir: package_dir.as_ref().to_path_buf(),
        }
    }
}

impl ResourceImporter for CopyImporter {
    fn import(&mut self, source: &Path, request: &ImportRequest<'_>) -> std::io::Result<String> {
        let file_name = source.file_name().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "source has no file name")
        })?;
        let dir = request.kind.storage_dir();
        std::fs::create_dir_all(self.package_dir.join(dir))?;
        let mut relative = Path::new(dir).join(file_name);
        if self.package_dir.join(&relative).exists() {
            relative = Path::new(dir).join(format!("{}_{}", request.id, file_name.to_string_lossy()));
        }
        std::fs::copy(source, self.package_dir.join(&relative))?;
        Ok(relative.to_string_lossy().replace('\\', "/"))
    }
}

/// Options a [`ManifestStore`] is opened with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreOptions {
    pub save_mode: SaveMode,
    pub marker_pruning: MarkerPruning,
}

/// A manifest loaded from disk.
///
/// Every mutating method validates first, changes the in-memory document and
/// then writes the whole document back once.
#[derive(Debug)]
pub struct ManifestStore {
    path: PathBuf,
    manifest: ResourceManifest,
    options: StoreOptions,
}

impl ManifestStore {
    /// Opens the manifest at `path`.
    ///
    /// A missing file yields a fresh manifest. A malformed one is logged and
    /// replaced by a fresh manifest on the next save.
    pub fn open(path: impl AsRef<Path>, options: StoreOptions) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let manifest = Self::load(&path)?;
        log::info!(
            "Loaded manifest {:?} with {} resources",
            path,
            manifest.resources.len()
        );
        Ok(Self {
            path,
            manifest,
            options,
        })
    }

    fn load(path: &Path) -> Result<ResourceManifest> {
        let mut manifest = match io::read_json::<ResourceManifest>(path) {
            Ok(Some(manifest)) => manifest,
            Ok(None) => {
                log::warn!("{:?} not found, creating default.", path);
                return Ok(ResourceManifest::default());
            }
            Err(Error::Schema(e)) => {
                log::warn!("Failed to parse manifest, using default: {}", e);
                return Ok(ResourceManifest::default());
            }
            Err(e) => return Err(e),
        };
        if manifest.repair_next_id() {
            log::warn!("nextID was behind the stored ids, raised to {}", manifest.next_id);
        }
        for marker in manifest.stale_empty_folders() {
            log::debug!("Empty folder marker {:?} has resources beneath it", marker);
        }
        Ok(manifest)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn manifest(&self) -> &ResourceManifest {
        &self.manifest
    }

    pub fn options(&self) -> StoreOptions {
        self.options
    }

    /// Writes the whole document back to disk.
    pub fn save(&self) -> Result<()> {
        io::write_json(&self.path, &self.manifest, self.options.save_mode)?;
        log::debug!("Saved manifest to {:?}", self.path);
        Ok(())
    }

    /// Discards in-memory state and reads the file again.
    pub fn reload(&mut self) -> Result<()> {
        self.manifest = Self::load(&self.path)?;
        Ok(())
    }

    pub fn create_folder(&mut self, parent: &str, name: &str) -> Result<CreateOutcome> {
        let outcome = self.manifest.create_folder(parent, name)?;
        if let CreateOutcome::Created(path) = &outcome {
            self.save()?;
            log::debug!("Created folder {:?}", path.as_str());
        }
        Ok(outcome)
    }

    pub fn delete_folder(&mut self, path: &str) -> Result<Removed> {
        let removed = self.manifest.delete_folder(path)?;
        self.save()?;
        log::debug!(
            "Deleted folder {:?} ({} resources, {} markers)",
            path,
            removed.resources.len(),
            removed.markers.len()
        );
        Ok(removed)
    }

    pub fn rename_folder(&mut self, path: &str, new_name: &str) -> Result<Rewrite> {
        let rewrite = self
            .manifest
            .rename_folder(path, new_name, self.options.marker_pruning)?;
        self.commit_rewrite(path, &rewrite)?;
        Ok(rewrite)
    }

    pub fn move_folder(&mut self, source: &str, target_parent: &str) -> Result<Rewrite> {
        let rewrite = self
            .manifest
            .move_folder(source, target_parent, self.options.marker_pruning)?;
        self.commit_rewrite(source, &rewrite)?;
        Ok(rewrite)
    }

    fn commit_rewrite(&mut self, old: &str, rewrite: &Rewrite) -> Result<()> {
        if rewrite.is_noop() {
            return Ok(());
        }
        self.save()?;
        log::debug!(
            "Rewrote {:?} to {:?} ({} resources, {} markers)",
            old,
            rewrite.new_path.as_str(),
            rewrite.resources,
            rewrite.markers
        );
        Ok(())
    }

    pub fn move_resource(&mut self, id: u32, target_parent: &str) -> Result<VirtualPath> {
        let before = self.manifest.resource(id).and_then(|r| r.virtual_path.clone());
        let new_path = self
            .manifest
            .move_resource(id, target_parent, self.options.marker_pruning)?;
        if before.as_deref() != Some(new_path.as_str()) {
            self.save()?;
            log::debug!("Moved resource {} to {:?}", id, new_path.as_str());
        }
        Ok(new_path)
    }

    /// Records a resource a collaborator has already placed in the package.
    pub fn record(
        &mut self,
        id: u32,
        storage_path: impl Into<String>,
        virtual_path: &str,
        kind: ResourceKind,
    ) -> Result<()> {
        let virtual_path = VirtualPath::normalize(virtual_path)?;
        if virtual_path.is_root() {
            return Err(PathError::InvalidName(String::new()).into());
        }
        if let Some(other) = self
            .manifest
            .resource_at(virtual_path.as_str())
            .filter(|other| other.id != id)
        {
            log::warn!(
                "Resource {} replaces resource {} at {:?}",
                id,
                other.id,
                virtual_path.as_str()
            );
        }
        self.manifest.upsert(
            ResourceEntry {
                id,
                storage_path: storage_path.into(),
                virtual_path: Some(virtual_path.into_string()),
                kind,
            },
            self.options.marker_pruning,
        );
        self.save()?;
        log::debug!("Recorded resource {}", id);
        Ok(())
    }

    /// Imports `source` through `importer` and records it at `virtual_path`.
    ///
    /// Returns the new resource id. The id is only consumed once the importer
    /// succeeds.
    pub fn import(
        &mut self,
        importer: &mut impl ResourceImporter,
        source: impl AsRef<Path>,
        virtual_path: &str,
        kind: ResourceKind,
    ) -> Result<u32> {
        let source = source.as_ref();
        let slot = VirtualPath::normalize(virtual_path)?;
        if slot.is_root() {
            return Err(PathError::InvalidName(String::new()).into());
        }
        if self.manifest.resource_at(slot.as_str()).is_some() {
            return Err(PathError::AlreadyExists(slot.into_string()).into());
        }

        let id = self.manifest.peek_id()?;
        let request = ImportRequest {
            id,
            virtual_path: &slot,
            kind: &kind,
        };
        let storage_path =
            importer
                .import(source, &request)
                .map_err(|source_err| IoError::ImportFailed {
                    path: source.to_path_buf(),
                    source: source_err,
                })?;
        self.manifest.allocate_id()?;
        log::info!("Imported {:?} as resource {}", source, id);
        self.record(id, storage_path, slot.as_str(), kind)?;
        Ok(id)
    }

    /// Removes a single resource from the manifest.
    pub fn remove_resource(&mut self, id: u32) -> Result<ResourceEntry> {
        let index = self
            .manifest
            .resources
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| PathError::NotFound(format!("resource {id}")))?;
        let entry = self.manifest.resources.remove(index);
        self.save()?;
        log::debug!("Removed resource {}", id);
        Ok(entry)
    }
}
