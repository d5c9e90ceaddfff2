//! A package on disk: its settings, its manifest and the scenes it lists.
//!
//! [`Package`] is passed to whatever needs it. Nothing here is global.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{HierarchyError, PathError, Result};
use crate::folder_tree::{self, FolderNode};
use crate::hierarchy::EntityHierarchy;
use crate::io;
use crate::manifest::{
    CopyImporter, ImportRequest, MANIFEST_FILE_NAME, ManifestStore, ResourceImporter, ResourceKind,
};
use crate::resource_index::ResourceIndex;
use crate::scene::{SceneDocument, SceneStore};
use crate::settings::{EditorSettings, SETTINGS_FILE_NAME};
use crate::vpath::{self, Segment, VirtualPath};

/// Name of the package directory inside a project directory.
pub const PACKAGE_DIR_NAME: &str = "Package";

#[derive(Debug)]
pub struct Package {
    dir: PathBuf,
    settings: EditorSettings,
    manifest: ManifestStore,
}

impl Package {
    /// Finds the package directory for a project or package directory.
    ///
    /// `dir` itself is the package when it holds a manifest or settings file.
    /// Otherwise its `Package` subdirectory is used if there is one.
    pub fn locate(dir: impl AsRef<Path>) -> Result<PathBuf> {
        let dir = dir.as_ref();
        if dir.join(MANIFEST_FILE_NAME).is_file() || dir.join(SETTINGS_FILE_NAME).is_file() {
            return Ok(dir.to_path_buf());
        }
        let nested = dir.join(PACKAGE_DIR_NAME);
        if nested.is_dir() {
            return Ok(nested);
        }
        Err(PathError::NotFound(dir.display().to_string()).into())
    }

    /// Opens the package found from `dir`.
    pub fn open(dir: impl AsRef<Path>) -> anyhow::Result<Self> {
        let dir = Self::locate(dir)?;
        Self::open_at(dir)
    }

    /// Creates a package in `dir` (which may already exist) and opens it.
    pub fn create(dir: impl AsRef<Path>) -> anyhow::Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        let package = Self::open_at(dir)?;
        if !package.manifest.path().exists() {
            package.manifest.save()?;
        }
        log::info!("Created package at {:?}", package.dir);
        Ok(package)
    }

    fn open_at(dir: PathBuf) -> anyhow::Result<Self> {
        let mut settings = EditorSettings::load_or_default(&dir)?;
        let manifest = ManifestStore::open(dir.join(&settings.manifest_file), settings.store_options())?;
        if let Err(e) = settings.write_to(&dir) {
            log::warn!("Unable to update {}: {}", SETTINGS_FILE_NAME, e);
        }
        log::info!("Opened package {:?}", dir);
        Ok(Self {
            dir,
            settings,
            manifest,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn settings(&self) -> &EditorSettings {
        &self.settings
    }

    pub fn manifest(&self) -> &ManifestStore {
        &self.manifest
    }

    pub fn manifest_mut(&mut self) -> &mut ManifestStore {
        &mut self.manifest
    }

    /// The current virtual folder tree.
    pub fn folder_tree(&self) -> FolderNode {
        let manifest = self.manifest.manifest();
        folder_tree::build(&manifest.resources, &manifest.empty_folders)
    }

    /// A listing of the current resources.
    pub fn index(&self) -> ResourceIndex {
        ResourceIndex::new(self.manifest.manifest())
    }

    /// Copies a file into the package and records it inside `folder`, named
    /// after the file.
    ///
    /// The kind is guessed from the extension when not given.
    pub fn import_file(
        &mut self,
        source: impl AsRef<Path>,
        folder: &str,
        kind: Option<ResourceKind>,
    ) -> Result<u32> {
        let source = source.as_ref();
        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        let folder = VirtualPath::normalize(folder)?;
        let virtual_path = folder.join(&Segment::new(&stem)?);
        let kind = kind
            .or_else(|| ResourceKind::detect(source))
            .unwrap_or_else(|| ResourceKind::Other("Misc".to_string()));
        let mut importer = CopyImporter::new(&self.dir);
        self.manifest
            .import(&mut importer, source, virtual_path.as_str(), kind)
    }

    /// Resolves a scene reference to its file.
    ///
    /// `reference` is a resource id, the virtual path of a scene resource, or
    /// a file path relative to the package.
    pub fn scene_path(&self, reference: &str) -> Result<PathBuf> {
        let manifest = self.manifest.manifest();
        let entry = match reference.parse::<u32>() {
            Ok(id) => manifest.resource(id),
            Err(_) => manifest.resource_at(reference),
        };
        if let Some(entry) = entry {
            if !matches!(entry.kind, ResourceKind::Scene | ResourceKind::SceneLevel) {
                return Err(PathError::NotFound(format!("scene {reference}")).into());
            }
            return Ok(self.dir.join(&entry.storage_path));
        }
        let file = self.dir.join(reference);
        if file.is_file() {
            return Ok(file);
        }
        Err(PathError::NotFound(format!("scene {reference}")).into())
    }

    /// Opens a scene for editing. See [`Package::scene_path`] for the accepted
    /// references.
    pub fn open_scene(&self, reference: &str) -> Result<EntityHierarchy> {
        let path = self.scene_path(reference)?;
        EntityHierarchy::open(SceneStore::new(path, self.settings.save_mode))
    }

    /// Writes a new scene file and records it as a `Scene` resource at
    /// `folder/name`. Returns the resource id and the open scene.
    pub fn create_scene(&mut self, folder: &str, name: &str) -> Result<(u32, EntityHierarchy)> {
        let name = Segment::new(name)?;
        let folder = VirtualPath::normalize(folder)?;
        let virtual_path = folder.join(&name);

        let mut writer = SceneWriter {
            package_dir: &self.dir,
            settings: &self.settings,
        };
        let id = self.manifest.import(
            &mut writer,
            Path::new(name.as_str()),
            virtual_path.as_str(),
            ResourceKind::Scene,
        )?;
        let hierarchy = self.open_scene(&id.to_string())?;
        Ok((id, hierarchy))
    }

    /// Attaches resource `model_id` to an entity after checking the manifest
    /// lists it as a model or mesh.
    pub fn attach_model(&self, hierarchy: &mut EntityHierarchy, entity: u32, model_id: u32) -> Result<usize> {
        let usable = self
            .manifest
            .manifest()
            .resource(model_id)
            .is_some_and(|r| r.kind.is_model_like());
        if !usable {
            return Err(HierarchyError::InvalidModel(model_id).into());
        }
        hierarchy.attach_model(entity, model_id)
    }

    /// Virtual paths of all scene resources.
    pub fn scenes(&self) -> Vec<(u32, String)> {
        self.manifest
            .manifest()
            .resources
            .iter()
            .filter(|r| matches!(r.kind, ResourceKind::Scene | ResourceKind::SceneLevel))
            .map(|r| (r.id, r.display_path().to_string()))
            .collect()
    }
}

/// Produces fresh scene files for [`Package::create_scene`].
struct SceneWriter<'a> {
    package_dir: &'a Path,
    settings: &'a EditorSettings,
}

impl ResourceImporter for SceneWriter<'_> {
    fn import(&mut self, source: &Path, request: &ImportRequest<'_>) -> std::io::Result<String> {
        let name = source.to_string_lossy();
        let relative = vpath::join_str(&self.settings.scenes_dir, &format!("{name}.json"));
        let path = self.package_dir.join(&relative);
        if path.exists() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                format!("{} already exists", path.display()),
            ));
        }
        log::debug!("Writing scene {} for resource {}", relative, request.id);
        io::write_json(&path, &SceneDocument::new(name.to_string()), self.settings.save_mode)
            .map_err(std::io::Error::other)?;
        Ok(relative)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locate_prefers_the_directory_then_its_package_folder() {
        let project = tempfile::tempdir().unwrap();
        assert!(Package::locate(project.path()).unwrap_err().is_not_found());

        let nested = project.path().join(PACKAGE_DIR_NAME);
        fs::create_dir(&nested).unwrap();
        assert_eq!(Package::locate(project.path()).unwrap(), nested);

        fs::write(project.path().join(MANIFEST_FILE_NAME), "{}").unwrap();
        assert_eq!(Package::locate(project.path()).unwrap(), project.path());
    }

    #[test]
    fn created_scenes_are_listed_and_open() {
        let dir = tempfile::tempdir().unwrap();
        let mut package = Package::create(dir.path()).unwrap();
        package.manifest_mut().create_folder("", "Levels").unwrap();

        let (id, hierarchy) = package.create_scene("Levels", "Forest").unwrap();

        assert_eq!(id, 5000);
        assert_eq!(hierarchy.document().name, "Forest");
        assert!(dir.path().join("Scenes").join("Forest.json").is_file());
        assert_eq!(package.scenes(), vec![(5000, "Levels/Forest".to_string())]);
        assert!(!package.manifest().manifest().has_marker("Levels"));
        assert!(package.open_scene("Levels/Forest").is_ok());
        assert!(package.open_scene("Levels/Nope").unwrap_err().is_not_found());
        assert!(package.create_scene("Levels", "Forest").is_err());
    }

    #[test]
    fn attach_model_checks_the_resource_kind() {
        let dir = tempfile::tempdir().unwrap();
        let mut package = Package::create(dir.path()).unwrap();
        package
            .manifest_mut()
            .record(10, "Models/tree.glb", "Props/tree", ResourceKind::Model)
            .unwrap();
        package
            .manifest_mut()
            .record(11, "Textures/bark.png", "Props/bark", ResourceKind::Texture)
            .unwrap();
        let (_, mut scene) = package.create_scene("", "Main").unwrap();
        let entity = scene.add_entity(0, None, Some("Tree")).unwrap();

        assert!(package.attach_model(&mut scene, entity, 11).is_err());
        assert!(package.attach_model(&mut scene, entity, 99).is_err());
        package.attach_model(&mut scene, entity, 10).unwrap();

        let reopened = package.open_scene("Main").unwrap();
        assert_eq!(reopened.entity(entity).unwrap().components[0].model_id, Some(10));
    }

    #[test]
    fn import_file_copies_and_records() {
        let dir = tempfile::tempdir().unwrap();
        let source_dir = tempfile::tempdir().unwrap();
        let source = source_dir.path().join("oak.png");
        fs::write(&source, [0u8; 4]).unwrap();

        let mut package = Package::create(dir.path()).unwrap();
        let id = package.import_file(&source, "Env/Trees", None).unwrap();

        let entry = package.manifest().manifest().resource(id).unwrap().clone();
        assert_eq!(entry.kind, ResourceKind::Texture);
        assert_eq!(entry.storage_path, "Textures/oak.png");
        assert_eq!(entry.virtual_path.as_deref(), Some("Env/Trees/oak"));
        assert!(dir.path().join("Textures").join("oak.png").is_file());
    }
}
