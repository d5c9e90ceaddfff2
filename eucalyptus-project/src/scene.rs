//! Scene documents: levels containing flat lists of parented entities.

use std::fmt::{self, Display, Formatter};
use std::path::{Path, PathBuf};

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::io::{self, SaveMode};

pub const SCENE_VERSION: i32 = 1;
pub const DEFAULT_LEVEL_NAME: &str = "Default";

pub const DEFAULT_CAMERA_FOV: f32 = 60.0;
pub const DEFAULT_CAMERA_NEAR: f32 = 0.1;
pub const DEFAULT_CAMERA_FAR: f32 = 1000.0;

/// The root scene document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneDocument {
    pub version: i32,
    pub name: String,
    pub levels: Vec<Level>,
}

impl Default for SceneDocument {
    fn default() -> Self {
        Self::new(String::new())
    }
}

impl SceneDocument {
    /// Creates a new scene with a single empty `Default` level.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            version: SCENE_VERSION,
            name: name.into(),
            levels: vec![Level::new(DEFAULT_LEVEL_NAME, 0)],
        }
    }

    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.levels.iter().flat_map(|level| level.entities.iter())
    }

    /// The highest entity id used anywhere in the document.
    pub fn max_entity_id(&self) -> u32 {
        self.entities().map(|e| e.id).max().unwrap_or(0)
    }
}

/// A level inside a scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Level {
    pub name: String,
    pub order: i32,
    pub visible: bool,
    pub enabled: bool,
    pub entities: Vec<Entity>,
}

impl Default for Level {
    fn default() -> Self {
        Self::new(String::new(), 0)
    }
}

impl Level {
    pub fn new(name: impl Into<String>, order: i32) -> Self {
        Self {
            name: name.into(),
            order,
            visible: true,
            enabled: true,
            entities: Vec::new(),
        }
    }

    pub fn entity(&self, id: u32) -> Option<&Entity> {
        self.entities.iter().find(|e| e.id == id)
    }

    pub fn entity_mut(&mut self, id: u32) -> Option<&mut Entity> {
        self.entities.iter_mut().find(|e| e.id == id)
    }
}

/// An entity inside a level. Parent links only point at entities of the same
/// level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Entity {
    pub id: u32,
    pub name: String,
    pub active: bool,
    #[serde(rename = "parentId", skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<u32>,
    pub transform: Transform,
    pub components: Vec<Component>,
}

impl Default for Entity {
    fn default() -> Self {
        Self::new(0, None)
    }
}

impl Entity {
    /// Creates a new active entity with an identity transform. Without a name
    /// it is called `Entity_{id}`.
    pub fn new(id: u32, name: Option<String>) -> Self {
        Self {
            id,
            name: name.unwrap_or_else(|| format!("Entity_{id}")),
            active: true,
            parent_id: None,
            transform: Transform::default(),
            components: Vec::new(),
        }
    }

    /// The name shown in a hierarchy view.
    pub fn display_name(&self) -> String {
        if self.name.trim().is_empty() {
            format!("Entity_{}", self.id)
        } else {
            self.name.clone()
        }
    }

    pub fn cameras(&self) -> impl Iterator<Item = (usize, &Component)> {
        self.components
            .iter()
            .enumerate()
            .filter(|(_, c)| c.kind == ComponentKind::Camera)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Transform {
    pub position: Vec3,
    /// Euler angles in degrees.
    pub rotation: Vec3,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }
}

/// The component type code as stored in the scene file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub enum ComponentKind {
    Model,
    Light,
    Camera,
    Unknown(i32),
}

impl From<i32> for ComponentKind {
    fn from(value: i32) -> Self {
        match value {
            1 => ComponentKind::Model,
            2 => ComponentKind::Light,
            3 => ComponentKind::Camera,
            other => ComponentKind::Unknown(other),
        }
    }
}

impl From<ComponentKind> for i32 {
    fn from(value: ComponentKind) -> Self {
        match value {
            ComponentKind::Model => 1,
            ComponentKind::Light => 2,
            ComponentKind::Camera => 3,
            ComponentKind::Unknown(code) => code,
        }
    }
}

impl Display for ComponentKind {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            ComponentKind::Model => write!(f, "model"),
            ComponentKind::Light => write!(f, "light"),
            ComponentKind::Camera => write!(f, "camera"),
            ComponentKind::Unknown(code) => write!(f, "unknown ({code})"),
        }
    }
}

/// A component attached to an entity. Only the fields of its kind are used.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    #[serde(rename = "type")]
    pub kind: ComponentKind,
    #[serde(rename = "modelID", default, skip_serializing_if = "Option::is_none")]
    pub model_id: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fov: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub near: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub far: Option<f32>,
    #[serde(rename = "isMainCamera", default)]
    pub is_main_camera: bool,
    /// Keys this crate does not understand, kept for the round trip.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Component {
    fn empty(kind: ComponentKind) -> Self {
        Self {
            kind,
            model_id: None,
            fov: None,
            near: None,
            far: None,
            is_main_camera: false,
            extra: serde_json::Map::new(),
        }
    }

    pub fn model(model_id: u32) -> Self {
        Self {
            model_id: Some(model_id),
            ..Self::empty(ComponentKind::Model)
        }
    }

    pub fn light() -> Self {
        Self::empty(ComponentKind::Light)
    }

    pub fn camera() -> Self {
        Self {
            fov: Some(DEFAULT_CAMERA_FOV),
            near: Some(DEFAULT_CAMERA_NEAR),
            far: Some(DEFAULT_CAMERA_FAR),
            ..Self::empty(ComponentKind::Camera)
        }
    }
}

/// Reads and writes one scene file.
#[derive(Debug, Clone)]
pub struct SceneStore {
    path: PathBuf,
    save_mode: SaveMode,
}

impl SceneStore {
    pub fn new(path: impl AsRef<Path>, save_mode: SaveMode) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            save_mode,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The name a fresh document for this file gets: the file stem.
    pub fn default_name(&self) -> String {
        self.path
            .file_stem()
            .map(|stem| stem.to_string_lossy().to_string())
            .unwrap_or_default()
    }

    /// Loads the document.
    ///
    /// A missing or malformed file yields a fresh document named after the
    /// file. Other read failures are returned.
    pub fn load(&self) -> Result<SceneDocument> {
        match io::read_json::<SceneDocument>(&self.path) {
            Ok(Some(document)) => {
                log::info!("Loaded scene {:?} from {:?}", document.name, self.path);
                Ok(document)
            }
            Ok(None) => {
                log::warn!("Scene file {:?} not found, creating default.", self.path);
                Ok(SceneDocument::new(self.default_name()))
            }
            Err(Error::Schema(e)) => {
                log::warn!("Failed to parse scene, using default: {}", e);
                Ok(SceneDocument::new(self.default_name()))
            }
            Err(e) => Err(e),
        }
    }

    /// Writes the whole document.
    pub fn save(&self, document: &SceneDocument) -> Result<()> {
        io::write_json(&self.path, document, self.save_mode)?;
        log::debug!("Saved scene {:?} to {:?}", document.name, self.path);
        Ok(())
    }
}
