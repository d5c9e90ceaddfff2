//! Project namespace core for the eucalyptus editor.
//!
//! Two hierarchies live here. The virtual resource folder tree is layered over
//! the flat, id keyed resource manifest ([`manifest`], [`folders`],
//! [`folder_tree`]). The scene entity hierarchy lives in scene documents
//! ([`scene`], [`hierarchy`]). Both are stored as JSON and rewritten whole on
//! every change.

pub mod error;
pub mod folder_tree;
pub mod folders;
pub mod hierarchy;
pub mod io;
pub mod manifest;
pub mod package;
pub mod properties;
pub mod resource_index;
pub mod scene;
pub mod settings;
pub mod vpath;

pub use error::{Error, Result};
pub use folder_tree::FolderNode;
pub use folders::{CreateOutcome, Removed, Rewrite};
pub use hierarchy::{EntityHierarchy, ParentTarget, PropertyTarget};
pub use manifest::{ManifestStore, MarkerPruning, ResourceEntry, ResourceKind, ResourceManifest};
pub use package::Package;
pub use resource_index::{ResourceIndex, ResourceQuery};
pub use scene::{Component, ComponentKind, Entity, Level, SceneDocument, SceneStore};
pub use settings::EditorSettings;
pub use vpath::VirtualPath;
