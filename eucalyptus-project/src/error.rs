//! Error types for the project namespace core.
//!
//! Every fallible operation returns [`Result`], whose error is one of the
//! domain enums below wrapped in [`enum@Error`].

use std::path::PathBuf;

/// Errors raised by virtual path validation and the folder operations.
#[derive(Debug, thiserror::Error)]
pub enum PathError {
    #[error("invalid name or path: {0:?}")]
    InvalidName(String),
    #[error("no such folder or resource: {0}")]
    NotFound(String),
    #[error("cannot move {source_path:?} into itself or one of its descendants ({target:?})")]
    CyclicMove { source_path: String, target: String },
    #[error("{0:?} already exists")]
    AlreadyExists(String),
    #[error("every resource id is in use")]
    IdsExhausted,
}

/// Filesystem failures while reading or writing a document.
#[derive(Debug, thiserror::Error)]
pub enum IoError {
    #[error("failed to read {path:?}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write {path:?}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to import {path:?}: {source}")]
    ImportFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A document exists but does not match the expected shape.
///
/// Loading recovers from this by falling back to a default document, so it
/// only reaches callers through [`crate::io::read_json`].
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("{path:?} is not a valid document: {source}")]
    MalformedDocument {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("unable to serialize document: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Errors raised by scene level/entity/component operations.
#[derive(Debug, thiserror::Error)]
pub enum HierarchyError {
    #[error("level {0} does not exist")]
    LevelNotFound(usize),
    #[error("entity {0} does not exist")]
    EntityNotFound(u32),
    #[error("entity {entity} has no component at index {index}")]
    ComponentNotFound { entity: u32, index: usize },
    #[error("invalid name: {0:?}")]
    InvalidName(String),
    #[error("cannot move entity {entity} under its own descendant {target}")]
    CyclicMove { entity: u32, target: u32 },
    #[error("component {index} of entity {entity} is not a camera")]
    NotACamera { entity: u32, index: usize },
    #[error("{0} is not a usable model id")]
    InvalidModel(u32),
    #[error("entity {entity} has no model component for resource {model}")]
    ModelNotAttached { entity: u32, model: u32 },
    #[error("every entity id is in use")]
    IdsExhausted,
}

/// Errors raised while editing a field through a property table.
#[derive(Debug, thiserror::Error)]
pub enum PropertyError {
    #[error("unknown field {0:?}")]
    UnknownField(String),
    #[error("field {0:?} is read only")]
    ReadOnly(String),
    #[error("cannot parse {text:?} as {expected}")]
    InvalidValue { text: String, expected: &'static str },
}

/// Top level error for the crate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Path(#[from] PathError),
    #[error(transparent)]
    Io(#[from] IoError),
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    Hierarchy(#[from] HierarchyError),
    #[error(transparent)]
    Property(#[from] PropertyError),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Returns true when this error means the requested item does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Error::Path(PathError::NotFound(_))
                | Error::Hierarchy(
                    HierarchyError::EntityNotFound(_)
                        | HierarchyError::LevelNotFound(_)
                        | HierarchyError::ComponentNotFound { .. }
                        | HierarchyError::ModelNotAttached { .. }
                )
        )
    }

    /// Returns true when this error was a rejected cyclic move.
    pub fn is_cyclic_move(&self) -> bool {
        matches!(
            self,
            Error::Path(PathError::CyclicMove { .. })
                | Error::Hierarchy(HierarchyError::CyclicMove { .. })
        )
    }
}
