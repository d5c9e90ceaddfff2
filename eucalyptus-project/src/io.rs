//! Whole-document JSON reading and writing shared by the manifest and scene
//! stores.

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{IoError, Result, SchemaError};

/// How a document is written back to disk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SaveMode {
    /// Write to a sibling temporary file, then rename it over the target.
    #[default]
    Atomic,
    /// Truncate and rewrite the target in place.
    Overwrite,
}

/// Reads and parses a JSON document.
///
/// Returns `Ok(None)` when the file does not exist.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(IoError::ReadFailed {
                path: path.to_path_buf(),
                source,
            }
            .into());
        }
    };
    let value = serde_json::from_str(&text).map_err(|source| SchemaError::MalformedDocument {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Some(value))
}

/// Serializes `value` as indented JSON and writes it to `path`, creating the
/// parent directory when needed.
pub fn write_json<T: Serialize>(path: &Path, value: &T, mode: SaveMode) -> Result<()> {
    let mut text = serde_json::to_string_pretty(value).map_err(SchemaError::Serialize)?;
    text.push('\n');

    let write_failed = |source| IoError::WriteFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(write_failed)?;
    }

    match mode {
        SaveMode::Overwrite => fs::write(path, text).map_err(write_failed)?,
        SaveMode::Atomic => {
            let temp = temp_sibling(path);
            fs::write(&temp, text).map_err(write_failed)?;
            if let Err(e) = fs::rename(&temp, path) {
                let _ = fs::remove_file(&temp);
                return Err(write_failed(e).into());
            }
        }
    }
    Ok(())
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn missing_file_reads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let value: Option<BTreeMap<String, i32>> =
            read_json(&dir.path().join("missing.json")).unwrap();
        assert!(value.is_none());
    }

    #[test]
    fn atomic_write_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("doc.json");
        let mut value = BTreeMap::new();
        value.insert("a".to_string(), 1);

        write_json(&path, &value, SaveMode::Atomic).unwrap();

        let back: BTreeMap<String, i32> = read_json(&path).unwrap().unwrap();
        assert_eq!(back, value);
        assert!(!dir.path().join("nested").join("doc.json.tmp").exists());
    }

    #[test]
    fn malformed_document_is_a_schema_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "{ not json").unwrap();
        let result: Result<Option<BTreeMap<String, i32>>> = read_json(&path);
        assert!(matches!(
            result,
            Err(crate::Error::Schema(SchemaError::MalformedDocument { .. }))
        ));
    }
}
