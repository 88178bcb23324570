//! Shape loader and in-memory registry
//!
//! - Shape files live at `<shape_dir>/shape_<name>.json`
//! - One declarative shape per file
//! - Registered names are immutable: re-registering is an error

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

use super::errors::{RecordError, RecordResult};
use super::types::RecordShape;

/// Reads shape files from disk and keeps the registry used by the validator.
pub struct ShapeLoader {
    /// Directory containing shape files, if backed by disk
    shape_dir: Option<PathBuf>,
    shapes: BTreeMap<String, Arc<RecordShape>>,
}

impl ShapeLoader {
    /// Creates a loader for shape files under `shape_dir`.
    pub fn new(shape_dir: &Path) -> Self {
        Self {
            shape_dir: Some(shape_dir.to_path_buf()),
            shapes: BTreeMap::new(),
        }
    }

    /// Creates a registry with no backing directory.
    pub fn in_memory() -> Self {
        Self {
            shape_dir: None,
            shapes: BTreeMap::new(),
        }
    }

    pub fn shape_dir(&self) -> Option<&Path> {
        self.shape_dir.as_deref()
    }

    /// Loads every `*.json` file from the shape directory.
    ///
    /// A missing directory is created; a malformed file aborts the load.
    /// Returns the number of shapes loaded.
    pub fn load_all(&mut self) -> RecordResult<usize> {
        let Some(dir) = self.shape_dir.clone() else {
            return Ok(0);
        };

        if !dir.exists() {
            fs::create_dir_all(&dir).map_err(|e| {
                RecordError::malformed_shape(
                    dir.display().to_string(),
                    format!("Failed to create shape directory: {}", e),
                )
            })?;
            return Ok(0);
        }

        let entries = fs::read_dir(&dir).map_err(|e| {
            RecordError::malformed_shape(
                dir.display().to_string(),
                format!("Failed to read shape directory: {}", e),
            )
        })?;

        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| {
                RecordError::malformed_shape(
                    dir.display().to_string(),
                    format!("Failed to read directory entry: {}", e),
                )
            })?;
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                paths.push(path);
            }
        }
        // Directory order is platform-dependent.
        paths.sort();

        for path in &paths {
            self.load_shape_file(path)?;
        }

        info!(dir = %dir.display(), count = paths.len(), "loaded shape files");
        Ok(paths.len())
    }

    /// Loads a single shape file.
    pub fn load_shape_file(&mut self, path: &Path) -> RecordResult<()> {
        let content = fs::read_to_string(path).map_err(|e| {
            RecordError::malformed_shape(
                path.display().to_string(),
                format!("Failed to read file: {}", e),
            )
        })?;

        let shape: RecordShape = serde_json::from_str(&content).map_err(|e| {
            RecordError::malformed_shape(path.display().to_string(), format!("Invalid JSON: {}", e))
        })?;

        shape
            .validate_structure()
            .map_err(|e| RecordError::malformed_shape(path.display().to_string(), e))?;

        self.insert(Arc::new(shape))
    }

    /// Registers a shape built in code.
    pub fn register(&mut self, shape: RecordShape) -> RecordResult<()> {
        self.register_shared(Arc::new(shape))
    }

    /// Registers an already shared shape.
    pub fn register_shared(&mut self, shape: Arc<RecordShape>) -> RecordResult<()> {
        shape
            .validate_structure()
            .map_err(|e| RecordError::malformed_shape("<in-memory>", e))?;
        self.insert(shape)
    }

    fn insert(&mut self, shape: Arc<RecordShape>) -> RecordResult<()> {
        if self.shapes.contains_key(&shape.name) {
            warn!(shape = %shape.name, "rejected duplicate shape registration");
            return Err(RecordError::ShapeAlreadyRegistered(shape.name.clone()));
        }
        self.shapes.insert(shape.name.clone(), shape);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Arc<RecordShape>> {
        self.shapes.get(name)
    }

    pub fn exists(&self, name: &str) -> bool {
        self.shapes.contains_key(name)
    }

    /// Registered names in sorted order.
    pub fn shape_names(&self) -> impl Iterator<Item = &str> {
        self.shapes.keys().map(String::as_str)
    }

    pub fn all_shapes(&self) -> impl Iterator<Item = &Arc<RecordShape>> {
        self.shapes.values()
    }

    pub fn shape_count(&self) -> usize {
        self.shapes.len()
    }

    /// Writes the declarative part of `shape` to the shape directory.
    ///
    /// Refuses to overwrite an existing file.
    pub fn save_shape(&self, shape: &RecordShape) -> RecordResult<PathBuf> {
        let dir = self.shape_dir.as_ref().ok_or_else(|| {
            RecordError::malformed_shape(&shape.name, "loader has no shape directory")
        })?;
        let path = dir.join(format!("shape_{}.json", shape.name));

        if path.exists() {
            return Err(RecordError::ShapeAlreadyRegistered(shape.name.clone()));
        }

        if !dir.exists() {
            fs::create_dir_all(dir).map_err(|e| {
                RecordError::malformed_shape(
                    dir.display().to_string(),
                    format!("Failed to create shape directory: {}", e),
                )
            })?;
        }

        let content = serde_json::to_string_pretty(shape).map_err(|e| {
            RecordError::malformed_shape(
                path.display().to_string(),
                format!("Failed to serialize shape: {}", e),
            )
        })?;

        fs::write(&path, content).map_err(|e| {
            RecordError::malformed_shape(
                path.display().to_string(),
                format!("Failed to write file: {}", e),
            )
        })?;

        Ok(path)
    }
}
