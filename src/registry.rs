//! The processed-files registry: the only durable checkpoint of a run.
//!
//! Stored as a pretty-printed JSON array of filenames. It is loaded once at
//! startup and rewritten after every attempted document, so a crash loses at
//! most the document that was in flight. Writes go through a temp file in the
//! same directory followed by a rename, so a crash mid-write leaves the
//! previous registry intact.

use crate::error::Pdf2NoteError;
use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Registry file name inside the output directory.
pub const REGISTRY_FILE: &str = "processed_files.json";

/// Ordered set of document filenames already attempted.
#[derive(Debug, Clone)]
pub struct ProcessedRegistry {
    path: PathBuf,
    names: Vec<String>,
    index: HashSet<String>,
}

impl ProcessedRegistry {
    /// Load the registry at `path`. A missing file is an empty registry.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, Pdf2NoteError> {
        let path = path.into();
        let names: Vec<String> = match std::fs::read_to_string(&path) {
            Ok(raw) if raw.trim().is_empty() => Vec::new(),
            Ok(raw) => serde_json::from_str(&raw).map_err(|e| Pdf2NoteError::RegistryLoad {
                path: path.clone(),
                detail: e.to_string(),
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                return Err(Pdf2NoteError::RegistryLoad {
                    path,
                    detail: e.to_string(),
                })
            }
        };

        let mut registry = Self {
            path,
            names: Vec::with_capacity(names.len()),
            index: HashSet::with_capacity(names.len()),
        };
        for name in names {
            registry.insert(name);
        }
        debug!(
            "Loaded registry {} ({} entries)",
            registry.path.display(),
            registry.len()
        );
        Ok(registry)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Entries in the order they were first recorded.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Add `name` and write the registry to disk immediately.
    ///
    /// Recording a name that is already present still rewrites the file but
    /// never duplicates the entry.
    pub fn record(&mut self, name: &str) -> Result<(), Pdf2NoteError> {
        self.insert(name.to_string());
        self.persist()
    }

    fn insert(&mut self, name: String) {
        if self.index.insert(name.clone()) {
            self.names.push(name);
        }
    }

    /// Atomically rewrite the registry file.
    pub fn persist(&self) -> Result<(), Pdf2NoteError> {
        let write_err = |source| Pdf2NoteError::RegistryWrite {
            path: self.path.clone(),
            source,
        };
        let json = serde_json::to_string_pretty(&self.names)
            .map_err(|e| Pdf2NoteError::Internal(format!("registry encode: {e}")))?;

        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir).map_err(write_err)?;

        let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(write_err)?;
        tmp.write_all(json.as_bytes()).map_err(write_err)?;
        tmp.persist(&self.path).map_err(|e| write_err(e.error))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let reg = ProcessedRegistry::load(dir.path().join(REGISTRY_FILE)).unwrap();
        assert!(reg.is_empty());
    }

    #[test]
    fn record_persists_immediately() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(REGISTRY_FILE);

        let mut reg = ProcessedRegistry::load(&path).unwrap();
        reg.record("a.pdf").unwrap();
        reg.record("b.pdf").unwrap();

        let on_disk: Vec<String> =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(on_disk, vec!["a.pdf", "b.pdf"]);

        let reloaded = ProcessedRegistry::load(&path).unwrap();
        assert!(reloaded.contains("a.pdf"));
        assert!(reloaded.contains("b.pdf"));
        assert!(!reloaded.contains("c.pdf"));
    }

    #[test]
    fn recording_twice_does_not_duplicate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(REGISTRY_FILE);
        let mut reg = ProcessedRegistry::load(&path).unwrap();
        reg.record("a.pdf").unwrap();
        reg.record("a.pdf").unwrap();
        assert_eq!(reg.names(), &["a.pdf".to_string()]);
    }

    #[test]
    fn duplicate_entries_on_disk_collapse() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(REGISTRY_FILE);
        std::fs::write(&path, r#"["a.pdf", "b.pdf", "a.pdf"]"#).unwrap();
        let reg = ProcessedRegistry::load(&path).unwrap();
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn corrupt_registry_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(REGISTRY_FILE);
        std::fs::write(&path, "{not json").unwrap();
        let err = ProcessedRegistry::load(&path).unwrap_err();
        assert!(matches!(err, Pdf2NoteError::RegistryLoad { .. }));
    }
}
