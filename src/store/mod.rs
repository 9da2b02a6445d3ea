// Artifact store module
// Persists the vector index and its document table as one paired unit


use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::index::{FlatL2Index, IndexError};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid index file {path}: {source}")]
    Index {
        path: PathBuf,
        #[source]
        source: IndexError,
    },
    #[error("Invalid metadata file {path}: {source}")]
    Metadata {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Document table is inconsistent: {docs} snippets but {names} names")]
    TableLengthMismatch { docs: usize, names: usize },
    #[error("Index holds {index} vectors but the document table has {table} entries")]
    CountMismatch { index: usize, table: usize },
    #[error("Index and metadata files are out of sync: {0}")]
    Desync(String),
}

/// Snippets and filenames in vector position order.
///
/// Serialized as `{"docs": [...], "names": [...]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentTable {
    pub docs: Vec<String>,
    pub names: Vec<String>,
}

/// Borrowed view of one table row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentEntry<'a> {
    pub name: &'a str,
    pub snippet: &'a str,
}

impl DocumentTable {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn push(&mut self, name: String, snippet: String) {
        self.names.push(name);
        self.docs.push(snippet);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.docs.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    /// Entry at a vector position, `None` when out of range
    #[inline]
    pub fn get(&self, position: usize) -> Option<DocumentEntry<'_>> {
        Some(DocumentEntry {
            name: self.names.get(position)?,
            snippet: self.docs.get(position)?,
        })
    }

    fn validate(&self) -> Result<(), StoreError> {
        if self.docs.len() != self.names.len() {
            return Err(StoreError::TableLengthMismatch {
                docs: self.docs.len(),
                names: self.names.len(),
            });
        }
        Ok(())
    }
}

/// Identifies the exact index file a metadata file was written with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexFingerprint {
    pub ntotal: usize,
    pub dimension: usize,
    pub checksum: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct MetadataFile {
    docs: Vec<String>,
    names: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    index: Option<IndexFingerprint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    built_at: Option<DateTime<Utc>>,
}

/// Everything read back by [`ArtifactStore::load`]
#[derive(Debug, Clone)]
pub struct LoadedArtifacts {
    pub index: FlatL2Index,
    pub table: DocumentTable,
    /// Embedding model recorded at build time, absent for legacy files
    pub model: Option<String>,
    pub built_at: Option<DateTime<Utc>>,
}

/// Location of the index file and its metadata side file
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    index_path: PathBuf,
    metadata_path: PathBuf,
}

impl ArtifactStore {
    #[inline]
    pub fn new(index_path: impl Into<PathBuf>, metadata_path: impl Into<PathBuf>) -> Self {
        Self {
            index_path: index_path.into(),
            metadata_path: metadata_path.into(),
        }
    }

    #[inline]
    pub fn from_config(config: &crate::config::Config) -> Self {
        Self::new(config.index_path(), config.metadata_path())
    }

    #[inline]
    pub fn index_path(&self) -> &Path {
        &self.index_path
    }

    #[inline]
    pub fn metadata_path(&self) -> &Path {
        &self.metadata_path
    }

    /// Whether both files of the pair are present
    #[inline]
    pub fn exists(&self) -> bool {
        self.index_path.is_file() && self.metadata_path.is_file()
    }

    /// Write the index and its table.
    ///
    /// Each file is written to a temporary sibling and renamed into place.
    /// The metadata goes last and records a fingerprint of the index bytes, so
    /// an interrupted save is detected by [`ArtifactStore::load`].
    pub fn save(
        &self,
        index: &FlatL2Index,
        table: &DocumentTable,
        model: &str,
    ) -> Result<IndexFingerprint, StoreError> {
        table.validate()?;
        if index.ntotal() != table.len() {
            return Err(StoreError::CountMismatch {
                index: index.ntotal(),
                table: table.len(),
            });
        }

        let bytes = index.to_bytes();
        let fingerprint = IndexFingerprint {
            ntotal: index.ntotal(),
            dimension: index.dimension(),
            checksum: crc32fast::hash(&bytes),
        };

        let metadata = MetadataFile {
            docs: table.docs.clone(),
            names: table.names.clone(),
            index: Some(fingerprint),
            model: Some(model.to_string()),
            built_at: Some(Utc::now()),
        };
        let json = serde_json::to_vec_pretty(&metadata).map_err(|source| StoreError::Metadata {
            path: self.metadata_path.clone(),
            source,
        })?;

        write_atomic(&self.index_path, &bytes)?;
        write_atomic(&self.metadata_path, &json)?;

        info!(
            "Saved index with {} vectors to {} (checksum {:#010x})",
            fingerprint.ntotal,
            self.index_path.display(),
            fingerprint.checksum
        );
        Ok(fingerprint)
    }

    /// Remove both files of the pair. Files that are already gone are ignored.
    ///
    /// The metadata goes first so an interrupted clear never leaves a loadable pair.
    pub fn clear(&self) -> Result<bool, StoreError> {
        let mut removed = false;
        for path in [&self.metadata_path, &self.index_path] {
            match fs::remove_file(path) {
                Ok(()) => {
                    debug!("Removed {}", path.display());
                    removed = true;
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(source) => {
                    return Err(StoreError::Io {
                        path: path.clone(),
                        source,
                    });
                }
            }
        }
        Ok(removed)
    }

    /// Read the pair back. `Ok(None)` when either file is missing.
    pub fn load(&self) -> Result<Option<LoadedArtifacts>, StoreError> {
        if !self.index_path.is_file() || !self.metadata_path.is_file() {
            debug!(
                "No persisted index at {} / {}",
                self.index_path.display(),
                self.metadata_path.display()
            );
            return Ok(None);
        }

        let bytes = fs::read(&self.index_path).map_err(|source| StoreError::Io {
            path: self.index_path.clone(),
            source,
        })?;
        let checksum = crc32fast::hash(&bytes);
        let index = FlatL2Index::from_bytes(&bytes).map_err(|source| StoreError::Index {
            path: self.index_path.clone(),
            source,
        })?;

        let json = fs::read(&self.metadata_path).map_err(|source| StoreError::Io {
            path: self.metadata_path.clone(),
            source,
        })?;
        let metadata: MetadataFile =
            serde_json::from_slice(&json).map_err(|source| StoreError::Metadata {
                path: self.metadata_path.clone(),
                source,
            })?;

        let table = DocumentTable {
            docs: metadata.docs,
            names: metadata.names,
        };
        table.validate()?;

        match metadata.index {
            Some(expected) => {
                let actual = IndexFingerprint {
                    ntotal: index.ntotal(),
                    dimension: index.dimension(),
                    checksum,
                };
                if expected != actual {
                    return Err(StoreError::Desync(format!(
                        "metadata expects {expected:?}, index file is {actual:?}"
                    )));
                }
            }
            None => {
                warn!(
                    "Metadata file {} has no index fingerprint, checking counts only",
                    self.metadata_path.display()
                );
            }
        }

        if index.ntotal() != table.len() {
            return Err(StoreError::Desync(format!(
                "index holds {} vectors, table has {} entries",
                index.ntotal(),
                table.len()
            )));
        }

        info!(
            "Loaded index with {} vectors ({} dimensions) from {}",
            index.ntotal(),
            index.dimension(),
            self.index_path.display()
        );

        Ok(Some(LoadedArtifacts {
            index,
            table,
            model: metadata.model,
            built_at: metadata.built_at,
        }))
    }
}

fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), StoreError> {
    let io_error = |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_error)?;
    }

    let mut tmp_name = path.as_os_str().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);

    fs::write(&tmp_path, contents).map_err(io_error)?;
    fs::rename(&tmp_path, path).map_err(io_error)?;
    Ok(())
}
