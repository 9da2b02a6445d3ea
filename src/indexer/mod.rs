// Indexer module
// Builds the vector index and document table from a directory of documents


use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use crate::embeddings::Embedder;
use crate::extractor::{DocumentKind, extract_text};
use crate::index::FlatL2Index;
use crate::store::{ArtifactStore, DocumentTable};
use crate::{HealthDocsError, Result};

/// A document whose text has been extracted and is ready to embed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectedDocument {
    pub name: String,
    /// Prefix of `text` returned as the answer payload
    pub snippet: String,
    /// Full text, used for the embedding
    pub text: String,
}

/// Counts from one build run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexingStats {
    pub files_seen: usize,
    pub unsupported_skipped: usize,
    pub empty_skipped: usize,
    pub documents_indexed: usize,
}

/// Output of [`Indexer::build`]: vectors and table in matching order
#[derive(Debug, Clone)]
pub struct BuiltIndex {
    pub index: FlatL2Index,
    pub table: DocumentTable,
    pub stats: IndexingStats,
}

pub struct Indexer {
    embedder: Arc<dyn Embedder>,
    snippet_chars: usize,
}

impl Indexer {
    #[inline]
    pub fn new(embedder: Arc<dyn Embedder>, snippet_chars: usize) -> Self {
        Self {
            embedder,
            snippet_chars,
        }
    }

    /// Extract every supported, non-empty document in `dir`, in filename order.
    ///
    /// Subdirectories are not descended into. An extraction failure aborts the run.
    pub fn collect_documents(&self, dir: &Path) -> Result<(Vec<CollectedDocument>, IndexingStats)> {
        let mut paths: Vec<PathBuf> = fs::read_dir(dir)?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<std::io::Result<_>>()?;
        paths.retain(|p| p.is_file());
        paths.sort();

        let mut stats = IndexingStats {
            files_seen: paths.len(),
            ..IndexingStats::default()
        };

        let bar = if console::user_attended_stderr() {
            ProgressBar::new(paths.len() as u64).with_style(
                ProgressStyle::with_template("{spinner} [{pos}/{len}] Extracting {msg}")
                    .expect("style template is valid"),
            )
        } else {
            ProgressBar::hidden()
        };

        let mut documents = Vec::new();
        for path in paths {
            bar.inc(1);
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            bar.set_message(name.clone());

            if DocumentKind::from_path(&path).is_none() {
                debug!("Skipping unsupported file: {}", path.display());
                stats.unsupported_skipped += 1;
                continue;
            }

            let text = extract_text(&path)?;
            if text.is_empty() {
                debug!("Skipping document with no text: {}", path.display());
                stats.empty_skipped += 1;
                continue;
            }

            documents.push(CollectedDocument {
                snippet: truncate_chars(&text, self.snippet_chars),
                name,
                text,
            });
        }
        bar.finish_and_clear();

        stats.documents_indexed = documents.len();
        Ok((documents, stats))
    }

    /// Build an in-memory index from `dir`. No documents yields an empty index.
    pub fn build(&self, dir: &Path) -> Result<BuiltIndex> {
        info!("Building index from {}", dir.display());

        let (documents, stats) = self.collect_documents(dir)?;
        let mut index = FlatL2Index::new(self.embedder.dimension())?;
        let mut table = DocumentTable::new();

        if documents.is_empty() {
            info!("No indexable documents found in {}", dir.display());
            return Ok(BuiltIndex {
                index,
                table,
                stats,
            });
        }

        let texts: Vec<String> = documents.iter().map(|d| d.text.clone()).collect();
        let vectors = self
            .embedder
            .embed_batch(&texts)
            .map_err(|e| HealthDocsError::Embedding(format!("{e:#}")))?;

        if vectors.len() != documents.len() {
            return Err(HealthDocsError::Embedding(format!(
                "expected {} embeddings, received {}",
                documents.len(),
                vectors.len()
            )));
        }

        index.add(&vectors)?;
        for document in documents {
            table.push(document.name, document.snippet);
        }

        info!(
            "Indexed {} documents ({} unsupported, {} empty)",
            stats.documents_indexed, stats.unsupported_skipped, stats.empty_skipped
        );

        Ok(BuiltIndex {
            index,
            table,
            stats,
        })
    }

    /// Build from `dir` and save the pair.
    ///
    /// An empty build writes nothing and removes any previously saved pair, so
    /// stale documents are never served after a rebuild.
    pub fn build_and_persist(&self, dir: &Path, store: &ArtifactStore) -> Result<BuiltIndex> {
        let built = self.build(dir)?;

        if built.index.is_empty() {
            if store.clear()? {
                info!("Index is empty, removed the previously saved index");
            } else {
                info!("Index is empty, skipping persistence");
            }
            return Ok(built);
        }

        store.save(&built.index, &built.table, self.embedder.model())?;
        Ok(built)
    }
}

/// First `max_chars` characters of `text`
fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => text[..byte_index].to_string(),
        None => text.to_string(),
    }
}
