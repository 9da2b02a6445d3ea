//! Query service context.
//!
//! One [`ServiceContext`] is created at startup and shared by every request
//! handler. It owns the embedder, the read-only index and document table, and
//! the service lifecycle:
//!
//! `Uninitialized -> Loading -> Ready | Empty`, or `Unavailable` when the
//! persisted index cannot be loaded or built. There is no way back to
//! `Loading` short of a restart.


use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::{debug, error, info, warn};

use crate::embeddings::Embedder;
use crate::index::{FlatL2Index, IndexError};
use crate::indexer::Indexer;
use crate::store::{ArtifactStore, DocumentTable};
use crate::{HealthDocsError, config::Config};

pub const NO_DOCUMENTS_ANSWER: &str = "No documents indexed yet.";
pub const NO_MATCH_ANSWER: &str = "No match found.";

/// Neighbours fetched per question
const TOP_K: usize = 1;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Index not available: {0}")]
    Unavailable(String),
    #[error("Service is still loading the index")]
    NotReady,
    #[error("Question must not be empty")]
    InvalidQuestion,
    #[error("Embedding failed: {0}")]
    Embedding(String),
    #[error("Search failed: {0}")]
    Search(#[from] IndexError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceState {
    Uninitialized,
    Loading,
    Ready,
    Empty,
    Unavailable(String),
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uninitialized => write!(f, "uninitialized"),
            Self::Loading => write!(f, "loading"),
            Self::Ready => write!(f, "ready"),
            Self::Empty => write!(f, "empty"),
            Self::Unavailable(_) => write!(f, "unavailable"),
        }
    }
}

/// Result of a question against the index
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    Match {
        answer: String,
        source: String,
        /// Raw squared L2 distance, lower is closer
        score: f32,
    },
    NoMatch,
    NoDocuments,
}

/// Snapshot reported by `/health` and the `status` command
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ServiceStatus {
    pub state: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub documents: usize,
    pub dimension: usize,
    pub model: String,
}

/// How [`ServiceContext::initialize`] finds its index
#[derive(Debug, Clone)]
pub struct StartupOptions {
    pub store: ArtifactStore,
    pub data_dir: PathBuf,
    pub snippet_chars: usize,
    pub build_on_startup: bool,
}

impl StartupOptions {
    #[inline]
    pub fn from_config(config: &Config) -> Self {
        Self {
            store: ArtifactStore::from_config(config),
            data_dir: config.data_dir_path(),
            snippet_chars: config.storage.snippet_chars,
            build_on_startup: config.storage.build_on_startup,
        }
    }
}

#[derive(Debug)]
struct Corpus {
    index: FlatL2Index,
    table: DocumentTable,
}

pub struct ServiceContext {
    embedder: Arc<dyn Embedder>,
    state: Mutex<ServiceState>,
    corpus: OnceLock<Corpus>,
    warmed_up: OnceCell<()>,
}

impl ServiceContext {
    #[inline]
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            state: Mutex::new(ServiceState::Uninitialized),
            corpus: OnceLock::new(),
            warmed_up: OnceCell::new(),
        }
    }

    /// Context serving an index that is already in memory
    pub fn from_parts(embedder: Arc<dyn Embedder>, index: FlatL2Index, table: DocumentTable) -> Self {
        let context = Self::new(embedder);
        let state = context.install(index, table);
        context.set_state(state);
        context
    }

    #[inline]
    pub fn state(&self) -> ServiceState {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_state(&self, state: ServiceState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }

    /// Load the persisted index, or build it from the data directory when absent.
    ///
    /// Never fails: problems leave the service `Unavailable`. Only the first
    /// call does any work; later calls return the current state.
    pub async fn initialize(&self, options: StartupOptions) -> ServiceState {
        {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            if *state != ServiceState::Uninitialized {
                warn!("Service already initialized ({}), ignoring", *state);
                return state.clone();
            }
            *state = ServiceState::Loading;
        }

        let embedder = Arc::clone(&self.embedder);
        let loaded = tokio::task::spawn_blocking(move || load_or_build(embedder, &options))
            .await
            .map_err(|e| HealthDocsError::Other(anyhow::anyhow!("Startup task failed: {e}")))
            .and_then(|result| result);

        let state = match loaded {
            Ok((index, table)) => self.install(index, table),
            Err(e) => {
                error!("Index unavailable: {}", e);
                ServiceState::Unavailable(e.to_string())
            }
        };

        info!("Service state: {}", state);
        self.set_state(state.clone());
        state
    }

    fn install(&self, index: FlatL2Index, table: DocumentTable) -> ServiceState {
        let state = if index.is_empty() {
            ServiceState::Empty
        } else {
            ServiceState::Ready
        };
        if self.corpus.set(Corpus { index, table }).is_err() {
            warn!("Index already installed, keeping the existing one");
        }
        state
    }

    /// Answer a question with the closest document
    pub async fn query(&self, question: &str) -> Result<QueryOutcome, ServiceError> {
        let corpus = match self.state() {
            ServiceState::Uninitialized | ServiceState::Loading => {
                return Err(ServiceError::NotReady);
            }
            ServiceState::Unavailable(reason) => return Err(ServiceError::Unavailable(reason)),
            ServiceState::Empty => return Ok(QueryOutcome::NoDocuments),
            ServiceState::Ready => self
                .corpus
                .get()
                .ok_or_else(|| ServiceError::Unavailable("index missing".to_string()))?,
        };

        if question.trim().is_empty() {
            return Err(ServiceError::InvalidQuestion);
        }

        self.warm_up().await?;

        let embedder = Arc::clone(&self.embedder);
        let text = question.to_string();
        let vector = tokio::task::spawn_blocking(move || embedder.embed(&text))
            .await
            .map_err(|e| ServiceError::Embedding(e.to_string()))?
            .map_err(|e| ServiceError::Embedding(format!("{e:#}")))?;

        let Some(nearest) = corpus.index.search(&vector, TOP_K)?.into_iter().next() else {
            return Ok(QueryOutcome::NoMatch);
        };

        match corpus.table.get(nearest.position) {
            Some(entry) => {
                debug!(
                    "Nearest document {} at distance {}",
                    entry.name, nearest.distance
                );
                Ok(QueryOutcome::Match {
                    answer: entry.snippet.to_string(),
                    source: entry.name.to_string(),
                    score: nearest.distance,
                })
            }
            None => {
                warn!(
                    "Nearest position {} is outside the document table ({} entries)",
                    nearest.position,
                    corpus.table.len()
                );
                Ok(QueryOutcome::NoMatch)
            }
        }
    }

    /// Run the embedder warm-up exactly once, even under concurrent first requests
    async fn warm_up(&self) -> Result<(), ServiceError> {
        self.warmed_up
            .get_or_try_init(|| async {
                let embedder = Arc::clone(&self.embedder);
                info!("Warming up embedding model {}", embedder.model());
                tokio::task::spawn_blocking(move || embedder.warm_up())
                    .await
                    .map_err(|e| ServiceError::Embedding(e.to_string()))?
                    .map_err(|e| ServiceError::Embedding(format!("{e:#}")))
            })
            .await
            .map(|_| ())
    }

    pub fn status(&self) -> ServiceStatus {
        let state = self.state();
        let reason = match &state {
            ServiceState::Unavailable(reason) => Some(reason.clone()),
            _ => None,
        };
        let (documents, dimension) = self
            .corpus
            .get()
            .map_or((0, self.embedder.dimension()), |c| {
                (c.index.ntotal(), c.index.dimension())
            });

        ServiceStatus {
            state: state.to_string(),
            reason,
            documents,
            dimension,
            model: self.embedder.model().to_string(),
        }
    }
}

fn load_or_build(
    embedder: Arc<dyn Embedder>,
    options: &StartupOptions,
) -> Result<(FlatL2Index, DocumentTable), HealthDocsError> {
    if let Some(artifacts) = options.store.load()? {
        if artifacts.index.dimension() != embedder.dimension() {
            return Err(HealthDocsError::Embedding(format!(
                "persisted index has {} dimensions but model '{}' produces {}",
                artifacts.index.dimension(),
                embedder.model(),
                embedder.dimension()
            )));
        }
        if let Some(model) = artifacts.model.as_deref().filter(|m| *m != embedder.model()) {
            warn!(
                "Index was built with model '{}' but queries use '{}'",
                model,
                embedder.model()
            );
        }
        return Ok((artifacts.index, artifacts.table));
    }

    if !options.build_on_startup {
        info!("No persisted index and startup build disabled");
        return Ok((FlatL2Index::new(embedder.dimension())?, DocumentTable::new()));
    }

    info!(
        "No persisted index found, building from {}",
        options.data_dir.display()
    );
    let indexer = Indexer::new(embedder, options.snippet_chars);
    let built = indexer.build_and_persist(&options.data_dir, &options.store)?;
    Ok((built.index, built.table))
}
