use thiserror::Error;

pub type Result<T> = std::result::Result<T, HealthDocsError>;

#[derive(Error, Debug)]
pub enum HealthDocsError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Extraction error: {0}")]
    Extraction(#[from] extractor::ExtractionError),

    #[error("Index error: {0}")]
    Index(#[from] index::IndexError),

    #[error("Storage error: {0}")]
    Store(#[from] store::StoreError),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Service error: {0}")]
    Service(#[from] service::ServiceError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

pub mod commands;
pub mod config;
pub mod embeddings;
pub mod extractor;
pub mod index;
pub mod indexer;
pub mod server;
pub mod service;
pub mod store;
