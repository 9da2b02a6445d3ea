#![expect(
    clippy::tests_outside_test_module,
    reason = "integration tests are only compiled in test mode"
)]

// Integration tests that require a local Ollama instance with an embedding model pulled
// Run with: cargo test --test integration_ollama -- --ignored

use healthdocs::config::{Config, OllamaConfig};
use healthdocs::embeddings::{Embedder, OllamaClient};
use healthdocs::indexer::Indexer;
use healthdocs::store::ArtifactStore;
use std::env;
use std::fs;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tracing::info;

const TEST_MODEL: &str = "all-minilm:latest";
const TEST_DIMENSION: u32 = 384;
const DEFAULT_OLLAMA_HOST: &str = "localhost";
const DEFAULT_OLLAMA_PORT: u16 = 11434;

fn live_config() -> Config {
    let host = env::var("OLLAMA_HOST").unwrap_or_else(|_| DEFAULT_OLLAMA_HOST.to_string());
    let port = env::var("OLLAMA_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(DEFAULT_OLLAMA_PORT);
    let model = env::var("OLLAMA_MODEL").unwrap_or_else(|_| TEST_MODEL.to_string());
    let embedding_dimension = env::var("OLLAMA_DIMENSION")
        .ok()
        .and_then(|d| d.parse().ok())
        .unwrap_or(TEST_DIMENSION);

    Config {
        ollama: OllamaConfig {
            host,
            port,
            model,
            batch_size: 4,
            embedding_dimension,
            ..OllamaConfig::default()
        },
        ..Config::default()
    }
}

fn create_integration_test_client(config: &Config) -> OllamaClient {
    OllamaClient::new(config)
        .expect("Failed to create Ollama client")
        .with_timeout(Duration::from_secs(60))
        .with_retry_attempts(3)
}

fn init_test_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter("debug")
        .with_test_writer()
        .try_init()
        .ok();
}

#[test]
#[ignore = "requires a local Ollama instance"]
fn real_ollama_health_check() {
    init_test_tracing();
    let client = create_integration_test_client(&live_config());

    let result = client.health_check();
    assert!(
        result.is_ok(),
        "Health check should succeed with local Ollama: {:?}",
        result
    );
}

#[test]
#[ignore = "requires a local Ollama instance"]
fn real_ollama_embeddings_have_configured_dimension() {
    init_test_tracing();
    let config = live_config();
    let client = create_integration_test_client(&config);

    let texts = vec![
        "diabetes management guide".to_string(),
        "cardiac surgery protocol".to_string(),
    ];
    let embeddings = client
        .generate_embeddings_batch(&texts)
        .expect("should embed");

    assert_eq!(embeddings.len(), 2);
    for embedding in &embeddings {
        assert_eq!(embedding.len(), config.ollama.embedding_dimension as usize);
    }
    info!("Generated {} embeddings", embeddings.len());
}

#[test]
#[ignore = "requires a local Ollama instance"]
fn real_ollama_index_finds_relevant_document() {
    init_test_tracing();
    let temp_dir = TempDir::new().expect("should create temp dir");
    let docs = temp_dir.path().join("docs");
    fs::create_dir(&docs).expect("should create docs dir");
    fs::write(
        docs.join("a.txt"),
        "Diabetes management guide: monitor blood glucose and adjust insulin doses.",
    )
    .expect("should write");
    fs::write(
        docs.join("b.txt"),
        "Cardiac surgery protocol: pre-operative assessment and post-operative care.",
    )
    .expect("should write");

    let config = live_config();
    let embedder: Arc<dyn Embedder> = Arc::new(create_integration_test_client(&config));
    let store = ArtifactStore::new(
        temp_dir.path().join("index.hdix"),
        temp_dir.path().join("docs.json"),
    );
    let built = Indexer::new(Arc::clone(&embedder), 1000)
        .build_and_persist(&docs, &store)
        .expect("should build");
    assert_eq!(built.index.ntotal(), 2);

    let query = embedder
        .embed("How do I keep my blood sugar under control?")
        .expect("should embed question");
    let nearest = built.index.search(&query, 1).expect("should search");
    let entry = built
        .table
        .get(nearest[0].position)
        .expect("position should be in table");
    assert_eq!(entry.name, "a.txt");
}
