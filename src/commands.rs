use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::embeddings::{Embedder, OllamaClient};
use crate::indexer::Indexer;
use crate::server;
use crate::service::{QueryOutcome, ServiceContext, ServiceState, StartupOptions};
use crate::store::ArtifactStore;

fn embedder_from_config(config: &Config) -> Result<Arc<dyn Embedder>> {
    let client = OllamaClient::new(config).context("Failed to create Ollama client")?;
    let embedder: Arc<dyn Embedder> = Arc::new(client);
    Ok(embedder)
}

/// Rebuild the index from the data directory and persist it
#[inline]
pub async fn build_index(config: &Config) -> Result<()> {
    let data_dir = config.data_dir_path();
    let store = ArtifactStore::from_config(config);
    let embedder = embedder_from_config(config)?;

    println!("Indexing documents in {}", data_dir.display());

    let warm = Arc::clone(&embedder);
    tokio::task::spawn_blocking(move || warm.warm_up())
        .await
        .context("Embedding health check task failed")?
        .context("Embedding model is not reachable")?;

    let indexer = Indexer::new(embedder, config.storage.snippet_chars);
    let persist_store = store.clone();
    let built = tokio::task::spawn_blocking(move || {
        indexer.build_and_persist(&data_dir, &persist_store)
    })
    .await
    .context("Indexing task failed")?
    .context("Failed to build index")?;

    let stats = &built.stats;
    println!("Indexing completed!");
    println!("  Files seen: {}", stats.files_seen);
    println!("  Documents indexed: {}", stats.documents_indexed);
    println!("  Unsupported files skipped: {}", stats.unsupported_skipped);
    println!("  Empty documents skipped: {}", stats.empty_skipped);

    if built.index.is_empty() {
        println!("No documents found, any previous index was removed.");
    } else {
        println!("  Index: {}", store.index_path().display());
        println!("  Metadata: {}", store.metadata_path().display());
    }

    Ok(())
}

/// Load or build the index, then serve HTTP until interrupted
#[inline]
pub async fn serve(config: &Config) -> Result<()> {
    let embedder = embedder_from_config(config)?;
    let context = Arc::new(ServiceContext::new(embedder));

    match context
        .initialize(StartupOptions::from_config(config))
        .await
    {
        ServiceState::Ready => info!("Index ready with {} documents", context.status().documents),
        ServiceState::Empty => warn!("No documents indexed, queries will return a placeholder"),
        ServiceState::Unavailable(reason) => {
            error!("Serving in degraded mode: {}", reason);
        }
        other => warn!("Unexpected service state after startup: {}", other),
    }

    let address = config.server.bind_address();
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;

    let router = server::create_router(context, config.static_dir_path());
    server::serve(listener, router).await?;

    info!("Server stopped");
    Ok(())
}

/// Answer a single question from the persisted index
#[inline]
pub async fn query_once(config: &Config, question: &str) -> Result<()> {
    let embedder = embedder_from_config(config)?;
    let context = ServiceContext::new(embedder);

    let options = StartupOptions {
        build_on_startup: false,
        ..StartupOptions::from_config(config)
    };
    if let ServiceState::Unavailable(reason) = context.initialize(options).await {
        println!("Index not available: {}", reason);
        println!("Run 'healthdocs index' to rebuild it.");
        return Ok(());
    }

    match context.query(question).await? {
        QueryOutcome::Match {
            answer,
            source,
            score,
        } => {
            println!("📄 {} (distance {:.4})", source, score);
            println!();
            println!("{}", answer);
        }
        QueryOutcome::NoMatch => println!("{}", crate::service::NO_MATCH_ANSWER),
        QueryOutcome::NoDocuments => {
            println!("{}", crate::service::NO_DOCUMENTS_ANSWER);
            println!("Run 'healthdocs index' after adding documents.");
        }
    }

    Ok(())
}

/// Report configuration, embedding server and artifact status
#[inline]
pub async fn show_status(config: &Config) -> Result<()> {
    println!("📊 Healthdocs Status Report");
    println!("{}", "=".repeat(50));
    println!();

    println!("📁 Documents:");
    let data_dir = config.data_dir_path();
    println!("   Directory: {}", data_dir.display());
    match std::fs::read_dir(&data_dir) {
        Ok(entries) => {
            let files = entries
                .filter_map(|e| e.ok())
                .filter(|e| e.path().is_file())
                .count();
            println!("   ✅ {} files", files);
        }
        Err(e) => println!("   ❌ Not readable - {}", e),
    }
    println!();

    println!("🤖 Ollama Status:");
    match OllamaClient::new(config) {
        Ok(client) => {
            let health = tokio::task::spawn_blocking(move || client.health_check())
                .await
                .context("Health check task failed")?;
            match health {
                Ok(()) => {
                    println!("   ✅ Ollama: Connected ({})", config.ollama.host);
                    println!("   📋 Model: {}", config.ollama.model);
                    println!("   🔢 Dimension: {}", config.ollama.embedding_dimension);
                }
                Err(e) => println!("   ⚠️  Ollama: Unhealthy - {}", e),
            }
        }
        Err(e) => println!("   ❌ Ollama: Failed to configure client - {}", e),
    }
    println!();

    println!("🔍 Index Status:");
    let store = ArtifactStore::from_config(config);
    println!("   Index: {}", store.index_path().display());
    println!("   Metadata: {}", store.metadata_path().display());
    match store.load() {
        Ok(Some(artifacts)) => {
            println!("   ✅ Index and metadata are consistent");
            println!("   📚 Documents: {}", artifacts.index.ntotal());
            println!("   🔢 Dimension: {}", artifacts.index.dimension());
            if let Some(model) = &artifacts.model {
                println!("   📋 Built with: {}", model);
                if *model != config.ollama.model {
                    println!(
                        "   ⚠️  Configured model differs ({}), rebuild recommended",
                        config.ollama.model
                    );
                }
            }
            if let Some(built_at) = artifacts.built_at {
                println!("   🕒 Built: {}", built_at.format("%Y-%m-%d %H:%M:%S UTC"));
            }
        }
        Ok(None) => println!("   💤 No index built yet"),
        Err(e) => println!("   ❌ Unusable - {}", e),
    }

    Ok(())
}
