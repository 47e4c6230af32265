use anyhow::{Context, Result};
use clap::Parser;
use docrubric::{
    api::{self, AppState},
    config::{self, Config},
    documents::{DocumentLookup, SqliteDocumentStore},
    embedding::get_embedding_client,
    evaluation::{EvaluationWorker, RubricCatalog, WorkerSettings},
    evaluator::OllamaEvaluatorClient,
    extract::PdfTextExtractor,
    ingestion::{IngestionDeps, IngestionService, IngestionSettings},
    logging,
    metrics::PipelineMetrics,
    qdrant::{QdrantService, VectorIndex},
    storage::{Credentials, S3ObjectStore},
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;

#[derive(Parser)]
#[command(
    name = "docrubric",
    about = "Document ingestion and rubric evaluation server"
)]
struct Cli {
    /// Port to listen on; overrides SERVER_PORT.
    #[arg(long)]
    port: Option<u16>,
    /// Extra dotenv file loaded before the environment is read.
    #[arg(long)]
    env_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    if let Some(path) = &cli.env_file {
        dotenvy::from_path(path)
            .with_context(|| format!("Failed to load env file {}", path.display()))?;
    }
    logging::init_tracing();
    let config = config::init_config().context("Failed to load configuration")?;

    let state = build_state(config).await?;
    let app = api::create_router(state);

    let (listener, port) = bind_listener(cli.port.or(config.server_port))
        .await
        .context("Failed to bind listener")?;
    tracing::info!("Listening on http://0.0.0.0:{}", port);
    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}

async fn build_state(config: &Config) -> Result<AppState> {
    let metrics = Arc::new(PipelineMetrics::new());

    let index = Arc::new(
        QdrantService::new(
            &config.qdrant_url,
            config.qdrant_api_key.clone(),
            config.qdrant_collection_name.clone(),
        )
        .context("Failed to create Qdrant client")?,
    );
    index
        .ensure_collection(config.embedding_dimension as u64)
        .await
        .context("Failed to ensure Qdrant collection exists")?;

    let objects = Arc::new(
        S3ObjectStore::new(
            &config.object_store_url,
            Credentials {
                access_key: config.object_store_access_key.clone(),
                secret_key: config.object_store_secret_key.clone(),
                region: config.object_store_region.clone(),
            },
        )
        .context("Failed to create object store client")?,
    );

    let documents = Arc::new(
        SqliteDocumentStore::open(&config.database_path).with_context(|| {
            format!("Failed to open database {}", config.database_path.display())
        })?,
    );

    let lookup = DocumentLookup::new(
        index.clone(),
        objects.clone(),
        config.object_store_bucket.clone(),
        config.presign_ttl,
    );
    let (worker, _worker_handle) = EvaluationWorker::spawn(
        lookup.clone(),
        Arc::new(OllamaEvaluatorClient::new(
            config.ollama_url.clone(),
            config.evaluator_model.clone(),
        )),
        Arc::new(RubricCatalog::default()),
        metrics.clone(),
        WorkerSettings {
            queue_capacity: config.job_queue_capacity,
            evaluation_timeout: config.evaluation_timeout,
            status_retention: config.status_retention,
        },
    );

    let ingestion = IngestionService::new(
        IngestionDeps {
            objects,
            extractor: Arc::new(PdfTextExtractor::new()),
            embedder: get_embedding_client(config),
            documents,
            index,
        },
        IngestionSettings {
            bucket: config.object_store_bucket.clone(),
            embedding_dimension: config.embedding_dimension,
        },
        metrics.clone(),
    );

    Ok(AppState {
        ingestion: Arc::new(ingestion),
        lookup,
        worker,
        metrics,
        enqueue_timeout: config.enqueue_timeout,
    })
}

async fn bind_listener(port: Option<u16>) -> Result<(TcpListener, u16), std::io::Error> {
    use std::net::Ipv4Addr;

    if let Some(port) = port {
        return TcpListener::bind((Ipv4Addr::UNSPECIFIED, port))
            .await
            .map(|listener| (listener, port));
    }

    const PORT_RANGE: std::ops::RangeInclusive<u16> = 4100..=4199;
    for port in PORT_RANGE {
        match TcpListener::bind((Ipv4Addr::UNSPECIFIED, port)).await {
            Ok(listener) => {
                tracing::debug!(port, "Bound server port");
                return Ok((listener, port));
            }
            Err(err) if err.kind() == std::io::ErrorKind::AddrInUse => {
                tracing::debug!(port, "Port already in use; trying next");
                continue;
            }
            Err(err) => return Err(err),
        }
    }

    Err(std::io::Error::new(
        std::io::ErrorKind::AddrNotAvailable,
        "No available port found in range 4100-4199",
    ))
}
