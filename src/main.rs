use anyhow::{Context, Result};
use axum::Router;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::{io::ErrorKind, path::Path, str::FromStr, sync::Arc};
use tokio::{fs, net::TcpListener};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

mod config;
mod errors;
mod handlers;
mod models;
mod routes;
mod services;
mod state;

use services::{
    disk_blob_store::{DiskBlobStore, validate_bucket_name, validate_object_key},
    metadata_store::SqliteMetadataStore,
    qr_service::{QrService, QrSettings},
    renderer::StyledQrRenderer,
    url_signer::UrlSigner,
};

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // --- Parse config + migrate flag ---
    let (cfg, migrate) = config::AppConfig::from_env_and_args()?;

    tracing::info!(
        "Starting qr-store: addr={} storage_dir={} database_url={} bucket={} folder={} table={} public_url={}",
        cfg.addr(),
        cfg.storage_dir,
        cfg.database_url,
        cfg.bucket_name,
        cfg.folder_name,
        cfg.table_name,
        cfg.public_url
    );

    validate_bucket_name(&cfg.bucket_name).context("QR_STORE_BUCKET_NAME")?;
    validate_object_key(&cfg.folder_name).context("QR_STORE_FOLDER_NAME")?;

    // --- Ensure storage directory exists ---
    if !Path::new(&cfg.storage_dir).exists() {
        fs::create_dir_all(&cfg.storage_dir).await?;
        tracing::info!("Created storage directory at {}", cfg.storage_dir);
    }

    // --- Initialize SQLite connection ---
    let db_url = &cfg.database_url;
    tracing::debug!("Connecting using raw URL => {}", db_url);

    let db_path = db_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("file:");
    if let Some(parent) = Path::new(db_path).parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).await?;
            tracing::info!("Created missing directory {:?}", parent);
        }
    }

    let options = SqliteConnectOptions::from_str(db_url)
        .with_context(|| format!("parsing database URL `{}`", db_url))?
        .create_if_missing(true);
    let db = Arc::new(
        SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?,
    );

    let metadata = SqliteMetadataStore::new(db);
    metadata.ensure_table(&cfg.table_name).await?;

    // --- Handle migration mode ---
    if migrate {
        tracing::info!("Database migration complete.");
        return Ok(()); // exit after migration
    }

    // --- Initialize collaborators ---
    let signing_key = match &cfg.signing_key {
        Some(key) => key.as_bytes().to_vec(),
        None => {
            tracing::warn!(
                "QR_STORE_SIGNING_KEY not set; download links will not survive a restart"
            );
            [Uuid::new_v4().into_bytes(), Uuid::new_v4().into_bytes()].concat()
        }
    };
    let blobs = DiskBlobStore::new(
        &cfg.storage_dir,
        UrlSigner::new(&signing_key, &cfg.public_url)
            .with_context(|| format!("configuring signed urls for {}", cfg.public_url))?,
    );

    let logo = StyledQrRenderer::load_logo(&cfg.logo_path)
        .with_context(|| format!("loading logo {}", cfg.logo_path.display()))?;
    if logo.is_none() {
        tracing::warn!(
            "Logo {} not found; codes will render without it",
            cfg.logo_path.display()
        );
    }

    let qr = QrService::new(
        Arc::new(StyledQrRenderer::new(logo)),
        Arc::new(blobs.clone()),
        Arc::new(metadata.clone()),
        QrSettings {
            bucket: cfg.bucket_name.clone(),
            folder: cfg.folder_name.clone(),
            table: cfg.table_name.clone(),
        },
    );

    // --- Build router ---
    let app: Router = routes::routes::routes().with_state(state::AppState {
        qr,
        blobs,
        metadata,
    });

    // --- Start server ---
    let addr = cfg.addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(cfg.host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", cfg.port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr).await?
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!("Server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
