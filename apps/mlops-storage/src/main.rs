//! Template flow
//!
//! Shows how a training step stores a checkpoint in the cloud and fetches
//! it back. Replace the training placeholder with your own model code.

use anyhow::Context;
use chrono::Utc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use mlops_storage::{StorageClient, StorageConfig};

const FLOW_NAME: &str = "TemplateFlow";
const DEFAULT_FLOW_CONFIG: &str = "./example_config.json";
const LOCAL_CHECKPOINT: &str = "example_filename.txt";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env before tracing so RUST_LOG can live there too
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "mlops_storage=debug,template_flow=info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = StorageConfig::from_env().context("Failed to load storage config from env")?;

    tracing::info!("Starting {} v{}", FLOW_NAME, env!("CARGO_PKG_VERSION"));
    tracing::info!("Storage project: {}", config.project);
    tracing::info!("Storage bucket: {}", config.bucket);

    log_flow_config().await;

    let storage_client = StorageClient::from_config(&config)
        .await
        .context("Failed to initialize storage client")?;

    tracing::info!("All set. Running training.");
    // Model training goes here

    let run_id = format!(
        "{}-{}",
        Utc::now().format("%Y%m%d%H%M%S"),
        &Uuid::new_v4().simple().to_string()[..8]
    );
    let remote_path = format!("{FLOW_NAME}/{run_id}/{LOCAL_CHECKPOINT}");

    // Store a checkpoint in the cloud
    let example_blob = vec![1u8, 2, 3, 4, 5];
    storage_client
        .store(example_blob, &remote_path)
        .await
        .context("Failed to store checkpoint")?;

    // Fetch it back
    storage_client
        .fetch(&remote_path, LOCAL_CHECKPOINT)
        .await
        .context("Failed to fetch checkpoint")?;

    println!("Flow complete.\n\nSee artifacts at {}/{}.", config.bucket, remote_path);
    Ok(())
}

/// Log `example_key` from the flow's JSON config, if one is present.
async fn log_flow_config() {
    let path = std::env::var("FLOW_CONFIG").unwrap_or_else(|_| DEFAULT_FLOW_CONFIG.to_string());

    let contents = match tokio::fs::read_to_string(&path).await {
        Ok(contents) => contents,
        Err(e) => {
            tracing::debug!("No flow config at {}: {}", path, e);
            return;
        }
    };

    match serde_json::from_str::<serde_json::Value>(&contents) {
        Ok(value) => {
            let example = value.get("example_key").cloned().unwrap_or(serde_json::Value::Null);
            tracing::info!("The config file says: {}", example);
        }
        Err(e) => tracing::warn!("Could not parse flow config {}: {}", path, e),
    }
}
