//! Ducket CLI
//!
//! Lists, fetches, uploads and deletes files through the storage facade.
//! The backend is selected from configuration files and `DUCKET__*` variables.

mod args;

use anyhow::Context;
use clap::Parser;
use tracing::debug;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use ducket_core::storage::{Bucket, BucketConfig, ObjectKey};
use ducket_shared::{AppConfig, LogConfig};

use crate::args::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let config = AppConfig::load().context("failed to load configuration")?;
    init_tracing(&config.log);

    let bucket_config =
        BucketConfig::try_from(config.storage).context("invalid storage configuration")?;
    let bucket = Bucket::new(bucket_config)?;
    debug!(backend = %bucket.kind(), "storage ready");

    run(&bucket, cli.command).await
}

fn init_tracing(log: &LogConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| log.filter.as_str().into());
    let registry = tracing_subscriber::registry().with(filter);

    // Results go to stdout, logs to stderr
    if log.json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

async fn run(bucket: &Bucket, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::List(args) => {
            let files = bucket.list_files().await?;
            for file in filter_project(files, args.project.as_deref()) {
                println!("{file}");
            }
        }
        Commands::Get(args) => {
            println!("{}", bucket.get_file(&args.file_ref()).await?);
        }
        Commands::Upload(args) => {
            let path = args.path.display().to_string();
            let request = args
                .into_request()
                .await
                .with_context(|| format!("failed to open {path}"))?;
            println!("{}", bucket.upload_file(request).await?);
        }
        Commands::Delete(args) => {
            bucket.delete_file(&args.file_ref()).await?;
        }
    }

    Ok(())
}

/// Keep only keys under `project/`, or everything when no project is given.
fn filter_project(files: Vec<String>, project: Option<&str>) -> Vec<String> {
    match project {
        Some(project) if !project.is_empty() => files
            .into_iter()
            .filter(|key| ObjectKey::is_in_project(key, project))
            .collect(),
        _ => files,
    }
}
