//! Mirrorgate CLI — command-line client for the upload gateway.
//!
//! Set MIRRORGATE_API_URL (or API_URL); defaults to http://localhost:3000.

use anyhow::Result;
use clap::{Parser, Subcommand};
use mirrorgate_api_client::ApiClient;
use mirrorgate_cli::init_tracing;
use serde_json::json;

#[derive(Parser)]
#[command(name = "mirrorgate", about = "Mirrorgate gateway CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the current pointer value and timestamp
    Status,
    /// Point the gateway at a new image URL
    SetUrl {
        /// Absolute URL of the image
        url: String,
    },
    /// Upload an image file; the pointer moves to the stored copy
    Upload {
        /// Path to the file to upload
        file: std::path::PathBuf,
    },
    /// List stored asset keys
    Files,
    /// Check gateway health
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let client = ApiClient::from_env()?;

    match cli.command {
        Commands::Status => {
            let status = client.image_status().await?;
            print_json(&json!({
                "imageUrl": status.image_url,
                "updatedAt": status.updated_at,
            }))?;
        }
        Commands::SetUrl { url } => {
            let response = client.update_image_url(&url).await?;
            print_json(&json!({
                "success": response.success,
                "imageUrl": response.image_url,
                "updatedAt": response.updated_at,
            }))?;
        }
        Commands::Upload { file } => {
            let response = client
                .upload_image(&file.to_string_lossy())
                .await?;
            print_json(&json!({
                "success": response.success,
                "imageUrl": response.image_url,
                "fileName": response.file_name,
                "fileSize": response.file_size,
            }))?;
        }
        Commands::Files => {
            let response = client.list_files().await?;
            print_json(&json!({ "files": response.files }))?;
        }
        Commands::Health => {
            let response = client.health().await?;
            print_json(&json!({
                "status": response.status,
                "timestamp": response.timestamp,
            }))?;
        }
    }

    Ok(())
}

fn print_json(value: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
