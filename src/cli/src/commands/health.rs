//! Health check command.

use anyhow::Result;
use clap::Args;

use crate::client::ApiClient;
use crate::output::{self, OutputFormat};

#[derive(Args)]
pub struct HealthArgs {}

pub async fn execute(_args: HealthArgs, client: &ApiClient, format: OutputFormat) -> Result<()> {
    let payload = client.get_raw("/health").await?;

    match format {
        OutputFormat::Table => {
            let status = payload["status"].as_str().unwrap_or("unknown");
            if status == "healthy" {
                output::print_success(&format!("Server at {} is healthy", client.base_url()));
            } else {
                output::print_error(&format!("Server reports status: {}", status));
            }
            if let Some(version) = payload["version"].as_str() {
                output::print_detail("Version", version);
            }
            if let Some(timestamp) = payload["timestamp"].as_str() {
                output::print_detail("Timestamp", timestamp);
            }
        }
        _ => output::print_item(&payload, format),
    }

    Ok(())
}
