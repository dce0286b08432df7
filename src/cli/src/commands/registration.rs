//! Registration commands.
//!
//! Register for events, cancel registrations, and list attendees.

use anyhow::{Context, Result};
use clap::Subcommand;
use serde::{Deserialize, Serialize};
use tabled::Tabled;

use crate::client::ApiClient;
use crate::output::{self, OutputFormat};

#[derive(Subcommand)]
pub enum RegistrationCommands {
    /// Register the authenticated user for an event
    Add {
        /// Event ID
        event_id: String,
    },

    /// Cancel a registration
    Cancel {
        /// Registration ID
        registration_id: String,
    },

    /// List your registrations, or an event's attendees with --event
    List {
        /// Event ID (owner/moderator only)
        #[arg(short, long)]
        event: Option<String>,
    },
}

// ── API types ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct RegistrationInfo {
    id: String,
    #[serde(rename = "eventId")]
    event_id: String,
    #[serde(rename = "userId")]
    user_id: String,
    #[serde(default, rename = "userName")]
    user_name: Option<String>,
    status: String,
    #[serde(rename = "registeredAt")]
    registered_at: String,
}

#[derive(Debug, Serialize, Tabled)]
struct RegistrationRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Event")]
    event_id: String,
    #[tabled(rename = "User")]
    user: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Registered")]
    registered_at: String,
}

// ── Execution ───────────────────────────────────────────────────────────────

pub async fn execute(
    cmd: RegistrationCommands,
    client: &ApiClient,
    format: OutputFormat,
) -> Result<()> {
    match cmd {
        RegistrationCommands::Add { event_id } => {
            let registration: serde_json::Value = client
                .post(
                    "/api/registrations",
                    &serde_json::json!({ "eventId": event_id }),
                )
                .await?;

            match format {
                OutputFormat::Table => {
                    output::print_success("Registered");
                    output::print_detail("ID", registration["id"].as_str().unwrap_or("?"));
                    output::print_detail("Event", registration["eventId"].as_str().unwrap_or("?"));
                }
                _ => output::print_item(&registration, format),
            }
        }

        RegistrationCommands::Cancel { registration_id } => {
            let registration: serde_json::Value = client
                .delete(&format!("/api/registrations/{}", registration_id))
                .await?;

            match format {
                OutputFormat::Table => {
                    output::print_success(&format!("Registration {} cancelled", registration_id));
                }
                _ => output::print_item(&registration, format),
            }
        }

        RegistrationCommands::List { event } => {
            let path = match &event {
                Some(event_id) => format!("/api/registrations?eventId={}", event_id),
                None => "/api/registrations".to_string(),
            };

            let payload = client.get_raw(&path).await?;
            let registrations: Vec<RegistrationInfo> =
                serde_json::from_value(payload["registrations"].clone())
                    .context("Failed to parse registration list")?;

            match format {
                OutputFormat::Table => {
                    let rows: Vec<RegistrationRow> = registrations
                        .iter()
                        .map(|r| RegistrationRow {
                            id: r.id.clone(),
                            event_id: r.event_id.chars().take(8).collect(),
                            user: r.user_name.clone().unwrap_or_else(|| r.user_id.clone()),
                            status: r.status.clone(),
                            registered_at: r.registered_at.clone(),
                        })
                        .collect();
                    output::print_list(&rows, format);
                }
                _ => output::print_item(&payload, format),
            }
        }
    }

    Ok(())
}
