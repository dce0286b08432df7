//! Event commands.
//!
//! Browse, create, moderate, and delete events.

use anyhow::{Context, Result};
use clap::Subcommand;
use serde::{Deserialize, Serialize};
use tabled::Tabled;

use crate::client::ApiClient;
use crate::output::{self, OutputFormat};

#[derive(Subcommand)]
pub enum EventCommands {
    /// List events
    List {
        /// Filter by category (e.g. Music, Technology)
        #[arg(short, long)]
        category: Option<String>,

        /// Free-text search over title, description, organizer
        #[arg(short, long)]
        search: Option<String>,

        /// Filter by moderation status (approved, pending, rejected, cancelled)
        #[arg(long)]
        status: Option<String>,

        /// Only events created by this principal id
        #[arg(long)]
        creator: Option<String>,

        /// Maximum number of results
        #[arg(short, long, default_value = "20")]
        limit: u32,

        /// Pagination cursor from a previous page
        #[arg(long)]
        after: Option<String>,
    },

    /// Get a single event
    Get {
        /// Event ID
        event_id: String,
    },

    /// Create a new event from a YAML or JSON file
    Create {
        /// Path to the event definition file
        #[arg(short, long)]
        file: String,
    },

    /// Update an event from a YAML or JSON patch file
    Update {
        /// Event ID
        event_id: String,

        /// Path to the patch file
        #[arg(short, long)]
        file: String,
    },

    /// Delete an event (cascades to its registrations)
    Delete {
        /// Event ID
        event_id: String,

        /// Skip confirmation
        #[arg(short, long)]
        force: bool,
    },

    /// Approve or reject a pending event (moderators only)
    Moderate {
        /// Event ID
        event_id: String,

        /// Decision: approved or rejected
        decision: String,
    },

    /// Cancel an approved event (creator only)
    Cancel {
        /// Event ID
        event_id: String,
    },

    /// List the fixed category set
    Categories,
}

// ── API types ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct EventInfo {
    id: String,
    title: String,
    category: String,
    status: String,
    #[serde(default, rename = "attendeeCount")]
    attendee_count: u32,
    capacity: Option<u32>,
    #[serde(rename = "startDate")]
    start_date: String,
}

#[derive(Debug, Serialize, Tabled)]
struct EventRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Category")]
    category: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Attendees")]
    attendees: String,
    #[tabled(rename = "Starts")]
    start_date: String,
}

fn to_row(event: &EventInfo) -> EventRow {
    let attendees = match event.capacity {
        Some(capacity) => format!("{}/{}", event.attendee_count, capacity),
        None => event.attendee_count.to_string(),
    };
    EventRow {
        id: event.id.chars().take(8).collect(),
        title: event.title.clone(),
        category: event.category.clone(),
        status: event.status.clone(),
        attendees,
        start_date: event.start_date.clone(),
    }
}

/// Read an event definition or patch file (YAML or JSON by extension).
fn read_body(path: &str) -> Result<serde_json::Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read event file: {}", path))?;

    if path.ends_with(".json") {
        serde_json::from_str(&content).with_context(|| "Failed to parse event JSON")
    } else {
        serde_yaml::from_str(&content).with_context(|| "Failed to parse event YAML")
    }
}

// ── Execution ───────────────────────────────────────────────────────────────

pub async fn execute(cmd: EventCommands, client: &ApiClient, format: OutputFormat) -> Result<()> {
    match cmd {
        EventCommands::List {
            category,
            search,
            status,
            creator,
            limit,
            after,
        } => {
            let mut params = vec![format!("limit={}", limit)];
            if let Some(category) = category {
                params.push(format!("category={}", category));
            }
            if let Some(search) = search {
                params.push(format!("search={}", search));
            }
            if let Some(status) = status {
                params.push(format!("status={}", status));
            }
            if let Some(creator) = creator {
                params.push(format!("creatorId={}", creator));
            }
            if let Some(after) = after {
                params.push(format!("startAfter={}", after));
            }

            let payload = client
                .get_raw(&format!("/api/events?{}", params.join("&")))
                .await?;
            let events: Vec<EventInfo> =
                serde_json::from_value(payload["events"].clone())
                    .context("Failed to parse event list")?;

            match format {
                OutputFormat::Table => {
                    let rows: Vec<EventRow> = events.iter().map(to_row).collect();
                    output::print_list(&rows, format);
                    if let Some(cursor) = payload["nextCursor"].as_str() {
                        output::print_info(&format!("More results: --after {}", cursor));
                    }
                }
                _ => output::print_item(&payload, format),
            }
        }

        EventCommands::Get { event_id } => {
            let event: serde_json::Value = client.get(&format!("/api/events/{}", event_id)).await?;

            match format {
                OutputFormat::Table => {
                    output::print_header(&format!("Event: {}", event_id));
                    for key in ["title", "category", "status", "startDate", "startTime"] {
                        if let Some(value) = event[key].as_str() {
                            output::print_detail(key, value);
                        }
                    }
                    output::print_detail(
                        "attendees",
                        &format!(
                            "{} (capacity {})",
                            event["attendeeCount"],
                            event["capacity"].as_u64().map_or("unlimited".to_string(), |c| c.to_string())
                        ),
                    );
                    output::print_detail("views", &event["viewCount"].to_string());
                }
                _ => output::print_item(&event, format),
            }
        }

        EventCommands::Create { file } => {
            let body = read_body(&file)?;
            let event: serde_json::Value = client.post("/api/events", &body).await?;

            match format {
                OutputFormat::Table => {
                    output::print_success("Event created");
                    output::print_detail("ID", event["id"].as_str().unwrap_or("?"));
                    output::print_detail("Status", event["status"].as_str().unwrap_or("?"));
                }
                _ => output::print_item(&event, format),
            }
        }

        EventCommands::Update { event_id, file } => {
            let body = read_body(&file)?;
            let event: serde_json::Value =
                client.put(&format!("/api/events/{}", event_id), &body).await?;

            match format {
                OutputFormat::Table => {
                    output::print_success(&format!("Event {} updated", event_id));
                }
                _ => output::print_item(&event, format),
            }
        }

        EventCommands::Delete { event_id, force } => {
            if !force {
                output::print_info(
                    "Deleting an event removes all of its registrations. Use --force to confirm.",
                );
                return Ok(());
            }

            let resp: serde_json::Value =
                client.delete(&format!("/api/events/{}", event_id)).await?;

            match format {
                OutputFormat::Table => {
                    output::print_success(&format!("Event {} deleted", event_id));
                }
                _ => output::print_item(&resp, format),
            }
        }

        EventCommands::Moderate { event_id, decision } => {
            let event: serde_json::Value = client
                .post(
                    &format!("/api/events/{}/status", event_id),
                    &serde_json::json!({ "status": decision }),
                )
                .await?;

            match format {
                OutputFormat::Table => {
                    output::print_success(&format!(
                        "Event {} is now {}",
                        event_id,
                        event["status"].as_str().unwrap_or("?")
                    ));
                }
                _ => output::print_item(&event, format),
            }
        }

        EventCommands::Cancel { event_id } => {
            let event: serde_json::Value = client
                .post(
                    &format!("/api/events/{}/status", event_id),
                    &serde_json::json!({ "status": "cancelled" }),
                )
                .await?;

            match format {
                OutputFormat::Table => {
                    output::print_success(&format!("Event {} cancelled", event_id));
                }
                _ => output::print_item(&event, format),
            }
        }

        EventCommands::Categories => {
            let payload = client.get_raw("/api/events/categories").await?;

            match format {
                OutputFormat::Table => {
                    output::print_header("Categories");
                    if let Some(categories) = payload["categories"].as_array() {
                        for category in categories {
                            if let Some(name) = category.as_str() {
                                println!("  {}", name);
                            }
                        }
                    }
                }
                _ => output::print_item(&payload["categories"], format),
            }
        }
    }

    Ok(())
}
