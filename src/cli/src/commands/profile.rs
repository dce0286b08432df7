//! Profile commands.

use anyhow::Result;
use clap::Subcommand;
use serde::Serialize;

use crate::client::ApiClient;
use crate::output::{self, OutputFormat};

#[derive(Subcommand)]
pub enum ProfileCommands {
    /// Show the authenticated user's profile
    Show,

    /// Update the authenticated user's profile
    Update {
        /// Display name
        #[arg(long)]
        name: Option<String>,

        /// Short biography (max 300 characters)
        #[arg(long)]
        biography: Option<String>,

        /// Contact email
        #[arg(long)]
        email: Option<String>,

        /// Phone number
        #[arg(long)]
        phone: Option<String>,

        /// Organization
        #[arg(long)]
        organization: Option<String>,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProfilePatchBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    biography: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    phone_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    organization: Option<String>,
}

fn print_profile(profile: &serde_json::Value) {
    output::print_header("Profile");
    for key in ["id", "name", "email", "phoneNumber", "organization"] {
        if let Some(value) = profile[key].as_str() {
            output::print_detail(key, value);
        }
    }
    if let Some(biography) = profile["biography"].as_str() {
        if !biography.is_empty() {
            output::print_detail("biography", biography);
        }
    }
}

pub async fn execute(cmd: ProfileCommands, client: &ApiClient, format: OutputFormat) -> Result<()> {
    match cmd {
        ProfileCommands::Show => {
            let profile: serde_json::Value = client.get("/api/profiles/me").await?;

            match format {
                OutputFormat::Table => print_profile(&profile),
                _ => output::print_item(&profile, format),
            }
        }

        ProfileCommands::Update {
            name,
            biography,
            email,
            phone,
            organization,
        } => {
            let body = ProfilePatchBody {
                name,
                biography,
                email,
                phone_number: phone,
                organization,
            };
            let profile: serde_json::Value = client.put("/api/profiles/me", &body).await?;

            match format {
                OutputFormat::Table => {
                    output::print_success("Profile updated");
                    print_profile(&profile);
                }
                _ => output::print_item(&profile, format),
            }
        }
    }

    Ok(())
}
