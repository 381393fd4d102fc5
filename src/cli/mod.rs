pub mod utils;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::auth::{Claims, SessionKeys};
use crate::config::config;

#[derive(Parser)]
#[command(name = "erp")]
#[command(about = "ERP CLI - operator tools for the multi-tenant ERP API")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Mint a session token with the configured secret")]
    Token {
        #[arg(long, help = "Principal id (becomes users.id)")]
        user_id: Uuid,
        #[arg(long, help = "Principal email")]
        email: String,
        #[arg(long, help = "Token lifetime in hours (defaults to SECURITY_JWT_EXPIRY_HOURS)")]
        hours: Option<u64>,
    },

    #[command(about = "Check server health status from the API /health endpoint")]
    Health {
        #[arg(long, help = "Server base URL (defaults to the configured host and port)")]
        url: Option<String>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);

    match cli.command {
        Commands::Token { user_id, email, hours } => token(&output_format, user_id, &email, hours),
        Commands::Health { url } => health(&output_format, url).await,
    }
}

fn token(output_format: &OutputFormat, user_id: Uuid, email: &str, hours: Option<u64>) -> anyhow::Result<()> {
    let security = &config().security;
    let hours = hours.unwrap_or(security.jwt_expiry_hours);
    let keys = SessionKeys::from_config(security).context("SECURITY_JWT_SECRET is not usable")?;
    let token = keys.issue_claims(&Claims::new(user_id, email, hours))?;

    match output_format {
        OutputFormat::Json => utils::output_success(
            output_format,
            "Token issued",
            Some(json!({ "token": token, "user_id": user_id, "expires_in_hours": hours })),
        ),
        OutputFormat::Text => {
            println!("{}", token);
            Ok(())
        }
    }
}

async fn health(output_format: &OutputFormat, url: Option<String>) -> anyhow::Result<()> {
    let base = url.unwrap_or_else(|| format!("http://{}", config().bind_address()));
    let endpoint = url::Url::parse(&base)
        .and_then(|base| base.join("/health"))
        .with_context(|| format!("invalid server URL '{}'", base))?;

    let response = reqwest::get(endpoint.clone())
        .await
        .with_context(|| format!("failed to reach {}", endpoint))?;
    let status = response.status();
    let body: Value = response.json().await.context("health endpoint returned invalid JSON")?;

    if status.is_success() {
        utils::output_success(output_format, &format!("{} is healthy", endpoint), Some(body))
    } else {
        utils::output_error(output_format, &format!("{} returned {}", endpoint, status), Some("UNHEALTHY"))?;
        anyhow::bail!("server unhealthy")
    }
}
