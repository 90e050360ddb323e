use anyhow::anyhow;
use clap::{Parser, Subcommand};
use serde_json::json;

use crate::app;
use crate::auth::issue_token;
use crate::config::AppConfig;
use crate::database::DatabaseManager;
use crate::services::refresh_year_rollup;

#[derive(Parser)]
#[command(name = "finance-dashboard")]
#[command(about = "Finance dashboard API server and maintenance commands")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Run the HTTP server (default when no command is given)")]
    Serve {
        #[arg(long, help = "Port to bind instead of the configured one")]
        port: Option<u16>,
    },

    #[command(about = "Exchange the dashboard password for a session token")]
    Token {
        #[arg(long)]
        password: String,
    },

    #[command(about = "Recompute the cached rollup of a year from its quarters")]
    Rollup {
        #[arg(long)]
        year: i32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
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
    let config = AppConfig::from_env();

    match cli.command.unwrap_or(Commands::Serve { port: None }) {
        Commands::Serve { port } => {
            let port = port.unwrap_or(config.api.port);
            app::serve(config, port).await
        }
        Commands::Token { password } => {
            let security = &config.security;
            let token = issue_token(
                &password,
                security.dashboard_password.as_deref(),
                security.jwt_secret.as_deref(),
                security.token_ttl_hours,
            )?;

            match output_format {
                OutputFormat::Json => println!("{}", json!({ "token": token })),
                OutputFormat::Text => println!("{}", token),
            }
            Ok(())
        }
        Commands::Rollup { year } => {
            let store = DatabaseManager::store(&config.database)?
                .ok_or_else(|| anyhow!("DATABASE_URL is not set"))?;
            let rollup = refresh_year_rollup(store.as_ref(), year).await?;

            match output_format {
                OutputFormat::Json => println!("{}", serde_json::to_string(&rollup)?),
                OutputFormat::Text => {
                    println!("Year:               {}", year);
                    println!("Total income:       {}", rollup.total_income);
                    println!("Total expense:      {}", rollup.total_expense);
                    println!("Cumulative surplus: {}", rollup.cumulative_surplus);
                }
            }
            Ok(())
        }
    }
}
