pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

#[derive(Parser)]
#[command(name = "hattra")]
#[command(about = "Hattra CLI - operator tasks for the hattra API database")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Apply pending database migrations")]
    Migrate,

    #[command(about = "Create an active admin account")]
    CreateAdmin {
        #[arg(long)]
        username: String,

        #[arg(long, help = "Defaults to the username")]
        password: Option<String>,

        #[arg(long)]
        email: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
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
        Commands::Migrate => commands::migrate::handle(output_format).await,
        Commands::CreateAdmin { username, password, email } => {
            commands::admin::handle(&username, password.as_deref(), email.as_deref(), output_format).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_create_admin() {
        let cli = Cli::try_parse_from(["hattra", "--json", "create-admin", "--username", "root"]).unwrap();
        assert!(matches!(OutputFormat::from_cli(&cli), OutputFormat::Json));
        match cli.command {
            Commands::CreateAdmin { username, password, email } => {
                assert_eq!(username, "root");
                assert!(password.is_none());
                assert!(email.is_none());
            }
            Commands::Migrate => panic!("expected create-admin"),
        }
    }

    #[test]
    fn create_admin_requires_a_username() {
        assert!(Cli::try_parse_from(["hattra", "create-admin"]).is_err());
    }
}
