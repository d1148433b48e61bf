pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use crate::config::AppConfig;

#[derive(Parser)]
#[command(name = "magnifimind-api")]
#[command(about = "Personal-data CRM API server and maintenance commands")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Run the HTTP server (default)")]
    Serve,

    #[command(about = "Print a bcrypt hash for a password")]
    HashPassword {
        #[arg(help = "Plaintext password")]
        password: String,
    },

    #[command(about = "Create a user with a login account")]
    CreateUser(commands::user::CreateUserArgs),
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

pub async fn run(cli: Cli, config: AppConfig) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => commands::serve::handle(config).await,
        Commands::HashPassword { password } => commands::user::print_password_hash(&password, output_format),
        Commands::CreateUser(args) => commands::user::create_user(args, &config, output_format).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serve_is_the_default() {
        let cli = Cli::try_parse_from(["magnifimind-api"]).unwrap();
        assert!(cli.command.is_none());
        assert!(!cli.json);
    }

    #[test]
    fn parses_create_user() {
        let cli = Cli::try_parse_from([
            "magnifimind-api",
            "--json",
            "create-user",
            "ada",
            "secret1",
            "--first-name",
            "Ada",
            "--last-name",
            "Lovelace",
            "--admin",
        ])
        .unwrap();

        assert!(matches!(OutputFormat::from_cli(&cli), OutputFormat::Json));
        match cli.command {
            Some(Commands::CreateUser(args)) => {
                assert_eq!(args.username, "ada");
                assert_eq!(args.first_name, "Ada");
                assert!(args.admin);
            }
            _ => panic!("expected create-user"),
        }
    }

    #[test]
    fn hash_password_requires_an_argument() {
        assert!(Cli::try_parse_from(["magnifimind-api", "hash-password"]).is_err());
    }
}
