use clap::Args;
use serde_json::json;

use crate::auth::{hash_password, hash_password_blocking};
use crate::cli::utils::{output_error, output_success};
use crate::cli::OutputFormat;
use crate::config::AppConfig;
use crate::database::models::{NewAccount, NewUser};
use crate::database::{DatabaseManager, UserRepository};

const CLI_USER: &str = "cli";
const DEFAULT_ROLE: &str = "user";

#[derive(Args, Debug)]
pub struct CreateUserArgs {
    #[arg(help = "Login name")]
    pub username: String,

    #[arg(help = "Plaintext password")]
    pub password: String,

    #[arg(long, help = "First name")]
    pub first_name: String,

    #[arg(long, help = "Last name")]
    pub last_name: String,

    #[arg(long, help = "Also grant the admin role")]
    pub admin: bool,
}

pub fn print_password_hash(password: &str, output_format: OutputFormat) -> anyhow::Result<()> {
    let hash = hash_password(password)?;
    match output_format {
        OutputFormat::Json => output_success(&output_format, "Password hashed", Some(json!({ "hash": hash }))),
        OutputFormat::Text => {
            println!("{}", hash);
            Ok(())
        }
    }
}

pub async fn create_user(args: CreateUserArgs, config: &AppConfig, output_format: OutputFormat) -> anyhow::Result<()> {
    let db = DatabaseManager::connect(&config.database).await?;
    let users = UserRepository::new(db.pool().clone());

    if users.find_account_by_name(&args.username).await?.is_some() {
        output_error(&output_format, &format!("Account '{}' already exists", args.username), Some("CONFLICT"))?;
        db.close().await;
        anyhow::bail!("account already exists");
    }

    let password_hash = hash_password_blocking(args.password).await?;
    let (user, account) = users
        .create(
            &NewUser {
                first_name: args.first_name,
                last_name: args.last_name,
            },
            &NewAccount {
                name: args.username,
                password_hash,
            },
            CLI_USER,
        )
        .await?;

    users.grant_role(account.id, DEFAULT_ROLE).await?;
    if args.admin {
        users.grant_role(account.id, &config.admin.role).await?;
    }
    db.close().await;

    output_success(
        &output_format,
        &format!("Created user {} with account {}", user.id, account.name),
        Some(json!({ "user_id": user.id, "account": account.name, "admin": args.admin })),
    )
}
