//! mealplan-admin - maintenance commands for a meal planner root folder
//!
//! ```bash
//! mealplan-admin seed
//! mealplan-admin reset-password <new> [--username admin]
//! mealplan-admin create-user <username> <password>
//! ```

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use mealplan_common::config::{RootFolderInitializer, RootFolderResolver, TomlConfig};
use mealplan_common::db::init::init_database;
use mealplan_common::password::{hash_password, validate_new_password};
use mealplan_server::db::users;
use mealplan_server::seed;
use tracing::info;

/// Maintenance tool for the meal planner database
#[derive(Parser, Debug)]
#[command(name = "mealplan-admin")]
#[command(about = "Maintenance commands for the meal planner database")]
#[command(version)]
struct Args {
    /// Folder holding the database and uploaded images
    #[arg(short, long, env = "MEALPLAN_ROOT_FOLDER", global = true)]
    root_folder: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Replace all data with the sample catalog and the default admin user
    Seed,

    /// Set a new password for an existing user
    ResetPassword {
        /// New password (at least 6 characters)
        new_password: String,

        #[arg(long, default_value = seed::DEFAULT_USERNAME)]
        username: String,
    },

    /// Add a user
    CreateUser { username: String, password: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mealplan_server=info,mealplan_admin=info".into()),
        )
        .init();

    let args = Args::parse();

    let root_folder = RootFolderResolver::new(args.root_folder, TomlConfig::load_or_default()).resolve();
    let initializer = RootFolderInitializer::new(root_folder);
    initializer
        .ensure_directory_exists()
        .context("Failed to prepare root folder")?;
    let db_path = initializer.database_path();
    let pool = init_database(&db_path)
        .await
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;
    info!("Database: {}", db_path.display());

    match args.command {
        Command::Seed => {
            let summary = seed::seed_database(&pool).await.context("Seeding failed")?;
            info!(
                "Seed complete: {} categories, {} meals; log in as '{}' / '{}'",
                summary.categories,
                summary.meals,
                seed::DEFAULT_USERNAME,
                seed::DEFAULT_PASSWORD
            );
        }
        Command::ResetPassword {
            new_password,
            username,
        } => {
            validate_new_password(&new_password)?;
            let Some(user) = users::find_by_username(&pool, &username).await? else {
                bail!("User '{}' not found", username);
            };
            let hash = hash_password(&new_password)?;
            users::update_password_hash(&pool, user.id, &hash).await?;
            info!("Password reset for '{}'", username);
        }
        Command::CreateUser { username, password } => {
            let username = username.trim();
            if username.is_empty() {
                bail!("Username is required");
            }
            validate_new_password(&password)?;
            let hash = hash_password(&password)?;
            let user = users::create_user(&pool, username, &hash)
                .await
                .with_context(|| format!("Failed to create user '{}'", username))?;
            info!("Created user {} '{}'", user.id, user.username);
        }
    }

    pool.close().await;
    Ok(())
}
