use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sea_orm_migration::MigratorTrait;
use stockline_api::{
    config,
    db::{self, DbConfig},
    migrator::Migrator,
};
use tracing::info;

/// Database migration runner
#[derive(Debug, Parser)]
#[command(name = "migration", about = "Apply or inspect stockline database migrations")]
struct Cli {
    /// Overrides the configured database URL
    #[arg(long)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Apply pending migrations (default)
    Up {
        /// Number of migrations to apply
        #[arg(short, long)]
        steps: Option<u32>,
    },
    /// Roll back applied migrations
    Down {
        /// Number of migrations to roll back
        #[arg(short, long, default_value_t = 1)]
        steps: u32,
    },
    /// Show which migrations are applied
    Status,
    /// Drop every table and re-apply all migrations
    Fresh,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let app_config = config::load_config().context("failed to load configuration")?;
    config::init_tracing(app_config.log_level(), app_config.log_json);

    let mut db_config = DbConfig::from(&app_config);
    if let Some(url) = cli.database_url {
        db_config.url = url;
    }
    let pool = db::establish_connection_with_config(&db_config)
        .await
        .context("failed to connect to database")?;

    match cli.command.unwrap_or(Command::Up { steps: None }) {
        Command::Up { steps } => {
            info!(?steps, "Applying migrations");
            Migrator::up(&pool, steps).await?;
        }
        Command::Down { steps } => {
            info!(steps, "Rolling back migrations");
            Migrator::down(&pool, Some(steps)).await?;
        }
        Command::Status => {
            Migrator::status(&pool).await?;
        }
        Command::Fresh => {
            info!("Recreating schema from scratch");
            Migrator::fresh(&pool).await?;
        }
    }

    Ok(())
}
