mod db;
mod engine;
mod journal;
mod models;
mod run;
mod util;

#[cfg(test)]
mod util_tests;

use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    init_logging();

    let args: Vec<String> = std::env::args().collect();
    let db_path = get_db_path()?;
    let db = db::Database::open(&db_path)?;
    ensure_default_user(&db)?;

    run::as_cli(&args, &db)
}

/// Logs go to stderr so command output stays clean. `RUST_LOG` overrides
/// the default `warn` level.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn ensure_default_user(db: &db::Database) -> Result<()> {
    if db.get_users()?.is_empty() {
        let user = models::User::new(run::DEFAULT_USER.into());
        db.insert_user(&user)?;
    }
    Ok(())
}

fn get_db_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("BUDGETWATCH_DB") {
        return Ok(PathBuf::from(path));
    }
    let proj_dirs = directories::ProjectDirs::from("com", "budgetwatch", "budgetwatch")
        .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
    let data_dir = proj_dirs.data_dir();
    std::fs::create_dir_all(data_dir)
        .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;
    Ok(data_dir.join("budgetwatch.db"))
}
