//! Tournament matchmaking command line.
//!
//! Reads commands from stdin (or a script file) and runs them against either
//! PostgreSQL or in-memory storage.

use std::sync::Arc;

use anyhow::{Context, Error, bail};
use ctrlc::set_handler;
use log::info;
use matchmaker::{
    db::{Database, DatabaseConfig, InMemoryRepository, TournamentRepository},
    registry::{CalculatorTablePlugin, Registries},
    tournament::TournamentManager,
};
use mm_cli::{config::CliConfig, session::Session};
use pico_args::Arguments;
use tokio::io::BufReader;

const HELP: &str = "\
Run tournament matchmaking commands

USAGE:
  mm_cli [OPTIONS]

OPTIONS:
  --db-url              URL   PostgreSQL connection string  [default: env DATABASE_URL, else in-memory]
  --calculators         FILE  JSON calculator tables to register  [default: env MM_CALCULATORS_FILE]
  --default-calculator  NAME  Calculator for new tournaments  [default: env MM_DEFAULT_CALCULATOR or standard]
  --script              FILE  Read commands from FILE instead of stdin

FLAGS:
  --rematch                   Allow rematches when pairings run out  [default: env MM_ALLOW_REMATCH or false]
  --json                      Print results as JSON
  -h, --help                  Print help information

ENVIRONMENT:
  DATABASE_URL                PostgreSQL connection string
  DB_MAX_CONNECTIONS          Maximum pool size
  RUST_LOG                    Log filter (e.g., info)
  (Type 'help' at the prompt for the command list)
";

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let config = CliConfig::from_env_and_args(pargs)?;

    // Catching signals for exit.
    set_handler(|| std::process::exit(0))?;

    env_logger::builder().format_target(false).init();

    let mut registries = Registries::with_builtins();
    if let Some(path) = &config.calculators_file {
        let plugin = CalculatorTablePlugin::from_file(path)
            .with_context(|| format!("Failed to load calculator tables from {}", path.display()))?;
        registries.install(&plugin)?;
    }
    if !registries.calculators.contains(&config.default_calculator) {
        bail!(
            "Default calculator '{}' is not registered (available: {})",
            config.default_calculator,
            registries.calculators.list_names().join(", ")
        );
    }

    let repository: Arc<dyn TournamentRepository> = match &config.database_url {
        Some(url) => {
            let db_config = DatabaseConfig::with_url(url.clone()).overridden_from_env()?;
            let db = Database::new(&db_config)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to connect to database: {}", e))?;
            db.health_check()
                .await
                .map_err(|e| anyhow::anyhow!("Database health check failed: {}", e))?;
            db.migrate().await.context("Failed to run migrations")?;
            info!("Database connected successfully");
            Arc::new(db.repository())
        }
        None => {
            info!("No DATABASE_URL given; using in-memory storage");
            Arc::new(InMemoryRepository::new())
        }
    };

    let manager = TournamentManager::new(repository, registries);
    let mut session = Session::new(manager, config.clone(), std::io::stdout().lock());

    match &config.script {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("Failed to open script {}", path.display()))?;
            session.run(BufReader::new(file)).await?;
        }
        None => session.run(BufReader::new(tokio::io::stdin())).await?,
    }

    Ok(())
}
