//! Cardstash CLI - serve the card collection API and manage its database

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use cardstash::config::{self, CardstashConfig};
use cardstash::storage::SqliteStore;
use cardstash::ui::{self, Icons};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "cardstash")]
#[command(version)]
#[command(about = "Trading-card collection service - cards, users and ownership over SQLite")]
#[command(long_about = r#"
Cardstash stores cards, users and which user owns how many copies of which
card, and serves them over a small JSON API.

Example usage:
  cardstash init --database cards.db
  cardstash serve --port 5000
  cardstash stats
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the HTTP API
    Serve {
        /// Path to the database file
        #[arg(short, long)]
        database: Option<PathBuf>,

        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Create the database schema and write a config file
    Init {
        /// Path to the database file
        #[arg(short, long)]
        database: Option<PathBuf>,

        /// DDL file to run instead of the built-in schema
        #[arg(short, long)]
        schema: Option<PathBuf>,

        /// Overwrite an existing config file
        #[arg(short, long)]
        force: bool,
    },

    /// Show row counts
    Stats {
        /// Path to the database file
        #[arg(short, long)]
        database: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    let config_path = cli.config.clone().unwrap_or_else(config::default_config_path);
    let cfg = config::load_config(&config_path)?;

    match cli.command {
        Commands::Serve { database, port } => {
            let db_path = cfg.database_path(database);
            config::create_database_dir(&db_path)?;

            let mut store = SqliteStore::open(&db_path, cfg.busy_timeout())?;
            store.bootstrap()?;
            ui::info("Database", &db_path.display().to_string());

            if let Some(store) = cardstash::server::start_server(cfg.addr(port), store).await? {
                store.close()?;
            }
        }

        Commands::Init { database, schema, force } => {
            let db_path = cfg.database_path(database);
            config::create_database_dir(&db_path)?;
            ui::header(&format!("Initializing {}", db_path.display()));

            let mut store = SqliteStore::open(&db_path, cfg.busy_timeout())?;
            let result = match &schema {
                Some(path) => {
                    let ddl = std::fs::read_to_string(path)?;
                    ui::info("Schema", &path.display().to_string());
                    store.execute_schema(&ddl)
                }
                None => store.bootstrap(),
            };
            if let Err(cardstash::Error::Schema(failures)) = &result {
                for failure in failures {
                    ui::error(&failure.to_string());
                }
            }
            result?;
            store.close()?;
            ui::success("Schema applied");

            if config_path.exists() && !force {
                ui::info("Config", &format!("{} kept (use --force to overwrite)", config_path.display()));
            } else {
                let written = CardstashConfig {
                    database: Some(db_path.display().to_string()),
                    ..cfg
                };
                written.save(&config_path, force)?;
                println!("{} Wrote {}", Icons::WRENCH, config_path.display());
            }
        }

        Commands::Stats { database } => {
            let db_path = cfg.database_path(database);
            if !db_path.exists() {
                anyhow::bail!("no database at {} (run `cardstash init` first)", db_path.display());
            }
            let store = SqliteStore::open(&db_path, cfg.busy_timeout())?;
            let stats = store.stats()?;
            ui::stats(&stats);
            store.close()?;
        }
    }

    Ok(())
}
