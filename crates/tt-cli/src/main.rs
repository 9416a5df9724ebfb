use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

use commands::import::ImportArgs;

#[derive(Parser)]
#[command(name = "tt")]
#[command(about = "Transit feed importer", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile one feed directory into the database
    Import(ImportArgs),

    /// Database commands
    Db {
        /// Env var holding the connection URL
        #[arg(long, default_value = tt_db::ENV_DB_URL)]
        url_env: String,

        #[command(subcommand)]
        cmd: DbCmd,
    },

    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order (base -> environment -> feed...)
        #[arg(required = true)]
        paths: Vec<String>,
    },
}

#[derive(Subcommand)]
enum DbCmd {
    /// Connectivity + schema presence
    Status,
    /// Apply embedded SQL migrations
    Migrate,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Silent if the file does not exist; production injects env vars directly.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let cli = Cli::parse();

    match cli.cmd {
        Commands::Import(args) => commands::import::run(args).await?,

        Commands::Db { url_env, cmd } => {
            let pool = tt_db::connect_from_env(&url_env, 1).await?;
            match cmd {
                DbCmd::Status => {
                    let s = tt_db::status(&pool).await?;
                    println!(
                        "db_ok={} has_postgis={} has_routes_table={}",
                        s.ok, s.has_postgis, s.has_routes_table
                    );
                }
                DbCmd::Migrate => {
                    tt_db::migrate(&pool).await?;
                    println!("migrations_applied=true");
                }
            }
        }

        Commands::ConfigHash { paths } => {
            let path_refs: Vec<&str> = paths.iter().map(String::as_str).collect();
            let loaded = tt_config::load_layered_yaml(&path_refs)?;
            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
        }
    }

    Ok(())
}

/// Logs go to stderr so stdout stays machine-readable.
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}
