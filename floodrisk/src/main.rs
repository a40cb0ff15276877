//! Point d'entrée CLI pour floodrisk

use anyhow::Result;
use clap::Parser;
use floodrisk::ResolveRequest;
use tracing::Level;
use tracing_subscriber::{fmt, EnvFilter};

// Charger .env au démarrage
fn load_env() {
    // Chercher .env dans le répertoire courant ou parent
    if dotenvy::dotenv().is_err() {
        // Essayer depuis le répertoire du binaire
        if let Ok(exe) = std::env::current_exe() {
            if let Some(dir) = exe.parent() {
                let _ = dotenvy::from_path(dir.join(".env"));
            }
        }
    }
}

mod cli;

use cli::{Commands, ConfigArgs};

/// Résoudre une coordonnée irlandaise en attributs environnementaux et cluster de risque
#[derive(Parser)]
#[command(name = "floodrisk")]
#[command(author, version)]
#[command(about = "Résoudre une coordonnée irlandaise en attributs sol/hydrologie/altitude/pluie et cluster de risque d'inondation")]
struct Cli {
    /// Augmenter la verbosité (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Mode silencieux
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(flatten)]
    config: ConfigArgs,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Charger .env avant tout
    load_env();

    let cli = Cli::parse();

    // Configurer le logging
    init_logging(cli.verbose, cli.quiet);

    let config = cli.config.resolve()?;

    match cli.command {
        Commands::Resolve {
            easting,
            northing,
            crs,
            pretty,
        } => {
            let request = ResolveRequest {
                easting,
                northing,
                crs,
            };
            cli::cmd_resolve(&config, request, pretty)?;
        }
        Commands::Batch { input, jobs } => {
            cli::cmd_batch(config, input.as_deref(), jobs).await?;
        }
        Commands::Inspect { report } => {
            cli::cmd_inspect(&config, report.as_deref())?;
        }
    }

    Ok(())
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => Level::WARN,
        (_, 0) => Level::INFO,
        (_, 1) => Level::DEBUG,
        (_, _) => Level::TRACE,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    // stdout est réservé aux réponses JSON
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .init();
}
