//! Définition et implémentation des commandes CLI
//!
//! - `resolve` : une coordonnée → réponse JSON
//! - `batch` : flux NDJSON de requêtes, une ligne JSON par réponse
//! - `inspect` : rapport de chargement des couches et du classifieur

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use floodrisk::{resolve_stream, ConfigOverrides, Crs, Engine, EngineConfig, EngineError, ResolutionResponse, ResolveRequest};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::info;

#[derive(Subcommand)]
pub enum Commands {
    /// Resolve a single coordinate
    Resolve {
        /// Easting (or longitude with --crs wgs84)
        #[arg(long, allow_negative_numbers = true)]
        easting: f64,

        /// Northing (or latitude with --crs wgs84)
        #[arg(long, allow_negative_numbers = true)]
        northing: f64,

        /// Reference system of the input coordinate
        #[arg(long, value_enum, default_value_t = Crs::IrishGrid)]
        crs: Crs,

        /// Pretty-print the JSON response
        #[arg(long)]
        pretty: bool,
    },

    /// Answer newline-delimited JSON requests, one JSON line per request, in input order
    Batch {
        /// Input file (default: stdin, or "-")
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Maximum number of requests resolved concurrently
        #[arg(long, alias = "threads")]
        jobs: Option<usize>,
    },

    /// Load the reference layers and the classifier, then print the load report
    Inspect {
        /// Save the report as JSON
        #[arg(long)]
        report: Option<PathBuf>,
    },
}

/// Options de configuration (priorité sur l'environnement et le fichier)
#[derive(Args, Debug, Default)]
pub struct ConfigArgs {
    /// JSON configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Soil layer (CSV with WKT geometry, or GeoJSON)
    #[arg(long, global = true)]
    pub soil: Option<PathBuf>,

    /// Hydrology layer (CSV with WKT geometry, or GeoJSON)
    #[arg(long, global = true)]
    pub hydrology: Option<PathBuf>,

    /// Elevation samples (CSV with Easting/Northing)
    #[arg(long, global = true)]
    pub elevation: Option<PathBuf>,

    /// Rainfall samples (CSV with Easting/Northing)
    #[arg(long, global = true)]
    pub rainfall: Option<PathBuf>,

    /// Classifier artifact (JSON)
    #[arg(long, global = true)]
    pub model: Option<PathBuf>,

    /// Maximum nearest-sample search radius, in metres
    #[arg(long, global = true)]
    pub search_radius: Option<f64>,

    /// Margin around the territory bounding box, in metres
    #[arg(long, global = true)]
    pub bbox_margin: Option<f64>,

    /// Rejected records tolerated per layer
    #[arg(long, global = true)]
    pub max_rejected: Option<usize>,
}

impl ConfigArgs {
    /// Fichier, puis environnement, puis ligne de commande
    pub fn resolve(&self) -> Result<EngineConfig> {
        let cli = ConfigOverrides {
            soil: self.soil.clone(),
            hydrology: self.hydrology.clone(),
            elevation: self.elevation.clone(),
            rainfall: self.rainfall.clone(),
            model: self.model.clone(),
            search_radius_m: self.search_radius,
            bbox_margin_m: self.bbox_margin,
            max_rejected_records: self.max_rejected,
            standardisation: None,
        };
        let overrides = ConfigOverrides::from_env()?.merge(cli);
        EngineConfig::resolve(self.config.as_deref(), overrides)
    }
}

/// Ligne de sortie du mode batch
#[derive(Serialize)]
#[serde(rename_all = "lowercase")]
enum BatchLine<'a> {
    Ok(&'a ResolutionResponse),
    Error(String),
}

pub fn cmd_resolve(config: &EngineConfig, request: ResolveRequest, pretty: bool) -> Result<()> {
    let (engine, report) = Engine::load(config).context("Failed to load reference data")?;
    info!("{}", report.summary());

    let response = engine.resolve(&request)?;
    let json = if pretty {
        serde_json::to_string_pretty(&response)?
    } else {
        serde_json::to_string(&response)?
    };
    println!("{}", json);
    Ok(())
}

pub async fn cmd_batch(config: EngineConfig, input: Option<&Path>, jobs: Option<usize>) -> Result<()> {
    let jobs = jobs.unwrap_or_else(|| {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4)
    });

    let (engine, report) = tokio::task::spawn_blocking(move || Engine::load(&config))
        .await
        .context("Loading task failed")?
        .context("Failed to load reference data")?;
    info!(jobs, "{}", report.summary());
    let engine = Arc::new(engine);

    let reader: Box<dyn AsyncBufRead + Unpin + Send> = match input {
        Some(path) if path != Path::new("-") => {
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("Cannot open {}", path.display()))?;
            Box::new(BufReader::new(file))
        }
        _ => Box::new(BufReader::new(tokio::io::stdin())),
    };

    // Le flux s'arrête à la première erreur de lecture, signalée en sortie
    let lines = stream::unfold(Some(reader.lines()), |state| async move {
        let mut lines = state?;
        match lines.next_line().await {
            Ok(Some(line)) => Some((Ok(line), Some(lines))),
            Ok(None) => None,
            Err(e) => Some((Err(e), None)),
        }
    });

    let requests = lines
        .filter(|line| futures::future::ready(!matches!(line, Ok(l) if l.trim().is_empty())))
        .map(|line| match line {
            Ok(line) => parse_request(&line),
            Err(e) => Err(EngineError::InvalidRequest(format!("read error: {}", e))),
        });

    let mut responses = std::pin::pin!(resolve_stream(engine, requests, jobs));
    let mut stdout = tokio::io::stdout();
    let (mut resolved, mut failed) = (0usize, 0usize);

    while let Some(result) = responses.next().await {
        let mut line = match &result {
            Ok(response) => {
                resolved += 1;
                serde_json::to_string(&BatchLine::Ok(response))?
            }
            Err(e) => {
                failed += 1;
                serde_json::to_string(&BatchLine::Error(e.to_string()))?
            }
        };
        line.push('\n');
        stdout.write_all(line.as_bytes()).await?;
    }
    stdout.flush().await?;

    info!(resolved, failed, "Batch terminé");
    Ok(())
}

pub fn cmd_inspect(config: &EngineConfig, report_path: Option<&Path>) -> Result<()> {
    let (engine, report) = Engine::load(config).context("Failed to load reference data")?;
    report.display();

    let bounds = engine.normalizer().bounds();
    println!(
        "Territory: E {:.0}–{:.0}, N {:.0}–{:.0} (margin {:.0} m)",
        bounds.min_easting, bounds.max_easting, bounds.min_northing, bounds.max_northing, config.bbox_margin_m
    );

    if let Some(path) = report_path {
        report
            .save_to_file(path)
            .with_context(|| format!("Failed to write report {}", path.display()))?;
        info!(path = %path.display(), "Rapport sauvegardé");
    }
    Ok(())
}

fn parse_request(line: &str) -> Result<ResolveRequest, EngineError> {
    serde_json::from_str(line).map_err(|e| EngineError::InvalidRequest(e.to_string()))
}
