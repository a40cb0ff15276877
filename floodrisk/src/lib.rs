//! # floodrisk
//!
//! Résolution d'une coordonnée irlandaise en attributs environnementaux
//! (sols, hydrologie, altitude, précipitations) et prédiction d'un cluster de
//! risque d'inondation / d'engorgement.
//!
//! ## Features
//!
//! - Normalisation Irish Grid / ITM / WGS84 en Rust pur, sans état global
//! - Recherches parallèles dans les quatre couches (`rayon`)
//! - Caractéristiques identiques à l'entraînement, constantes figées dans l'artefact
//! - Dégradation gracieuse : les données présentes sont toujours renvoyées
//! - Mode batch asynchrone (`tokio`), réponses dans l'ordre des requêtes
//!
//! ## Usage CLI
//!
//! ```bash
//! # Une coordonnée
//! floodrisk resolve --easting 316000 --northing 234000
//! floodrisk resolve --easting -6.26 --northing 53.35 --crs wgs84 --pretty
//!
//! # Flux NDJSON sur stdin
//! floodrisk batch --jobs 8 < requests.ndjson
//!
//! # Rapport de chargement
//! floodrisk inspect --report load-report.json
//! ```

pub mod classifier;
pub mod config;
pub mod engine;
pub mod features;
pub mod normalize;
pub mod report;

pub use classifier::{Classifier, ClassifierError, Prediction};
pub use config::{ConfigOverrides, EngineConfig};
pub use engine::{
    resolve_batch, resolve_stream, Classification, Engine, EngineError, ReferenceLayers, ResolutionResponse,
    ResolveRequest,
};
pub use features::{FeatureEngineer, FeatureError, FeatureVector};
pub use normalize::{Crs, GridPoint, NormalizeError, Normalizer};
pub use report::{LoadReport, LoadStatus};
