//! # geolayers
//!
//! Chargement et indexation spatiale des couches de référence irlandaises
//! (sols, hydrologie, altitude, précipitations), toutes exprimées en Irish Grid (EPSG:29903).
//!
//! ## Features
//!
//! - Lecture CSV (géométries WKT ou colonnes Easting/Northing) et GeoJSON
//! - Décodage tolérant : UTF-8 via `simdutf8`, repli Windows-1252
//! - Validation par enregistrement : les lignes invalides sont rejetées et comptées
//! - Index R-tree (`rstar`) : point-dans-polygone et plus proche voisin borné
//! - Départage déterministe : le plus petit identifiant d'enregistrement gagne
//!
//! ## Usage
//!
//! ```rust,ignore
//! use geolayers::{load_polygonal, SoilRecord};
//! use std::path::Path;
//!
//! let soil = load_polygonal::<SoilRecord>(Path::new("soil.csv"), 0)?;
//! if let Some(hit) = soil.index.lookup(316_000.0, 234_000.0) {
//!     println!("{}: {}", hit.id, hit.record.texture);
//! }
//! ```

pub mod error;
pub mod index;
pub mod source;
pub mod types;

pub use error::LayerError;
pub use index::{load_polygonal, load_sampled, Hit, LayerIndex, LayerShape, LoadedLayer};
pub use types::{
    ElevationSample, HydrologyRecord, LayerKind, LayerRecord, LoadOutcome, PolygonFeature, RainfallSample,
    RecordId, RejectedRecord, SamplePoint, SoilRecord,
};
