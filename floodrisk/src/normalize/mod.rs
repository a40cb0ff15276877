//! Normalisation des coordonnées vers l'Irish Grid (EPSG:29903)
//!
//! Reprojection en Rust pur, sans état global :
//! - Irish Grid (EPSG:29903) - identité
//! - Irish Transverse Mercator (EPSG:2157)
//! - WGS84 (EPSG:4326), longitude/latitude en degrés
//!
//! Toute coordonnée est ensuite contrôlée contre l'emprise du territoire couvert
//! par les couches de référence.

mod ellipsoid;
mod helmert;
mod tmerc;

pub use ellipsoid::Ellipsoid;
pub use helmert::Helmert;
pub use tmerc::TransverseMercator;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Point en coordonnées géographiques (radians)
#[derive(Debug, Clone, Copy)]
pub struct Geographic {
    /// Longitude en radians
    pub lon: f64,
    /// Latitude en radians
    pub lat: f64,
}

impl Geographic {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    /// Convertit en degrés
    pub fn to_degrees(self) -> (f64, f64) {
        (self.lon.to_degrees(), self.lat.to_degrees())
    }

    /// Crée depuis des degrés
    pub fn from_degrees(lon_deg: f64, lat_deg: f64) -> Self {
        Self {
            lon: lon_deg.to_radians(),
            lat: lat_deg.to_radians(),
        }
    }
}

/// Système de coordonnées d'une requête
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Crs {
    /// Irish Grid, EPSG:29903 (grille des couches)
    #[default]
    IrishGrid,
    /// Irish Transverse Mercator, EPSG:2157
    Itm,
    /// WGS84, EPSG:4326 (x = longitude, y = latitude)
    Wgs84,
}

impl Crs {
    pub fn epsg(self) -> u32 {
        match self {
            Crs::IrishGrid => 29903,
            Crs::Itm => 2157,
            Crs::Wgs84 => 4326,
        }
    }
}

/// Coordonnée normalisée dans la grille des couches
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GridPoint {
    pub easting: f64,
    pub northing: f64,
}

/// Coordonnée refusée avant toute recherche
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NormalizeError {
    #[error("invalid coordinate: components must be finite (got {x}, {y})")]
    NonFinite { x: f64, y: f64 },

    #[error("invalid coordinate: longitude/latitude out of range (got {lon}, {lat})")]
    GeographicOutOfRange { lon: f64, lat: f64 },

    #[error("invalid coordinate: ({easting:.1}, {northing:.1}) lies outside the covered territory")]
    OutOfTerritory { easting: f64, northing: f64 },
}

/// Emprise du territoire couvert, en Irish Grid
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TerritoryBounds {
    pub min_easting: f64,
    pub min_northing: f64,
    pub max_easting: f64,
    pub max_northing: f64,
}

impl TerritoryBounds {
    /// Emprise d'échantillonnage des couches irlandaises
    pub const IRELAND: TerritoryBounds = TerritoryBounds {
        min_easting: 13098.0,
        min_northing: 11478.0,
        max_easting: 367154.0,
        max_northing: 462251.0,
    };

    /// Élargit l'emprise de `margin` mètres de chaque côté
    pub fn with_margin(self, margin: f64) -> Self {
        Self {
            min_easting: self.min_easting - margin,
            min_northing: self.min_northing - margin,
            max_easting: self.max_easting + margin,
            max_northing: self.max_northing + margin,
        }
    }

    pub fn contains(&self, easting: f64, northing: f64) -> bool {
        easting >= self.min_easting
            && easting <= self.max_easting
            && northing >= self.min_northing
            && northing <= self.max_northing
    }
}

/// Normalisation des coordonnées entrantes.
///
/// Valeur immuable (`Send + Sync`), construite une fois et partagée entre les requêtes.
#[derive(Debug, Clone)]
pub struct Normalizer {
    bounds: TerritoryBounds,
    irish_grid: TransverseMercator,
    itm: TransverseMercator,
    wgs84_to_tm65: Helmert,
}

impl Normalizer {
    /// `margin` : tolérance en mètres autour de l'emprise du territoire
    pub fn new(margin: f64) -> Self {
        Self {
            bounds: TerritoryBounds::IRELAND.with_margin(margin),
            irish_grid: TransverseMercator::irish_grid(),
            itm: TransverseMercator::itm(),
            wgs84_to_tm65: Helmert::TM65_TO_WGS84.inverse(),
        }
    }

    pub fn bounds(&self) -> TerritoryBounds {
        self.bounds
    }

    /// Valide puis reprojette (x, y) exprimé dans `crs` vers l'Irish Grid
    pub fn normalize(&self, x: f64, y: f64, crs: Crs) -> Result<GridPoint, NormalizeError> {
        if !x.is_finite() || !y.is_finite() {
            return Err(NormalizeError::NonFinite { x, y });
        }

        let (easting, northing) = match crs {
            Crs::IrishGrid => (x, y),
            Crs::Itm => {
                // ETRS89 assimilé à WGS84
                let geo = self.itm.inverse(x, y);
                self.project_wgs84(geo)
            }
            Crs::Wgs84 => {
                if !(-180.0..=180.0).contains(&x) || !(-90.0..=90.0).contains(&y) {
                    return Err(NormalizeError::GeographicOutOfRange { lon: x, lat: y });
                }
                self.project_wgs84(Geographic::from_degrees(x, y))
            }
        };

        if !easting.is_finite() || !northing.is_finite() || !self.bounds.contains(easting, northing) {
            return Err(NormalizeError::OutOfTerritory { easting, northing });
        }

        Ok(GridPoint { easting, northing })
    }

    /// WGS84 géographique → Irish Grid
    fn project_wgs84(&self, geo: Geographic) -> (f64, f64) {
        let tm65 = self
            .wgs84_to_tm65
            .transform(geo, Ellipsoid::WGS84, Ellipsoid::AIRY_MODIFIED);
        self.irish_grid.forward(tm65)
    }

    /// Retourne une description de la chaîne de reprojection utilisée
    pub fn description(crs: Crs) -> &'static str {
        match crs {
            Crs::IrishGrid => "identity (EPSG:29903)",
            Crs::Itm => "EPSG:2157 → ETRS89 → Helmert → EPSG:29903",
            Crs::Wgs84 => "EPSG:4326 → Helmert → EPSG:29903",
        }
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(10_000.0)
    }
}
