//! Calcul du vecteur de caractéristiques du classifieur
//!
//! Reproduit exactement la transformation appliquée à l'entraînement :
//! - `Raw_Hydrology  = ordinal(catégorie) × 2`
//! - `Flood_Risk_Index = z(précipitations annuelles) − z(altitude)`
//! - `Runoff_Index     = (3 − Raw_Hydrology) − z(altitude)`
//!
//! Les constantes de standardisation et la table d'encodage sont figées dans
//! l'artefact du classifieur ; elles ne sont jamais recalculées.

use std::collections::BTreeMap;
use std::fmt;

use geolayers::{ElevationSample, HydrologyRecord, RainfallSample};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Noms des caractéristiques, dans l'ordre du vecteur
pub const FEATURE_NAMES: [&str; 3] = ["Flood_Risk_Index", "Runoff_Index", "Raw_Hydrology"];

/// Standardisation z = (x − mean) / scale
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Standardiser {
    pub mean: f64,
    pub scale: f64,
}

impl Standardiser {
    pub fn apply(&self, value: f64) -> f64 {
        (value - self.mean) / self.scale
    }

    /// Constantes utilisables : finies, échelle non nulle
    pub fn is_valid(&self) -> bool {
        self.mean.is_finite() && self.scale.is_finite() && self.scale != 0.0
    }
}

/// Constantes de standardisation des entrées brutes
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Standardisation {
    pub rainfall: Standardiser,
    pub elevation: Standardiser,
}

/// Vecteur de caractéristiques d'une requête
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FeatureVector {
    pub flood_risk_index: f64,
    pub runoff_index: f64,
    pub raw_hydrology: f64,
}

impl FeatureVector {
    /// Valeurs dans l'ordre de [`FEATURE_NAMES`]
    pub fn to_array(&self) -> [f64; 3] {
        [self.flood_risk_index, self.runoff_index, self.raw_hydrology]
    }
}

/// Entrée requise par le calcul des caractéristiques
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureInput {
    Hydrology,
    Elevation,
    Rainfall,
}

impl fmt::Display for FeatureInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FeatureInput::Hydrology => "hydrology",
            FeatureInput::Elevation => "elevation",
            FeatureInput::Rainfall => "rainfall",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FeatureError {
    #[error("insufficient environmental data for this location (missing: {})", join(.0))]
    MissingInput(Vec<FeatureInput>),

    #[error("unknown hydrology category '{0}' (not seen at training time)")]
    UnknownCategory(String),
}

fn join(inputs: &[FeatureInput]) -> String {
    inputs.iter().map(|i| i.to_string()).collect::<Vec<_>>().join(", ")
}

/// Calcul des caractéristiques à partir des sorties brutes des couches
#[derive(Debug, Clone)]
pub struct FeatureEngineer {
    encoding: BTreeMap<String, u32>,
    standardisation: Standardisation,
}

impl FeatureEngineer {
    pub fn new(encoding: BTreeMap<String, u32>, standardisation: Standardisation) -> Self {
        Self {
            encoding,
            standardisation,
        }
    }

    /// Même encodage, autres constantes de standardisation
    pub fn with_standardisation(self, standardisation: Standardisation) -> Self {
        Self {
            standardisation,
            ..self
        }
    }

    pub fn standardisation(&self) -> Standardisation {
        self.standardisation
    }

    /// Catégories connues à l'entraînement
    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.encoding.keys().map(String::as_str)
    }

    /// Calcule le vecteur, ou signale les entrées absentes / la catégorie inconnue
    pub fn derive(
        &self,
        hydrology: Option<&HydrologyRecord>,
        elevation: Option<&ElevationSample>,
        rainfall: Option<&RainfallSample>,
    ) -> Result<FeatureVector, FeatureError> {
        let (hydrology, elevation, rainfall) = match (hydrology, elevation, rainfall) {
            (Some(h), Some(e), Some(r)) => (h, e, r),
            (h, e, r) => {
                let mut missing = Vec::new();
                if h.is_none() {
                    missing.push(FeatureInput::Hydrology);
                }
                if e.is_none() {
                    missing.push(FeatureInput::Elevation);
                }
                if r.is_none() {
                    missing.push(FeatureInput::Rainfall);
                }
                return Err(FeatureError::MissingInput(missing));
            }
        };

        let ordinal = self
            .encoding
            .get(&hydrology.category)
            .ok_or_else(|| FeatureError::UnknownCategory(hydrology.category.clone()))?;

        let raw_hydrology = f64::from(*ordinal) * 2.0;
        let z_rain = self.standardisation.rainfall.apply(rainfall.annual);
        let z_elev = self.standardisation.elevation.apply(elevation.elevation);

        Ok(FeatureVector {
            flood_risk_index: z_rain - z_elev,
            runoff_index: (3.0 - raw_hydrology) - z_elev,
            raw_hydrology,
        })
    }
}
