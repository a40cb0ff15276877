//! Réponse d'une résolution

use geolayers::{ElevationSample, HydrologyRecord, RainfallSample, SoilRecord};
use serde::{Deserialize, Serialize};

use crate::classifier::ClusterId;
use crate::normalize::{Crs, GridPoint};

/// Requête : une coordonnée et son système
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct ResolveRequest {
    pub easting: f64,
    pub northing: f64,
    #[serde(default)]
    pub crs: Crs,
}

impl ResolveRequest {
    pub fn irish_grid(easting: f64, northing: f64) -> Self {
        Self {
            easting,
            northing,
            crs: Crs::IrishGrid,
        }
    }
}

/// Issue de l'étape de classification : prédiction ou raison de l'échec
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Classification {
    Predicted {
        cluster_prediction: ClusterId,
        #[serde(skip_serializing_if = "Option::is_none")]
        cluster_label: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        cluster_confidence: Option<f64>,
    },
    Failed {
        cluster_prediction_error: String,
    },
}

/// Attributs disponibles au point, et classification.
///
/// Construite à chaque requête, jamais conservée.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolutionResponse {
    /// Coordonnée normalisée (Irish Grid)
    pub location: GridPoint,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub soil_data: Option<SoilRecord>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub hydrology_data: Option<HydrologyRecord>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub elevation_data: Option<ElevationSample>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub rainfall_data: Option<RainfallSample>,

    #[serde(flatten)]
    pub classification: Classification,
}

impl ResolutionResponse {
    pub fn cluster_prediction(&self) -> Option<ClusterId> {
        match self.classification {
            Classification::Predicted { cluster_prediction, .. } => Some(cluster_prediction),
            Classification::Failed { .. } => None,
        }
    }

    pub fn cluster_prediction_error(&self) -> Option<&str> {
        match &self.classification {
            Classification::Predicted { .. } => None,
            Classification::Failed {
                cluster_prediction_error,
            } => Some(cluster_prediction_error),
        }
    }
}
