//! Format JSON de l'artefact du classifieur
//!
//! L'artefact fige tout ce que l'entraînement a produit : encodage des catégories
//! hydrologiques, constantes de standardisation, mise à l'échelle éventuelle des
//! caractéristiques, libellés des clusters et modèle.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::model::{ClusterId, Model, CLUSTERS};
use super::ClassifierError;
use crate::features::{Standardisation, Standardiser, FEATURE_NAMES};

/// Version du format supportée
pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact {
    pub format_version: u32,

    /// Ordre du vecteur de caractéristiques
    pub feature_names: Vec<String>,

    /// Catégorie hydrologique → ordinal (encodage de l'entraînement)
    pub hydrology_encoding: BTreeMap<String, u32>,

    /// Standardisation des précipitations et de l'altitude
    pub standardisation: Standardisation,

    /// Mise à l'échelle appliquée au vecteur avant le modèle
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_scaling: Option<Vec<Standardiser>>,

    /// Libellés qualitatifs des clusters
    #[serde(default = "default_labels")]
    pub labels: BTreeMap<ClusterId, String>,

    pub model: Model,
}

/// Libellés du regroupement d'origine
pub fn default_labels() -> BTreeMap<ClusterId, String> {
    [(0, "Low"), (1, "Moderate-to-High"), (2, "Moderate"), (3, "Low-to-Moderate")]
        .into_iter()
        .map(|(id, label)| (id, label.to_string()))
        .collect()
}

impl Artifact {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, ClassifierError> {
        let artifact: Artifact = serde_json::from_slice(bytes)?;
        artifact.validate()?;
        Ok(artifact)
    }

    /// Vérifie la cohérence complète de l'artefact
    pub fn validate(&self) -> Result<(), ClassifierError> {
        if self.format_version != FORMAT_VERSION {
            return Err(ClassifierError::UnsupportedVersion {
                found: self.format_version,
                expected: FORMAT_VERSION,
            });
        }

        if self.feature_names.iter().map(String::as_str).ne(FEATURE_NAMES) {
            return Err(invalid(format!(
                "feature_names must be {:?}, found {:?}",
                FEATURE_NAMES, self.feature_names
            )));
        }

        if self.hydrology_encoding.is_empty() {
            return Err(invalid("hydrology_encoding is empty"));
        }

        for (name, s) in [
            ("rainfall", &self.standardisation.rainfall),
            ("elevation", &self.standardisation.elevation),
        ] {
            if !s.is_valid() {
                return Err(invalid(format!("standardisation.{}: finite mean and non-zero scale required", name)));
            }
        }

        if let Some(scaling) = &self.feature_scaling {
            if scaling.len() != FEATURE_NAMES.len() {
                return Err(invalid(format!(
                    "feature_scaling has {} entries, expected {}",
                    scaling.len(),
                    FEATURE_NAMES.len()
                )));
            }
            if scaling.iter().any(|s| !s.is_valid()) {
                return Err(invalid("feature_scaling: finite mean and non-zero scale required"));
            }
        }

        if let Some(id) = self.labels.keys().find(|id| !CLUSTERS.contains(id)) {
            return Err(invalid(format!("label for unknown cluster {}", id)));
        }

        self.model.validate(FEATURE_NAMES.len()).map_err(invalid)
    }
}

fn invalid(message: impl Into<String>) -> ClassifierError {
    ClassifierError::Invalid(message.into())
}
