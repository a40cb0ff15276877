//! Adaptateur du classifieur pré-entraîné
//!
//! L'artefact est chargé une fois au démarrage puis traité comme immuable.
//! Un artefact illisible ou incohérent rend le service indisponible.

pub mod artifact;
pub mod model;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{info, warn};

pub use artifact::{Artifact, FORMAT_VERSION};
pub use model::{ClusterId, Model, Prediction};

use crate::features::{FeatureEngineer, FeatureVector, Standardisation, Standardiser};

#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("cannot read classifier artifact {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed classifier artifact: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("unsupported classifier artifact format version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },

    #[error("invalid classifier artifact: {0}")]
    Invalid(String),
}

/// Classifieur prêt à prédire
#[derive(Debug, Clone)]
pub struct Classifier {
    model: Model,
    scaling: Option<Vec<Standardiser>>,
    labels: BTreeMap<ClusterId, String>,
    fingerprint: String,
}

impl Classifier {
    /// Charge l'artefact et construit le calcul de caractéristiques associé
    pub fn load(path: &Path) -> Result<(Self, FeatureEngineer), ClassifierError> {
        let bytes = std::fs::read(path).map_err(|source| ClassifierError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let loaded = Self::from_slice(&bytes)?;
        info!(
            path = %path.display(),
            model = loaded.0.family(),
            fingerprint = %loaded.0.fingerprint,
            "Classifieur chargé"
        );
        Ok(loaded)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<(Self, FeatureEngineer), ClassifierError> {
        let artifact = Artifact::from_slice(bytes)?;
        let fingerprint = hex::encode(blake3::hash(bytes).as_bytes());

        let engineer = FeatureEngineer::new(artifact.hydrology_encoding, artifact.standardisation);
        let classifier = Self {
            model: artifact.model,
            scaling: artifact.feature_scaling,
            labels: artifact.labels,
            fingerprint,
        };
        Ok((classifier, engineer))
    }

    /// Prédiction déterministe pour un vecteur complet.
    ///
    /// Une erreur signale un modèle incohérent, jamais une entrée inattendue.
    pub fn predict(&self, features: &FeatureVector) -> Result<Prediction, ClassifierError> {
        let mut x = features.to_array();
        if let Some(scaling) = &self.scaling {
            for (value, s) in x.iter_mut().zip(scaling) {
                *value = s.apply(*value);
            }
        }
        self.model.predict(&x).map_err(ClassifierError::Invalid)
    }

    /// Libellé qualitatif d'un cluster
    pub fn label(&self, cluster: ClusterId) -> Option<&str> {
        self.labels.get(&cluster).map(String::as_str)
    }

    /// Empreinte BLAKE3 (hex) de l'artefact
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn family(&self) -> &'static str {
        self.model.family()
    }

    pub fn classes(&self) -> Vec<ClusterId> {
        self.model.classes()
    }
}

/// Remplace les constantes de standardisation de l'artefact
pub fn override_standardisation(engineer: FeatureEngineer, standardisation: Standardisation) -> FeatureEngineer {
    warn!(
        ?standardisation,
        trained = ?engineer.standardisation(),
        "Constantes de standardisation remplacées par la configuration : l'espace des caractéristiques s'écarte de l'entraînement"
    );
    engineer.with_standardisation(standardisation)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ARTIFACT: &str = r#"{
        "format_version": 1,
        "feature_names": ["Flood_Risk_Index", "Runoff_Index", "Raw_Hydrology"],
        "hydrology_encoding": {"X": 1},
        "standardisation": {"rainfall": {"mean": 900, "scale": 200}, "elevation": {"mean": 100, "scale": 50}},
        "feature_scaling": [{"mean": 0, "scale": 2}, {"mean": 0, "scale": 2}, {"mean": 0, "scale": 2}],
        "model": {"type": "nearest_centroid", "centroids": [
            {"label": 0, "center": [0, 0, 0]},
            {"label": 1, "center": [0.8, 1.05, 1.0]}
        ]}
    }"#;

    #[test]
    fn test_scaling_applied_before_model() {
        let (classifier, _) = Classifier::from_slice(ARTIFACT.as_bytes()).unwrap();
        let v = FeatureVector {
            flood_risk_index: 1.6,
            runoff_index: 2.1,
            raw_hydrology: 2.0,
        };
        assert_eq!(classifier.predict(&v).unwrap().cluster, 1);
        assert_eq!(classifier.label(1), Some("Moderate-to-High"));
        assert_eq!(classifier.classes(), vec![0, 1]);
    }

    #[test]
    fn test_fingerprint_stable() {
        let (a, _) = Classifier::from_slice(ARTIFACT.as_bytes()).unwrap();
        let (b, _) = Classifier::from_slice(ARTIFACT.as_bytes()).unwrap();
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint().len(), 64);
        assert_eq!(a.fingerprint(), blake3::hash(ARTIFACT.as_bytes()).to_hex().as_str());
    }

    #[test]
    fn test_missing_file() {
        let err = Classifier::load(Path::new("/nonexistent/classifier.json")).unwrap_err();
        assert!(matches!(err, ClassifierError::Io { .. }));
    }
}
