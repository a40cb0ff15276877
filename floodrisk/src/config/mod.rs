//! Configuration du moteur
//!
//! Sources, par priorité croissante :
//! 1. fichier JSON (`--config`)
//! 2. variables d'environnement `FLOODRISK_*` (`.env` compris)
//! 3. options de la ligne de commande
//!
//! La surcharge de standardisation passe par le fichier (`standardisation`) ou par
//! `FLOODRISK_STANDARDISATION`, un JSON `{"rainfall": {"mean", "scale"}, "elevation": {...}}`.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use geolayers::LayerKind;
use serde::{Deserialize, Serialize};

use crate::features::Standardisation;

pub const ENV_SOIL_PATH: &str = "FLOODRISK_SOIL_PATH";
pub const ENV_HYDROLOGY_PATH: &str = "FLOODRISK_HYDROLOGY_PATH";
pub const ENV_ELEVATION_PATH: &str = "FLOODRISK_ELEVATION_PATH";
pub const ENV_RAINFALL_PATH: &str = "FLOODRISK_RAINFALL_PATH";
pub const ENV_MODEL_PATH: &str = "FLOODRISK_MODEL_PATH";
pub const ENV_SEARCH_RADIUS: &str = "FLOODRISK_SEARCH_RADIUS";
pub const ENV_BBOX_MARGIN: &str = "FLOODRISK_BBOX_MARGIN";
pub const ENV_MAX_REJECTED: &str = "FLOODRISK_MAX_REJECTED";
pub const ENV_STANDARDISATION: &str = "FLOODRISK_STANDARDISATION";

/// Chemins des quatre couches de référence
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LayerPaths {
    pub soil: PathBuf,
    pub hydrology: PathBuf,
    pub elevation: PathBuf,
    pub rainfall: PathBuf,
}

impl LayerPaths {
    pub fn get(&self, kind: LayerKind) -> &Path {
        match kind {
            LayerKind::Soil => &self.soil,
            LayerKind::Hydrology => &self.hydrology,
            LayerKind::Elevation => &self.elevation,
            LayerKind::Rainfall => &self.rainfall,
        }
    }
}

/// Configuration principale
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineConfig {
    pub layers: LayerPaths,

    /// Artefact JSON du classifieur
    pub model: PathBuf,

    /// Rayon maximal de recherche du plus proche échantillon (mètres)
    #[serde(default = "default_search_radius")]
    pub search_radius_m: f64,

    /// Rayon propre à la couche d'altitude
    #[serde(default)]
    pub elevation_radius_m: Option<f64>,

    /// Rayon propre à la couche de précipitations
    #[serde(default)]
    pub rainfall_radius_m: Option<f64>,

    /// Marge autour de l'emprise du territoire (mètres)
    #[serde(default = "default_bbox_margin")]
    pub bbox_margin_m: f64,

    /// Nombre d'enregistrements rejetés tolérés par couche
    #[serde(default)]
    pub max_rejected_records: usize,

    /// Remplace les constantes de standardisation de l'artefact
    #[serde(default)]
    pub standardisation: Option<Standardisation>,
}

fn default_search_radius() -> f64 {
    5_000.0
}

fn default_bbox_margin() -> f64 {
    10_000.0
}

/// Valeurs fournies par l'environnement ou la ligne de commande
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub soil: Option<PathBuf>,
    pub hydrology: Option<PathBuf>,
    pub elevation: Option<PathBuf>,
    pub rainfall: Option<PathBuf>,
    pub model: Option<PathBuf>,
    pub search_radius_m: Option<f64>,
    pub bbox_margin_m: Option<f64>,
    pub max_rejected_records: Option<usize>,
    pub standardisation: Option<Standardisation>,
}

impl ConfigOverrides {
    /// Lit les variables `FLOODRISK_*` du processus
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Lit les variables via `lookup` (testable sans toucher à l'environnement)
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let path = |name: &str| lookup(name).filter(|v| !v.trim().is_empty()).map(PathBuf::from);

        Ok(Self {
            soil: path(ENV_SOIL_PATH),
            hydrology: path(ENV_HYDROLOGY_PATH),
            elevation: path(ENV_ELEVATION_PATH),
            rainfall: path(ENV_RAINFALL_PATH),
            model: path(ENV_MODEL_PATH),
            search_radius_m: parse_var(&lookup, ENV_SEARCH_RADIUS)?,
            bbox_margin_m: parse_var(&lookup, ENV_BBOX_MARGIN)?,
            max_rejected_records: parse_var(&lookup, ENV_MAX_REJECTED)?,
            standardisation: parse_json_var(&lookup, ENV_STANDARDISATION)?,
        })
    }

    /// Fusionne : les valeurs de `other` l'emportent
    pub fn merge(self, other: ConfigOverrides) -> Self {
        Self {
            soil: other.soil.or(self.soil),
            hydrology: other.hydrology.or(self.hydrology),
            elevation: other.elevation.or(self.elevation),
            rainfall: other.rainfall.or(self.rainfall),
            model: other.model.or(self.model),
            search_radius_m: other.search_radius_m.or(self.search_radius_m),
            bbox_margin_m: other.bbox_margin_m.or(self.bbox_margin_m),
            max_rejected_records: other.max_rejected_records.or(self.max_rejected_records),
            standardisation: other.standardisation.or(self.standardisation),
        }
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(name) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map(Some)
            .with_context(|| format!("Invalid value for {}: {:?}", name, raw)),
        _ => Ok(None),
    }
}

fn parse_json_var<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Result<Option<T>>
where
    T: serde::de::DeserializeOwned,
{
    match lookup(name) {
        Some(raw) if !raw.trim().is_empty() => serde_json::from_str(&raw)
            .map(Some)
            .with_context(|| format!("Invalid JSON for {}: {:?}", name, raw)),
        _ => Ok(None),
    }
}

impl EngineConfig {
    /// Charge une configuration depuis un fichier
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .context(format!("Failed to read config file: {}", path.display()))?;

        serde_json::from_str(&content).context("Failed to parse config JSON")
    }

    /// Construit la configuration finale à partir du fichier éventuel et des surcharges
    pub fn resolve(file: Option<&Path>, overrides: ConfigOverrides) -> Result<Self> {
        let mut config = match file {
            Some(path) => Self::load(path)?,
            None => Self::from_overrides(&overrides)?,
        };
        config.apply(overrides);
        config.validate()?;
        Ok(config)
    }

    fn from_overrides(overrides: &ConfigOverrides) -> Result<Self> {
        let required = |value: &Option<PathBuf>, env: &str, flag: &str| -> Result<PathBuf> {
            value
                .clone()
                .with_context(|| format!("Missing {} (set {} or pass --{})", flag, env, flag))
        };

        Ok(Self {
            layers: LayerPaths {
                soil: required(&overrides.soil, ENV_SOIL_PATH, "soil")?,
                hydrology: required(&overrides.hydrology, ENV_HYDROLOGY_PATH, "hydrology")?,
                elevation: required(&overrides.elevation, ENV_ELEVATION_PATH, "elevation")?,
                rainfall: required(&overrides.rainfall, ENV_RAINFALL_PATH, "rainfall")?,
            },
            model: required(&overrides.model, ENV_MODEL_PATH, "model")?,
            search_radius_m: default_search_radius(),
            elevation_radius_m: None,
            rainfall_radius_m: None,
            bbox_margin_m: default_bbox_margin(),
            max_rejected_records: 0,
            standardisation: None,
        })
    }

    fn apply(&mut self, overrides: ConfigOverrides) {
        if let Some(p) = overrides.soil {
            self.layers.soil = p;
        }
        if let Some(p) = overrides.hydrology {
            self.layers.hydrology = p;
        }
        if let Some(p) = overrides.elevation {
            self.layers.elevation = p;
        }
        if let Some(p) = overrides.rainfall {
            self.layers.rainfall = p;
        }
        if let Some(p) = overrides.model {
            self.model = p;
        }
        if let Some(r) = overrides.search_radius_m {
            self.search_radius_m = r;
        }
        if let Some(m) = overrides.bbox_margin_m {
            self.bbox_margin_m = m;
        }
        if let Some(n) = overrides.max_rejected_records {
            self.max_rejected_records = n;
        }
        if let Some(s) = overrides.standardisation {
            self.standardisation = Some(s);
        }
    }

    /// Vérifie les valeurs numériques
    pub fn validate(&self) -> Result<()> {
        for (name, radius) in [
            ("search_radius_m", Some(self.search_radius_m)),
            ("elevation_radius_m", self.elevation_radius_m),
            ("rainfall_radius_m", self.rainfall_radius_m),
        ] {
            if let Some(r) = radius {
                if !r.is_finite() || r <= 0.0 {
                    bail!("{} must be a positive finite distance, got {}", name, r);
                }
            }
        }
        if !self.bbox_margin_m.is_finite() || self.bbox_margin_m < 0.0 {
            bail!("bbox_margin_m must be a non-negative finite distance, got {}", self.bbox_margin_m);
        }
        if let Some(s) = &self.standardisation {
            if !s.rainfall.is_valid() || !s.elevation.is_valid() {
                bail!("standardisation override requires finite means and non-zero scales");
            }
        }
        Ok(())
    }

    /// Rayon de recherche effectif d'une couche échantillonnée
    pub fn sample_radius(&self, kind: LayerKind) -> f64 {
        match kind {
            LayerKind::Elevation => self.elevation_radius_m.unwrap_or(self.search_radius_m),
            LayerKind::Rainfall => self.rainfall_radius_m.unwrap_or(self.search_radius_m),
            LayerKind::Soil | LayerKind::Hydrology => self.search_radius_m,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> ConfigOverrides {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        ConfigOverrides::from_lookup(|name| map.get(name).cloned()).unwrap()
    }

    fn full_env() -> ConfigOverrides {
        env(&[
            (ENV_SOIL_PATH, "data/soil.csv"),
            (ENV_HYDROLOGY_PATH, "data/hydrology.csv"),
            (ENV_ELEVATION_PATH, "data/elevation.csv"),
            (ENV_RAINFALL_PATH, "data/rainfall.csv"),
            (ENV_MODEL_PATH, "model/classifier.json"),
            (ENV_SEARCH_RADIUS, "2500"),
        ])
    }

    #[test]
    fn test_from_env() {
        let config = EngineConfig::resolve(None, full_env()).unwrap();
        assert_eq!(config.layers.soil, PathBuf::from("data/soil.csv"));
        assert_eq!(config.search_radius_m, 2500.0);
        assert_eq!(config.bbox_margin_m, 10_000.0);
        assert_eq!(config.max_rejected_records, 0);
    }

    #[test]
    fn test_missing_path() {
        let err = EngineConfig::resolve(None, env(&[(ENV_SOIL_PATH, "soil.csv")])).unwrap_err();
        assert!(err.to_string().contains(ENV_HYDROLOGY_PATH));
    }

    #[test]
    fn test_invalid_number() {
        let err = ConfigOverrides::from_lookup(|name| (name == ENV_MAX_REJECTED).then(|| "many".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains(ENV_MAX_REJECTED));
    }

    #[test]
    fn test_cli_overrides_env() {
        let cli = ConfigOverrides {
            search_radius_m: Some(100.0),
            model: Some(PathBuf::from("other.json")),
            ..Default::default()
        };
        let config = EngineConfig::resolve(None, full_env().merge(cli)).unwrap();
        assert_eq!(config.search_radius_m, 100.0);
        assert_eq!(config.model, PathBuf::from("other.json"));
        assert_eq!(config.layers.rainfall, PathBuf::from("data/rainfall.csv"));
    }

    #[test]
    fn test_file_with_overrides() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(
            &mut file,
            br#"{
                "layers": {"soil": "s.csv", "hydrology": "h.csv", "elevation": "e.csv", "rainfall": "r.csv"},
                "model": "m.json",
                "rainfall_radius_m": 1500,
                "max_rejected_records": 3
            }"#,
        )
        .unwrap();

        let overrides = ConfigOverrides {
            bbox_margin_m: Some(0.0),
            ..Default::default()
        };
        let config = EngineConfig::resolve(Some(file.path()), overrides).unwrap();
        assert_eq!(config.max_rejected_records, 3);
        assert_eq!(config.bbox_margin_m, 0.0);
        assert_eq!(config.sample_radius(LayerKind::Rainfall), 1500.0);
        assert_eq!(config.sample_radius(LayerKind::Elevation), 5_000.0);
    }

    #[test]
    fn test_standardisation_from_env() {
        let mut pairs = vec![(
            ENV_STANDARDISATION,
            r#"{"rainfall": {"mean": 1000, "scale": 250}, "elevation": {"mean": 80, "scale": 40}}"#,
        )];
        pairs.extend([
            (ENV_SOIL_PATH, "s.csv"),
            (ENV_HYDROLOGY_PATH, "h.csv"),
            (ENV_ELEVATION_PATH, "e.csv"),
            (ENV_RAINFALL_PATH, "r.csv"),
            (ENV_MODEL_PATH, "m.json"),
        ]);
        let config = EngineConfig::resolve(None, env(&pairs)).unwrap();
        let s = config.standardisation.unwrap();
        assert_eq!((s.rainfall.mean, s.rainfall.scale), (1000.0, 250.0));
        assert_eq!((s.elevation.mean, s.elevation.scale), (80.0, 40.0));
    }

    #[test]
    fn test_standardisation_env_overrides_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(
            &mut file,
            br#"{
                "layers": {"soil": "s.csv", "hydrology": "h.csv", "elevation": "e.csv", "rainfall": "r.csv"},
                "model": "m.json",
                "standardisation": {"rainfall": {"mean": 900, "scale": 200}, "elevation": {"mean": 100, "scale": 50}}
            }"#,
        )
        .unwrap();

        let overrides = env(&[(
            ENV_STANDARDISATION,
            r#"{"rainfall": {"mean": 950, "scale": 200}, "elevation": {"mean": 100, "scale": 50}}"#,
        )]);
        let config = EngineConfig::resolve(Some(file.path()), overrides).unwrap();
        assert_eq!(config.standardisation.unwrap().rainfall.mean, 950.0);
    }

    #[test]
    fn test_invalid_standardisation_json() {
        let err = ConfigOverrides::from_lookup(|name| (name == ENV_STANDARDISATION).then(|| "{".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains(ENV_STANDARDISATION));

        let zero_scale = env(&[
            (ENV_SOIL_PATH, "s.csv"),
            (ENV_HYDROLOGY_PATH, "h.csv"),
            (ENV_ELEVATION_PATH, "e.csv"),
            (ENV_RAINFALL_PATH, "r.csv"),
            (ENV_MODEL_PATH, "m.json"),
            (
                ENV_STANDARDISATION,
                r#"{"rainfall": {"mean": 900, "scale": 0}, "elevation": {"mean": 100, "scale": 50}}"#,
            ),
        ]);
        assert!(EngineConfig::resolve(None, zero_scale).is_err());
    }

    #[test]
    fn test_validate_radius() {
        let cli = ConfigOverrides {
            search_radius_m: Some(-1.0),
            ..Default::default()
        };
        assert!(EngineConfig::resolve(None, full_env().merge(cli)).is_err());
    }
}
