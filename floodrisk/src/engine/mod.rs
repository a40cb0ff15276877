//! Orchestration d'une résolution
//!
//! Par requête :
//! 1. normalisation de la coordonnée (refus → `InvalidCoordinate`)
//! 2. recherche indépendante et parallèle dans les quatre couches
//! 3. calcul des caractéristiques si hydrologie, altitude et précipitations sont présentes
//! 4. classification, ou raison lisible de son absence
//!
//! Les données disponibles sont toujours renvoyées ; seule la classification est
//! marquée en erreur quand une entrée manque.

pub mod response;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use futures::stream::{self, Stream, StreamExt};
use geolayers::{
    load_polygonal, load_sampled, ElevationSample, HydrologyRecord, LayerError, LayerIndex, LayerKind,
    RainfallSample, SoilRecord,
};
use thiserror::Error;
use tracing::{debug, error, info};

pub use response::{Classification, ResolutionResponse, ResolveRequest};

use crate::classifier::{self, Classifier, ClassifierError};
use crate::config::EngineConfig;
use crate::features::FeatureEngineer;
use crate::normalize::{GridPoint, NormalizeError, Normalizer};
use crate::report::{ArtifactInfo, LoadReport};

#[derive(Debug, Error)]
pub enum EngineError {
    /// Coordonnée refusée avant toute recherche
    #[error(transparent)]
    InvalidCoordinate(#[from] NormalizeError),

    /// Couche illisible ou trop de rejets au démarrage
    #[error("cannot build {layer} layer index from {path}: {source}")]
    LayerIndexBuild {
        layer: LayerKind,
        path: PathBuf,
        #[source]
        source: LayerError,
    },

    /// Artefact absent ou invalide au démarrage
    #[error("classifier unavailable: {0}")]
    ClassifierUnavailable(#[from] ClassifierError),

    /// Requête illisible (mode batch)
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("resolution task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl EngineError {
    fn layer(layer: LayerKind, path: &Path, source: LayerError) -> Self {
        EngineError::LayerIndexBuild {
            layer,
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Les quatre couches de référence indexées
#[derive(Debug)]
pub struct ReferenceLayers {
    pub soil: LayerIndex<SoilRecord>,
    pub hydrology: LayerIndex<HydrologyRecord>,
    pub elevation: LayerIndex<ElevationSample>,
    pub rainfall: LayerIndex<RainfallSample>,
}

/// Moteur de résolution, immuable après chargement et partagé via `Arc`
#[derive(Debug)]
pub struct Engine {
    normalizer: Normalizer,
    layers: ReferenceLayers,
    engineer: FeatureEngineer,
    classifier: Classifier,
}

impl Engine {
    pub fn new(
        normalizer: Normalizer,
        layers: ReferenceLayers,
        classifier: Classifier,
        engineer: FeatureEngineer,
    ) -> Self {
        Self {
            normalizer,
            layers,
            engineer,
            classifier,
        }
    }

    /// Charge couches et classifieur en parallèle ; toute erreur est fatale
    pub fn load(config: &EngineConfig) -> Result<(Self, LoadReport), EngineError> {
        let start = Instant::now();
        let tolerance = config.max_rejected_records;
        let paths = &config.layers;
        let elevation_radius = config.sample_radius(LayerKind::Elevation);
        let rainfall_radius = config.sample_radius(LayerKind::Rainfall);

        let (((soil, hydrology), (elevation, rainfall)), loaded_classifier) = rayon::join(
            || {
                rayon::join(
                    || {
                        rayon::join(
                            || load_polygonal::<SoilRecord>(&paths.soil, tolerance),
                            || load_polygonal::<HydrologyRecord>(&paths.hydrology, tolerance),
                        )
                    },
                    || {
                        rayon::join(
                            || load_sampled::<ElevationSample>(&paths.elevation, tolerance, elevation_radius),
                            || load_sampled::<RainfallSample>(&paths.rainfall, tolerance, rainfall_radius),
                        )
                    },
                )
            },
            || Classifier::load(&config.model),
        );

        let soil = soil.map_err(|e| EngineError::layer(LayerKind::Soil, &paths.soil, e))?;
        let hydrology = hydrology.map_err(|e| EngineError::layer(LayerKind::Hydrology, &paths.hydrology, e))?;
        let elevation = elevation.map_err(|e| EngineError::layer(LayerKind::Elevation, &paths.elevation, e))?;
        let rainfall = rainfall.map_err(|e| EngineError::layer(LayerKind::Rainfall, &paths.rainfall, e))?;
        let (classifier, mut engineer) = loaded_classifier?;

        if let Some(standardisation) = config.standardisation {
            engineer = classifier::override_standardisation(engineer, standardisation);
        }

        let mut report = LoadReport::new();
        report.record_layer(LayerKind::Soil, &paths.soil, &soil, None);
        report.record_layer(LayerKind::Hydrology, &paths.hydrology, &hydrology, None);
        report.record_layer(LayerKind::Elevation, &paths.elevation, &elevation, Some(elevation_radius));
        report.record_layer(LayerKind::Rainfall, &paths.rainfall, &rainfall, Some(rainfall_radius));
        report.record_artifact(ArtifactInfo {
            source: config.model.display().to_string(),
            model: classifier.family().to_string(),
            classes: classifier.classes(),
            fingerprint: classifier.fingerprint().to_string(),
        });
        report.set_duration(start.elapsed());
        report.finalize();

        info!(
            duration_ms = start.elapsed().as_millis() as u64,
            "{}",
            report.summary()
        );

        let layers = ReferenceLayers {
            soil: soil.index,
            hydrology: hydrology.index,
            elevation: elevation.index,
            rainfall: rainfall.index,
        };
        let engine = Self::new(Normalizer::new(config.bbox_margin_m), layers, classifier, engineer);
        Ok((engine, report))
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    pub fn layers(&self) -> &ReferenceLayers {
        &self.layers
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    /// Résout une requête ; seule une coordonnée invalide est une erreur
    pub fn resolve(&self, request: &ResolveRequest) -> Result<ResolutionResponse, EngineError> {
        let point = self
            .normalizer
            .normalize(request.easting, request.northing, request.crs)
            .inspect_err(|e| debug!(?request, error = %e, "Coordonnée refusée"))?;
        Ok(self.resolve_point(point))
    }

    fn resolve_point(&self, point: GridPoint) -> ResolutionResponse {
        let (e, n) = (point.easting, point.northing);
        let layers = &self.layers;

        let ((soil, hydrology), (elevation, rainfall)) = rayon::join(
            || rayon::join(|| layers.soil.lookup(e, n), || layers.hydrology.lookup(e, n)),
            || rayon::join(|| layers.elevation.lookup(e, n), || layers.rainfall.lookup(e, n)),
        );

        debug!(
            easting = e,
            northing = n,
            soil = soil.map(|h| h.id),
            hydrology = hydrology.map(|h| h.id),
            elevation = elevation.map(|h| h.id),
            rainfall = rainfall.map(|h| h.id),
            "Couches résolues"
        );

        let derived = self.engineer.derive(
            hydrology.map(|h| h.record),
            elevation.map(|h| h.record),
            rainfall.map(|h| h.record),
        );

        let classification = match derived {
            Ok(features) => match self.classifier.predict(&features) {
                Ok(prediction) => Classification::Predicted {
                    cluster_prediction: prediction.cluster,
                    cluster_label: self.classifier.label(prediction.cluster).map(str::to_string),
                    cluster_confidence: prediction.confidence,
                },
                Err(err) => {
                    error!(easting = e, northing = n, error = %err, "Classifieur incohérent");
                    Classification::Failed {
                        cluster_prediction_error: err.to_string(),
                    }
                }
            },
            Err(reason) => {
                debug!(easting = e, northing = n, %reason, "Classification impossible");
                Classification::Failed {
                    cluster_prediction_error: reason.to_string(),
                }
            }
        };

        ResolutionResponse {
            location: point,
            soil_data: soil.map(|h| h.record.clone()),
            hydrology_data: hydrology.map(|h| h.record.clone()),
            elevation_data: elevation.map(|h| *h.record),
            rainfall_data: rainfall.map(|h| *h.record),
            classification,
        }
    }
}

/// Résout un flux de requêtes sur le pool bloquant de tokio.
///
/// Au plus `jobs` requêtes en vol ; les réponses sortent dans l'ordre des requêtes.
pub fn resolve_stream<S>(
    engine: Arc<Engine>,
    requests: S,
    jobs: usize,
) -> impl Stream<Item = Result<ResolutionResponse, EngineError>>
where
    S: Stream<Item = Result<ResolveRequest, EngineError>>,
{
    requests
        .map(move |request| {
            let engine = Arc::clone(&engine);
            async move {
                let request = request?;
                tokio::task::spawn_blocking(move || engine.resolve(&request)).await?
            }
        })
        .buffered(jobs.max(1))
}

/// Résout un lot de requêtes, dans l'ordre
pub async fn resolve_batch(
    engine: Arc<Engine>,
    requests: Vec<ResolveRequest>,
    jobs: usize,
) -> Vec<Result<ResolutionResponse, EngineError>> {
    resolve_stream(engine, stream::iter(requests.into_iter().map(Ok)), jobs)
        .collect()
        .await
}
