//! Index spatiaux des couches de référence
//!
//! Deux formes de couches coexistent :
//! - polygonale : on cherche le polygone contenant le point
//! - échantillonnée : on cherche l'échantillon le plus proche
//!
//! [`LayerIndex`] masque cette différence derrière une seule opération `lookup`.

pub mod polygon;
pub mod sample;

use std::path::Path;

use geo::Rect;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::LayerError;
use crate::source;
use crate::types::{LayerRecord, LoadOutcome, PolygonFeature, RecordId, RejectedRecord, SamplePoint};

pub use polygon::PolygonIndex;
pub use sample::SampleIndex;

/// Résultat d'une recherche dans une couche
#[derive(Debug)]
pub struct Hit<'a, R> {
    pub id: RecordId,
    pub record: &'a R,
    /// Distance à l'échantillon retenu (couches échantillonnées uniquement)
    pub distance: Option<f64>,
}

impl<R> Clone for Hit<'_, R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<R> Copy for Hit<'_, R> {}

/// Forme géométrique d'une couche
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerShape {
    Polygonal,
    Sampled,
}

/// Index d'une couche, polygonale ou échantillonnée
#[derive(Debug)]
pub enum LayerIndex<R> {
    Polygonal(PolygonIndex<R>),
    Sampled(SampleIndex<R>),
}

impl<R> LayerIndex<R> {
    /// Enregistrement applicable au point (easting, northing) en Irish Grid
    pub fn lookup(&self, easting: f64, northing: f64) -> Option<Hit<'_, R>> {
        match self {
            LayerIndex::Polygonal(index) => index.lookup(easting, northing).map(|f| Hit {
                id: f.id,
                record: &f.record,
                distance: None,
            }),
            LayerIndex::Sampled(index) => index.nearest(easting, northing).map(|(s, d)| Hit {
                id: s.id,
                record: &s.record,
                distance: Some(d),
            }),
        }
    }

    pub fn shape(&self) -> LayerShape {
        match self {
            LayerIndex::Polygonal(_) => LayerShape::Polygonal,
            LayerIndex::Sampled(_) => LayerShape::Sampled,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            LayerIndex::Polygonal(index) => index.len(),
            LayerIndex::Sampled(index) => index.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn extent(&self) -> Option<Rect<f64>> {
        match self {
            LayerIndex::Polygonal(index) => index.extent(),
            LayerIndex::Sampled(index) => index.extent(),
        }
    }
}

/// Couche chargée et indexée, avec le bilan du chargement
#[derive(Debug)]
pub struct LoadedLayer<R> {
    pub index: LayerIndex<R>,
    pub rejected: Vec<RejectedRecord>,
    /// Nombre d'enregistrements lus (valides + rejetés)
    pub total: usize,
}

impl<R> LoadedLayer<R> {
    pub fn loaded(&self) -> usize {
        self.index.len()
    }
}

/// Vérifie la tolérance aux rejets puis la présence d'au moins un enregistrement
fn check_outcome<R: LayerRecord, T>(outcome: &LoadOutcome<T>, tolerance: usize) -> Result<(), LayerError> {
    let rejected = outcome.rejected.len();
    if rejected > tolerance {
        return Err(LayerError::TooManyRejected {
            layer: R::KIND,
            rejected,
            total: outcome.total(),
            tolerance,
        });
    }
    if outcome.records.is_empty() {
        return Err(LayerError::EmptyLayer(R::KIND));
    }
    Ok(())
}

/// Construit l'index d'une couche polygonale déjà lue
pub fn index_polygons<R: LayerRecord>(
    outcome: LoadOutcome<PolygonFeature<R>>,
    tolerance: usize,
) -> Result<LoadedLayer<R>, LayerError> {
    check_outcome::<R, _>(&outcome, tolerance)?;
    let total = outcome.total();
    let index = PolygonIndex::build(outcome.records);
    debug!(layer = %R::KIND, polygons = index.len(), "Index polygonal construit");
    Ok(LoadedLayer {
        index: LayerIndex::Polygonal(index),
        rejected: outcome.rejected,
        total,
    })
}

/// Construit l'index d'une couche échantillonnée déjà lue
pub fn index_samples<R: LayerRecord>(
    outcome: LoadOutcome<SamplePoint<R>>,
    tolerance: usize,
    max_radius: f64,
) -> Result<LoadedLayer<R>, LayerError> {
    check_outcome::<R, _>(&outcome, tolerance)?;
    let total = outcome.total();
    let index = SampleIndex::build(outcome.records, max_radius);
    debug!(layer = %R::KIND, samples = index.len(), max_radius, "Index d'échantillons construit");
    Ok(LoadedLayer {
        index: LayerIndex::Sampled(index),
        rejected: outcome.rejected,
        total,
    })
}

/// Lit et indexe une couche polygonale (CSV+WKT ou GeoJSON)
pub fn load_polygonal<R: LayerRecord>(path: &Path, tolerance: usize) -> Result<LoadedLayer<R>, LayerError> {
    let layer = index_polygons(source::read_polygons::<R>(path)?, tolerance)?;
    info!(
        layer = %R::KIND,
        loaded = layer.loaded(),
        rejected = layer.rejected.len(),
        "Couche chargée"
    );
    Ok(layer)
}

/// Lit et indexe une couche échantillonnée (CSV ou GeoJSON de points)
pub fn load_sampled<R: LayerRecord>(
    path: &Path,
    tolerance: usize,
    max_radius: f64,
) -> Result<LoadedLayer<R>, LayerError> {
    let layer = index_samples(source::read_samples::<R>(path)?, tolerance, max_radius)?;
    info!(
        layer = %R::KIND,
        loaded = layer.loaded(),
        rejected = layer.rejected.len(),
        "Couche chargée"
    );
    Ok(layer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ElevationSample, LayerKind};

    fn outcome(n: u32, rejected: usize) -> LoadOutcome<SamplePoint<ElevationSample>> {
        LoadOutcome {
            records: (0..n)
                .map(|id| SamplePoint {
                    id,
                    easting: id as f64 * 100.0,
                    northing: 0.0,
                    record: ElevationSample { elevation: id as f64 },
                })
                .collect(),
            rejected: (0..rejected)
                .map(|i| RejectedRecord {
                    record: n as usize + i,
                    reason: "bad".into(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_lookup_through_enum() {
        let layer = index_samples(outcome(3, 0), 0, 1000.0).unwrap();
        assert_eq!(layer.index.shape(), LayerShape::Sampled);
        let hit = layer.index.lookup(190.0, 10.0).unwrap();
        assert_eq!(hit.id, 2);
        assert_eq!(hit.record.elevation, 2.0);
        assert!(hit.distance.unwrap() > 0.0);
        assert_eq!(layer.total, 3);
    }

    #[test]
    fn test_tolerance_exceeded() {
        let err = index_samples(outcome(3, 2), 1, 1000.0).unwrap_err();
        match err {
            LayerError::TooManyRejected {
                layer,
                rejected,
                total,
                tolerance,
            } => {
                assert_eq!(layer, LayerKind::Elevation);
                assert_eq!((rejected, total, tolerance), (2, 5, 1));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_tolerance_respected() {
        let layer = index_samples(outcome(3, 2), 2, 1000.0).unwrap();
        assert_eq!(layer.loaded(), 3);
        assert_eq!(layer.rejected.len(), 2);
    }

    #[test]
    fn test_empty_layer() {
        let err = index_samples(outcome(0, 0), 0, 1000.0).unwrap_err();
        assert!(matches!(err, LayerError::EmptyLayer(LayerKind::Elevation)));
    }
}
