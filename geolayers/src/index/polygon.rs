//! Index des couches polygonales (sols, hydrologie)

use geo::coordinate_position::CoordPos;
use geo::{BoundingRect, Coord, CoordinatePosition, Rect};
use rstar::primitives::{GeomWithData, Rectangle};
use rstar::RTree;

use crate::types::PolygonFeature;

/// Emprise d'un polygone dans le R-tree, avec sa position dans `features`
type Envelope = GeomWithData<Rectangle<[f64; 2]>, usize>;

/// Recherche du polygone contenant un point.
///
/// Les points situés exactement sur une frontière commune appartiennent aux deux
/// polygones : l'identifiant le plus petit l'emporte.
#[derive(Debug)]
pub struct PolygonIndex<R> {
    features: Vec<PolygonFeature<R>>,
    tree: RTree<Envelope>,
    extent: Option<Rect<f64>>,
}

impl<R> PolygonIndex<R> {
    /// Construit l'index (bulk load) à partir des polygones validés
    pub fn build(mut features: Vec<PolygonFeature<R>>) -> Self {
        features.sort_by_key(|f| f.id);

        let mut extent: Option<Rect<f64>> = None;
        let mut envelopes = Vec::with_capacity(features.len());

        for (position, feature) in features.iter().enumerate() {
            let Some(rect) = feature.geometry.bounding_rect() else {
                continue;
            };
            extent = Some(match extent {
                Some(e) => merge(e, rect),
                None => rect,
            });
            envelopes.push(GeomWithData::new(
                Rectangle::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]),
                position,
            ));
        }

        Self {
            features,
            tree: RTree::bulk_load(envelopes),
            extent,
        }
    }

    /// Polygone contenant (ou touchant) le point, le plus petit identifiant en cas d'ambiguïté
    pub fn lookup(&self, easting: f64, northing: f64) -> Option<&PolygonFeature<R>> {
        let coord = Coord {
            x: easting,
            y: northing,
        };

        self.tree
            .locate_all_at_point(&[easting, northing])
            .map(|envelope| &self.features[envelope.data])
            .filter(|feature| {
                matches!(
                    feature.geometry.coordinate_position(&coord),
                    CoordPos::Inside | CoordPos::OnBoundary
                )
            })
            .min_by_key(|feature| feature.id)
    }

    /// Nombre de polygones indexés
    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Emprise de la couche
    pub fn extent(&self) -> Option<Rect<f64>> {
        self.extent
    }
}

fn merge(a: Rect<f64>, b: Rect<f64>) -> Rect<f64> {
    Rect::new(
        Coord {
            x: a.min().x.min(b.min().x),
            y: a.min().y.min(b.min().y),
        },
        Coord {
            x: a.max().x.max(b.max().x),
            y: a.max().y.max(b.max().y),
        },
    )
}
