//! Index des couches échantillonnées (altitude, précipitations)

use geo::{Coord, Rect};
use rstar::primitives::GeomWithData;
use rstar::RTree;

use crate::types::SamplePoint;

type Node = GeomWithData<[f64; 2], usize>;

/// Recherche de l'échantillon le plus proche, borné par un rayon maximal.
///
/// À distance égale, le plus petit identifiant l'emporte.
#[derive(Debug)]
pub struct SampleIndex<R> {
    samples: Vec<SamplePoint<R>>,
    tree: RTree<Node>,
    max_radius: f64,
    extent: Option<Rect<f64>>,
}

impl<R> SampleIndex<R> {
    /// `max_radius` en mètres, fini et positif ; `f64::INFINITY` désactive la borne
    pub fn build(mut samples: Vec<SamplePoint<R>>, max_radius: f64) -> Self {
        samples.sort_by_key(|s| s.id);

        let nodes: Vec<Node> = samples
            .iter()
            .enumerate()
            .map(|(position, s)| GeomWithData::new([s.easting, s.northing], position))
            .collect();

        let extent = samples.iter().fold(None, |acc: Option<Rect<f64>>, s| {
            Some(match acc {
                None => Rect::new(
                    Coord { x: s.easting, y: s.northing },
                    Coord { x: s.easting, y: s.northing },
                ),
                Some(r) => Rect::new(
                    Coord {
                        x: r.min().x.min(s.easting),
                        y: r.min().y.min(s.northing),
                    },
                    Coord {
                        x: r.max().x.max(s.easting),
                        y: r.max().y.max(s.northing),
                    },
                ),
            })
        });

        Self {
            samples,
            tree: RTree::bulk_load(nodes),
            max_radius,
            extent,
        }
    }

    /// Échantillon le plus proche et sa distance euclidienne, `None` au-delà du rayon
    pub fn nearest(&self, easting: f64, northing: f64) -> Option<(&SamplePoint<R>, f64)> {
        let max_d2 = self.max_radius * self.max_radius;
        let mut best: Option<(&SamplePoint<R>, f64)> = None;

        for (node, d2) in self.tree.nearest_neighbor_iter_with_distance_2(&[easting, northing]) {
            if d2 > max_d2 {
                break;
            }
            let sample = &self.samples[node.data];
            match best {
                None => best = Some((sample, d2)),
                Some((current, best_d2)) => {
                    if d2 > best_d2 {
                        break;
                    }
                    if sample.id < current.id {
                        best = Some((sample, d2));
                    }
                }
            }
        }

        best.map(|(sample, d2)| (sample, d2.sqrt()))
    }

    pub fn max_radius(&self) -> f64 {
        self.max_radius
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn extent(&self) -> Option<Rect<f64>> {
        self.extent
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(id: u32, easting: f64, northing: f64) -> SamplePoint<u32> {
        SamplePoint {
            id,
            easting,
            northing,
            record: id * 10,
        }
    }

    #[test]
    fn test_nearest() {
        let index = SampleIndex::build(
            vec![sample(0, 0.0, 0.0), sample(1, 100.0, 0.0), sample(2, 0.0, 100.0)],
            f64::INFINITY,
        );
        let (s, d) = index.nearest(90.0, 0.0).unwrap();
        assert_eq!(s.id, 1);
        assert!((d - 10.0).abs() < 1e-9);
        assert_eq!(s.record, 10);
    }

    #[test]
    fn test_radius_cutoff() {
        let index = SampleIndex::build(vec![sample(0, 0.0, 0.0)], 50.0);
        assert!(index.nearest(30.0, 40.0).is_some()); // exactement 50 m
        assert!(index.nearest(30.0, 41.0).is_none());
    }

    #[test]
    fn test_equidistant_prefers_lowest_id() {
        let index = SampleIndex::build(
            vec![sample(5, 10.0, 0.0), sample(2, -10.0, 0.0), sample(9, 0.0, 10.0)],
            f64::INFINITY,
        );
        let (s, d) = index.nearest(0.0, 0.0).unwrap();
        assert_eq!(s.id, 2);
        assert!((d - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_and_extent() {
        let empty: SampleIndex<u32> = SampleIndex::build(Vec::new(), 1000.0);
        assert!(empty.nearest(0.0, 0.0).is_none());
        assert!(empty.extent().is_none());

        let index = SampleIndex::build(vec![sample(0, 5.0, 7.0), sample(1, -3.0, 20.0)], 1000.0);
        let extent = index.extent().unwrap();
        assert_eq!(extent.min(), Coord { x: -3.0, y: 7.0 });
        assert_eq!(extent.max(), Coord { x: 5.0, y: 20.0 });
        assert_eq!(index.len(), 2);
    }
}
