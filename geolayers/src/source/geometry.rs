//! Conversion et validation des géométries sources

use geo::{Geometry, MultiPolygon, Polygon};
use geozero::wkt::Wkt;
use geozero::ToGeo;

/// Parse une géométrie WKT et la ramène à un MultiPolygon valide
pub fn polygonal_from_wkt(text: &str) -> Result<MultiPolygon<f64>, String> {
    let text = text.trim();
    if text.is_empty() {
        return Err("missing geometry".to_string());
    }
    let geometry = Wkt(text)
        .to_geo()
        .map_err(|e| format!("invalid WKT geometry: {}", e))?;
    into_multipolygon(geometry)
}

/// Ramène une géométrie à un MultiPolygon, ou la rejette
pub fn into_multipolygon(geometry: Geometry<f64>) -> Result<MultiPolygon<f64>, String> {
    let polygons: Vec<Polygon<f64>> = match geometry {
        Geometry::Polygon(p) => vec![p],
        Geometry::MultiPolygon(mp) => mp.0,
        Geometry::Rect(r) => vec![r.to_polygon()],
        Geometry::GeometryCollection(gc) => {
            let mut polygons = Vec::new();
            for g in gc {
                polygons.extend(into_multipolygon(g)?.0);
            }
            polygons
        }
        other => return Err(format!("expected polygonal geometry, found {}", kind(&other))),
    };

    if polygons.is_empty() {
        return Err("empty polygonal geometry".to_string());
    }

    for polygon in &polygons {
        // Polygon::new ferme automatiquement les rings : 4 coordonnées = triangle
        if polygon.exterior().0.len() < 4 {
            return Err("degenerate polygon (fewer than 3 distinct vertices)".to_string());
        }
        let all_finite = std::iter::once(polygon.exterior())
            .chain(polygon.interiors())
            .flat_map(|ring| ring.coords())
            .all(|c| c.x.is_finite() && c.y.is_finite());
        if !all_finite {
            return Err("non-finite polygon coordinate".to_string());
        }
    }

    Ok(MultiPolygon::new(polygons))
}

fn kind(geometry: &Geometry<f64>) -> &'static str {
    match geometry {
        Geometry::Point(_) => "Point",
        Geometry::Line(_) => "Line",
        Geometry::LineString(_) => "LineString",
        Geometry::Polygon(_) => "Polygon",
        Geometry::MultiPoint(_) => "MultiPoint",
        Geometry::MultiLineString(_) => "MultiLineString",
        Geometry::MultiPolygon(_) => "MultiPolygon",
        Geometry::GeometryCollection(_) => "GeometryCollection",
        Geometry::Rect(_) => "Rect",
        Geometry::Triangle(_) => "Triangle",
    }
}
