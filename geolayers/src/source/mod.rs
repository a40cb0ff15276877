//! Lecture des couches de référence depuis le disque
//!
//! Formats supportés :
//! - CSV (export de shapefile, géométrie en WKT dans la colonne `geometry`)
//! - GeoJSON (FeatureCollection, attributs dans `properties`)

pub mod csv;
pub mod geometry;
pub mod text;

use std::borrow::Cow;
use std::path::Path;

use geojson::{GeoJson, JsonObject, JsonValue};
use tracing::{debug, warn};

use crate::types::{Fields, LayerRecord, LoadOutcome, PolygonFeature, RejectedRecord, SamplePoint};
use crate::LayerError;
use csv::CsvTable;

/// Colonne WKT des couches polygonales
pub const GEOMETRY_COLUMN: &str = "geometry";

/// Alias acceptés pour les coordonnées des couches échantillonnées
pub const EASTING_COLUMNS: &[&str] = &["Easting", "east"];
pub const NORTHING_COLUMNS: &[&str] = &["Northing", "north"];

/// Nombre de rejets détaillés dans les logs
const LOGGED_REJECTIONS: usize = 5;

/// Format d'une source, déduit de l'extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Csv,
    GeoJson,
}

impl SourceFormat {
    pub fn from_path(path: &Path) -> Result<Self, LayerError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("csv") => Ok(Self::Csv),
            Some("geojson") | Some("json") => Ok(Self::GeoJson),
            _ => Err(LayerError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

/// Lit une couche polygonale
pub fn read_polygons<R: LayerRecord>(path: &Path) -> Result<LoadOutcome<PolygonFeature<R>>, LayerError> {
    let format = SourceFormat::from_path(path)?;
    let data = std::fs::read(path)?;
    let text = text::decode(&data);
    let file = path.display().to_string();

    let outcome = match format {
        SourceFormat::Csv => polygons_from_csv::<R>(&file, &text)?,
        SourceFormat::GeoJson => polygons_from_geojson::<R>(&file, &text)?,
    };
    log_outcome::<R, _>(&file, &outcome);
    Ok(outcome)
}

/// Lit une couche échantillonnée
pub fn read_samples<R: LayerRecord>(path: &Path) -> Result<LoadOutcome<SamplePoint<R>>, LayerError> {
    let format = SourceFormat::from_path(path)?;
    let data = std::fs::read(path)?;
    let text = text::decode(&data);
    let file = path.display().to_string();

    let outcome = match format {
        SourceFormat::Csv => samples_from_csv::<R>(&file, &text)?,
        SourceFormat::GeoJson => samples_from_geojson::<R>(&file, &text)?,
    };
    log_outcome::<R, _>(&file, &outcome);
    Ok(outcome)
}

/// Couche polygonale depuis un CSV avec géométrie WKT
pub fn polygons_from_csv<R: LayerRecord>(
    file: &str,
    text: &str,
) -> Result<LoadOutcome<PolygonFeature<R>>, LayerError> {
    let table = CsvTable::parse(file, text)?;
    table.require(&[GEOMETRY_COLUMN])?;
    table.require(R::REQUIRED_FIELDS)?;

    let mut outcome = LoadOutcome {
        records: Vec::new(),
        rejected: Vec::new(),
    };

    for (index, row) in table.rows() {
        let parsed = row.and_then(|row| {
            let wkt = row.field(GEOMETRY_COLUMN).unwrap_or_default();
            let geometry = geometry::polygonal_from_wkt(&wkt)?;
            let record = R::from_fields(&row)?;
            Ok(PolygonFeature {
                id: record_id(index)?,
                geometry,
                record,
            })
        });
        push(&mut outcome, index, parsed);
    }

    Ok(outcome)
}

/// Couche échantillonnée depuis un CSV (colonnes Easting/Northing)
pub fn samples_from_csv<R: LayerRecord>(
    file: &str,
    text: &str,
) -> Result<LoadOutcome<SamplePoint<R>>, LayerError> {
    let table = CsvTable::parse(file, text)?;
    let easting_col = table
        .column_any(EASTING_COLUMNS)
        .ok_or_else(|| LayerError::missing_column(file, EASTING_COLUMNS[0]))?;
    let northing_col = table
        .column_any(NORTHING_COLUMNS)
        .ok_or_else(|| LayerError::missing_column(file, NORTHING_COLUMNS[0]))?;
    table.require(R::REQUIRED_FIELDS)?;

    let mut outcome = LoadOutcome {
        records: Vec::new(),
        rejected: Vec::new(),
    };

    for (index, row) in table.rows() {
        let parsed = row.and_then(|row| {
            let easting = coordinate(row.get(easting_col), "easting")?;
            let northing = coordinate(row.get(northing_col), "northing")?;
            let record = R::from_fields(&row)?;
            Ok(SamplePoint {
                id: record_id(index)?,
                easting,
                northing,
                record,
            })
        });
        push(&mut outcome, index, parsed);
    }

    Ok(outcome)
}

/// Couche polygonale depuis une FeatureCollection GeoJSON
pub fn polygons_from_geojson<R: LayerRecord>(
    file: &str,
    text: &str,
) -> Result<LoadOutcome<PolygonFeature<R>>, LayerError> {
    let features = feature_collection(file, text)?;

    let mut outcome = LoadOutcome {
        records: Vec::new(),
        rejected: Vec::new(),
    };

    for (index, feature) in features.into_iter().enumerate() {
        let parsed = (|| -> Result<PolygonFeature<R>, String> {
            let geometry = feature.geometry.ok_or_else(|| "missing geometry".to_string())?;
            let geometry: geo::Geometry<f64> = geometry
                .try_into()
                .map_err(|e: geojson::Error| format!("invalid GeoJSON geometry: {}", e))?;
            let geometry = geometry::into_multipolygon(geometry)?;
            let properties = JsonFields(feature.properties.as_ref());
            let record = R::from_fields(&properties)?;
            Ok(PolygonFeature {
                id: record_id(index)?,
                geometry,
                record,
            })
        })();
        push(&mut outcome, index, parsed);
    }

    Ok(outcome)
}

/// Couche échantillonnée depuis une FeatureCollection GeoJSON de points
pub fn samples_from_geojson<R: LayerRecord>(
    file: &str,
    text: &str,
) -> Result<LoadOutcome<SamplePoint<R>>, LayerError> {
    let features = feature_collection(file, text)?;

    let mut outcome = LoadOutcome {
        records: Vec::new(),
        rejected: Vec::new(),
    };

    for (index, feature) in features.into_iter().enumerate() {
        let parsed = (|| -> Result<SamplePoint<R>, String> {
            let geometry = feature.geometry.ok_or_else(|| "missing geometry".to_string())?;
            let geometry: geo::Geometry<f64> = geometry
                .try_into()
                .map_err(|e: geojson::Error| format!("invalid GeoJSON geometry: {}", e))?;
            let geo::Geometry::Point(point) = geometry else {
                return Err("expected Point geometry".to_string());
            };
            if !(point.x().is_finite() && point.y().is_finite()) {
                return Err("non-finite point coordinate".to_string());
            }
            let properties = JsonFields(feature.properties.as_ref());
            let record = R::from_fields(&properties)?;
            Ok(SamplePoint {
                id: record_id(index)?,
                easting: point.x(),
                northing: point.y(),
                record,
            })
        })();
        push(&mut outcome, index, parsed);
    }

    Ok(outcome)
}

/// Propriétés GeoJSON vues comme des champs
struct JsonFields<'a>(Option<&'a JsonObject>);

impl Fields for JsonFields<'_> {
    fn field(&self, name: &str) -> Option<Cow<'_, str>> {
        let properties = self.0?;
        let value = properties.get(name).or_else(|| {
            properties
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v)
        })?;
        match value {
            JsonValue::String(s) => Some(Cow::Borrowed(s.as_str())),
            JsonValue::Number(n) => Some(Cow::Owned(n.to_string())),
            JsonValue::Bool(b) => Some(Cow::Owned(b.to_string())),
            _ => None,
        }
    }
}

fn feature_collection(file: &str, text: &str) -> Result<Vec<geojson::Feature>, LayerError> {
    let geojson: GeoJson = text
        .parse()
        .map_err(|e: geojson::Error| LayerError::parse_error(file, e.to_string()))?;
    match geojson {
        GeoJson::FeatureCollection(fc) => Ok(fc.features),
        _ => Err(LayerError::parse_error(file, "expected a FeatureCollection")),
    }
}

fn coordinate(value: Option<&str>, name: &str) -> Result<f64, String> {
    let text = value.map(str::trim).unwrap_or_default();
    if text.is_empty() {
        return Err(format!("missing {}", name));
    }
    let value: f64 =
        fast_float::parse(text).map_err(|_| format!("{} is not a number: {:?}", name, text))?;
    if !value.is_finite() {
        return Err(format!("{} is not finite", name));
    }
    Ok(value)
}

fn record_id(index: usize) -> Result<crate::RecordId, String> {
    crate::RecordId::try_from(index).map_err(|_| format!("record index {} overflows", index))
}

fn push<T>(outcome: &mut LoadOutcome<T>, index: usize, parsed: Result<T, String>) {
    match parsed {
        Ok(record) => outcome.records.push(record),
        Err(reason) => {
            debug!(record = index, reason = %reason, "Record rejected");
            outcome.rejected.push(RejectedRecord {
                record: index,
                reason,
            });
        }
    }
}

fn log_outcome<R: LayerRecord, T>(file: &str, outcome: &LoadOutcome<T>) {
    if outcome.rejected.is_empty() {
        debug!(layer = %R::KIND, file = file, records = outcome.records.len(), "Layer read");
        return;
    }
    warn!(
        layer = %R::KIND,
        file = file,
        records = outcome.records.len(),
        rejected = outcome.rejected.len(),
        "Layer read with rejected records"
    );
    for rejected in outcome.rejected.iter().take(LOGGED_REJECTIONS) {
        warn!(layer = %R::KIND, record = rejected.record, reason = %rejected.reason, "Rejected");
    }
}
