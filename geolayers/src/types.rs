//! Types de données pour le crate geolayers

use std::borrow::Cow;
use std::fmt;

use geo::MultiPolygon;
use serde::Serialize;

/// Identifiant d'un enregistrement : sa position (base 0) dans le fichier source.
///
/// Sert de critère de départage déterministe : en cas d'égalité, le plus petit gagne.
pub type RecordId = u32;

/// Les quatre couches de référence
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerKind {
    Soil,
    Hydrology,
    Elevation,
    Rainfall,
}

impl LayerKind {
    pub const ALL: [LayerKind; 4] = [
        LayerKind::Soil,
        LayerKind::Hydrology,
        LayerKind::Elevation,
        LayerKind::Rainfall,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            LayerKind::Soil => "soil",
            LayerKind::Hydrology => "hydrology",
            LayerKind::Elevation => "elevation",
            LayerKind::Rainfall => "rainfall",
        }
    }
}

impl fmt::Display for LayerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Attributs pédologiques (couche polygonale des sols)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SoilRecord {
    #[serde(rename = "Texture")]
    pub texture: String,
    #[serde(rename = "Depth")]
    pub depth: String,
    #[serde(rename = "Description")]
    pub description: String,
    #[serde(rename = "TextureSubgroup", skip_serializing_if = "Option::is_none")]
    pub texture_subgroup: Option<String>,
}

/// Attributs hydrologiques (couche polygonale)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HydrologyRecord {
    #[serde(rename = "Category")]
    pub category: String,
    #[serde(rename = "MaterialDescription")]
    pub material_description: String,
    #[serde(rename = "Drainage")]
    pub drainage: String,
}

/// Altitude d'un échantillon, en mètres
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ElevationSample {
    #[serde(rename = "Elevation")]
    pub elevation: f64,
}

/// Précipitations d'un échantillon, en millimètres
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RainfallSample {
    #[serde(rename = "Annual")]
    pub annual: f64,
    /// Décembre-janvier-février
    #[serde(rename = "Winter")]
    pub winter: f64,
    /// Mars-avril-mai
    #[serde(rename = "Spring")]
    pub spring: f64,
    /// Juin-juillet-août
    #[serde(rename = "Summer")]
    pub summer: f64,
    /// Septembre-octobre-novembre
    #[serde(rename = "Autumn")]
    pub autumn: f64,
}

/// Polygone d'une couche polygonale avec ses attributs
#[derive(Debug, Clone)]
pub struct PolygonFeature<R> {
    pub id: RecordId,
    pub geometry: MultiPolygon<f64>,
    pub record: R,
}

/// Échantillon ponctuel d'une couche échantillonnée
#[derive(Debug, Clone)]
pub struct SamplePoint<R> {
    pub id: RecordId,
    pub easting: f64,
    pub northing: f64,
    pub record: R,
}

/// Enregistrement rejeté à la lecture
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RejectedRecord {
    /// Position de l'enregistrement dans la source (base 0)
    pub record: usize,
    /// Raison du rejet
    pub reason: String,
}

/// Résultat de la lecture d'une couche
#[derive(Debug)]
pub struct LoadOutcome<T> {
    /// Enregistrements valides, dans l'ordre de la source
    pub records: Vec<T>,
    /// Enregistrements rejetés
    pub rejected: Vec<RejectedRecord>,
}

impl<T> LoadOutcome<T> {
    /// Nombre total d'enregistrements lus
    pub fn total(&self) -> usize {
        self.records.len() + self.rejected.len()
    }
}

/// Accès aux champs d'un enregistrement source (ligne CSV, propriétés GeoJSON)
pub trait Fields {
    /// Valeur brute d'un champ, `None` si la colonne n'existe pas
    fn field(&self, name: &str) -> Option<Cow<'_, str>>;
}

/// Un type d'attributs attaché à une couche
pub trait LayerRecord: Sized + Clone + Send + Sync + 'static {
    /// Couche à laquelle ce type appartient
    const KIND: LayerKind;

    /// Colonnes obligatoires dans la source
    const REQUIRED_FIELDS: &'static [&'static str];

    /// Construit l'enregistrement, ou explique pourquoi il est invalide
    fn from_fields<F: Fields + ?Sized>(fields: &F) -> Result<Self, String>;
}

/// Champ texte obligatoire et non vide
pub(crate) fn required_text<F: Fields + ?Sized>(fields: &F, name: &str) -> Result<String, String> {
    let value = fields
        .field(name)
        .ok_or_else(|| format!("missing field `{}`", name))?;
    let value = value.trim();
    if value.is_empty() {
        return Err(format!("empty field `{}`", name));
    }
    Ok(value.to_string())
}

/// Champ texte facultatif (vide = absent)
pub(crate) fn optional_text<F: Fields + ?Sized>(fields: &F, name: &str) -> Option<String> {
    fields
        .field(name)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Champ numérique obligatoire et fini
pub(crate) fn required_number<F: Fields + ?Sized>(fields: &F, name: &str) -> Result<f64, String> {
    let text = required_text(fields, name)?;
    let value: f64 = fast_float::parse(&text)
        .map_err(|_| format!("field `{}` is not a number: {:?}", name, text))?;
    if !value.is_finite() {
        return Err(format!("field `{}` is not finite", name));
    }
    Ok(value)
}

/// Valeurs nodata du MNT d'origine
const ELEVATION_NODATA: [f64; 2] = [-32768.0, -500.0];

impl LayerRecord for SoilRecord {
    const KIND: LayerKind = LayerKind::Soil;
    const REQUIRED_FIELDS: &'static [&'static str] = &["TEXTURE", "DEPTH", "PlainEngli"];

    fn from_fields<F: Fields + ?Sized>(fields: &F) -> Result<Self, String> {
        Ok(Self {
            texture: required_text(fields, "TEXTURE")?,
            depth: required_text(fields, "DEPTH")?,
            description: required_text(fields, "PlainEngli")?,
            texture_subgroup: optional_text(fields, "Texture_Su"),
        })
    }
}

impl LayerRecord for HydrologyRecord {
    const KIND: LayerKind = LayerKind::Hydrology;
    const REQUIRED_FIELDS: &'static [&'static str] = &["CATEGORY", "ParMat_Des", "SoilDraina"];

    fn from_fields<F: Fields + ?Sized>(fields: &F) -> Result<Self, String> {
        Ok(Self {
            category: required_text(fields, "CATEGORY")?,
            material_description: required_text(fields, "ParMat_Des")?,
            drainage: required_text(fields, "SoilDraina")?,
        })
    }
}

impl LayerRecord for ElevationSample {
    const KIND: LayerKind = LayerKind::Elevation;
    const REQUIRED_FIELDS: &'static [&'static str] = &["Elevation"];

    fn from_fields<F: Fields + ?Sized>(fields: &F) -> Result<Self, String> {
        let elevation = required_number(fields, "Elevation")?;
        if ELEVATION_NODATA.contains(&elevation) {
            return Err(format!("elevation nodata value {}", elevation));
        }
        Ok(Self { elevation })
    }
}

impl LayerRecord for RainfallSample {
    const KIND: LayerKind = LayerKind::Rainfall;
    const REQUIRED_FIELDS: &'static [&'static str] = &["ANN", "DJF", "MAM", "JJA", "SON"];

    fn from_fields<F: Fields + ?Sized>(fields: &F) -> Result<Self, String> {
        Ok(Self {
            annual: required_number(fields, "ANN")?,
            winter: required_number(fields, "DJF")?,
            spring: required_number(fields, "MAM")?,
            summer: required_number(fields, "JJA")?,
            autumn: required_number(fields, "SON")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct MapFields(HashMap<&'static str, &'static str>);

    impl Fields for MapFields {
        fn field(&self, name: &str) -> Option<Cow<'_, str>> {
            self.0.get(name).map(|v| Cow::Borrowed(*v))
        }
    }

    fn fields(pairs: &[(&'static str, &'static str)]) -> MapFields {
        MapFields(pairs.iter().copied().collect())
    }

    #[test]
    fn test_soil_record() {
        let f = fields(&[
            ("TEXTURE", " Loam "),
            ("DEPTH", "Deep"),
            ("PlainEngli", "Fine loamy drift"),
            ("Texture_Su", ""),
        ]);
        let soil = SoilRecord::from_fields(&f).unwrap();
        assert_eq!(soil.texture, "Loam");
        assert_eq!(soil.texture_subgroup, None);
    }

    #[test]
    fn test_empty_required_field_is_rejected() {
        let f = fields(&[("CATEGORY", "1"), ("ParMat_Des", ""), ("SoilDraina", "Poor")]);
        let err = HydrologyRecord::from_fields(&f).unwrap_err();
        assert!(err.contains("ParMat_Des"), "{}", err);
    }

    #[test]
    fn test_elevation_nodata_is_rejected() {
        let f = fields(&[("Elevation", "-32768")]);
        assert!(ElevationSample::from_fields(&f).is_err());

        let f = fields(&[("Elevation", "42.5")]);
        assert_eq!(ElevationSample::from_fields(&f).unwrap().elevation, 42.5);
    }

    #[test]
    fn test_rainfall_non_numeric_is_rejected() {
        let f = fields(&[
            ("ANN", "1000"),
            ("DJF", "abc"),
            ("MAM", "200"),
            ("JJA", "200"),
            ("SON", "300"),
        ]);
        let err = RainfallSample::from_fields(&f).unwrap_err();
        assert!(err.contains("DJF"));
    }

    #[test]
    fn test_layer_kind_display() {
        assert_eq!(LayerKind::Hydrology.to_string(), "hydrology");
        assert_eq!(LayerKind::ALL.len(), 4);
    }
}
