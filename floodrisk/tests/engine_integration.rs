//! Tests d'intégration : chargement depuis des fichiers et résolution de bout en bout

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use floodrisk::config::LayerPaths;
use floodrisk::{resolve_batch, Crs, Engine, EngineConfig, EngineError, LoadStatus, NormalizeError, ResolveRequest};
use geolayers::{LayerError, LayerKind};
use tempfile::TempDir;

fn square(x0: f64, y0: f64, size: f64) -> String {
    format!(
        "\"POLYGON (({x0} {y0}, {x1} {y0}, {x1} {y1}, {x0} {y1}, {x0} {y0}))\"",
        x0 = x0,
        y0 = y0,
        x1 = x0 + size,
        y1 = y0 + size
    )
}

fn fixture_model() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/classifier.json")
}

/// Trois cellules de 10 km :
/// - A (300–310 km) : sol, hydrologie « Peat », altitude 45 m, pluie 1000 mm
/// - B (310–320 km) : sol, pas d'hydrologie
/// - C (320–330 km) : pas de sol, hydrologie de catégorie inconnue
struct World {
    dir: TempDir,
    config: EngineConfig,
}

impl World {
    fn new() -> Self {
        Self::with_hydrology_extra("")
    }

    fn with_hydrology_extra(extra: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();

        let soil = format!(
            "TEXTURE,DEPTH,PlainEngli,Texture_Su,geometry\n\
             Loam,Deep,Fine loamy drift with limestones,Loam,{}\n\
             Clay,Shallow,Clayey drift,,{}\n",
            square(300_000.0, 200_000.0, 10_000.0),
            square(310_000.0, 200_000.0, 10_000.0)
        );
        let hydrology = format!(
            "CATEGORY,ParMat_Des,SoilDraina,geometry\n\
             Peat,Blanket peat,Poor,{}\n\
             Made Ground,Urban,Variable,{}\n{}",
            square(300_000.0, 200_000.0, 10_000.0),
            square(320_000.0, 200_000.0, 10_000.0),
            extra
        );
        let elevation = "Easting,Northing,Elevation\n\
                         305000,205000,45\n\
                         315000,205000,30\n\
                         325000,205000,10\n";
        let rainfall = "east,north,ANN,DJF,MAM,JJA,SON\n\
                        305000,205000,1000,300,220,200,280\n\
                        315000,205000,1100,330,240,220,310\n\
                        325000,205000,900,270,200,180,250\n";

        let write = |name: &str, content: &str| -> PathBuf {
            let path = dir.path().join(name);
            let mut file = std::fs::File::create(&path).unwrap();
            file.write_all(content.as_bytes()).unwrap();
            path
        };

        let config = EngineConfig {
            layers: LayerPaths {
                soil: write("soil.csv", &soil),
                hydrology: write("hydrology.csv", &hydrology),
                elevation: write("elevation.csv", elevation),
                rainfall: write("rainfall.csv", rainfall),
            },
            model: fixture_model(),
            search_radius_m: 5_000.0,
            elevation_radius_m: None,
            rainfall_radius_m: None,
            bbox_margin_m: 10_000.0,
            max_rejected_records: 0,
            standardisation: None,
        };

        Self { dir, config }
    }

    fn engine(&self) -> Engine {
        Engine::load(&self.config).unwrap().0
    }
}

#[test]
fn test_full_resolution() {
    let world = World::new();
    let engine = world.engine();

    let response = engine.resolve(&ResolveRequest::irish_grid(305_000.0, 205_000.0)).unwrap();

    assert_eq!(response.soil_data.as_ref().unwrap().texture, "Loam");
    assert_eq!(response.hydrology_data.as_ref().unwrap().category, "Peat");
    assert_eq!(response.elevation_data.unwrap().elevation, 45.0);
    assert_eq!(response.rainfall_data.unwrap().annual, 1000.0);

    // [1.6, 2.1, 2] → centroïde du cluster 1
    assert_eq!(response.cluster_prediction(), Some(1));
    assert!(response.cluster_prediction_error().is_none());

    let json = serde_json::to_value(&response).unwrap();
    assert_eq!(json["cluster_label"], "Moderate-to-High");
    assert_eq!(json["soil_data"]["TextureSubgroup"], "Loam");
    assert_eq!(json["rainfall_data"]["Winter"], 300.0);
}

#[test]
fn test_deterministic_prediction() {
    let world = World::new();
    let engine = world.engine();
    let request = ResolveRequest::irish_grid(304_200.0, 206_100.0);

    let first = engine.resolve(&request).unwrap();
    for _ in 0..10 {
        assert_eq!(engine.resolve(&request).unwrap(), first);
    }
}

#[test]
fn test_missing_hydrology_keeps_other_layers() {
    let world = World::new();
    let engine = world.engine();

    let response = engine.resolve(&ResolveRequest::irish_grid(315_000.0, 205_000.0)).unwrap();

    assert_eq!(response.soil_data.as_ref().unwrap().texture, "Clay");
    assert!(response.hydrology_data.is_none());
    assert_eq!(response.elevation_data.unwrap().elevation, 30.0);
    assert!(response.rainfall_data.is_some());
    assert_eq!(response.cluster_prediction(), None);
    assert_eq!(
        response.cluster_prediction_error(),
        Some("insufficient environmental data for this location (missing: hydrology)")
    );

    let json = serde_json::to_value(&response).unwrap();
    assert!(json.get("hydrology_data").is_none());
    assert!(json.get("cluster_prediction").is_none());
}

#[test]
fn test_unknown_category() {
    let world = World::new();
    let engine = world.engine();

    let response = engine.resolve(&ResolveRequest::irish_grid(325_000.0, 205_000.0)).unwrap();

    assert!(response.soil_data.is_none());
    assert_eq!(response.hydrology_data.as_ref().unwrap().category, "Made Ground");
    assert!(response.elevation_data.is_some());
    assert!(response.rainfall_data.is_some());
    assert_eq!(
        response.cluster_prediction_error(),
        Some("unknown hydrology category 'Made Ground' (not seen at training time)")
    );
}

#[test]
fn test_beyond_search_radius() {
    let world = World::new();
    let engine = world.engine();

    // Dans le territoire, loin de toute donnée
    let response = engine.resolve(&ResolveRequest::irish_grid(100_000.0, 100_000.0)).unwrap();
    assert!(response.soil_data.is_none());
    assert!(response.elevation_data.is_none());
    assert!(response.rainfall_data.is_none());
    assert!(response
        .cluster_prediction_error()
        .unwrap()
        .contains("missing: hydrology, elevation, rainfall"));
}

#[test]
fn test_out_of_territory() {
    let world = World::new();
    let engine = world.engine();

    let err = engine
        .resolve(&ResolveRequest::irish_grid(1_000_000.0, 1_000_000.0))
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::InvalidCoordinate(NormalizeError::OutOfTerritory { .. })
    ));

    let err = engine
        .resolve(&ResolveRequest {
            easting: 2.35,
            northing: 48.85,
            crs: Crs::Wgs84,
        })
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidCoordinate(_)));
}

#[test]
fn test_same_point_in_every_crs() {
    let world = World::new();
    let engine = world.engine();

    let grid = engine.resolve(&ResolveRequest::irish_grid(305_000.0, 205_000.0)).unwrap();
    // Même point exprimé en ITM et en WGS84 (valeurs de référence indépendantes)
    let others = [
        ResolveRequest {
            easting: 704_928.136,
            northing: 705_032.683,
            crs: Crs::Itm,
        },
        ResolveRequest {
            easting: -6.433_675_43,
            northing: 53.085_571_68,
            crs: Crs::Wgs84,
        },
    ];

    for request in others {
        let response = engine.resolve(&request).unwrap();
        assert!((response.location.easting - 305_000.0).abs() < 0.05, "{:?}", response.location);
        assert!((response.location.northing - 205_000.0).abs() < 0.05, "{:?}", response.location);
        assert_eq!(response.soil_data, grid.soil_data);
        assert_eq!(response.hydrology_data, grid.hydrology_data);
        assert_eq!(response.elevation_data, grid.elevation_data);
        assert_eq!(response.rainfall_data, grid.rainfall_data);
        assert_eq!(response.classification, grid.classification);
        assert_eq!(response.cluster_prediction(), Some(1));
    }
}

#[test]
fn test_wgs84_near_pole_is_invalid() {
    let world = World::new();
    let engine = world.engine();

    for latitude in [89.99, 90.0, 90.5] {
        let err = engine
            .resolve(&ResolveRequest {
                easting: -8.0,
                northing: latitude,
                crs: Crs::Wgs84,
            })
            .unwrap_err();
        assert!(
            matches!(err, EngineError::InvalidCoordinate(_)),
            "latitude {}: {:?}",
            latitude,
            err
        );
    }

    let err = engine
        .resolve(&ResolveRequest {
            easting: -8.0,
            northing: 90.5,
            crs: Crs::Wgs84,
        })
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::InvalidCoordinate(NormalizeError::GeographicOutOfRange { .. })
    ));
}

#[test]
fn test_load_report() {
    let world = World::new();
    let (_, report) = Engine::load(&world.config).unwrap();

    assert_eq!(report.status, LoadStatus::Success);
    assert_eq!(report.layers.len(), 4);
    assert_eq!(report.total_loaded(), 2 + 2 + 3 + 3);
    let artifact = report.artifact.as_ref().unwrap();
    assert_eq!(artifact.model, "nearest_centroid");
    assert_eq!(artifact.classes, vec![0, 1, 2, 3]);
    assert_eq!(artifact.fingerprint.len(), 64);

    let path = world.dir.path().join("report.json");
    report.save_to_file(&path).unwrap();
    assert!(path.exists());
}

#[test]
fn test_rejected_records_over_tolerance() {
    let world = World::with_hydrology_extra(&format!(",Till,Poor,{}\n", square(0.0, 0.0, 10.0)));

    match Engine::load(&world.config) {
        Err(EngineError::LayerIndexBuild { layer, source, .. }) => {
            assert_eq!(layer, LayerKind::Hydrology);
            assert!(matches!(
                source,
                LayerError::TooManyRejected {
                    rejected: 1,
                    total: 3,
                    ..
                }
            ));
        }
        other => panic!("unexpected result: {:?}", other.map(|_| ())),
    }

    let mut tolerant = world.config.clone();
    tolerant.max_rejected_records = 1;
    let (_, report) = Engine::load(&tolerant).unwrap();
    assert_eq!(report.status, LoadStatus::PartialSuccess);
    assert_eq!(report.rejected.len(), 1);
    assert_eq!(report.rejected[0].layer, LayerKind::Hydrology);
    assert_eq!(report.rejected[0].record, 2);
}

#[test]
fn test_missing_classifier_is_fatal() {
    let world = World::new();
    let mut config = world.config.clone();
    config.model = world.dir.path().join("missing.json");

    assert!(matches!(
        Engine::load(&config),
        Err(EngineError::ClassifierUnavailable(_))
    ));
}

#[test]
fn test_standardisation_override() {
    let world = World::new();
    let mut config = world.config.clone();
    // Altitude 45 m devient « haute » : z = (45 - 0) / 50 = 0.9
    config.standardisation = Some(floodrisk::features::Standardisation {
        rainfall: floodrisk::features::Standardiser {
            mean: 900.0,
            scale: 200.0,
        },
        elevation: floodrisk::features::Standardiser {
            mean: 0.0,
            scale: 50.0,
        },
    });
    let (engine, _) = Engine::load(&config).unwrap();
    let response = engine.resolve(&ResolveRequest::irish_grid(305_000.0, 205_000.0)).unwrap();

    // [-0.4, 0.1, 2] : plus proche du cluster 2
    assert_eq!(response.cluster_prediction(), Some(2));
}

#[tokio::test]
async fn test_batch_preserves_order() {
    let world = World::new();
    let engine = Arc::new(world.engine());

    let requests = vec![
        ResolveRequest::irish_grid(305_000.0, 205_000.0),
        ResolveRequest::irish_grid(f64::NAN, 205_000.0),
        ResolveRequest::irish_grid(315_000.0, 205_000.0),
        ResolveRequest::irish_grid(325_000.0, 205_000.0),
    ];
    let results = resolve_batch(Arc::clone(&engine), requests, 3).await;

    assert_eq!(results.len(), 4);
    assert_eq!(results[0].as_ref().unwrap().cluster_prediction(), Some(1));
    assert!(matches!(results[1], Err(EngineError::InvalidCoordinate(_))));
    assert_eq!(results[2].as_ref().unwrap().soil_data.as_ref().unwrap().texture, "Clay");
    assert!(results[3].as_ref().unwrap().soil_data.is_none());
}
