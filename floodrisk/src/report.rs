//! Rapport de chargement des couches et du classifieur
//!
//! Collecte, par couche, les enregistrements chargés et rejetés ainsi que
//! l'empreinte de l'artefact, pour affichage ou sauvegarde JSON.

use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use geolayers::{LayerKind, LayerShape, LoadedLayer};
use serde::Serialize;

/// Statut global du chargement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LoadStatus {
    /// Aucun enregistrement rejeté
    Success,
    /// Des enregistrements ont été rejetés, dans la limite tolérée
    PartialSuccess,
}

/// Enregistrement rejeté avec contexte
#[derive(Debug, Clone, Serialize)]
pub struct RejectedEntry {
    pub layer: LayerKind,
    /// Position (base 0) dans le fichier source
    pub record: usize,
    pub reason: String,
}

/// Statistiques d'une couche
#[derive(Debug, Clone, Serialize)]
pub struct LayerStats {
    pub layer: LayerKind,
    pub source: String,
    pub shape: LayerShape,
    pub loaded: usize,
    pub rejected: usize,
    /// Emprise [min_e, min_n, max_e, max_n]
    pub extent: Option<[f64; 4]>,
    /// Rayon de recherche (couches échantillonnées)
    pub search_radius_m: Option<f64>,
}

/// Informations sur l'artefact du classifieur
#[derive(Debug, Clone, Serialize)]
pub struct ArtifactInfo {
    pub source: String,
    pub model: String,
    pub classes: Vec<u8>,
    pub fingerprint: String,
}

/// Rapport complet de chargement
#[derive(Debug, Clone, Serialize)]
pub struct LoadReport {
    pub duration_secs: f64,
    pub status: LoadStatus,
    pub layers: Vec<LayerStats>,
    pub rejected: Vec<RejectedEntry>,
    pub artifact: Option<ArtifactInfo>,
}

impl Default for LoadReport {
    fn default() -> Self {
        Self {
            duration_secs: 0.0,
            status: LoadStatus::Success,
            layers: Vec::new(),
            rejected: Vec::new(),
            artifact: None,
        }
    }
}

impl LoadReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enregistre le bilan d'une couche
    pub fn record_layer<R>(&mut self, kind: LayerKind, source: &Path, layer: &LoadedLayer<R>, radius: Option<f64>) {
        self.layers.push(LayerStats {
            layer: kind,
            source: source.display().to_string(),
            shape: layer.index.shape(),
            loaded: layer.loaded(),
            rejected: layer.rejected.len(),
            extent: layer
                .index
                .extent()
                .map(|r| [r.min().x, r.min().y, r.max().x, r.max().y]),
            search_radius_m: radius,
        });
        self.rejected.extend(layer.rejected.iter().map(|r| RejectedEntry {
            layer: kind,
            record: r.record,
            reason: r.reason.clone(),
        }));
    }

    pub fn record_artifact(&mut self, info: ArtifactInfo) {
        self.artifact = Some(info);
    }

    pub fn set_duration(&mut self, duration: Duration) {
        self.duration_secs = duration.as_secs_f64();
    }

    /// Détermine le statut final
    pub fn finalize(&mut self) {
        self.layers.sort_by_key(|l| l.layer);
        self.status = if self.rejected.is_empty() {
            LoadStatus::Success
        } else {
            LoadStatus::PartialSuccess
        };
    }

    pub fn total_loaded(&self) -> usize {
        self.layers.iter().map(|l| l.loaded).sum()
    }

    /// Affiche le rapport sur la console
    pub fn display(&self) {
        println!("\n{}", "=".repeat(60));
        println!("LOAD REPORT");
        println!("{}", "=".repeat(60));

        println!("\nStatus: {:?}", self.status);
        println!("Duration: {:.2}s", self.duration_secs);

        println!("\n--- LAYERS ---");
        for l in &self.layers {
            println!(
                "  {:<10} {:?}: {} loaded, {} rejected ({})",
                l.layer.as_str(),
                l.shape,
                l.loaded,
                l.rejected,
                l.source
            );
            if let Some([min_e, min_n, max_e, max_n]) = l.extent {
                println!("             extent: E {:.0}–{:.0}, N {:.0}–{:.0}", min_e, max_e, min_n, max_n);
            }
            if let Some(r) = l.search_radius_m {
                println!("             search radius: {:.0} m", r);
            }
        }

        if let Some(a) = &self.artifact {
            println!("\n--- CLASSIFIER ---");
            println!("  Model: {} (classes {:?})", a.model, a.classes);
            println!("  Source: {}", a.source);
            println!("  BLAKE3: {}", a.fingerprint);
        }

        if !self.rejected.is_empty() {
            println!("\n--- REJECTED RECORDS ({}) ---", self.rejected.len());
            for r in self.rejected.iter().take(20) {
                println!("  [{}:{}] {}", r.layer, r.record, r.reason);
            }
            if self.rejected.len() > 20 {
                println!("  ... and {} more", self.rejected.len() - 20);
            }
        }

        println!("\n{}", "=".repeat(60));
    }

    /// Sauvegarde le rapport en JSON
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Affichage compact pour le résumé
    pub fn summary(&self) -> String {
        let layers = self
            .layers
            .iter()
            .map(|l| format!("{} {}", l.layer, l.loaded))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "{} records loaded ({}), {} rejected",
            self.total_loaded(),
            layers,
            self.rejected.len()
        )
    }
}
