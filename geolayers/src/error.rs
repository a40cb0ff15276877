//! Types d'erreurs pour le crate geolayers

use thiserror::Error;

use crate::types::LayerKind;

/// Erreurs pouvant survenir lors du chargement d'une couche de référence
#[derive(Debug, Error)]
pub enum LayerError {
    /// Erreur d'I/O lors de la lecture du fichier source
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Extension de fichier non reconnue
    #[error("Unsupported source format: {0}")]
    UnsupportedFormat(String),

    /// Colonne obligatoire absente de l'en-tête
    #[error("Missing required column `{column}` in {file}")]
    MissingColumn { file: String, column: String },

    /// Fichier illisible dans son ensemble
    #[error("Parse error in {file}: {reason}")]
    ParseError { file: String, reason: String },

    /// Trop d'enregistrements rejetés à la construction de l'index
    #[error("{layer} layer rejected {rejected} of {total} records (tolerance {tolerance})")]
    TooManyRejected {
        layer: LayerKind,
        rejected: usize,
        total: usize,
        tolerance: usize,
    },

    /// Aucun enregistrement valide
    #[error("{0} layer contains no valid record")]
    EmptyLayer(LayerKind),
}

impl LayerError {
    /// Crée une erreur de parsing avec contexte
    pub fn parse_error(file: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ParseError {
            file: file.into(),
            reason: reason.into(),
        }
    }

    /// Crée une erreur de colonne manquante
    pub fn missing_column(file: impl Into<String>, column: impl Into<String>) -> Self {
        Self::MissingColumn {
            file: file.into(),
            column: column.into(),
        }
    }
}
