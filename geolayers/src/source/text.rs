//! Décodage des fichiers texte sources

use std::borrow::Cow;

/// Décode le contenu d'un fichier : UTF-8 si valide, sinon Windows-1252.
///
/// Les exports CSV de shapefiles irlandais contiennent souvent des caractères
/// accentués (síneadh fada) encodés en Latin-1.
pub fn decode(data: &[u8]) -> Cow<'_, str> {
    let data = data.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(data);

    match simdutf8::basic::from_utf8(data) {
        Ok(text) => Cow::Borrowed(text),
        Err(_) => {
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(data);
            tracing::debug!("Source is not valid UTF-8, decoded as Windows-1252");
            decoded
        }
    }
}
