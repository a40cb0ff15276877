//! Lecteur CSV minimal pour les exports de couches (champs entre guillemets, WKT)

use std::borrow::Cow;
use std::collections::HashMap;

use memchr::{memchr, memchr2};

use crate::types::Fields;
use crate::LayerError;

/// Table CSV en mémoire : en-tête indexé et corps non encore découpé
#[derive(Debug)]
pub struct CsvTable<'a> {
    file: String,
    headers: Vec<String>,
    columns: HashMap<String, usize>,
    body: &'a str,
}

impl<'a> CsvTable<'a> {
    /// Lit l'en-tête et prépare l'itération des lignes
    pub fn parse(file: impl Into<String>, text: &'a str) -> Result<Self, LayerError> {
        let file = file.into();
        let mut pos = 0;

        let headers = loop {
            match next_record(text, &mut pos) {
                None => return Err(LayerError::parse_error(file, "empty file, no header")),
                Some(Ok(fields)) if fields.len() == 1 && fields[0].trim().is_empty() => continue,
                Some(Ok(fields)) => {
                    break fields
                        .into_iter()
                        .map(|f| f.trim().to_string())
                        .collect::<Vec<_>>()
                }
                Some(Err(reason)) => return Err(LayerError::parse_error(file, reason)),
            }
        };

        let mut columns = HashMap::with_capacity(headers.len());
        for (i, name) in headers.iter().enumerate() {
            columns.entry(name.to_ascii_lowercase()).or_insert(i);
        }

        Ok(Self {
            file,
            headers,
            columns,
            body: &text[pos..],
        })
    }

    /// Nom du fichier source (pour les messages)
    pub fn file(&self) -> &str {
        &self.file
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Index d'une colonne (insensible à la casse)
    pub fn column(&self, name: &str) -> Option<usize> {
        self.columns.get(&name.to_ascii_lowercase()).copied()
    }

    /// Index de la première colonne trouvée parmi des alias
    pub fn column_any(&self, names: &[&str]) -> Option<usize> {
        names.iter().find_map(|n| self.column(n))
    }

    /// Vérifie la présence des colonnes obligatoires
    pub fn require(&self, names: &[&str]) -> Result<(), LayerError> {
        match names.iter().find(|n| self.column(n).is_none()) {
            Some(missing) => Err(LayerError::missing_column(&self.file, *missing)),
            None => Ok(()),
        }
    }

    /// Itère sur les enregistrements de données
    pub fn rows(&self) -> Rows<'_, 'a> {
        Rows {
            table: self,
            pos: 0,
            index: 0,
        }
    }
}

/// Itérateur sur les lignes de données.
///
/// Chaque élément porte la position de l'enregistrement (base 0) et la ligne,
/// ou la raison pour laquelle elle est illisible.
pub struct Rows<'t, 'a> {
    table: &'t CsvTable<'a>,
    pos: usize,
    index: usize,
}

impl<'t, 'a> Iterator for Rows<'t, 'a> {
    type Item = (usize, Result<CsvRow<'t, 'a>, String>);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let fields = match next_record(self.table.body, &mut self.pos)? {
                Ok(fields) => fields,
                Err(reason) => {
                    // `next_record` s'est déjà resynchronisé sur la ligne suivante
                    let index = self.index;
                    self.index += 1;
                    return Some((index, Err(reason)));
                }
            };

            // Lignes vides ignorées
            if fields.len() == 1 && fields[0].trim().is_empty() {
                continue;
            }

            let index = self.index;
            self.index += 1;

            let expected = self.table.headers.len();
            if fields.len() != expected {
                return Some((
                    index,
                    Err(format!(
                        "expected {} fields, found {}",
                        expected,
                        fields.len()
                    )),
                ));
            }

            return Some((
                index,
                Ok(CsvRow {
                    table: self.table,
                    values: fields,
                }),
            ));
        }
    }
}

/// Une ligne CSV découpée
#[derive(Debug)]
pub struct CsvRow<'t, 'a> {
    table: &'t CsvTable<'a>,
    values: Vec<Cow<'a, str>>,
}

impl CsvRow<'_, '_> {
    /// Valeur par index de colonne
    pub fn get(&self, index: usize) -> Option<&str> {
        self.values.get(index).map(|v| v.as_ref())
    }
}

impl Fields for CsvRow<'_, '_> {
    fn field(&self, name: &str) -> Option<Cow<'_, str>> {
        let index = self.table.column(name)?;
        self.get(index).map(Cow::Borrowed)
    }
}

/// Découpe l'enregistrement qui commence à `pos` et avance `pos` après sa fin.
///
/// Retourne `None` en fin d'entrée.
fn next_record<'a>(input: &'a str, pos: &mut usize) -> Option<Result<Vec<Cow<'a, str>>, String>> {
    let bytes = input.as_bytes();
    let len = bytes.len();
    if *pos >= len {
        return None;
    }

    let mut fields = Vec::new();
    let mut i = *pos;

    loop {
        if i < len && bytes[i] == b'"' {
            // Champ entre guillemets, "" = guillemet littéral
            let open = i;
            i += 1;
            let mut value = String::new();
            let mut segment = i;
            loop {
                let Some(offset) = memchr(b'"', &bytes[i..]) else {
                    // Seule la ligne du guillemet ouvrant est perdue
                    *pos = memchr(b'\n', &bytes[open..]).map_or(len, |o| open + o + 1);
                    return Some(Err("unterminated quoted field".to_string()));
                };
                let quote = i + offset;
                if quote + 1 < len && bytes[quote + 1] == b'"' {
                    value.push_str(&input[segment..=quote]);
                    i = quote + 2;
                    segment = i;
                } else {
                    value.push_str(&input[segment..quote]);
                    i = quote + 1;
                    break;
                }
            }
            fields.push(Cow::Owned(value));

            if i < len && bytes[i] == b'\r' {
                i += 1;
            }
            if i >= len {
                break;
            }
            match bytes[i] {
                b',' => i += 1,
                b'\n' => {
                    i += 1;
                    break;
                }
                other => {
                    // Se resynchroniser sur la fin de ligne
                    *pos = memchr(b'\n', &bytes[i..]).map_or(len, |o| i + o + 1);
                    return Some(Err(format!(
                        "unexpected character {:?} after quoted field",
                        other as char
                    )));
                }
            }
        } else {
            let end = memchr2(b',', b'\n', &bytes[i..]).map_or(len, |o| i + o);
            let mut value = &input[i..end];
            let at_separator = end < len && bytes[end] == b',';
            if !at_separator {
                value = value.strip_suffix('\r').unwrap_or(value);
            }
            fields.push(Cow::Borrowed(value));
            i = end + 1;
            if !at_separator {
                break;
            }
        }
    }

    *pos = i.min(len);
    Some(Ok(fields))
}
