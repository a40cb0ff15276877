//! Familles de modèles supportées
//!
//! Toutes les prédictions sont déterministes ; à score égal, la classe de plus
//! petit identifiant l'emporte.

use serde::{Deserialize, Serialize};

/// Identifiant de cluster
pub type ClusterId = u8;

/// Clusters produits par le regroupement d'origine
pub const CLUSTERS: [ClusterId; 4] = [0, 1, 2, 3];

/// Classe prédite et indice de confiance éventuel
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Prediction {
    pub cluster: ClusterId,
    /// Part des votes, probabilité moyenne ou softmax selon le modèle
    pub confidence: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Centroid {
    pub label: ClusterId,
    pub center: Vec<f64>,
}

/// Nœud d'arbre de décision : split `x[feature] <= threshold` → `left`, sinon `right`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        /// Effectifs ou probabilités par classe, alignés sur `classes`
        value: Vec<f64>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tree {
    pub nodes: Vec<TreeNode>,
}

/// Modèle pré-entraîné
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Model {
    /// Centroïde le plus proche
    NearestCentroid { centroids: Vec<Centroid> },
    /// Régression logistique / SVM linéaire : argmax des scores par classe
    Linear {
        classes: Vec<ClusterId>,
        coefficients: Vec<Vec<f64>>,
        intercepts: Vec<f64>,
    },
    /// Forêt aléatoire : moyenne des distributions normalisées des feuilles
    Forest { classes: Vec<ClusterId>, trees: Vec<Tree> },
    /// k plus proches voisins, vote majoritaire
    KNearest {
        k: usize,
        points: Vec<Vec<f64>>,
        labels: Vec<ClusterId>,
    },
}

impl Model {
    /// Nom de la famille, pour les rapports
    pub fn family(&self) -> &'static str {
        match self {
            Model::NearestCentroid { .. } => "nearest_centroid",
            Model::Linear { .. } => "linear",
            Model::Forest { .. } => "forest",
            Model::KNearest { .. } => "k_nearest",
        }
    }

    /// Classes que le modèle peut produire, triées
    pub fn classes(&self) -> Vec<ClusterId> {
        let mut classes: Vec<ClusterId> = match self {
            Model::NearestCentroid { centroids } => centroids.iter().map(|c| c.label).collect(),
            Model::Linear { classes, .. } | Model::Forest { classes, .. } => classes.clone(),
            Model::KNearest { labels, .. } => labels.clone(),
        };
        classes.sort_unstable();
        classes.dedup();
        classes
    }

    /// Contrôle de cohérence à la lecture de l'artefact
    pub fn validate(&self, dim: usize) -> Result<(), String> {
        match self {
            Model::NearestCentroid { centroids } => {
                if centroids.is_empty() {
                    return Err("nearest_centroid: no centroid".into());
                }
                for c in centroids {
                    check_class(c.label)?;
                    check_vector(&c.center, dim, "centroid")?;
                }
            }
            Model::Linear {
                classes,
                coefficients,
                intercepts,
            } => {
                check_classes(classes)?;
                if coefficients.len() != classes.len() || intercepts.len() != classes.len() {
                    return Err(format!(
                        "linear: {} classes but {} coefficient rows and {} intercepts",
                        classes.len(),
                        coefficients.len(),
                        intercepts.len()
                    ));
                }
                for row in coefficients {
                    check_vector(row, dim, "coefficient row")?;
                }
                if intercepts.iter().any(|v| !v.is_finite()) {
                    return Err("linear: non-finite intercept".into());
                }
            }
            Model::Forest { classes, trees } => {
                check_classes(classes)?;
                if trees.is_empty() {
                    return Err("forest: no tree".into());
                }
                for (t, tree) in trees.iter().enumerate() {
                    validate_tree(tree, dim, classes.len()).map_err(|e| format!("forest: tree {}: {}", t, e))?;
                }
            }
            Model::KNearest { k, points, labels } => {
                if points.len() != labels.len() {
                    return Err(format!(
                        "k_nearest: {} points but {} labels",
                        points.len(),
                        labels.len()
                    ));
                }
                if *k == 0 || *k > points.len() {
                    return Err(format!("k_nearest: k={} with {} points", k, points.len()));
                }
                for label in labels {
                    check_class(*label)?;
                }
                for p in points {
                    check_vector(p, dim, "training point")?;
                }
            }
        }
        Ok(())
    }

    /// Prédit la classe d'un vecteur (déjà mis à l'échelle).
    ///
    /// Ne peut échouer qu'avec un modèle qui n'a pas passé `validate`.
    pub fn predict(&self, x: &[f64]) -> Result<Prediction, String> {
        match self {
            Model::NearestCentroid { centroids } => {
                let mut best: Option<(ClusterId, f64)> = None;
                for c in centroids {
                    let d = squared_distance(&c.center, x);
                    best = match best {
                        Some((label, bd)) if bd < d || (bd == d && label <= c.label) => Some((label, bd)),
                        _ => Some((c.label, d)),
                    };
                }
                let (cluster, _) = best.ok_or("nearest_centroid: no centroid")?;
                Ok(Prediction {
                    cluster,
                    confidence: None,
                })
            }
            Model::Linear {
                classes,
                coefficients,
                intercepts,
            } => {
                let scores: Vec<f64> = coefficients
                    .iter()
                    .zip(intercepts)
                    .map(|(w, b)| b + w.iter().zip(x).map(|(wi, xi)| wi * xi).sum::<f64>())
                    .collect();
                let (cluster, top) = argmax(classes, &scores).ok_or("linear: no class")?;
                // Softmax de la classe retenue
                let denom: f64 = scores.iter().map(|s| (s - top).exp()).sum();
                Ok(Prediction {
                    cluster,
                    confidence: Some(1.0 / denom),
                })
            }
            Model::Forest { classes, trees } => {
                if trees.is_empty() {
                    return Err("forest: no tree".into());
                }
                let mut totals = vec![0.0; classes.len()];
                for (t, tree) in trees.iter().enumerate() {
                    let value = leaf_value(tree, x).map_err(|e| format!("forest: tree {}: {}", t, e))?;
                    let sum: f64 = value.iter().sum();
                    if sum > 0.0 {
                        for (total, v) in totals.iter_mut().zip(value) {
                            *total += v / sum;
                        }
                    }
                }
                let n = trees.len() as f64;
                let probabilities: Vec<f64> = totals.iter().map(|t| t / n).collect();
                let (cluster, p) = argmax(classes, &probabilities).ok_or("forest: no class")?;
                Ok(Prediction {
                    cluster,
                    confidence: Some(p),
                })
            }
            Model::KNearest { k, points, labels } => {
                if *k == 0 {
                    return Err("k_nearest: k=0".into());
                }
                let mut neighbours: Vec<(f64, usize)> = points
                    .iter()
                    .enumerate()
                    .map(|(i, p)| (squared_distance(p, x), i))
                    .collect();
                neighbours.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

                let mut votes = [0usize; CLUSTERS.len()];
                for &(_, i) in neighbours.iter().take(*k) {
                    let label = labels.get(i).copied().ok_or("k_nearest: point without label")?;
                    *votes
                        .get_mut(label as usize)
                        .ok_or_else(|| format!("k_nearest: class id {} outside {:?}", label, CLUSTERS))? += 1;
                }
                let counts: Vec<f64> = votes.iter().map(|&v| v as f64).collect();
                let (cluster, top) = argmax(&CLUSTERS, &counts).ok_or("k_nearest: no class")?;
                Ok(Prediction {
                    cluster,
                    confidence: Some(top / *k as f64),
                })
            }
        }
    }
}

/// Classe de score maximal, la plus petite en cas d'égalité ; `None` sans classe
fn argmax(classes: &[ClusterId], scores: &[f64]) -> Option<(ClusterId, f64)> {
    let mut best: Option<(ClusterId, f64)> = None;
    for (&class, &score) in classes.iter().zip(scores) {
        best = match best {
            Some((c, s)) if s > score || (s == score && c <= class) => Some((c, s)),
            _ => Some((class, score)),
        };
    }
    best
}

fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Descend l'arbre jusqu'à une feuille (terminaison garantie par la validation)
fn leaf_value<'t>(tree: &'t Tree, x: &[f64]) -> Result<&'t [f64], String> {
    let mut index = 0;
    // Chaque pas avance strictement dans un arbre validé
    for _ in 0..tree.nodes.len() {
        match tree.nodes.get(index) {
            Some(TreeNode::Leaf { value }) => return Ok(value),
            Some(TreeNode::Split {
                feature,
                threshold,
                left,
                right,
            }) => {
                let v = x
                    .get(*feature)
                    .ok_or_else(|| format!("node {}: feature {} out of range", index, feature))?;
                index = if *v <= *threshold { *left } else { *right };
            }
            None => return Err(format!("invalid node index {}", index)),
        }
    }
    Err("no leaf reached".into())
}

fn check_class(class: ClusterId) -> Result<(), String> {
    if CLUSTERS.contains(&class) {
        Ok(())
    } else {
        Err(format!("class id {} outside {:?}", class, CLUSTERS))
    }
}

fn check_classes(classes: &[ClusterId]) -> Result<(), String> {
    if classes.is_empty() {
        return Err("no class".into());
    }
    for (i, c) in classes.iter().enumerate() {
        check_class(*c)?;
        if classes[..i].contains(c) {
            return Err(format!("duplicate class id {}", c));
        }
    }
    Ok(())
}

fn check_vector(v: &[f64], dim: usize, what: &str) -> Result<(), String> {
    if v.len() != dim {
        return Err(format!("{} has {} values, expected {}", what, v.len(), dim));
    }
    if v.iter().any(|x| !x.is_finite()) {
        return Err(format!("{} contains a non-finite value", what));
    }
    Ok(())
}

/// Enfants strictement après leur parent : tout parcours termine
fn validate_tree(tree: &Tree, dim: usize, n_classes: usize) -> Result<(), String> {
    if tree.nodes.is_empty() {
        return Err("empty tree".into());
    }
    for (i, node) in tree.nodes.iter().enumerate() {
        match node {
            TreeNode::Split {
                feature,
                threshold,
                left,
                right,
            } => {
                if *feature >= dim {
                    return Err(format!("node {}: feature {} out of range", i, feature));
                }
                if !threshold.is_finite() {
                    return Err(format!("node {}: non-finite threshold", i));
                }
                for child in [*left, *right] {
                    if child <= i || child >= tree.nodes.len() {
                        return Err(format!("node {}: invalid child index {}", i, child));
                    }
                }
            }
            TreeNode::Leaf { value } => {
                if value.len() != n_classes {
                    return Err(format!("node {}: {} values for {} classes", i, value.len(), n_classes));
                }
                if value.iter().any(|v| !v.is_finite() || *v < 0.0) {
                    return Err(format!("node {}: invalid leaf value", i));
                }
            }
        }
    }
    Ok(())
}
