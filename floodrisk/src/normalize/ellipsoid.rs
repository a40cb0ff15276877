//! Définitions des ellipsoïdes

/// Ellipsoïde de révolution défini par ses demi-axes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ellipsoid {
    /// Demi-grand axe (rayon équatorial) en mètres
    pub a: f64,
    /// Demi-petit axe (rayon polaire) en mètres
    pub b: f64,
}

impl Ellipsoid {
    /// Airy modifié (1849), utilisé par l'Irish Grid (TM65)
    pub const AIRY_MODIFIED: Ellipsoid = Ellipsoid {
        a: 6377340.189,
        b: 6356034.447938,
    };

    /// GRS80, utilisé par l'ITM (ETRS89)
    pub const GRS80: Ellipsoid = Ellipsoid {
        a: 6378137.0,
        b: 6356752.314140356,
    };

    /// WGS84
    pub const WGS84: Ellipsoid = Ellipsoid {
        a: 6378137.0,
        b: 6356752.314245179,
    };

    /// Première excentricité au carré
    pub fn e2(&self) -> f64 {
        (self.a * self.a - self.b * self.b) / (self.a * self.a)
    }

    /// Troisième aplatissement n = (a - b) / (a + b)
    pub fn n(&self) -> f64 {
        (self.a - self.b) / (self.a + self.b)
    }
}
