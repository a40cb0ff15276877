//! Projection Transverse Mercator
//!
//! Séries de l'Ordnance Survey (précision millimétrique dans la zone irlandaise) :
//! - Irish Grid (EPSG:29903), sur Airy modifié
//! - Irish Transverse Mercator (EPSG:2157), sur GRS80

use super::ellipsoid::Ellipsoid;
use super::Geographic;

/// Seuil de convergence de la latitude inverse, en mètres d'arc méridien
const ARC_TOLERANCE: f64 = 1e-5;

/// Borne du nombre d'itérations (la convergence prend 3 à 4 tours)
const MAX_ITERATIONS: usize = 16;

/// Paramètres d'une projection Transverse Mercator
#[derive(Debug, Clone, Copy)]
pub struct TransverseMercator {
    pub ellipsoid: Ellipsoid,
    /// Facteur d'échelle sur le méridien central
    pub k0: f64,
    /// Latitude d'origine (radians)
    pub lat0: f64,
    /// Méridien central (radians)
    pub lon0: f64,
    /// False easting
    pub e0: f64,
    /// False northing
    pub n0: f64,
}

impl TransverseMercator {
    /// Irish Grid / TM65 (EPSG:29903)
    pub fn irish_grid() -> Self {
        Self {
            ellipsoid: Ellipsoid::AIRY_MODIFIED,
            k0: 1.000035,
            lat0: 53.5f64.to_radians(),
            lon0: (-8.0f64).to_radians(),
            e0: 200000.0,
            n0: 250000.0,
        }
    }

    /// Irish Transverse Mercator (EPSG:2157)
    pub fn itm() -> Self {
        Self {
            ellipsoid: Ellipsoid::GRS80,
            k0: 0.99982,
            lat0: 53.5f64.to_radians(),
            lon0: (-8.0f64).to_radians(),
            e0: 600000.0,
            n0: 750000.0,
        }
    }

    /// Arc méridien depuis la latitude d'origine, mis à l'échelle
    fn meridional_arc(&self, phi: f64) -> f64 {
        let n = self.ellipsoid.n();
        let (n2, n3) = (n * n, n * n * n);
        let dp = phi - self.lat0;
        let sp = phi + self.lat0;

        self.ellipsoid.b
            * self.k0
            * ((1.0 + n + 1.25 * n2 + 1.25 * n3) * dp
                - (3.0 * n + 3.0 * n2 + 21.0 / 8.0 * n3) * dp.sin() * sp.cos()
                + (15.0 / 8.0 * n2 + 15.0 / 8.0 * n3) * (2.0 * dp).sin() * (2.0 * sp).cos()
                - 35.0 / 24.0 * n3 * (3.0 * dp).sin() * (3.0 * sp).cos())
    }

    /// Rayons de courbure (nu, rho) mis à l'échelle, et eta²
    fn curvature(&self, phi: f64) -> (f64, f64, f64) {
        let a = self.ellipsoid.a;
        let e2 = self.ellipsoid.e2();
        let s2 = phi.sin().powi(2);
        let nu = a * self.k0 / (1.0 - e2 * s2).sqrt();
        let rho = a * self.k0 * (1.0 - e2) / (1.0 - e2 * s2).powf(1.5);
        (nu, rho, nu / rho - 1.0)
    }

    /// Géographique → (easting, northing)
    pub fn forward(&self, geo: Geographic) -> (f64, f64) {
        let phi = geo.lat;
        let (sin_phi, cos_phi, tan_phi) = (phi.sin(), phi.cos(), phi.tan());
        let t2 = tan_phi * tan_phi;
        let t4 = t2 * t2;
        let (nu, rho, eta2) = self.curvature(phi);

        let i = self.meridional_arc(phi) + self.n0;
        let ii = nu / 2.0 * sin_phi * cos_phi;
        let iii = nu / 24.0 * sin_phi * cos_phi.powi(3) * (5.0 - t2 + 9.0 * eta2);
        let iiia = nu / 720.0 * sin_phi * cos_phi.powi(5) * (61.0 - 58.0 * t2 + t4);
        let iv = nu * cos_phi;
        let v = nu / 6.0 * cos_phi.powi(3) * (nu / rho - t2);
        let vi = nu / 120.0 * cos_phi.powi(5) * (5.0 - 18.0 * t2 + t4 + 14.0 * eta2 - 58.0 * t2 * eta2);

        let dl = geo.lon - self.lon0;
        let easting = self.e0 + iv * dl + v * dl.powi(3) + vi * dl.powi(5);
        let northing = i + ii * dl.powi(2) + iii * dl.powi(4) + iiia * dl.powi(6);
        (easting, northing)
    }

    /// (easting, northing) → géographique
    pub fn inverse(&self, easting: f64, northing: f64) -> Geographic {
        let a_k0 = self.ellipsoid.a * self.k0;

        // Latitude du pied de la perpendiculaire, par itération sur l'arc méridien
        let mut phi = (northing - self.n0) / a_k0 + self.lat0;
        let mut m = self.meridional_arc(phi);
        for _ in 0..MAX_ITERATIONS {
            let residual = northing - self.n0 - m;
            if residual.abs() < ARC_TOLERANCE {
                break;
            }
            phi += residual / a_k0;
            m = self.meridional_arc(phi);
        }

        let (cos_phi, tan_phi) = (phi.cos(), phi.tan());
        let sec_phi = 1.0 / cos_phi;
        let t2 = tan_phi * tan_phi;
        let t4 = t2 * t2;
        let t6 = t4 * t2;
        let (nu, rho, eta2) = self.curvature(phi);

        let vii = tan_phi / (2.0 * rho * nu);
        let viii = tan_phi / (24.0 * rho * nu.powi(3)) * (5.0 + 3.0 * t2 + eta2 - 9.0 * t2 * eta2);
        let ix = tan_phi / (720.0 * rho * nu.powi(5)) * (61.0 + 90.0 * t2 + 45.0 * t4);
        let x = sec_phi / nu;
        let xi = sec_phi / (6.0 * nu.powi(3)) * (nu / rho + 2.0 * t2);
        let xii = sec_phi / (120.0 * nu.powi(5)) * (5.0 + 28.0 * t2 + 24.0 * t4);
        let xiia = sec_phi / (5040.0 * nu.powi(7)) * (61.0 + 662.0 * t2 + 1320.0 * t4 + 720.0 * t6);

        let de = easting - self.e0;
        let lat = phi - vii * de.powi(2) + viii * de.powi(4) - ix * de.powi(6);
        let lon = self.lon0 + x * de - xi * de.powi(3) + xii * de.powi(5) - xiia * de.powi(7);

        Geographic::new(lon, lat)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_true_origin() {
        let tm = TransverseMercator::irish_grid();
        let (e, n) = tm.forward(Geographic::from_degrees(-8.0, 53.5));
        assert!((e - 200000.0).abs() < 1e-6, "e={}", e);
        assert!((n - 250000.0).abs() < 1e-6, "n={}", n);
    }

    #[test]
    fn test_round_trip() {
        for tm in [TransverseMercator::irish_grid(), TransverseMercator::itm()] {
            for (lon, lat) in [(-6.26, 53.35), (-9.05, 53.27), (-8.47, 51.90), (-7.3, 55.2)] {
                let (e, n) = tm.forward(Geographic::from_degrees(lon, lat));
                let (lon2, lat2) = tm.inverse(e, n).to_degrees();
                assert!((lon - lon2).abs() < 1e-8, "lon={} lon2={}", lon, lon2);
                assert!((lat - lat2).abs() < 1e-8, "lat={} lat2={}", lat, lat2);
            }
        }
    }

    #[test]
    fn test_itm_dublin() {
        // Spire de Dublin, ETRS89 ≈ WGS84
        let (e, n) = TransverseMercator::itm().forward(Geographic::from_degrees(-6.2603, 53.3498));
        assert!((e - 715826.5).abs() < 1.0, "e={}", e);
        assert!((n - 734697.6).abs() < 1.0, "n={}", n);
    }
}
