//! Changement de datum par transformation de Helmert à 7 paramètres

use super::ellipsoid::Ellipsoid;
use super::Geographic;

const ARC_SECOND: f64 = std::f64::consts::PI / (180.0 * 3600.0);

/// Coordonnées géocentriques cartésiennes (mètres)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Geocentric {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Géographique (hauteur ellipsoïdale nulle) → géocentrique
pub fn to_geocentric(geo: Geographic, ellipsoid: Ellipsoid) -> Geocentric {
    let e2 = ellipsoid.e2();
    let (sin_phi, cos_phi) = geo.lat.sin_cos();
    let nu = ellipsoid.a / (1.0 - e2 * sin_phi * sin_phi).sqrt();

    Geocentric {
        x: nu * cos_phi * geo.lon.cos(),
        y: nu * cos_phi * geo.lon.sin(),
        z: (1.0 - e2) * nu * sin_phi,
    }
}

/// Géocentrique → géographique (itération de Bowring simplifiée)
pub fn from_geocentric(point: Geocentric, ellipsoid: Ellipsoid) -> Geographic {
    let e2 = ellipsoid.e2();
    let p = point.x.hypot(point.y);
    let lon = point.y.atan2(point.x);

    let mut lat = point.z.atan2(p * (1.0 - e2));
    for _ in 0..10 {
        let sin_lat = lat.sin();
        let nu = ellipsoid.a / (1.0 - e2 * sin_lat * sin_lat).sqrt();
        let next = (point.z + e2 * nu * sin_lat).atan2(p);
        let converged = (next - lat).abs() < 1e-12;
        lat = next;
        if converged {
            break;
        }
    }

    Geographic::new(lon, lat)
}

/// Transformation de Helmert (convention « position vector »)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Helmert {
    /// Translations (mètres)
    pub tx: f64,
    pub ty: f64,
    pub tz: f64,
    /// Rotations (secondes d'arc)
    pub rx: f64,
    pub ry: f64,
    pub rz: f64,
    /// Facteur d'échelle (ppm)
    pub s: f64,
}

impl Helmert {
    /// TM65 (Ireland 1965) → WGS84, paramètres publiés pour EPSG:29903
    pub const TM65_TO_WGS84: Helmert = Helmert {
        tx: 482.5,
        ty: -130.6,
        tz: 564.6,
        rx: -1.042,
        ry: -0.214,
        rz: -0.631,
        s: 8.15,
    };

    /// Transformation réciproque (au premier ordre, erreur millimétrique)
    pub fn inverse(&self) -> Helmert {
        Helmert {
            tx: -self.tx,
            ty: -self.ty,
            tz: -self.tz,
            rx: -self.rx,
            ry: -self.ry,
            rz: -self.rz,
            s: -self.s,
        }
    }

    pub fn apply(&self, p: Geocentric) -> Geocentric {
        let (rx, ry, rz) = (self.rx * ARC_SECOND, self.ry * ARC_SECOND, self.rz * ARC_SECOND);
        let scale = 1.0 + self.s * 1e-6;

        Geocentric {
            x: self.tx + scale * p.x - rz * p.y + ry * p.z,
            y: self.ty + rz * p.x + scale * p.y - rx * p.z,
            z: self.tz - ry * p.x + rx * p.y + scale * p.z,
        }
    }

    /// Change le datum d'un point géographique
    pub fn transform(&self, geo: Geographic, from: Ellipsoid, to: Ellipsoid) -> Geographic {
        from_geocentric(self.apply(to_geocentric(geo, from)), to)
    }
}
