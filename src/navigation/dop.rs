use nalgebra::{DMatrix, Matrix3, Vector3};

use crate::geodesy::{ecef_to_geodetic, enu_rotation};

/// [DilutionOfPrecision] of the vehicles contributing to the solution
#[derive(Debug, Clone, Default, Copy, PartialEq)]
pub struct DilutionOfPrecision {
    /// Geometric DOP
    pub gdop: f64,

    /// Horizontal DOP
    pub hdop: f64,

    /// Vertical DOP
    pub vdop: f64,

    /// Temporal DOP
    pub tdop: f64,
}

/// Rotates an ECEF covariance to local (north, east, up) frame, at this position.
pub(crate) fn neu_covariance(q_ecef: &Matrix3<f64>, rx_ecef_m: &Vector3<f64>) -> Matrix3<f64> {
    let (lat_rad, lon_rad, _) = ecef_to_geodetic(rx_ecef_m);
    let enu = enu_rotation(lat_rad, lon_rad);

    // columns: north, east, up
    let neu = Matrix3::from_columns(&[enu.column(1), enu.column(0), enu.column(2)]);

    neu.transpose() * q_ecef * neu
}

impl DilutionOfPrecision {
    /// Creates new [DilutionOfPrecision] from the unit line of sight vectors
    /// (vehicle to receiver) of the vehicles in use. Requires at least 4 vehicles.
    pub(crate) fn new(rx_ecef_m: &Vector3<f64>, los: &[Vector3<f64>]) -> Option<Self> {
        if los.len() < 4 {
            return None;
        }

        let g = DMatrix::<f64>::from_fn(los.len(), 4, |i, j| if j < 3 { los[i][j] } else { 1.0 });

        let g_gt_inv = (g.transpose() * &g).try_inverse()?;

        let q_ecef = g_gt_inv.fixed_view::<3, 3>(0, 0).into_owned();

        let (lat_rad, lon_rad, _) = ecef_to_geodetic(rx_ecef_m);
        let r = enu_rotation(lat_rad, lon_rad);
        let q_enu = r.transpose() * q_ecef * r;

        let dop = Self {
            gdop: g_gt_inv.trace().sqrt(),
            tdop: g_gt_inv[(3, 3)].sqrt(),
            vdop: q_enu[(2, 2)].sqrt(),
            hdop: (q_enu[(0, 0)] + q_enu[(1, 1)]).sqrt(),
        };

        if dop.gdop.is_finite() {
            Some(dop)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::geodesy::geodetic_to_ecef;

    fn los(rx: &Vector3<f64>, elev_deg: f64, azim_deg: f64) -> Vector3<f64> {
        let (lat, lon, _) = ecef_to_geodetic(rx);
        let r = enu_rotation(lat, lon);
        let (e, a) = (elev_deg.to_radians(), azim_deg.to_radians());
        // receiver to vehicle, in ENU
        let enu = Vector3::new(e.cos() * a.sin(), e.cos() * a.cos(), e.sin());
        -(r * enu)
    }

    #[test]
    fn dop_geometry() {
        let rx = geodetic_to_ecef(45.0_f64.to_radians(), 5.0_f64.to_radians(), 100.0);

        let los = vec![
            los(&rx, 90.0, 0.0),
            los(&rx, 30.0, 0.0),
            los(&rx, 30.0, 120.0),
            los(&rx, 30.0, 240.0),
        ];

        let dop = DilutionOfPrecision::new(&rx, &los).unwrap();

        // symmetric geometry
        assert!(dop.hdop > 0.0 && dop.hdop < 2.0);
        assert!(dop.vdop > 0.0);
        assert!(dop.gdop >= dop.hdop);
        assert!((dop.gdop.powi(2) - dop.hdop.powi(2) - dop.vdop.powi(2) - dop.tdop.powi(2)).abs() < 1.0E-9);

        assert!(DilutionOfPrecision::new(&rx, &los[..3]).is_none());
    }

    #[test]
    fn neu_rotation() {
        let rx = geodetic_to_ecef(45.0_f64.to_radians(), 5.0_f64.to_radians(), 100.0);
        let (lat, lon, _) = ecef_to_geodetic(&rx);
        let r = enu_rotation(lat, lon);

        // 1m² north only uncertainty
        let north = r.column(1).into_owned();
        let q_ecef = north * north.transpose();

        let q_neu = neu_covariance(&q_ecef, &rx);
        assert!((q_neu[(0, 0)] - 1.0).abs() < 1.0E-9);
        assert!(q_neu[(1, 1)].abs() < 1.0E-9);
        assert!(q_neu[(2, 2)].abs() < 1.0E-9);
    }
}
