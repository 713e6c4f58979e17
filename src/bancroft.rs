//! Bancroft closed-form position and clock solver
use log::debug;
use nalgebra::{DMatrix, DVector, Vector3, Vector4};

use crate::{constants::EARTH_SEMI_MAJOR_AXIS_WGS84, error::Error};

/// One pseudo range and the position of the vehicle that emitted it.
#[derive(Debug, Clone, Copy)]
pub struct BancroftObservation {
    /// Vehicle position at transmission time, ECEF meters
    pub position_ecef_m: Vector3<f64>,
    /// Pseudo range corrected for the vehicle clock offset (meters)
    pub pseudo_range_m: f64,
}

/// Bancroft solution
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BancroftSolution {
    /// Receiver position, ECEF meters
    pub position_ecef_m: Vector3<f64>,
    /// Receiver clock bias (meters of delay)
    pub clock_bias_m: f64,
}

impl BancroftSolution {
    /// Receiver clock bias, in seconds
    pub fn clock_bias_s(&self) -> f64 {
        self.clock_bias_m / crate::constants::SPEED_OF_LIGHT_M_S
    }
}

/// Bancroft solver: closed form solution of the quadratic system formed
/// by the Lorentz inner product, from 4 or more pseudo ranges.
/// When two real solutions exist, the one closest to the Earth surface is retained.
pub struct Bancroft {
    /// B matrix (x, y, z, pr) per observation
    b: DMatrix<f64>,
    /// a vector: half Lorentz norm of each row of B
    a: DVector<f64>,
}

fn lorentz_4_4(a: &Vector4<f64>, b: &Vector4<f64>) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2] - a[3] * b[3]
}

impl Bancroft {
    /// Builds a new [Bancroft] solver. Requires at least 4 observations.
    pub fn new(observations: &[BancroftObservation]) -> Result<Self, Error> {
        let n = observations.len();
        if n < 4 {
            return Err(Error::InsufficientGeometry);
        }

        let mut b = DMatrix::<f64>::zeros(n, 4);
        let mut a = DVector::<f64>::zeros(n);

        for (i, obs) in observations.iter().enumerate() {
            let row = Vector4::new(
                obs.position_ecef_m[0],
                obs.position_ecef_m[1],
                obs.position_ecef_m[2],
                obs.pseudo_range_m,
            );
            for j in 0..4 {
                b[(i, j)] = row[j];
            }
            a[i] = 0.5 * lorentz_4_4(&row, &row);
        }

        Ok(Self { b, a })
    }

    /// Resolves the receiver position and clock bias.
    pub fn resolve(&self) -> Result<BancroftSolution, Error> {
        let n = self.b.nrows();
        let b_t = self.b.transpose();

        let b_inv = (&b_t * &self.b)
            .try_inverse()
            .ok_or(Error::InsufficientGeometry)?
            * b_t;

        let ones = DVector::<f64>::from_element(n, 1.0);
        let u = &b_inv * ones;
        let v = &b_inv * &self.a;

        let u = Vector4::new(u[0], u[1], u[2], u[3]);
        let v = Vector4::new(v[0], v[1], v[2], v[3]);

        let e = lorentz_4_4(&u, &u);
        let f = lorentz_4_4(&u, &v) - 1.0;
        let g = lorentz_4_4(&v, &v);

        if e == 0.0 || !e.is_finite() {
            return Err(Error::InsufficientGeometry);
        }

        let delta = f * f - e * g;
        if delta < 0.0 || !delta.is_finite() {
            debug!("bancroft: imaginary solution (delta={})", delta);
            return Err(Error::InsufficientGeometry);
        }

        let sqrt_delta = delta.sqrt();

        let solution = [(-f + sqrt_delta) / e, (-f - sqrt_delta) / e]
            .iter()
            .map(|lambda| {
                let y = u * *lambda + v;
                BancroftSolution {
                    position_ecef_m: Vector3::new(y[0], y[1], y[2]),
                    clock_bias_m: -y[3],
                }
            })
            .min_by(|lhs, rhs| {
                let lhs = (lhs.position_ecef_m.norm() - EARTH_SEMI_MAJOR_AXIS_WGS84).abs();
                let rhs = (rhs.position_ecef_m.norm() - EARTH_SEMI_MAJOR_AXIS_WGS84).abs();
                lhs.total_cmp(&rhs)
            })
            .ok_or(Error::InsufficientGeometry)?;

        if !solution.position_ecef_m.iter().all(|x| x.is_finite()) {
            return Err(Error::InsufficientGeometry);
        }

        Ok(solution)
    }
}

#[cfg(test)]
mod test {
    use super::{Bancroft, BancroftObservation};
    use crate::prelude::{Error, Vector3};

    #[test]
    fn not_enough_observations() {
        let obs = [BancroftObservation {
            position_ecef_m: Vector3::new(20.0E6, 0.0, 0.0),
            pseudo_range_m: 20.0E6,
        }; 3];
        assert_eq!(Bancroft::new(&obs).err(), Some(Error::InsufficientGeometry));
    }

    #[test]
    fn degenerate_geometry() {
        let obs = [BancroftObservation {
            position_ecef_m: Vector3::zeros(),
            pseudo_range_m: 0.0,
        }; 5];
        let solver = Bancroft::new(&obs).unwrap();
        assert_eq!(solver.resolve().err(), Some(Error::InsufficientGeometry));
    }
}
