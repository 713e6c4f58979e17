//! Kalman measurement update
use nalgebra::{DMatrix, DVector};

use crate::error::Error;

/// Measurement update output
#[derive(Debug, Clone)]
pub(crate) struct KalmanUpdate {
    /// State correction
    pub dx: DVector<f64>,
    /// Updated covariance
    pub covariance: DMatrix<f64>,
    /// Post-fit residuals: y - H dx
    pub postfit: DVector<f64>,
}

/// True if `p` is (numerically) positive definite.
/// Strict definiteness is required: every live parameter keeps a non zero
/// variance, and the next update factorizes this matrix.
pub(crate) fn is_positive_definite(p: &DMatrix<f64>) -> bool {
    if !p.iter().all(|x| x.is_finite()) {
        return false;
    }
    if p.diagonal().iter().any(|x| *x <= 0.0) {
        return false;
    }
    p.clone().cholesky().is_some()
}

/// Classic Kalman gain update.
///
/// ## Input
/// - p: prior covariance
/// - h: design matrix
/// - y: pre-fit residuals
/// - sigma: observation standard deviations
///
/// K = P Hᵗ (H P Hᵗ + R)⁻¹, dx = K y, and the covariance
/// is updated in Joseph form: P' = (I - K H) P (I - K H)ᵗ + K R Kᵗ
pub(crate) fn measurement_update(
    p: &DMatrix<f64>,
    h: &DMatrix<f64>,
    y: &DVector<f64>,
    sigma: &DVector<f64>,
) -> Result<KalmanUpdate, Error> {
    let n = p.nrows();

    let r = DMatrix::<f64>::from_diagonal(&sigma.map(|s| s.powi(2)));

    let p_ht = p * h.transpose();
    let s = h * &p_ht + &r;

    let s_inv = s.cholesky().ok_or(Error::MatrixInversion)?.inverse();

    let k = &p_ht * s_inv;
    let dx = &k * y;

    let i_kh = DMatrix::<f64>::identity(n, n) - &k * h;
    let updated = &i_kh * p * i_kh.transpose() + &k * &r * k.transpose();
    let covariance = (&updated + updated.transpose()) * 0.5;

    if !is_positive_definite(&covariance) {
        return Err(Error::DivergedCovariance);
    }

    let postfit = y - h * &dx;

    Ok(KalmanUpdate {
        dx,
        covariance,
        postfit,
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use rstest::*;

    #[test]
    fn scalar_update() {
        // prior 0 +/- 2, observation 1 +/- 2: posterior 0.5 +/- sqrt(2)
        let p = DMatrix::from_element(1, 1, 4.0);
        let h = DMatrix::from_element(1, 1, 1.0);
        let y = DVector::from_element(1, 1.0);
        let sigma = DVector::from_element(1, 2.0);

        let update = measurement_update(&p, &h, &y, &sigma).unwrap();
        assert!((update.dx[0] - 0.5).abs() < 1.0E-12);
        assert!((update.covariance[(0, 0)] - 2.0).abs() < 1.0E-12);
        assert!((update.postfit[0] - 0.5).abs() < 1.0E-12);
    }

    #[rstest]
    #[case(1.0E4, 1.0E-5, 1.0E-6)]
    #[case(1.0E6, 1.0E-6, 1.0E-6)]
    #[case(1.0E8, 1.0E-4, 1.0E-3)]
    fn weighted_mean(#[case] prior: f64, #[case] dx_tol: f64, #[case] cov_tol: f64) {
        // two unknowns, three observations: a, b and a + b
        let p = DMatrix::from_diagonal(&DVector::from_vec(vec![prior, prior]));
        let h = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 0.0, 1.0, 1.0, 1.0]);
        let y = DVector::from_vec(vec![1.0, 2.0, 3.0]);
        let sigma = DVector::from_vec(vec![0.1, 0.1, 0.1]);

        let update = measurement_update(&p, &h, &y, &sigma).unwrap();
        assert!((update.dx[0] - 1.0).abs() < dx_tol);
        assert!((update.dx[1] - 2.0).abs() < dx_tol);
        assert!(update.postfit.iter().all(|v| v.abs() < dx_tol));

        // least squares covariance: sigma² (HᵗH)⁻¹
        let cov = &update.covariance;
        assert!((cov[(0, 0)] - 0.02 / 3.0).abs() < cov_tol, "{}", cov);
        assert!((cov[(1, 1)] - 0.02 / 3.0).abs() < cov_tol, "{}", cov);
        assert!((cov[(0, 1)] + 0.01 / 3.0).abs() < cov_tol, "{}", cov);
        assert_eq!(cov[(0, 1)], cov[(1, 0)]);
        assert!(is_positive_definite(cov));
    }

    #[test]
    fn positive_definiteness() {
        let p = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 2.0, 1.0]);
        assert!(!is_positive_definite(&p));
        let p = DMatrix::from_row_slice(2, 2, &[2.0, 1.0, 1.0, 2.0]);
        assert!(is_positive_definite(&p));
        let p = DMatrix::from_row_slice(2, 2, &[2.0, 0.0, 0.0, 0.0]);
        assert!(!is_positive_definite(&p));
    }
}
