//! Post-fit residuals screening
use std::collections::HashMap;

use log::warn;
use nalgebra::DVector;

use crate::{
    cfg::SolverOpts,
    navigation::model::{Design, ObservationType},
    prelude::{Constellation, Epoch, SV},
};

/// Post-fit [OutlierDetector]: identifies, per constellation,
/// the worst observation when it exceeds its threshold.
#[derive(Debug, Clone, Copy)]
pub(crate) struct OutlierDetector {
    max_code_m: f64,
    max_phase_m: f64,
    sigma_code_m: f64,
    sigma_phase_m: f64,
}

impl OutlierDetector {
    pub fn new(opts: &SolverOpts) -> Self {
        Self {
            max_code_m: opts.max_res_code_m,
            max_phase_m: opts.max_res_phase_m,
            sigma_code_m: opts.sigma_code_m,
            sigma_phase_m: opts.sigma_phase_m,
        }
    }

    /// Returns the vehicles to be excluded, sorted.
    /// Residuals are normalized to the reference (zenith) uncertainty, so
    /// low elevation observations are granted larger residuals.
    pub fn detect(&self, t: Epoch, design: &Design, postfit: &DVector<f64>) -> Vec<SV> {
        let (threshold, sigma_ref) = match design.kind {
            ObservationType::Code => (self.max_code_m, self.sigma_code_m),
            ObservationType::Phase => (self.max_phase_m, self.sigma_phase_m),
        };

        let mut worst = HashMap::<Constellation, (SV, f64)>::new();

        for (row, sv) in design.sv.iter().enumerate() {
            let normalized = postfit[row].abs() * sigma_ref / design.sigma[row];

            match worst.get(&sv.constellation) {
                Some((_, max)) if *max >= normalized => {},
                _ => {
                    worst.insert(sv.constellation, (*sv, normalized));
                },
            }
        }

        let mut outliers = worst
            .into_values()
            .filter(|(_, residual)| *residual > threshold)
            .map(|(sv, residual)| {
                warn!(
                    "{} - {} outlier {} residual {:.3}m (max {:.3}m)",
                    t, sv, design.kind, residual, threshold
                );
                sv
            })
            .collect::<Vec<_>>();

        outliers.sort();
        outliers
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use nalgebra::DMatrix;

    fn design(kind: ObservationType, sv: Vec<SV>, sigma: Vec<f64>) -> Design {
        let n = sv.len();
        Design {
            kind,
            sv,
            h: DMatrix::zeros(n, 1),
            y: DVector::zeros(n),
            sigma: DVector::from_vec(sigma),
        }
    }

    #[test]
    fn worst_per_constellation() {
        let g01 = SV::new(Constellation::GPS, 1);
        let g02 = SV::new(Constellation::GPS, 2);
        let e05 = SV::new(Constellation::Galileo, 5);
        let e07 = SV::new(Constellation::Galileo, 7);

        let opts = SolverOpts::default();
        let detector = OutlierDetector::new(&opts);

        let design = design(
            ObservationType::Code,
            vec![g01, g02, e05, e07],
            vec![1.0; 4],
        );

        let postfit = DVector::from_vec(vec![12.0, -15.0, 11.0, 3.0]);
        let outliers = detector.detect(Epoch::default(), &design, &postfit);
        assert_eq!(outliers, vec![g02, e05]);

        let postfit = DVector::from_vec(vec![1.0, -2.0, 9.9, 3.0]);
        assert!(detector.detect(Epoch::default(), &design, &postfit).is_empty());
    }

    #[test]
    fn weighted_threshold() {
        let g01 = SV::new(Constellation::GPS, 1);
        let g02 = SV::new(Constellation::GPS, 2);

        let opts = SolverOpts::default();
        let detector = OutlierDetector::new(&opts);

        // 8cm on a low vehicle (sigma x2) is tolerated, 6cm at zenith is not
        let design = design(
            ObservationType::Phase,
            vec![g01, g02],
            vec![opts.sigma_phase_m * 2.0, opts.sigma_phase_m],
        );

        let postfit = DVector::from_vec(vec![0.08, 0.0]);
        assert!(detector.detect(Epoch::default(), &design, &postfit).is_empty());

        let postfit = DVector::from_vec(vec![0.08, 0.06]);
        assert_eq!(detector.detect(Epoch::default(), &design, &postfit), vec![g02]);
    }
}
