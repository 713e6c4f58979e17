//! Filter configuration preset

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Observation weighting with respect to elevation angle
#[derive(Default, Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ElevationWeighting {
    /// Same sigma whatever the elevation
    Flat,
    /// sigma / sin(e)
    #[default]
    Sine,
    /// sigma / sin²(e)
    SineSquared,
}

impl ElevationWeighting {
    /// Scales `sigma` for a signal observed at `elevation_rad`.
    pub(crate) fn scale(&self, sigma: f64, elevation_rad: f64) -> f64 {
        let sin_e = elevation_rad.sin().max(1.0E-3);
        match self {
            Self::Flat => sigma,
            Self::Sine => sigma / sin_e,
            Self::SineSquared => sigma / sin_e.powi(2),
        }
    }
}

const fn default_sigma_code() -> f64 {
    1.0
}

const fn default_sigma_phase() -> f64 {
    0.01
}

const fn default_max_res_code() -> f64 {
    10.0
}

const fn default_max_res_phase() -> f64 {
    0.05
}

const fn default_apriori_sigma_crd() -> f64 {
    100.0
}

const fn default_apriori_sigma_clk() -> f64 {
    1000.0
}

const fn default_apriori_sigma_trp() -> f64 {
    0.1
}

const fn default_apriori_sigma_offset() -> f64 {
    1000.0
}

const fn default_apriori_sigma_amb() -> f64 {
    100.0
}

const fn default_noise_crd() -> (f64, f64, f64) {
    (0.0, 0.0, 0.0)
}

const fn default_noise_clk() -> f64 {
    1000.0
}

const fn default_noise_trp() -> f64 {
    3.0E-5
}

const fn default_noise_offset() -> f64 {
    1000.0
}

const fn default_estimate_tropo() -> bool {
    true
}

const fn default_max_missing_epochs() -> u32 {
    0
}

const fn default_max_epoch_gap() -> f64 {
    60.0
}

const fn default_bancroft_max_disagreement() -> f64 {
    100.0
}

const fn default_bancroft_max_suspect() -> usize {
    3
}

const fn default_max_consecutive_failures() -> usize {
    5
}

const fn default_max_hdop() -> f64 {
    5.0
}

const fn default_min_nominal_sv() -> usize {
    5
}

/// [SolverOpts] drive the Kalman filter: observation noise, outlier
/// rejection, a priori knowledge, process noise and failure recovery.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SolverOpts {
    /// Zenithal code observation sigma (m)
    #[cfg_attr(feature = "serde", serde(default = "default_sigma_code"))]
    pub sigma_code_m: f64,

    /// Zenithal phase observation sigma (m)
    #[cfg_attr(feature = "serde", serde(default = "default_sigma_phase"))]
    pub sigma_phase_m: f64,

    /// Code observation elevation weighting
    #[cfg_attr(feature = "serde", serde(default))]
    pub code_weighting: ElevationWeighting,

    /// Phase observation elevation weighting
    #[cfg_attr(feature = "serde", serde(default))]
    pub phase_weighting: ElevationWeighting,

    /// Code residual rejection threshold (m)
    #[cfg_attr(feature = "serde", serde(default = "default_max_res_code"))]
    pub max_res_code_m: f64,

    /// Phase residual rejection threshold (m)
    #[cfg_attr(feature = "serde", serde(default = "default_max_res_phase"))]
    pub max_res_phase_m: f64,

    /// A priori coordinates sigma (m)
    #[cfg_attr(feature = "serde", serde(default = "default_apriori_sigma_crd"))]
    pub apriori_sigma_crd_m: f64,

    /// A priori receiver clock sigma (m)
    #[cfg_attr(feature = "serde", serde(default = "default_apriori_sigma_clk"))]
    pub apriori_sigma_clk_m: f64,

    /// A priori zenith wet delay sigma (m)
    #[cfg_attr(feature = "serde", serde(default = "default_apriori_sigma_trp"))]
    pub apriori_sigma_trp_m: f64,

    /// A priori inter system time offset sigma (m)
    #[cfg_attr(feature = "serde", serde(default = "default_apriori_sigma_offset"))]
    pub apriori_sigma_offset_m: f64,

    /// A priori ambiguity sigma (m)
    #[cfg_attr(feature = "serde", serde(default = "default_apriori_sigma_amb"))]
    pub apriori_sigma_amb_m: f64,

    /// Coordinates process noise (North, East, Up) in m/√s.
    /// Null for static receivers.
    #[cfg_attr(feature = "serde", serde(default = "default_noise_crd"))]
    pub noise_crd_m_sqrt_s: (f64, f64, f64),

    /// Receiver clock process noise (m/√s)
    #[cfg_attr(feature = "serde", serde(default = "default_noise_clk"))]
    pub noise_clk_m_sqrt_s: f64,

    /// Zenith wet delay process noise (m/√s)
    #[cfg_attr(feature = "serde", serde(default = "default_noise_trp"))]
    pub noise_trp_m_sqrt_s: f64,

    /// Inter system time offsets process noise (m/√s)
    #[cfg_attr(feature = "serde", serde(default = "default_noise_offset"))]
    pub noise_offset_m_sqrt_s: f64,

    /// Estimate the residual zenith wet delay
    #[cfg_attr(feature = "serde", serde(default = "default_estimate_tropo"))]
    pub estimate_troposphere: bool,

    /// Number of epochs an ambiguity survives while its vehicle is not observed
    #[cfg_attr(feature = "serde", serde(default = "default_max_missing_epochs"))]
    pub max_missing_epochs: u32,

    /// Maximal gap between two epochs (s). Larger gaps reset the filter.
    #[cfg_attr(feature = "serde", serde(default = "default_max_epoch_gap"))]
    pub max_epoch_gap_s: f64,

    /// Maximal 3D distance between running solution and Bancroft cross check (m)
    #[cfg_attr(feature = "serde", serde(default = "default_bancroft_max_disagreement"))]
    pub bancroft_max_disagreement_m: f64,

    /// Number of consecutive suspect epochs (Bancroft disagreement) that reset the filter
    #[cfg_attr(feature = "serde", serde(default = "default_bancroft_max_suspect"))]
    pub bancroft_max_suspect_epochs: usize,

    /// Number of consecutive rejected epochs that reset the filter
    #[cfg_attr(feature = "serde", serde(default = "default_max_consecutive_failures"))]
    pub max_consecutive_failures: usize,

    /// HDOP above which the solution is declared degraded
    #[cfg_attr(feature = "serde", serde(default = "default_max_hdop"))]
    pub max_hdop: f64,

    /// Number of vehicles under which the solution is declared degraded
    #[cfg_attr(feature = "serde", serde(default = "default_min_nominal_sv"))]
    pub min_nominal_sv: usize,
}

impl Default for SolverOpts {
    fn default() -> Self {
        Self {
            sigma_code_m: default_sigma_code(),
            sigma_phase_m: default_sigma_phase(),
            code_weighting: ElevationWeighting::default(),
            phase_weighting: ElevationWeighting::default(),
            max_res_code_m: default_max_res_code(),
            max_res_phase_m: default_max_res_phase(),
            apriori_sigma_crd_m: default_apriori_sigma_crd(),
            apriori_sigma_clk_m: default_apriori_sigma_clk(),
            apriori_sigma_trp_m: default_apriori_sigma_trp(),
            apriori_sigma_offset_m: default_apriori_sigma_offset(),
            apriori_sigma_amb_m: default_apriori_sigma_amb(),
            noise_crd_m_sqrt_s: default_noise_crd(),
            noise_clk_m_sqrt_s: default_noise_clk(),
            noise_trp_m_sqrt_s: default_noise_trp(),
            noise_offset_m_sqrt_s: default_noise_offset(),
            estimate_troposphere: default_estimate_tropo(),
            max_missing_epochs: default_max_missing_epochs(),
            max_epoch_gap_s: default_max_epoch_gap(),
            bancroft_max_disagreement_m: default_bancroft_max_disagreement(),
            bancroft_max_suspect_epochs: default_bancroft_max_suspect(),
            max_consecutive_failures: default_max_consecutive_failures(),
            max_hdop: default_max_hdop(),
            min_nominal_sv: default_min_nominal_sv(),
        }
    }
}

impl SolverOpts {
    /// Parameter settings recommended for static receivers
    pub fn static_preset() -> Self {
        Self {
            noise_crd_m_sqrt_s: (0.0, 0.0, 0.0),
            max_missing_epochs: 2,
            ..Default::default()
        }
    }

    /// Parameter settings recommended for roaming receivers
    pub fn kinematic_preset() -> Self {
        Self {
            apriori_sigma_crd_m: 1000.0,
            noise_crd_m_sqrt_s: (10.0, 10.0, 10.0),
            max_res_code_m: 15.0,
            max_hdop: 8.0,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod test {
    use super::ElevationWeighting;

    #[test]
    fn elevation_weighting() {
        let e = 30.0_f64.to_radians();
        assert_eq!(ElevationWeighting::Flat.scale(1.0, e), 1.0);
        assert!((ElevationWeighting::Sine.scale(1.0, e) - 2.0).abs() < 1.0E-12);
        assert!((ElevationWeighting::SineSquared.scale(1.0, e) - 4.0).abs() < 1.0E-12);
    }
}
