use std::collections::HashMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::prelude::Constellation;

mod modeling;
mod solver;

pub use modeling::Modeling;
pub use solver::{ElevationWeighting, SolverOpts};

/// Signal combination used per [Constellation]
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Combination {
    /// Ionosphere free combination of two frequencies
    /// (first order ionospheric delay cancels out).
    #[default]
    IonosphereFree,
    /// Single frequency: first observed carrier, no ionosphere compensation.
    SingleFrequency,
}

/// Per [Constellation] setup
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SystemSetup {
    /// Signal combination
    #[cfg_attr(feature = "serde", serde(default))]
    pub combination: Combination,
    /// Use code observations
    #[cfg_attr(feature = "serde", serde(default = "default_true"))]
    pub code: bool,
    /// Use phase observations
    #[cfg_attr(feature = "serde", serde(default = "default_true"))]
    pub phase: bool,
}

impl Default for SystemSetup {
    fn default() -> Self {
        Self {
            combination: Combination::IonosphereFree,
            code: true,
            phase: true,
        }
    }
}

impl SystemSetup {
    /// Code only [SystemSetup]
    pub fn code_only(combination: Combination) -> Self {
        Self {
            combination,
            code: true,
            phase: false,
        }
    }
}

#[cfg(feature = "serde")]
fn default_true() -> bool {
    true
}

fn default_systems() -> HashMap<Constellation, SystemSetup> {
    let mut systems = HashMap::new();
    systems.insert(Constellation::GPS, SystemSetup::default());
    systems
}

fn default_min_sv_elev() -> f64 {
    10.0
}

fn default_min_sv() -> usize {
    4
}

/// Filter [Config]uration
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Config {
    /// Constellations we navigate with. [Constellation::GPS]
    /// is the time reference: one time offset is estimated per other system.
    #[cfg_attr(feature = "serde", serde(default = "default_systems"))]
    pub systems: HashMap<Constellation, SystemSetup>,

    /// A priori receiver position (ECEF m). When defined, this is
    /// preferred over the Bancroft solution on cold start.
    #[cfg_attr(feature = "serde", serde(default))]
    pub apriori_position_ecef_m: Option<(f64, f64, f64)>,

    /// Antenna reference point eccentricity (North, East, Up) in meters
    #[cfg_attr(feature = "serde", serde(default))]
    pub antenna_neu_ecc_m: Option<(f64, f64, f64)>,

    /// Minimal vehicle elevation (degrees)
    #[cfg_attr(feature = "serde", serde(default = "default_min_sv_elev"))]
    pub min_sv_elev_deg: f64,

    /// Minimal signal strength (dB.Hz) for an observation to contribute
    #[cfg_attr(feature = "serde", serde(default))]
    pub min_snr: Option<f64>,

    /// Minimal number of vehicles to form a solution
    #[cfg_attr(feature = "serde", serde(default = "default_min_sv"))]
    pub min_sv: usize,

    /// Physical [Modeling]
    #[cfg_attr(feature = "serde", serde(default))]
    pub modeling: Modeling,

    /// [SolverOpts]
    #[cfg_attr(feature = "serde", serde(default))]
    pub solver: SolverOpts,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            systems: default_systems(),
            apriori_position_ecef_m: None,
            antenna_neu_ecc_m: None,
            min_sv_elev_deg: default_min_sv_elev(),
            min_snr: None,
            min_sv: default_min_sv(),
            modeling: Modeling::default(),
            solver: SolverOpts::default(),
        }
    }
}

impl Config {
    /// [Config] preset for static receivers
    pub fn static_preset() -> Self {
        Self {
            solver: SolverOpts::static_preset(),
            ..Default::default()
        }
    }

    /// [Config] preset for roaming receivers
    pub fn kinematic_preset() -> Self {
        Self {
            solver: SolverOpts::kinematic_preset(),
            ..Default::default()
        }
    }

    /// Adds (or replaces) one [Constellation] to navigate with
    pub fn with_system(&self, constellation: Constellation, setup: SystemSetup) -> Self {
        let mut s = self.clone();
        s.systems.insert(constellation, setup);
        s
    }

    /// Defines the a priori receiver position (ECEF m)
    pub fn with_apriori_position(&self, ecef_m: (f64, f64, f64)) -> Self {
        let mut s = self.clone();
        s.apriori_position_ecef_m = Some(ecef_m);
        s
    }

    /// Constellations (other than GPS) that require a time offset parameter,
    /// in a stable order.
    pub(crate) fn offset_systems(&self) -> Vec<Constellation> {
        [
            Constellation::Glonass,
            Constellation::Galileo,
            Constellation::BeiDou,
        ]
        .into_iter()
        .filter(|c| self.systems.contains_key(c))
        .collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn default_config() {
        let cfg = Config::default();
        assert_eq!(cfg.min_sv, 4);
        assert!(cfg.systems.contains_key(&Constellation::GPS));
        assert!(cfg.offset_systems().is_empty());

        let cfg = cfg
            .with_system(Constellation::Galileo, SystemSetup::default())
            .with_system(
                Constellation::Glonass,
                SystemSetup::code_only(Combination::SingleFrequency),
            );
        assert_eq!(
            cfg.offset_systems(),
            vec![Constellation::Glonass, Constellation::Galileo]
        );
    }

    #[cfg(feature = "serde")]
    #[test]
    fn deserialize() {
        let content = r#"{
            "min_sv_elev_deg": 7.5,
            "apriori_position_ecef_m": [4696989.6880, 723994.2090, 4239678.3136],
            "solver": {
                "sigma_code_m": 2.0,
                "code_weighting": "SineSquared"
            }
        }"#;

        let cfg: Config = serde_json::from_str(content).unwrap();
        assert_eq!(cfg.min_sv_elev_deg, 7.5);
        assert_eq!(cfg.min_sv, 4);
        assert_eq!(
            cfg.apriori_position_ecef_m,
            Some((4696989.6880, 723994.2090, 4239678.3136))
        );
        assert_eq!(cfg.solver.sigma_code_m, 2.0);
        assert_eq!(cfg.solver.code_weighting, ElevationWeighting::SineSquared);
        assert_eq!(cfg.solver.phase_weighting, ElevationWeighting::Sine);
        assert_eq!(cfg.solver.max_epoch_gap_s, 60.0);
        assert!(cfg.systems.contains_key(&Constellation::GPS));
        assert_eq!(cfg.modeling, Modeling::default());
    }
}
