//! Epoch observation set
use std::collections::BTreeMap;

use itertools::Itertools;

use crate::{
    cfg::Combination,
    constants::SPEED_OF_LIGHT_M_S,
    error::Error,
    models::SatelliteState,
    prelude::{Carrier, Constellation, Epoch, Vector3, SV},
};

/// Signal observation, on one frequency.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    /// [Carrier] frequency.
    pub carrier: Carrier,
    /// Pseudo range observation, expressed in meters.
    pub pseudo_range_m: Option<f64>,
    /// Phase range observation, expressed in meters.
    pub phase_range_m: Option<f64>,
    /// Possible SNR indication (in dB/Hz).
    pub snr_dbhz: Option<f64>,
}

impl Observation {
    /// Creates new pseudo range [Observation] (in meters), with possible
    /// SNR in dB/Hz.
    pub fn pseudo_range(carrier: Carrier, range_m: f64, snr_dbhz: Option<f64>) -> Self {
        Self {
            carrier,
            snr_dbhz,
            phase_range_m: None,
            pseudo_range_m: Some(range_m),
        }
    }

    /// Creates new pseudo range and (ambiguous) phase range [Observation],
    /// both in meters, with possible SNR in dB/Hz.
    pub fn code_and_phase(
        carrier: Carrier,
        pseudo_range_m: f64,
        phase_range_m: f64,
        snr_dbhz: Option<f64>,
    ) -> Self {
        Self {
            carrier,
            snr_dbhz,
            pseudo_range_m: Some(pseudo_range_m),
            phase_range_m: Some(phase_range_m),
        }
    }

    /// Copies and returns new [Observation] with defined ambiguous phase range (in meters)
    pub fn with_phase_range_m(&self, phase_range_m: f64) -> Self {
        let mut s = *self;
        s.phase_range_m = Some(phase_range_m);
        s
    }

    /// Copies and returns new [Observation] with defined pseudo range (in meters)
    pub fn with_pseudo_range_m(&self, pseudo_range_m: f64) -> Self {
        let mut s = *self;
        s.pseudo_range_m = Some(pseudo_range_m);
        s
    }
}

/// Signal (combination) formed for one vehicle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Signal {
    /// Primary carrier
    pub lhs: Carrier,
    /// Secondary carrier (dual frequency combination)
    pub rhs: Option<Carrier>,
    /// Combination coefficients
    pub coefficients: (f64, f64),
    /// Combination wavelength (m)
    pub wavelength_m: f64,
}

impl Signal {
    fn single(carrier: Carrier) -> Self {
        Self {
            lhs: carrier,
            rhs: None,
            coefficients: (1.0, 0.0),
            wavelength_m: carrier.wavelength(),
        }
    }

    fn ionosphere_free(lhs: Carrier, rhs: Carrier) -> Result<Self, Error> {
        let (f1, f2) = (lhs.frequency(), rhs.frequency());
        if f1 == f2 {
            return Err(Error::UnknownCarrierFrequency);
        }
        let denom = f1.powi(2) - f2.powi(2);
        Ok(Self {
            lhs,
            rhs: Some(rhs),
            coefficients: (f1.powi(2) / denom, -f2.powi(2) / denom),
            wavelength_m: SPEED_OF_LIGHT_M_S / (f1 + f2),
        })
    }

    /// Combines two values observed on lhs and rhs carriers
    fn combine(&self, lhs: f64, rhs: f64) -> f64 {
        self.coefficients.0 * lhs + self.coefficients.1 * rhs
    }
}

impl std::fmt::Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> Result<(), std::fmt::Error> {
        match self.rhs {
            Some(rhs) => write!(f, "IF({}/{})", self.lhs, rhs),
            None => write!(f, "{}", self.lhs),
        }
    }
}

/// Observations and derived quantities of one vehicle, for one epoch
#[derive(Debug, Clone)]
pub struct SatData {
    /// [SV]
    pub sv: SV,
    /// Signal [Observation]s
    pub observations: Vec<Observation>,
    /// Cycle slip (loss of lock) detected on this epoch
    pub slip: bool,
    /// Signal combination
    pub(crate) signal: Option<Signal>,
    /// Code combination (m)
    pub(crate) code_m: Option<f64>,
    /// Phase combination (m)
    pub(crate) phase_m: Option<f64>,
    /// State at transmission time
    pub(crate) state: Option<SatelliteState>,
    /// Clock offset (incl. relativistic effect), in meters
    pub(crate) clock_m: f64,
    /// Elevation (rad)
    pub(crate) elevation_rad: f64,
    /// Azimuth (rad)
    pub(crate) azimuth_rad: f64,
    /// Geometric range (m)
    pub(crate) rho_m: f64,
    /// Unit vector, from vehicle to receiver
    pub(crate) los: Vector3<f64>,
    /// Troposphere mapping function value
    pub(crate) mapping_wet: f64,
}

impl SatData {
    /// Creates new [SatData] from raw [Observation]s
    pub fn new(sv: SV, observations: Vec<Observation>) -> Self {
        Self {
            sv,
            observations,
            slip: false,
            signal: None,
            code_m: None,
            phase_m: None,
            state: None,
            clock_m: 0.0,
            elevation_rad: 0.0,
            azimuth_rad: 0.0,
            rho_m: 0.0,
            los: Vector3::zeros(),
            mapping_wet: 1.0,
        }
    }

    /// Copies and returns [SatData] with cycle slip flag
    pub fn with_slip(&self, slip: bool) -> Self {
        let mut s = self.clone();
        s.slip = slip;
        s
    }

    /// Elevation angle (degrees), once evaluated
    pub fn elevation_deg(&self) -> f64 {
        self.elevation_rad.to_degrees()
    }

    /// Azimuth angle (degrees), once evaluated
    pub fn azimuth_deg(&self) -> f64 {
        self.azimuth_rad.to_degrees()
    }

    /// Geometric range (m), once evaluated
    pub fn rho_m(&self) -> f64 {
        self.rho_m
    }

    /// Signal combination wavelength (m), once formed
    pub fn wavelength_m(&self) -> Option<f64> {
        self.signal.map(|signal| signal.wavelength_m)
    }

    /// Forms the signal combination. Observations below `min_snr` do not contribute.
    /// Fails when the code combination cannot be formed. Missing phase
    /// only prevents this vehicle from contributing to the phase pass.
    pub(crate) fn combine(
        &mut self,
        combination: Combination,
        min_snr: Option<f64>,
    ) -> Result<(), Error> {
        let observations = self
            .observations
            .iter()
            .filter(|obs| match (min_snr, obs.snr_dbhz) {
                (Some(min), Some(snr)) => snr >= min,
                _ => true,
            })
            .sorted_by(|a, b| b.carrier.frequency().total_cmp(&a.carrier.frequency()))
            .copied()
            .collect::<Vec<_>>();

        let codes = observations
            .iter()
            .filter_map(|obs| Some((obs.carrier, obs.pseudo_range_m?)))
            .unique_by(|(carrier, _)| *carrier)
            .collect::<Vec<_>>();

        let phase_of = |carrier: Carrier| {
            observations
                .iter()
                .filter(|obs| obs.carrier == carrier)
                .find_map(|obs| obs.phase_range_m)
        };

        match combination {
            Combination::SingleFrequency => {
                let (carrier, code) = codes.first().ok_or(Error::PseudoRangeCombination)?;
                let signal = Signal::single(*carrier);
                self.code_m = Some(*code);
                self.phase_m = phase_of(*carrier);
                self.signal = Some(signal);
            },
            Combination::IonosphereFree => {
                if codes.len() < 2 {
                    return Err(Error::PseudoRangeCombination);
                }
                let ((c1, p1), (c2, p2)) = (codes[0], codes[1]);
                let signal = Signal::ionosphere_free(c1, c2)?;
                self.code_m = Some(signal.combine(p1, p2));
                self.phase_m = match (phase_of(c1), phase_of(c2)) {
                    (Some(l1), Some(l2)) => Some(signal.combine(l1, l2)),
                    _ => None,
                };
                self.signal = Some(signal);
            },
        }
        Ok(())
    }
}

/// One epoch worth of observations, indexed by [SV]
#[derive(Debug, Clone)]
pub struct EpochData {
    /// Sampling [Epoch]
    pub t: Epoch,
    /// Per vehicle data
    pub(crate) sat_data: BTreeMap<SV, SatData>,
}

impl EpochData {
    /// Creates a new (empty) [EpochData]
    pub fn new(t: Epoch) -> Self {
        Self {
            t,
            sat_data: Default::default(),
        }
    }

    /// Adds (or replaces) one vehicle
    pub fn insert(&mut self, sat: SatData) {
        self.sat_data.insert(sat.sv, sat);
    }

    /// Copies and returns [EpochData] with this vehicle
    pub fn with_sat_data(&self, sat: SatData) -> Self {
        let mut s = self.clone();
        s.insert(sat);
        s
    }

    /// Number of vehicles
    pub fn len(&self) -> usize {
        self.sat_data.len()
    }

    /// True if no vehicle remains
    pub fn is_empty(&self) -> bool {
        self.sat_data.is_empty()
    }

    /// Number of vehicles of this [Constellation]
    pub fn size_sys(&self, constellation: Constellation) -> usize {
        self.sat_data
            .keys()
            .filter(|sv| sv.constellation == constellation)
            .count()
    }

    /// [SatData] of this vehicle, if any
    pub fn get(&self, sv: &SV) -> Option<&SatData> {
        self.sat_data.get(sv)
    }

    /// [SV] iterator, in increasing order
    pub fn sv_iter(&self) -> impl Iterator<Item = SV> + '_ {
        self.sat_data.keys().copied()
    }

    pub(crate) fn remove(&mut self, sv: &SV) -> Option<SatData> {
        self.sat_data.remove(sv)
    }

    pub(crate) fn values(&self) -> impl Iterator<Item = &SatData> {
        self.sat_data.values()
    }

    pub(crate) fn values_mut(&mut self) -> impl Iterator<Item = &mut SatData> {
        self.sat_data.values_mut()
    }
}

impl std::fmt::Display for EpochData {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> Result<(), std::fmt::Error> {
        write!(f, "{} [{}]", self.t, self.sat_data.keys().join(", "))
    }
}
