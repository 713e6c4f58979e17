mod bancroft;

use std::collections::HashMap;
use std::ops::Range;
use std::sync::Once;

use log::LevelFilter;
use rand::Rng;

use crate::{
    cfg::ElevationWeighting,
    constants::{EARTH_ANGULAR_VEL_RAD, SPEED_OF_LIGHT_M_S},
    geodesy::{ecef_to_geodetic, elevation_azimuth, enu_rotation, rotate_z},
    prelude::{
        Carrier, Config, Constellation, EphemerisSource, Epoch, EpochData, Observation,
        Saastamoinen, SatData, SatelliteState, TroposphereModel, Vector3, SV,
    },
};

static INIT: Once = Once::new();

pub fn init_logger() {
    INIT.call_once(|| {
        env_logger::builder()
            .is_test(true)
            .filter_level(LevelFilter::Debug)
            .init();
    });
}

/// Static receiver (ECEF m)
pub const RX_ECEF_M: (f64, f64, f64) = (3582105.291, 532589.7313, 5232754.8054);

/// Receiver clock offset (m)
pub const RX_CLOCK_M: f64 = 30.0;

/// Zenith vehicle and three vehicles 30° above the horizon
pub const GEOMETRY: [(u8, f64, f64); 4] = [
    (1, 90.0, 0.0),
    (2, 30.0, 0.0),
    (3, 30.0, 120.0),
    (4, 30.0, 240.0),
];

pub fn rx_ecef_m() -> Vector3<f64> {
    Vector3::new(RX_ECEF_M.0, RX_ECEF_M.1, RX_ECEF_M.2)
}

pub fn gps(prn: u8) -> SV {
    SV::new(Constellation::GPS, prn)
}

pub fn t0() -> Epoch {
    Epoch::from_gregorian_utc_at_midnight(2020, 6, 25)
}

/// Vehicles at rest in ECEF frame, with perfect clocks
#[derive(Debug, Clone)]
pub struct StaticOrbits {
    positions: HashMap<SV, Vector3<f64>>,
}

impl EphemerisSource for StaticOrbits {
    fn state_at(&self, sv: SV, _: Epoch) -> Option<SatelliteState> {
        self.positions
            .get(&sv)
            .map(|position| SatelliteState::from_position(*position, 0.0))
    }
}

/// Every vehicle is translated by the same vector, growing by `velocity_m_s`
/// each second past `start`. Unchanged observations then describe a receiver
/// translated by that same vector.
pub struct Drifting {
    inner: Box<dyn EphemerisSource>,
    start: Epoch,
    velocity_m_s: Vector3<f64>,
}

impl Drifting {
    pub fn new(inner: Box<dyn EphemerisSource>, start: Epoch, velocity_m_s: Vector3<f64>) -> Self {
        Self {
            inner,
            start,
            velocity_m_s,
        }
    }
}

impl EphemerisSource for Drifting {
    fn state_at(&self, sv: SV, t: Epoch) -> Option<SatelliteState> {
        let mut state = self.inner.state_at(sv, t)?;
        let dt = (t - self.start).to_seconds().round().max(0.0);
        state.position_ecef_m += self.velocity_m_s * dt;
        Some(state)
    }
}

/// No ephemeris for one vehicle, during `window`
pub struct Outage {
    inner: Box<dyn EphemerisSource>,
    sv: SV,
    window: Range<Epoch>,
}

impl Outage {
    pub fn new(inner: Box<dyn EphemerisSource>, sv: SV, window: Range<Epoch>) -> Self {
        Self { inner, sv, window }
    }
}

impl EphemerisSource for Outage {
    fn state_at(&self, sv: SV, t: Epoch) -> Option<SatelliteState> {
        if sv == self.sv && self.window.contains(&t) {
            None
        } else {
            self.inner.state_at(sv, t)
        }
    }
}

/// Synthetic dual frequency (L1/L2) observations, free of ionosphere,
/// generated with the filter's own physical model.
#[derive(Debug, Clone)]
pub struct Scenario {
    orbits: StaticOrbits,
    ambiguities: HashMap<SV, (f64, f64)>,
}

impl Scenario {
    /// Places the vehicles 20 000 km away from the receiver,
    /// at (elevation, azimuth) in degrees.
    pub fn new(geometry: &[(u8, f64, f64)]) -> Self {
        let rx = rx_ecef_m();
        let (lat, lon, _) = ecef_to_geodetic(&rx);
        let r = enu_rotation(lat, lon);

        let mut positions = HashMap::new();
        let mut ambiguities = HashMap::new();

        for (prn, elev_deg, azim_deg) in geometry.iter() {
            let (e, a) = (elev_deg.to_radians(), azim_deg.to_radians());
            let enu = Vector3::new(e.cos() * a.sin(), e.cos() * a.cos(), e.sin());
            positions.insert(gps(*prn), rx + r * enu * 20_000_000.0);

            let n = *prn as f64;
            ambiguities.insert(gps(*prn), (7.0 * n - 11.0, 13.0 - 5.0 * n));
        }

        Self {
            orbits: StaticOrbits { positions },
            ambiguities,
        }
    }

    /// Default [Config] for these scenarios
    pub fn config() -> Config {
        let mut cfg = Config::default();
        cfg.min_sv = 3;
        cfg.solver.code_weighting = ElevationWeighting::Flat;
        cfg.solver.phase_weighting = ElevationWeighting::Flat;
        cfg.solver.min_nominal_sv = 4;
        cfg
    }

    pub fn ephemeris(&self) -> Box<dyn EphemerisSource> {
        Box::new(self.orbits.clone())
    }

    /// Modifies the L1 and L2 integer ambiguities of this vehicle
    pub fn set_ambiguities(&mut self, sv: SV, n1: f64, n2: f64) {
        self.ambiguities.insert(sv, (n1, n2));
    }

    /// Range, including receiver clock offset and tropospheric delay
    pub fn range_m(&self, sv: SV) -> f64 {
        let rx = rx_ecef_m();
        let sv_position = self.orbits.positions[&sv];

        let rho0 = (sv_position - rx).norm();
        let rotated = rotate_z(&rx, EARTH_ANGULAR_VEL_RAD * rho0 / SPEED_OF_LIGHT_M_S);
        let rho = (rotated - sv_position).norm();

        let (_, _, height_m) = ecef_to_geodetic(&rx);
        let (elevation, _) = elevation_azimuth(&rx, &sv_position);
        let troposphere = Saastamoinen::default().slant_delay(elevation, height_m, t0());

        rho + RX_CLOCK_M + troposphere.slant_delay_m()
    }

    /// [SatData] with noise free observations
    pub fn sat_data(&self, sv: SV) -> SatData {
        self.noisy_sat_data(sv, (0.0, 0.0), (0.0, 0.0))
    }

    /// [SatData] with code and phase noise, on L1 and L2 (m)
    pub fn noisy_sat_data(&self, sv: SV, code: (f64, f64), phase: (f64, f64)) -> SatData {
        let range = self.range_m(sv);
        let (n1, n2) = self.ambiguities[&sv];

        SatData::new(
            sv,
            vec![
                Observation::code_and_phase(
                    Carrier::L1,
                    range + code.0,
                    range + n1 * Carrier::L1.wavelength() + phase.0,
                    Some(45.0),
                ),
                Observation::code_and_phase(
                    Carrier::L2,
                    range + code.1,
                    range + n2 * Carrier::L2.wavelength() + phase.1,
                    Some(40.0),
                ),
            ],
        )
    }

    /// Noise free [SatData], without phase observations
    pub fn code_sat_data(&self, sv: SV) -> SatData {
        let range = self.range_m(sv);
        SatData::new(
            sv,
            vec![
                Observation::pseudo_range(Carrier::L1, range, Some(45.0)),
                Observation::pseudo_range(Carrier::L2, range, Some(40.0)),
            ],
        )
    }

    /// [SatData] with a code blunder (m), on both frequencies
    pub fn blunder(&self, sv: SV, blunder_m: f64) -> SatData {
        self.noisy_sat_data(sv, (blunder_m, blunder_m), (0.0, 0.0))
    }

    /// Noise free [EpochData]
    pub fn epoch(&self, t: Epoch) -> EpochData {
        let mut epoch = EpochData::new(t);
        for sv in self.orbits.positions.keys() {
            epoch.insert(self.sat_data(*sv));
        }
        epoch
    }

    /// Noise free [EpochData], without phase observations
    pub fn code_epoch(&self, t: Epoch) -> EpochData {
        let mut epoch = EpochData::new(t);
        for sv in self.orbits.positions.keys() {
            epoch.insert(self.code_sat_data(*sv));
        }
        epoch
    }

    /// [EpochData] with uniformly distributed noise
    pub fn noisy_epoch<R: Rng>(&self, t: Epoch, rng: &mut R, code_m: f64, phase_m: f64) -> EpochData {
        let mut epoch = EpochData::new(t);
        for sv in self.orbits.positions.keys() {
            let code = (
                rng.random_range(-code_m..code_m),
                rng.random_range(-code_m..code_m),
            );
            let phase = (
                rng.random_range(-phase_m..phase_m),
                rng.random_range(-phase_m..phase_m),
            );
            epoch.insert(self.noisy_sat_data(*sv, code, phase));
        }
        epoch
    }
}
