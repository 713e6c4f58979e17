//! External models (collaborators) the filter relies on.
//! All of them are invoked synchronously, once per vehicle and per
//! observation model evaluation, and must not retain any filter state.
use crate::prelude::{Carrier, Epoch, Vector3, SV};

mod tropo;
pub use tropo::Saastamoinen;

/// Orbital state and clock offset of one vehicle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SatelliteState {
    /// Antenna phase center position, ECEF meters
    pub position_ecef_m: Vector3<f64>,
    /// Velocity, ECEF m/s
    pub velocity_ecef_m_s: Vector3<f64>,
    /// Clock offset to system time (s)
    pub clock_bias_s: f64,
}

impl SatelliteState {
    /// Builds a [SatelliteState] for a vehicle considered at rest in ECEF frame
    pub fn from_position(position_ecef_m: Vector3<f64>, clock_bias_s: f64) -> Self {
        Self {
            position_ecef_m,
            clock_bias_s,
            velocity_ecef_m_s: Vector3::zeros(),
        }
    }
}

/// Any orbit and clock provider (broadcast ephemeris, real-time corrections,
/// interpolated precise products..) should implement [EphemerisSource].
pub trait EphemerisSource {
    /// Provide the [SatelliteState] at requested [Epoch], which is
    /// the signal transmission time (expressed in the [SV] timescale).
    /// Return None when no valid data covers this instant: the
    /// vehicle is then dropped from the current epoch.
    fn state_at(&self, sv: SV, t: Epoch) -> Option<SatelliteState>;
}

/// Tropospheric delay components, as evaluated for one line of sight
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct TroposphereComponents {
    /// Zenith hydrostatic delay (m)
    pub zenith_hydrostatic_m: f64,
    /// Zenith wet delay (m)
    pub zenith_wet_m: f64,
    /// Wet mapping function value. This is the partial derivative
    /// of the slant delay with respect to the estimated zenith wet delay.
    pub mapping_wet: f64,
}

impl TroposphereComponents {
    /// Modeled slant delay (m)
    pub fn slant_delay_m(&self) -> f64 {
        (self.zenith_hydrostatic_m + self.zenith_wet_m) * self.mapping_wet
    }
}

/// Tropospheric model
pub trait TroposphereModel {
    /// Returns [TroposphereComponents] for a signal observed at `elevation_rad`,
    /// by a receiver located at `height_m` above the ellipsoid.
    fn slant_delay(&self, elevation_rad: f64, height_m: f64, t: Epoch) -> TroposphereComponents;
}

/// Site displacement model (solid Earth tides, ocean loading)
pub trait TidalModel {
    /// Returns the site displacement vector (ECEF m)
    /// at the approximate site `position_ecef_m`.
    fn displacement(&self, t: Epoch, position_ecef_m: &Vector3<f64>) -> Vector3<f64>;
}

/// Carrier phase wind-up model
pub trait WindUpModel {
    /// Returns the phase wind-up, in cycles.
    fn windup(
        &self,
        t: Epoch,
        sv: SV,
        rx_position_ecef_m: &Vector3<f64>,
        sv_position_ecef_m: &Vector3<f64>,
    ) -> f64;
}

/// Antenna phase center model
pub trait AntennaModel {
    /// Receiver phase center offset and variation projected on
    /// the line of sight, for this [Carrier] (m).
    fn receiver_correction(&self, carrier: Carrier, elevation_rad: f64, azimuth_rad: f64)
        -> f64;

    /// Vehicle phase center offset and variation projected on
    /// the line of sight, for this [Carrier] (m).
    fn satellite_correction(&self, _sv: SV, _carrier: Carrier, _elevation_rad: f64) -> f64 {
        0.0
    }
}

/// External models installed on the [Filter](crate::prelude::Filter)
pub(crate) struct Models {
    pub ephemeris: Box<dyn EphemerisSource>,
    pub troposphere: Box<dyn TroposphereModel>,
    pub tides: Option<Box<dyn TidalModel>>,
    pub windup: Option<Box<dyn WindUpModel>>,
    pub antenna: Option<Box<dyn AntennaModel>>,
}

impl Models {
    pub fn new(ephemeris: Box<dyn EphemerisSource>) -> Self {
        Self {
            ephemeris,
            troposphere: Box::new(Saastamoinen::default()),
            tides: None,
            windup: None,
            antenna: None,
        }
    }
}
