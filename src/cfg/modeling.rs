#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

fn default_sv_clock() -> bool {
    true
}

fn default_relativistic_clock() -> bool {
    true
}

fn default_tropo_delay() -> bool {
    true
}

fn default_earth_rot() -> bool {
    true
}

fn default_phase_windup() -> bool {
    false
}

fn default_solid_tides() -> bool {
    false
}

fn default_antenna() -> bool {
    true
}

/// Atmospherical, Physical and Environmental modeling.
/// Corrections that rely on an external model (tides, wind-up, antenna)
/// only apply when that model was installed on the [Filter](crate::prelude::Filter).
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Modeling {
    /// Compensate for onboard clock offset to system time (+/- 100km)
    #[cfg_attr(feature = "serde", serde(default = "default_sv_clock"))]
    pub sv_clock_bias: bool,

    /// Compensate for relativistic effect on onboard clock (+/- 10m)
    #[cfg_attr(feature = "serde", serde(default = "default_relativistic_clock"))]
    pub relativistic_clock_bias: bool,

    /// Compensate for troposphere negative impact (+/- 10m)
    #[cfg_attr(feature = "serde", serde(default = "default_tropo_delay"))]
    pub tropo_delay: bool,

    /// Compensate for Earth rotation during signal propagation
    /// (static +5/+10m eastern error).
    #[cfg_attr(feature = "serde", serde(default = "default_earth_rot"))]
    pub earth_rotation: bool,

    /// Compensate for signal phase windup (phase observations only).
    #[cfg_attr(feature = "serde", serde(default = "default_phase_windup"))]
    pub phase_windup: bool,

    /// Compensate for crust (solid body) and ocean loading deformation.
    #[cfg_attr(feature = "serde", serde(default = "default_solid_tides"))]
    pub solid_tides: bool,

    /// Compensate for antenna eccentricity and phase center variations.
    #[cfg_attr(feature = "serde", serde(default = "default_antenna"))]
    pub antenna: bool,
}

impl Default for Modeling {
    fn default() -> Self {
        Self {
            sv_clock_bias: default_sv_clock(),
            relativistic_clock_bias: default_relativistic_clock(),
            tropo_delay: default_tropo_delay(),
            earth_rotation: default_earth_rot(),
            phase_windup: default_phase_windup(),
            solid_tides: default_solid_tides(),
            antenna: default_antenna(),
        }
    }
}

impl Modeling {
    /// Defines a null [Modeling] structure where all physical
    /// perturbations and phenomena are not accounted for.
    /// This is not the default value! Use this for synthetic data only.
    pub fn no_modeling() -> Modeling {
        Modeling {
            sv_clock_bias: false,
            relativistic_clock_bias: false,
            tropo_delay: false,
            earth_rotation: false,
            phase_windup: false,
            solid_tides: false,
            antenna: false,
        }
    }
}
