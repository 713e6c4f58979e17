#![doc = include_str!("../README.md")]
#![cfg_attr(docrs, feature(doc_cfg))]

extern crate gnss_rs as gnss;

// private modules
mod bancroft;
mod carrier;
mod cfg;
mod constants;
mod error;
mod geodesy;
mod models;
mod navigation;
mod observation;
mod solutions;

#[cfg(test)]
mod tests;

// prelude
pub mod prelude {
    pub use crate::bancroft::{Bancroft, BancroftObservation, BancroftSolution};
    pub use crate::carrier::Carrier;
    pub use crate::cfg::{Combination, Config, ElevationWeighting, Modeling, SolverOpts, SystemSetup};
    pub use crate::error::Error;
    pub use crate::geodesy::{ecef_to_geodetic, elevation_azimuth, enu_rotation, geodetic_to_ecef};
    pub use crate::models::{
        AntennaModel, EphemerisSource, SatelliteState, Saastamoinen, TidalModel,
        TroposphereComponents, TroposphereModel, WindUpModel,
    };
    pub use crate::navigation::{
        DilutionOfPrecision, Filter, FilterState, ObservationType, Parameter, ParameterKind,
        StateVector,
    };
    pub use crate::observation::{EpochData, Observation, SatData};
    pub use crate::solutions::{PPPSolution, Residual, SolutionStatus};
    // re-export
    pub use gnss::prelude::{Constellation, SV};
    pub use hifitime::{Duration, Epoch, TimeScale};
    pub use nalgebra::Vector3;
}

// pub export
pub use error::Error;
