//! PPP Solutions
use std::collections::HashMap;

use itertools::Itertools;
use nalgebra::{DMatrix, Matrix3};

use crate::{
    constants::SPEED_OF_LIGHT_M_S,
    navigation::{dop::DilutionOfPrecision, model::ObservationType},
    prelude::{Constellation, Epoch, Vector3, SV},
};

#[cfg(feature = "serde")]
use serde::Serialize;

/// Confidence attached to a [PPPSolution]
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub enum SolutionStatus {
    /// Solution obtained in nominal conditions
    #[default]
    Nominal,
    /// Solution obtained with too few vehicles, poor geometry or
    /// while the Bancroft cross check disagrees: lower confidence.
    Degraded,
}

impl std::fmt::Display for SolutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Nominal => write!(f, "nominal"),
            Self::Degraded => write!(f, "degraded"),
        }
    }
}

/// Post-fit residual of one observation
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Residual {
    /// [SV]
    pub sv: SV,
    /// [ObservationType]
    pub observation: ObservationType,
    /// Residual (m)
    pub residual_m: f64,
}

impl std::fmt::Display for Residual {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{} {:<5} {:>10.4}", self.sv, self.observation, self.residual_m)
    }
}

/// PPP Solution, as resolved at one [Epoch].
#[derive(Debug, Clone)]
pub struct PPPSolution {
    /// Sampling [Epoch]
    pub epoch: Epoch,
    /// [SolutionStatus]
    pub status: SolutionStatus,
    /// Position (ECEF m)
    pub position_ecef_m: Vector3<f64>,
    /// Position standard deviation, per ECEF component (m)
    pub position_std_m: Vector3<f64>,
    /// Receiver clock offset (m)
    pub clock_offset_m: f64,
    /// Receiver clock offset standard deviation (m)
    pub clock_std_m: f64,
    /// Residual zenith wet delay estimate (m), when estimated
    pub troposphere_m: Option<f64>,
    /// Residual zenith wet delay standard deviation (m)
    pub troposphere_std_m: Option<f64>,
    /// Time offsets of other constellations to GPS (m)
    pub system_offsets_m: HashMap<Constellation, f64>,
    /// Position offset to the a priori position (north, east, up) in meters,
    /// when an a priori position is defined.
    pub neu_offset_m: Option<Vector3<f64>>,
    /// Position covariance, in local (north, east, up) frame (m²)
    pub neu_covariance: Matrix3<f64>,
    /// Full covariance matrix, in parameter order
    pub covariance: DMatrix<f64>,
    /// Vehicles that contributed to this solution
    pub sv: Vec<SV>,
    /// [DilutionOfPrecision], when at least 4 vehicles contributed
    pub dop: Option<DilutionOfPrecision>,
    /// Post-fit residuals
    pub residuals: Vec<Residual>,
}

impl PPPSolution {
    /// Number of vehicles that contributed
    pub fn num_sv(&self) -> usize {
        self.sv.len()
    }

    /// Horizontal dilution of precision
    pub fn hdop(&self) -> Option<f64> {
        self.dop.map(|dop| dop.hdop)
    }

    /// Receiver clock offset (s)
    pub fn clock_offset_s(&self) -> f64 {
        self.clock_offset_m / SPEED_OF_LIGHT_M_S
    }

    /// Textual post-fit residuals report, one line per observation
    pub fn residual_report(&self) -> String {
        self.residuals
            .iter()
            .map(|res| format!("{} RES {}", self.epoch, res))
            .join("\n")
    }
}

impl std::fmt::Display for PPPSolution {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "{} ({}) x={:.4} y={:.4} z={:.4} (+/- {:.4} {:.4} {:.4}) clk={:.4} nsv={}",
            self.epoch,
            self.status,
            self.position_ecef_m[0],
            self.position_ecef_m[1],
            self.position_ecef_m[2],
            self.position_std_m[0],
            self.position_std_m[1],
            self.position_std_m[2],
            self.clock_offset_m,
            self.num_sv(),
        )?;
        if let Some(trp) = self.troposphere_m {
            write!(f, " trp={:.4}", trp)?;
        }
        if let Some(hdop) = self.hdop() {
            write!(f, " hdop={:.2}", hdop)?;
        }
        Ok(())
    }
}
