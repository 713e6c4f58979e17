//! Linearized observation model
use log::debug;
use nalgebra::{DMatrix, DVector};

use crate::{
    cfg::Config,
    constants::{EARTH_ANGULAR_VEL_RAD, SPEED_OF_LIGHT_M_S},
    geodesy::{ecef_to_geodetic, elevation_azimuth, rotate_z},
    models::Models,
    navigation::{
        parameter::{partial, ParameterKind},
        state::StateVector,
    },
    observation::{EpochData, SatData},
    prelude::{Epoch, SV},
};

/// Observation type, processed in this order within one epoch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObservationType {
    /// Code (pseudo range) combination
    Code,
    /// Phase (carrier) combination
    Phase,
}

impl ObservationType {
    pub(crate) fn is_phase(&self) -> bool {
        matches!(self, Self::Phase)
    }
}

impl std::fmt::Display for ObservationType {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> Result<(), std::fmt::Error> {
        match self {
            Self::Code => write!(f, "code"),
            Self::Phase => write!(f, "phase"),
        }
    }
}

/// Design matrix, pre-fit residuals and weights, for one [ObservationType]
#[derive(Debug, Clone)]
pub(crate) struct Design {
    /// [ObservationType]
    pub kind: ObservationType,
    /// Observation owner, per row
    pub sv: Vec<SV>,
    /// Design matrix
    pub h: DMatrix<f64>,
    /// Pre-fit residuals (observed - modeled)
    pub y: DVector<f64>,
    /// Observation standard deviations
    pub sigma: DVector<f64>,
}

impl Design {
    pub fn is_empty(&self) -> bool {
        self.sv.is_empty()
    }
}

/// Observation model builder
pub(crate) struct ObservationModel<'a> {
    cfg: &'a Config,
    models: &'a Models,
}

impl<'a> ObservationModel<'a> {
    pub fn new(cfg: &'a Config, models: &'a Models) -> Self {
        Self { cfg, models }
    }

    /// Evaluates the modeled observation of `sat` at the current state,
    /// and refreshes its geometry (range, line of sight, elevation, mapping function).
    /// Ambiguity is not accounted for.
    pub fn evaluate(
        &self,
        t: Epoch,
        state: &StateVector,
        sat: &mut SatData,
        kind: ObservationType,
    ) -> Option<f64> {
        let modeling = &self.cfg.modeling;

        let sv_position = sat.state?.position_ecef_m;
        let rx_apriori = state.position_ecef_m()?;

        let mut rx = rx_apriori;

        if modeling.solid_tides {
            if let Some(tides) = &self.models.tides {
                rx += tides.displacement(t, &rx_apriori);
            }
        }

        if modeling.earth_rotation {
            let rho0 = (sv_position - rx).norm();
            rx = rotate_z(&rx, EARTH_ANGULAR_VEL_RAD * rho0 / SPEED_OF_LIGHT_M_S);
        }

        let los = rx - sv_position;
        let rho = los.norm();

        sat.rho_m = rho;
        sat.los = los / rho;

        let (_, _, height_m) = ecef_to_geodetic(&rx_apriori);
        let (elevation, azimuth) = elevation_azimuth(&rx_apriori, &sv_position);
        sat.elevation_rad = elevation;
        sat.azimuth_rad = azimuth;

        let troposphere = self
            .models
            .troposphere
            .slant_delay(elevation, height_m, t);
        sat.mapping_wet = troposphere.mapping_wet;

        let mut value = rho - sat.clock_m;

        value += state.value(ParameterKind::ReceiverClock).unwrap_or(0.0);

        value += state
            .value(ParameterKind::SystemOffset(sat.sv.constellation))
            .unwrap_or(0.0);

        if modeling.tropo_delay {
            value += troposphere.slant_delay_m();
        }

        value += state.value(ParameterKind::Troposphere).unwrap_or(0.0) * troposphere.mapping_wet;

        if modeling.antenna {
            value += self.antenna_correction(sat);
        }

        if kind.is_phase() && modeling.phase_windup {
            if let Some(windup) = &self.models.windup {
                let cycles = windup.windup(t, sat.sv, &rx, &sv_position);
                value += cycles * sat.wavelength_m().unwrap_or(0.0);
            }
        }

        Some(value)
    }

    /// Antenna eccentricity and phase center corrections, projected on the line of sight
    fn antenna_correction(&self, sat: &SatData) -> f64 {
        let (elev, azim) = (sat.elevation_rad, sat.azimuth_rad);
        let mut correction = 0.0;

        if let Some((n, e, u)) = self.cfg.antenna_neu_ecc_m {
            correction -= n * azim.cos() * elev.cos() + e * azim.sin() * elev.cos() + u * elev.sin();
        }

        if let (Some(antenna), Some(signal)) = (&self.models.antenna, sat.signal) {
            let (a1, a2) = signal.coefficients;

            correction += a1 * antenna.receiver_correction(signal.lhs, elev, azim);
            correction += a1 * antenna.satellite_correction(sat.sv, signal.lhs, elev);

            if let Some(rhs) = signal.rhs {
                correction += a2 * antenna.receiver_correction(rhs, elev, azim);
                correction += a2 * antenna.satellite_correction(sat.sv, rhs, elev);
            }
        }

        correction
    }

    /// Builds the [Design] of this [ObservationType], for all vehicles
    /// of this epoch. Phase observations only contribute once
    /// an ambiguity exists for that vehicle.
    pub fn build(
        &self,
        t: Epoch,
        kind: ObservationType,
        state: &StateVector,
        epoch: &mut EpochData,
    ) -> Design {
        let solver = &self.cfg.solver;
        let ncols = state.len();

        let mut svs = Vec::<SV>::with_capacity(epoch.len());
        let mut h = Vec::<f64>::with_capacity(epoch.len() * ncols);
        let mut y = Vec::<f64>::with_capacity(epoch.len());
        let mut sigma = Vec::<f64>::with_capacity(epoch.len());

        for sat in epoch.values_mut() {
            let Some(setup) = self.cfg.systems.get(&sat.sv.constellation) else {
                continue;
            };

            let observed = match kind {
                ObservationType::Code if setup.code => sat.code_m,
                ObservationType::Phase if setup.phase => sat.phase_m,
                _ => None,
            };

            let Some(observed) = observed else {
                continue;
            };

            let ambiguity_m = if kind.is_phase() {
                let Some(ambiguity) = state.value(ParameterKind::Ambiguity(sat.sv)) else {
                    continue;
                };
                ambiguity * sat.wavelength_m().unwrap_or(0.0)
            } else {
                0.0
            };

            let Some(modeled) = self.evaluate(t, state, sat, kind) else {
                continue;
            };

            let residual = observed - modeled - ambiguity_m;

            let weighting = match kind {
                ObservationType::Code => (solver.code_weighting, solver.sigma_code_m),
                ObservationType::Phase => (solver.phase_weighting, solver.sigma_phase_m),
            };

            svs.push(sat.sv);
            y.push(residual);
            sigma.push(weighting.0.scale(weighting.1, sat.elevation_rad));
            h.extend(
                state
                    .parameters()
                    .iter()
                    .map(|param| partial(param, sat, kind.is_phase())),
            );
        }

        let nrows = svs.len();

        debug!(
            "{} - {} design: {} observation(s) x {} parameter(s)",
            t, kind, nrows, ncols
        );

        Design {
            kind,
            sv: svs,
            h: DMatrix::from_row_slice(nrows, ncols, &h),
            y: DVector::from_vec(y),
            sigma: DVector::from_vec(sigma),
        }
    }
}
