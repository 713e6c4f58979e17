//! PPP navigation filter
use itertools::Itertools;
use log::{debug, error, info, warn};
use nalgebra::{DMatrix, Matrix3, Vector3};

use crate::{
    bancroft::{Bancroft, BancroftObservation, BancroftSolution},
    cfg::Config,
    constants::{EARTH_ANGULAR_VEL_RAD, SPEED_OF_LIGHT_M_S},
    error::Error,
    geodesy::{ecef_to_geodetic, elevation_azimuth, enu_rotation, rotate_z},
    models::{AntennaModel, EphemerisSource, Models, TidalModel, TroposphereModel, WindUpModel},
    navigation::{
        dop::{neu_covariance, DilutionOfPrecision},
        kalman::measurement_update,
        model::{ObservationModel, ObservationType},
        outlier::OutlierDetector,
        parameter::ParameterKind,
        snapshot::Snapshot,
        state::StateVector,
    },
    observation::{EpochData, SatData},
    prelude::{Constellation, Duration, Epoch, SV},
    solutions::{PPPSolution, Residual, SolutionStatus},
};

/// [Filter] lifecycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FilterState {
    /// No epoch processed yet
    #[default]
    Uninitialized,
    /// State vector needs to be (re)built from scratch
    ColdStart,
    /// Nominal tracking
    Tracking,
    /// Tracking, but latest solution has lower confidence
    Degraded,
}

impl FilterState {
    /// True when a state vector is being propagated
    pub fn is_tracking(&self) -> bool {
        matches!(self, Self::Tracking | Self::Degraded)
    }
}

impl std::fmt::Display for FilterState {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Uninitialized => write!(f, "uninitialized"),
            Self::ColdStart => write!(f, "cold-start"),
            Self::Tracking => write!(f, "tracking"),
            Self::Degraded => write!(f, "degraded"),
        }
    }
}

/// Outcome of one predict + update attempt
enum Attempt {
    /// Update applied, with post-fit residuals
    Accepted(Vec<Residual>),
    /// Outliers were identified: nothing applied
    Outliers(Vec<SV>),
}

/// PPP [Filter]: estimates the receiver position, clock offset,
/// residual tropospheric delay, inter system offsets and float ambiguities,
/// epoch after epoch.
pub struct Filter {
    /// [Config]
    cfg: Config,
    /// External models
    models: Models,
    /// [FilterState]
    status: FilterState,
    /// [StateVector]
    state: StateVector,
    /// Latest resolved [EpochData]
    epoch: Option<EpochData>,
    /// Latest resolved [Epoch]
    time: Option<Epoch>,
    /// Consecutive epochs for which Bancroft disagrees with the filter
    suspect_epochs: usize,
    /// Consecutive rejected epochs
    consecutive_failures: usize,
    /// Latest [PPPSolution]
    solution: Option<PPPSolution>,
}

impl Filter {
    /// Creates a new PPP [Filter].
    ///
    /// ## Input
    /// - cfg: [Config] preset
    /// - ephemeris: [EphemerisSource] that provides the vehicle states.
    ///
    /// The troposphere is modeled with the default Saastamoinen model.
    /// Use the other builders to install the remaining external models.
    pub fn new(cfg: Config, ephemeris: Box<dyn EphemerisSource>) -> Self {
        Self {
            cfg,
            models: Models::new(ephemeris),
            status: FilterState::default(),
            state: StateVector::default(),
            epoch: None,
            time: None,
            suspect_epochs: 0,
            consecutive_failures: 0,
            solution: None,
        }
    }

    /// Replaces the [TroposphereModel]
    pub fn with_troposphere_model(mut self, model: Box<dyn TroposphereModel>) -> Self {
        self.models.troposphere = model;
        self
    }

    /// Installs a [TidalModel]
    pub fn with_tidal_model(mut self, model: Box<dyn TidalModel>) -> Self {
        self.models.tides = Some(model);
        self
    }

    /// Installs a [WindUpModel]
    pub fn with_windup_model(mut self, model: Box<dyn WindUpModel>) -> Self {
        self.models.windup = Some(model);
        self
    }

    /// Installs an [AntennaModel]
    pub fn with_antenna_model(mut self, model: Box<dyn AntennaModel>) -> Self {
        self.models.antenna = Some(model);
        self
    }

    /// Current [FilterState]
    pub fn status(&self) -> FilterState {
        self.status
    }

    /// [Config] in use
    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// [Epoch] of the latest resolved epoch
    pub fn time(&self) -> Option<Epoch> {
        self.time
    }

    /// Current [StateVector]
    pub fn state(&self) -> &StateVector {
        &self.state
    }

    /// Current position estimate (ECEF m)
    pub fn position_ecef_m(&self) -> Option<Vector3<f64>> {
        self.state.position_ecef_m()
    }

    /// Current receiver clock offset estimate (m)
    pub fn clock_m(&self) -> Option<f64> {
        self.state.value(ParameterKind::ReceiverClock)
    }

    /// Current residual zenith wet delay estimate (m)
    pub fn troposphere_m(&self) -> Option<f64> {
        self.state.value(ParameterKind::Troposphere)
    }

    /// Residual zenith wet delay standard deviation (m)
    pub fn troposphere_std_m(&self) -> Option<f64> {
        self.state.std_dev(ParameterKind::Troposphere)
    }

    /// Time offset of this [Constellation] to GPS (m)
    pub fn system_offset_m(&self, constellation: Constellation) -> Option<f64> {
        self.state.value(ParameterKind::SystemOffset(constellation))
    }

    /// Number of vehicles that contributed to the latest solution
    pub fn num_sv(&self) -> usize {
        self.solution.as_ref().map(|sol| sol.num_sv()).unwrap_or(0)
    }

    /// HDOP of the latest solution
    pub fn hdop(&self) -> Option<f64> {
        self.solution.as_ref().and_then(|sol| sol.hdop())
    }

    /// Current covariance matrix
    pub fn covariance(&self) -> &DMatrix<f64> {
        self.state.covariance()
    }

    /// Textual post-fit residuals report of the latest solution
    pub fn residual_report(&self) -> String {
        self.solution
            .as_ref()
            .map(|sol| sol.residual_report())
            .unwrap_or_default()
    }

    /// Latest [PPPSolution]
    pub fn solution(&self) -> Option<&PPPSolution> {
        self.solution.as_ref()
    }

    /// Latest resolved [EpochData], as used by the solution
    pub fn epoch_data(&self) -> Option<&EpochData> {
        self.epoch.as_ref()
    }

    /// Discards the state vector: next epoch is a cold start.
    pub fn reset(&mut self) {
        self.state = StateVector::default();
        self.status = FilterState::ColdStart;
        self.suspect_epochs = 0;
        self.consecutive_failures = 0;
    }

    /// Processes a new epoch.
    /// On failure, the filter state is left untouched and the epoch
    /// is reported as unresolved.
    pub fn update(&mut self, mut epoch: EpochData) -> Result<PPPSolution, Error> {
        let t = epoch.t;

        if self.status.is_tracking() {
            if let Some(time) = self.time {
                let dt = (t - time).to_seconds();
                if dt > self.cfg.solver.max_epoch_gap_s {
                    warn!("{} - {:.1}s data gap: filter reset", t, dt);
                    self.reset();
                }
            }
        }

        self.prepare(&mut epoch);

        if epoch.len() < self.cfg.min_sv {
            return self.reject(t, Error::NotEnoughObservations);
        }

        let bancroft = self.bancroft(&epoch);
        let mut suspect = false;

        if self.status.is_tracking() {
            match (&bancroft, self.state.position_ecef_m()) {
                (Ok(solution), Some(position)) => {
                    let distance = (solution.position_ecef_m - position).norm();
                    if distance > self.cfg.solver.bancroft_max_disagreement_m {
                        self.suspect_epochs += 1;
                        warn!(
                            "{} - bancroft disagreement {:.3}m ({}/{})",
                            t,
                            distance,
                            self.suspect_epochs,
                            self.cfg.solver.bancroft_max_suspect_epochs
                        );
                        if self.suspect_epochs >= self.cfg.solver.bancroft_max_suspect_epochs {
                            warn!("{} - persistent disagreement: filter reset", t);
                            self.reset();
                        } else {
                            suspect = true;
                        }
                    } else {
                        self.suspect_epochs = 0;
                    }
                },
                (Err(e), _) => debug!("{} - bancroft cross check: {}", t, e),
                _ => {},
            }
        }

        if !self.status.is_tracking() {
            if let Err(e) = &bancroft {
                error!("{} - bancroft: {}", t, e);
                return self.reject(t, Error::InsufficientGeometry);
            }
            if self.status == FilterState::Uninitialized {
                self.status = FilterState::ColdStart;
            }
        }

        let bancroft = bancroft.ok();

        self.elevation_mask(&mut epoch, bancroft.as_ref());

        if epoch.len() < self.cfg.min_sv {
            return self.reject(t, Error::NotEnoughObservations);
        }

        match self.update_p(t, &mut epoch, bancroft.as_ref()) {
            Ok(residuals) => {
                self.time = Some(t);
                self.consecutive_failures = 0;

                let solution = self.build_solution(t, &epoch, residuals, suspect)?;

                self.status = match solution.status {
                    SolutionStatus::Nominal => FilterState::Tracking,
                    SolutionStatus::Degraded => FilterState::Degraded,
                };

                info!("{}", solution);
                for res in solution.residuals.iter() {
                    debug!("{} RES {}", t, res);
                }

                self.epoch = Some(epoch);
                self.solution = Some(solution.clone());
                Ok(solution)
            },
            Err(e) => self.reject(t, e),
        }
    }

    /// Reports a rejected epoch. Repeated failures reset the filter.
    fn reject(&mut self, t: Epoch, e: Error) -> Result<PPPSolution, Error> {
        self.consecutive_failures += 1;
        error!(
            "{} - epoch rejected: {} ({} consecutive)",
            t, e, self.consecutive_failures
        );
        if self.status.is_tracking()
            && self.consecutive_failures >= self.cfg.solver.max_consecutive_failures
        {
            warn!("{} - too many consecutive failures: filter reset", t);
            self.reset();
        }
        Err(e)
    }

    /// Forms the signal combinations and evaluates the vehicle states.
    /// Vehicles that cannot contribute are dropped.
    fn prepare(&self, epoch: &mut EpochData) {
        let t = epoch.t;

        let unused = epoch
            .sv_iter()
            .filter(|sv| !self.cfg.systems.contains_key(&sv.constellation))
            .collect::<Vec<_>>();

        for sv in unused {
            debug!("{} - {} not configured", t, sv);
            epoch.remove(&sv);
        }

        let mut dropped = Vec::<SV>::new();

        for sat in epoch.values_mut() {
            if let Err(e) = self.prepare_sat(t, sat) {
                warn!("{} - {} dropped: {}", t, sat.sv, e);
                dropped.push(sat.sv);
            }
        }

        for sv in dropped {
            epoch.remove(&sv);
        }
    }

    fn prepare_sat(&self, t: Epoch, sat: &mut SatData) -> Result<(), Error> {
        let setup = self
            .cfg
            .systems
            .get(&sat.sv.constellation)
            .copied()
            .unwrap_or_default();

        sat.combine(setup.combination, self.cfg.min_snr)?;

        let code = sat.code_m.ok_or(Error::PseudoRangeCombination)?;

        let t_tx = t - Duration::from_seconds(code / SPEED_OF_LIGHT_M_S);

        let state = self
            .models
            .ephemeris
            .state_at(sat.sv, t_tx)
            .ok_or(Error::EphemerisUnavailable(sat.sv))?;

        let mut clock_m = 0.0;

        if self.cfg.modeling.sv_clock_bias {
            clock_m += state.clock_bias_s * SPEED_OF_LIGHT_M_S;
        }

        if self.cfg.modeling.relativistic_clock_bias {
            clock_m -= 2.0 * state.position_ecef_m.dot(&state.velocity_ecef_m_s)
                / SPEED_OF_LIGHT_M_S;
        }

        sat.clock_m = clock_m;
        sat.state = Some(state);
        Ok(())
    }

    /// Bancroft solution, from the code combinations of this epoch
    fn bancroft(&self, epoch: &EpochData) -> Result<BancroftSolution, Error> {
        let observations = epoch
            .values()
            .filter_map(|sat| {
                let state = sat.state?;
                let pseudo_range_m = sat.code_m? + sat.clock_m;

                let position_ecef_m = if self.cfg.modeling.earth_rotation {
                    rotate_z(
                        &state.position_ecef_m,
                        -EARTH_ANGULAR_VEL_RAD * pseudo_range_m / SPEED_OF_LIGHT_M_S,
                    )
                } else {
                    state.position_ecef_m
                };

                Some(BancroftObservation {
                    position_ecef_m,
                    pseudo_range_m,
                })
            })
            .collect::<Vec<_>>();

        let solution = Bancroft::new(&observations)?.resolve()?;

        debug!(
            "{} - bancroft: {:.3} {:.3} {:.3} clk={:.3}",
            epoch.t,
            solution.position_ecef_m[0],
            solution.position_ecef_m[1],
            solution.position_ecef_m[2],
            solution.clock_bias_m,
        );

        Ok(solution)
    }

    /// Removes vehicles below the elevation mask
    fn elevation_mask(&self, epoch: &mut EpochData, bancroft: Option<&BancroftSolution>) {
        let rx = self
            .state
            .position_ecef_m()
            .or(self
                .cfg
                .apriori_position_ecef_m
                .map(|(x, y, z)| Vector3::new(x, y, z)))
            .or(bancroft.map(|sol| sol.position_ecef_m));

        let Some(rx) = rx else {
            return;
        };

        let t = epoch.t;
        let mut masked = Vec::<SV>::new();

        for sat in epoch.values_mut() {
            let Some(state) = sat.state else {
                continue;
            };

            let (elevation, azimuth) = elevation_azimuth(&rx, &state.position_ecef_m);
            sat.elevation_rad = elevation;
            sat.azimuth_rad = azimuth;

            if sat.elevation_deg() < self.cfg.min_sv_elev_deg {
                debug!(
                    "{} - {} below elevation mask ({:.1}°)",
                    t,
                    sat.sv,
                    sat.elevation_deg()
                );
                masked.push(sat.sv);
            }
        }

        for sv in masked {
            epoch.remove(&sv);
        }
    }

    /// Predict and update, with outlier rejection.
    /// Any failure restores the state prior this call.
    fn update_p(
        &mut self,
        t: Epoch,
        epoch: &mut EpochData,
        bancroft: Option<&BancroftSolution>,
    ) -> Result<Vec<Residual>, Error> {
        let snapshot = Snapshot::new(&self.state, epoch, self.time);
        let mut outliers = Vec::<SV>::new();

        loop {
            for sv in outliers.iter() {
                epoch.remove(sv);
            }

            if epoch.len() < self.cfg.min_sv {
                snapshot.restore(&mut self.state, epoch, &mut self.time);
                return Err(Error::NotEnoughObservations);
            }

            match self.attempt(t, epoch, bancroft) {
                Ok(Attempt::Accepted(residuals)) => return Ok(residuals),
                Ok(Attempt::Outliers(svs)) => {
                    snapshot.restore(&mut self.state, epoch, &mut self.time);
                    outliers.extend(svs);
                },
                Err(e) => {
                    snapshot.restore(&mut self.state, epoch, &mut self.time);
                    return Err(e);
                },
            }
        }
    }

    /// One predict + update attempt: code pass then phase pass.
    fn attempt(
        &mut self,
        t: Epoch,
        epoch: &mut EpochData,
        bancroft: Option<&BancroftSolution>,
    ) -> Result<Attempt, Error> {
        self.predict(t, epoch, bancroft)?;

        let detector = OutlierDetector::new(&self.cfg.solver);
        let mut residuals = Vec::<Residual>::new();

        for kind in [ObservationType::Code, ObservationType::Phase] {
            let design =
                ObservationModel::new(&self.cfg, &self.models).build(t, kind, &self.state, epoch);

            if design.is_empty() {
                if kind.is_phase() {
                    continue;
                }
                return Err(Error::NotEnoughObservations);
            }

            let update = measurement_update(
                self.state.covariance(),
                &design.h,
                &design.y,
                &design.sigma,
            )?;

            let outliers = detector.detect(t, &design, &update.postfit);
            if !outliers.is_empty() {
                return Ok(Attempt::Outliers(outliers));
            }

            self.state.apply(&update.dx, update.covariance);

            residuals.extend(design.sv.iter().zip(update.postfit.iter()).map(
                |(sv, residual_m)| Residual {
                    sv: *sv,
                    observation: kind,
                    residual_m: *residual_m,
                },
            ));
        }

        Ok(Attempt::Accepted(residuals))
    }

    /// Time update: state initialization or process noise,
    /// then ambiguities management.
    fn predict(
        &mut self,
        t: Epoch,
        epoch: &EpochData,
        bancroft: Option<&BancroftSolution>,
    ) -> Result<(), Error> {
        if self.state.is_empty() {
            self.initialize(t, bancroft)?;
        } else {
            let dt = self
                .time
                .map(|time| (t - time).to_seconds().max(0.0))
                .unwrap_or(0.0);
            self.process_noise(dt);

            for param in self.state.iter_mut() {
                param.age += 1;
            }
        }

        self.manage_ambiguities(t, epoch);
        Ok(())
    }

    /// Builds the state vector from scratch
    fn initialize(&mut self, t: Epoch, bancroft: Option<&BancroftSolution>) -> Result<(), Error> {
        let solver = &self.cfg.solver;
        let bancroft = bancroft.ok_or(Error::InsufficientGeometry)?;

        let position = self
            .cfg
            .apriori_position_ecef_m
            .map(|(x, y, z)| Vector3::new(x, y, z))
            .unwrap_or(bancroft.position_ecef_m);

        let var_crd = solver.apriori_sigma_crd_m.powi(2);

        self.state.add(ParameterKind::CoordX, position[0], var_crd);
        self.state.add(ParameterKind::CoordY, position[1], var_crd);
        self.state.add(ParameterKind::CoordZ, position[2], var_crd);

        self.state.add(
            ParameterKind::ReceiverClock,
            bancroft.clock_bias_m,
            solver.apriori_sigma_clk_m.powi(2),
        );

        if solver.estimate_troposphere {
            self.state.add(
                ParameterKind::Troposphere,
                0.0,
                solver.apriori_sigma_trp_m.powi(2),
            );
        }

        for constellation in self.cfg.offset_systems() {
            self.state.add(
                ParameterKind::SystemOffset(constellation),
                0.0,
                solver.apriori_sigma_offset_m.powi(2),
            );
        }

        info!("{} - filter initialized ({} parameters)", t, self.state.len());
        Ok(())
    }

    /// Injects process noise, for `dt` seconds.
    /// Variances never exceed their initial value.
    fn process_noise(&mut self, dt: f64) {
        let solver = &self.cfg.solver;

        if let Some(position) = self.state.position_ecef_m() {
            let (n, e, u) = solver.noise_crd_m_sqrt_s;
            if n > 0.0 || e > 0.0 || u > 0.0 {
                let (lat, lon, _) = ecef_to_geodetic(&position);
                let r = enu_rotation(lat, lon);
                let q_enu = Matrix3::from_diagonal(&Vector3::new(e * e, n * n, u * u)) * dt;
                self.state
                    .add_position_process_noise(&(r * q_enu * r.transpose()));
            }
        }

        self.state.add_process_noise(
            ParameterKind::ReceiverClock,
            solver.noise_clk_m_sqrt_s.powi(2) * dt,
            solver.apriori_sigma_clk_m.powi(2),
        );

        self.state.add_process_noise(
            ParameterKind::Troposphere,
            solver.noise_trp_m_sqrt_s.powi(2) * dt,
            solver.apriori_sigma_trp_m.powi(2),
        );

        for constellation in self.cfg.offset_systems() {
            self.state.add_process_noise(
                ParameterKind::SystemOffset(constellation),
                solver.noise_offset_m_sqrt_s.powi(2) * dt,
                solver.apriori_sigma_offset_m.powi(2),
            );
        }
    }

    /// Removes ambiguities of vehicles that slipped or disappeared,
    /// and introduces ambiguities for new phase observations,
    /// seeded from the code minus phase difference.
    fn manage_ambiguities(&mut self, t: Epoch, epoch: &EpochData) {
        let max_missing = self.cfg.solver.max_missing_epochs;

        for param in self.state.iter_mut() {
            if let ParameterKind::Ambiguity(sv) = param.kind {
                if epoch.get(&sv).is_some() {
                    param.missing = 0;
                } else {
                    param.missing += 1;
                }
            }
        }

        let removed = self.state.remove_where(|param| match param.kind {
            ParameterKind::Ambiguity(sv) => {
                param.missing > max_missing || epoch.get(&sv).map(|sat| sat.slip).unwrap_or(false)
            },
            _ => false,
        });

        for param in removed.iter() {
            if param.missing > max_missing {
                debug!("{} - {} no longer observed", t, param.kind);
            } else {
                info!("{} - {} cycle slip: ambiguity reset", t, param.kind);
            }
        }

        for sat in epoch.values() {
            let use_phase = self
                .cfg
                .systems
                .get(&sat.sv.constellation)
                .map(|setup| setup.phase)
                .unwrap_or(false);

            if !use_phase {
                continue;
            }

            let kind = ParameterKind::Ambiguity(sat.sv);

            if self.state.find(kind).is_some() {
                continue;
            }

            let (Some(code), Some(phase), Some(lambda)) =
                (sat.code_m, sat.phase_m, sat.wavelength_m())
            else {
                continue;
            };

            self.state.add(
                kind,
                (phase - code) / lambda,
                (self.cfg.solver.apriori_sigma_amb_m / lambda).powi(2),
            );
        }
    }

    /// Builds the [PPPSolution] of the epoch that was just resolved
    fn build_solution(
        &self,
        t: Epoch,
        epoch: &EpochData,
        residuals: Vec<Residual>,
        suspect: bool,
    ) -> Result<PPPSolution, Error> {
        let solver = &self.cfg.solver;

        let position = self
            .state
            .position_ecef_m()
            .ok_or(Error::InsufficientGeometry)?;

        let q_ecef = self
            .state
            .position_covariance()
            .ok_or(Error::InsufficientGeometry)?;

        let sv = residuals
            .iter()
            .map(|res| res.sv)
            .unique()
            .sorted()
            .collect::<Vec<_>>();

        let los = sv
            .iter()
            .filter_map(|sv| epoch.get(sv).map(|sat| sat.los))
            .collect::<Vec<_>>();

        let dop = DilutionOfPrecision::new(&position, &los);

        let neu_offset_m = self.cfg.apriori_position_ecef_m.map(|(x, y, z)| {
            let (lat, lon, _) = ecef_to_geodetic(&position);
            let enu = enu_rotation(lat, lon).transpose() * (position - Vector3::new(x, y, z));
            Vector3::new(enu[1], enu[0], enu[2])
        });

        let poor_geometry = match dop {
            Some(dop) => dop.hdop > solver.max_hdop,
            None => true,
        };

        let status = if suspect || sv.len() < solver.min_nominal_sv || poor_geometry {
            SolutionStatus::Degraded
        } else {
            SolutionStatus::Nominal
        };

        let system_offsets_m = self
            .state
            .parameters()
            .iter()
            .filter_map(|param| match param.kind {
                ParameterKind::SystemOffset(constellation) => Some((constellation, param.value)),
                _ => None,
            })
            .collect();

        Ok(PPPSolution {
            epoch: t,
            status,
            position_ecef_m: position,
            position_std_m: q_ecef.diagonal().map(|var| var.max(0.0).sqrt()),
            clock_offset_m: self.clock_m().unwrap_or(0.0),
            clock_std_m: self
                .state
                .std_dev(ParameterKind::ReceiverClock)
                .unwrap_or(0.0),
            troposphere_m: self.troposphere_m(),
            troposphere_std_m: self.troposphere_std_m(),
            system_offsets_m,
            neu_offset_m,
            neu_covariance: neu_covariance(&q_ecef, &position),
            covariance: self.state.covariance().clone(),
            sv,
            dop,
            residuals,
        })
    }
}
