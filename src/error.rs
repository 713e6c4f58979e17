use thiserror::Error;

use crate::prelude::SV;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Bancroft initialization requires at least 4 vehicles
    /// with a non degenerate geometry. Cold start is not possible
    /// and the epoch is skipped.
    #[error("bancroft: insufficient or degenerate geometry")]
    InsufficientGeometry,

    /// Outlier rejection (or pre-fit criteria) left us with not
    /// enough vehicles to form a solution. The epoch is rolled back.
    #[error("not enough observations to form a solution")]
    NotEnoughObservations,

    /// No orbital state or clock could be obtained for this vehicle.
    /// The vehicle is dropped from the current epoch.
    #[error("{0}: ephemeris unavailable")]
    EphemerisUnavailable(SV),

    /// Updated covariance failed the positive definiteness test.
    /// The epoch is rolled back.
    #[error("updated covariance is not positive definite")]
    DivergedCovariance,

    /// Innovation covariance could not be inverted (bad signal data or invalid orbital states).
    #[error("failed to invert matrix")]
    MatrixInversion,

    /// Ionosphere free combination requires pseudo range
    /// sampled on two separate frequencies.
    #[error("failed to form pseudo range combination")]
    PseudoRangeCombination,

    /// Dual frequency combination of two identical frequencies
    #[error("unknown carrier frequency")]
    UnknownCarrierFrequency,
}
