pub(crate) mod dop;
pub(crate) mod filter;
pub(crate) mod kalman;
pub(crate) mod model;
pub(crate) mod outlier;
pub(crate) mod parameter;
pub(crate) mod snapshot;
pub(crate) mod state;

pub use dop::DilutionOfPrecision;
pub use filter::{Filter, FilterState};
pub use model::ObservationType;
pub use parameter::{Parameter, ParameterKind};
pub use state::StateVector;
