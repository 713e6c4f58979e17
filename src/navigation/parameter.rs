//! Filter parameters (unknowns)
use crate::{
    observation::SatData,
    prelude::{Constellation, SV},
};

/// Kind of estimated [Parameter]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParameterKind {
    /// Receiver ECEF X coordinate (m)
    CoordX,
    /// Receiver ECEF Y coordinate (m)
    CoordY,
    /// Receiver ECEF Z coordinate (m)
    CoordZ,
    /// Receiver clock offset (m)
    ReceiverClock,
    /// Residual zenith wet delay (m)
    Troposphere,
    /// Time offset between this [Constellation] and GPS (m)
    SystemOffset(Constellation),
    /// Phase ambiguity of this [SV] (cycles of the combination wavelength)
    Ambiguity(SV),
}

impl ParameterKind {
    /// Only ambiguities may be removed during the filter lifetime.
    pub fn is_removable(&self) -> bool {
        matches!(self, Self::Ambiguity(_))
    }

    /// Vehicle this [ParameterKind] is attached to
    pub fn sv(&self) -> Option<SV> {
        match self {
            Self::Ambiguity(sv) => Some(*sv),
            _ => None,
        }
    }
}

impl std::fmt::Display for ParameterKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> Result<(), std::fmt::Error> {
        match self {
            Self::CoordX => write!(f, "CRD_X"),
            Self::CoordY => write!(f, "CRD_Y"),
            Self::CoordZ => write!(f, "CRD_Z"),
            Self::ReceiverClock => write!(f, "CLK"),
            Self::Troposphere => write!(f, "TRP"),
            Self::SystemOffset(c) => write!(f, "OFF_{}", c),
            Self::Ambiguity(sv) => write!(f, "AMB_{}", sv),
        }
    }
}

/// One scalar unknown of the state vector
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    /// [ParameterKind]
    pub kind: ParameterKind,
    /// Current estimate
    pub value: f64,
    /// Row (and column) in the covariance matrix
    pub(crate) index: usize,
    /// Row in the covariance matrix prior last restructuring
    pub(crate) prev_index: Option<usize>,
    /// Number of epochs since creation
    pub(crate) age: u32,
    /// Number of consecutive epochs the attached vehicle was not used
    pub(crate) missing: u32,
}

impl Parameter {
    pub(crate) fn new(kind: ParameterKind, value: f64, index: usize) -> Self {
        Self {
            kind,
            value,
            index,
            prev_index: None,
            age: 0,
            missing: 0,
        }
    }

    /// Row (and column) of this [Parameter] in the covariance matrix
    pub fn index(&self) -> usize {
        self.index
    }

    /// Number of epochs since this [Parameter] was created
    pub fn age(&self) -> u32 {
        self.age
    }
}

/// Partial derivative of the `phase` (or code) observation of `sat`
/// with respect to this [Parameter]. Geometry (line of sight, mapping function)
/// is the one evaluated by the last observation model evaluation.
pub(crate) fn partial(param: &Parameter, sat: &SatData, phase: bool) -> f64 {
    match param.kind {
        ParameterKind::CoordX => sat.los[0],
        ParameterKind::CoordY => sat.los[1],
        ParameterKind::CoordZ => sat.los[2],
        ParameterKind::ReceiverClock => 1.0,
        ParameterKind::Troposphere => sat.mapping_wet,
        ParameterKind::SystemOffset(constellation) => {
            if sat.sv.constellation == constellation {
                1.0
            } else {
                0.0
            }
        },
        ParameterKind::Ambiguity(sv) => {
            if phase && sat.sv == sv {
                sat.wavelength_m().unwrap_or(0.0)
            } else {
                0.0
            }
        },
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::prelude::{Carrier, Observation, Vector3};
    use crate::cfg::Combination;

    #[test]
    fn partials() {
        let g05 = SV::new(Constellation::GPS, 5);
        let e11 = SV::new(Constellation::Galileo, 11);

        let mut sat = SatData::new(
            g05,
            vec![Observation::code_and_phase(Carrier::L1, 20.0E6, 20.0E6, None)],
        );
        sat.combine(Combination::SingleFrequency, None).unwrap();
        sat.los = Vector3::new(0.6, 0.0, 0.8);
        sat.mapping_wet = 1.5;

        let partial_of = |kind: ParameterKind, phase: bool| {
            partial(&Parameter::new(kind, 0.0, 0), &sat, phase)
        };

        assert_eq!(partial_of(ParameterKind::CoordX, false), 0.6);
        assert_eq!(partial_of(ParameterKind::CoordZ, true), 0.8);
        assert_eq!(partial_of(ParameterKind::ReceiverClock, false), 1.0);
        assert_eq!(partial_of(ParameterKind::Troposphere, true), 1.5);
        assert_eq!(partial_of(ParameterKind::SystemOffset(Constellation::Galileo), false), 0.0);
        assert_eq!(partial_of(ParameterKind::Ambiguity(g05), false), 0.0);
        assert_eq!(partial_of(ParameterKind::Ambiguity(e11), true), 0.0);
        assert_eq!(
            partial_of(ParameterKind::Ambiguity(g05), true),
            Carrier::L1.wavelength()
        );
    }

    #[test]
    fn removability() {
        assert!(!ParameterKind::CoordX.is_removable());
        assert!(!ParameterKind::ReceiverClock.is_removable());
        assert!(!ParameterKind::Troposphere.is_removable());
        assert!(!ParameterKind::SystemOffset(Constellation::Glonass).is_removable());
        assert!(ParameterKind::Ambiguity(SV::new(Constellation::GPS, 1)).is_removable());
    }
}
