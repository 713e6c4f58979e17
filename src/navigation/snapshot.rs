//! Rollback snapshot
use crate::{navigation::state::StateVector, observation::EpochData, prelude::Epoch};

/// Deep copy of everything an epoch update may modify.
/// Nothing is shared with the live filter.
#[derive(Debug, Clone)]
pub(crate) struct Snapshot {
    state: StateVector,
    epoch: EpochData,
    time: Option<Epoch>,
}

impl Snapshot {
    /// Remembers current state
    pub fn new(state: &StateVector, epoch: &EpochData, time: Option<Epoch>) -> Self {
        Self {
            state: state.clone(),
            epoch: epoch.clone(),
            time,
        }
    }

    /// Restores remembered state, discarding all pending modifications.
    /// The snapshot remains valid and may be restored again.
    pub fn restore(
        &self,
        state: &mut StateVector,
        epoch: &mut EpochData,
        time: &mut Option<Epoch>,
    ) {
        state.clone_from(&self.state);
        epoch.clone_from(&self.epoch);
        *time = self.time;
    }
}

#[cfg(test)]
mod test {
    use super::Snapshot;
    use crate::{
        navigation::{parameter::ParameterKind, state::StateVector},
        observation::{EpochData, SatData},
        prelude::{Constellation, Duration, Epoch, SV},
    };

    #[test]
    fn restore() {
        let t0 = Epoch::default();
        let g01 = SV::new(Constellation::GPS, 1);

        let mut state = StateVector::default();
        state.add(ParameterKind::ReceiverClock, 10.0, 1.0);
        let mut epoch = EpochData::new(t0).with_sat_data(SatData::new(g01, vec![]));
        let mut time = Some(t0);

        let snapshot = Snapshot::new(&state, &epoch, time);

        state.add(ParameterKind::Ambiguity(g01), 1.0, 1.0);
        epoch.remove(&g01);
        time = Some(t0 + Duration::from_seconds(1.0));

        snapshot.restore(&mut state, &mut epoch, &mut time);
        assert_eq!(state.len(), 1);
        assert_eq!(state.value(ParameterKind::ReceiverClock), Some(10.0));
        assert_eq!(epoch.len(), 1);
        assert_eq!(time, Some(t0));

        // restoring twice is harmless
        state.add(ParameterKind::Troposphere, 0.0, 1.0);
        snapshot.restore(&mut state, &mut epoch, &mut time);
        assert_eq!(state.len(), 1);
    }
}
