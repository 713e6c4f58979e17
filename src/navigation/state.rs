//! State vector and covariance management
use log::debug;
use nalgebra::{DMatrix, DVector, Matrix3, Vector3};

use crate::navigation::parameter::{Parameter, ParameterKind};

/// Live [Parameter]s and their covariance matrix.
/// Every [Parameter] index matches its row (and column) in the covariance matrix.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateVector {
    params: Vec<Parameter>,
    covariance: DMatrix<f64>,
}

impl StateVector {
    /// Number of live parameters
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// True if no parameter is defined yet
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Live [Parameter]s, in covariance order
    pub fn parameters(&self) -> &[Parameter] {
        &self.params
    }

    /// Covariance matrix
    pub fn covariance(&self) -> &DMatrix<f64> {
        &self.covariance
    }

    /// [Parameter] of this kind, if it exists
    pub fn find(&self, kind: ParameterKind) -> Option<&Parameter> {
        self.params.iter().find(|p| p.kind == kind)
    }

    /// Current estimate of this [ParameterKind]
    pub fn value(&self, kind: ParameterKind) -> Option<f64> {
        self.find(kind).map(|p| p.value)
    }

    /// Current variance of this [ParameterKind]
    pub fn variance(&self, kind: ParameterKind) -> Option<f64> {
        self.find(kind)
            .map(|p| self.covariance[(p.index, p.index)])
    }

    /// Current standard deviation of this [ParameterKind]
    pub fn std_dev(&self, kind: ParameterKind) -> Option<f64> {
        self.variance(kind).map(|var| var.max(0.0).sqrt())
    }

    /// Receiver position (ECEF m)
    pub fn position_ecef_m(&self) -> Option<Vector3<f64>> {
        Some(Vector3::new(
            self.value(ParameterKind::CoordX)?,
            self.value(ParameterKind::CoordY)?,
            self.value(ParameterKind::CoordZ)?,
        ))
    }

    /// Position covariance (ECEF m²)
    pub fn position_covariance(&self) -> Option<Matrix3<f64>> {
        let x = self.find(ParameterKind::CoordX)?.index;
        Some(self.covariance.fixed_view::<3, 3>(x, x).into_owned())
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Parameter> {
        self.params.iter_mut()
    }

    /// Appends a new [Parameter], uncorrelated to existing ones.
    pub(crate) fn add(&mut self, kind: ParameterKind, value: f64, variance: f64) -> usize {
        assert!(
            self.find(kind).is_none(),
            "internal error: {} is already defined",
            kind
        );

        let index = self.params.len();
        self.covariance.resize_mut(index + 1, index + 1, 0.0);
        self.covariance[(index, index)] = variance;
        self.params.push(Parameter::new(kind, value, index));

        debug!("{} (#{}) added: {:.4} +/- {:.4}", kind, index, value, variance.sqrt());
        index
    }

    /// Removes this [Parameter], if it exists.
    /// Panics if this is a structural (non removable) parameter.
    pub(crate) fn remove(&mut self, kind: ParameterKind) -> Option<Parameter> {
        self.remove_where(|p| p.kind == kind).pop()
    }

    /// Removes all [Parameter]s matching `predicate` and compacts the covariance matrix.
    /// Panics if a structural (non removable) parameter matches.
    pub(crate) fn remove_where<F: Fn(&Parameter) -> bool>(&mut self, predicate: F) -> Vec<Parameter> {
        if let Some(param) = self
            .params
            .iter()
            .find(|p| predicate(p) && !p.kind.is_removable())
        {
            panic!(
                "fatal: attempt to remove structural parameter {}",
                param.kind
            );
        }

        if !self.params.iter().any(&predicate) {
            return Vec::new();
        }

        for param in self.params.iter_mut() {
            param.prev_index = Some(param.index);
        }

        let (removed, kept): (Vec<_>, Vec<_>) =
            std::mem::take(&mut self.params).into_iter().partition(|p| predicate(p));

        self.params = kept;
        self.remap();

        for param in removed.iter() {
            debug!("{} (#{}) removed", param.kind, param.index);
        }
        removed
    }

    /// Rebuilds the covariance matrix, from previous indexes.
    fn remap(&mut self) {
        let n = self.params.len();
        let prev = &self.covariance;

        let covariance = DMatrix::<f64>::from_fn(n, n, |i, j| {
            match (self.params[i].prev_index, self.params[j].prev_index) {
                (Some(prev_i), Some(prev_j)) => prev[(prev_i, prev_j)],
                _ => 0.0,
            }
        });

        self.covariance = covariance;

        for (index, param) in self.params.iter_mut().enumerate() {
            param.index = index;
        }
    }

    /// Injects process noise on this [Parameter]. When its variance would
    /// exceed `max_variance`, the parameter is decorrelated and reset to `max_variance`.
    pub(crate) fn add_process_noise(
        &mut self,
        kind: ParameterKind,
        variance: f64,
        max_variance: f64,
    ) {
        let Some(index) = self.find(kind).map(|p| p.index) else {
            return;
        };

        let updated = self.covariance[(index, index)] + variance;

        if updated > max_variance {
            self.decorrelate(index, max_variance);
        } else {
            self.covariance[(index, index)] = updated;
        }
    }

    /// Injects a full 3x3 process noise block on the coordinates
    pub(crate) fn add_position_process_noise(&mut self, q: &Matrix3<f64>) {
        let Some(x) = self.find(ParameterKind::CoordX).map(|p| p.index) else {
            return;
        };
        let mut block = self.covariance.fixed_view_mut::<3, 3>(x, x);
        block += q;
    }

    fn decorrelate(&mut self, index: usize, variance: f64) {
        self.covariance.row_mut(index).fill(0.0);
        self.covariance.column_mut(index).fill(0.0);
        self.covariance[(index, index)] = variance;
    }

    /// Applies a measurement update: state correction and new covariance.
    pub(crate) fn apply(&mut self, dx: &DVector<f64>, covariance: DMatrix<f64>) {
        assert_eq!(dx.len(), self.params.len(), "internal error: invalid correction");
        assert_eq!(
            covariance.nrows(),
            self.params.len(),
            "internal error: invalid covariance"
        );

        for param in self.params.iter_mut() {
            param.value += dx[param.index];
        }
        self.covariance = covariance;
    }

    /// True when all dimensions and indexes are consistent
    pub fn is_consistent(&self) -> bool {
        let n = self.params.len();
        self.covariance.nrows() == n
            && self.covariance.ncols() == n
            && self.params.iter().enumerate().all(|(i, p)| p.index == i)
    }

    /// True when covariance is symmetric, within tolerance
    pub fn is_symmetric(&self, tolerance: f64) -> bool {
        let n = self.covariance.nrows();
        (0..n).all(|i| {
            (0..i).all(|j| (self.covariance[(i, j)] - self.covariance[(j, i)]).abs() <= tolerance)
        })
    }
}
