//! Decision variables: bounds, named variable sets, and the registry the
//! solver reads and writes between iterations.

use nalgebra::DVector;
use serde::{Deserialize, Serialize};

use crate::error::FormulationError;

/// Lower/upper pair for one scalar or one residual row. Equality is
/// encoded as `lower == upper`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bound {
    pub lower: f64,
    pub upper: f64,
}

impl Bound {
    pub fn new(lower: f64, upper: f64) -> Self {
        debug_assert!(lower <= upper, "bound must satisfy lower <= upper");
        Self { lower, upper }
    }

    /// The unbounded interval, the default for fresh variable sets.
    pub fn unbounded() -> Self {
        Self {
            lower: f64::NEG_INFINITY,
            upper: f64::INFINITY,
        }
    }

    /// An equality bound pinning the row to `value`.
    pub fn equality(value: f64) -> Self {
        Self {
            lower: value,
            upper: value,
        }
    }

    /// Shifts both endpoints by `offset`.
    pub fn shifted(self, offset: f64) -> Self {
        Self {
            lower: self.lower + offset,
            upper: self.upper + offset,
        }
    }

    pub fn contains(&self, value: f64) -> bool {
        self.lower <= value && value <= self.upper
    }
}

/// A named block of decision variables with one bound per scalar.
#[derive(Debug, Clone)]
pub struct VariableSet {
    id: String,
    values: DVector<f64>,
    bounds: Vec<Bound>,
}

impl VariableSet {
    /// Builds a set with default (unbounded) bounds on every scalar.
    pub fn new(values: DVector<f64>, id: impl Into<String>) -> Self {
        let bounds = vec![Bound::unbounded(); values.len()];
        Self {
            id: id.into(),
            values,
            bounds,
        }
    }

    /// Builds a set with explicit per-scalar bounds.
    pub fn with_bounds(
        values: DVector<f64>,
        id: impl Into<String>,
        bounds: Vec<Bound>,
    ) -> Result<Self, FormulationError> {
        let id = id.into();
        if values.len() != bounds.len() {
            return Err(FormulationError::BoundCountMismatch {
                id,
                values: values.len(),
                bounds: bounds.len(),
            });
        }
        Ok(Self { id, values, bounds })
    }

    /// Builds a set with the same bound on every scalar.
    pub fn with_uniform_bound(
        values: DVector<f64>,
        id: impl Into<String>,
        bound: Bound,
    ) -> Self {
        let bounds = vec![bound; values.len()];
        Self {
            id: id.into(),
            values,
            bounds,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.len() == 0
    }

    pub fn values(&self) -> &DVector<f64> {
        &self.values
    }

    pub fn bounds(&self) -> &[Bound] {
        &self.bounds
    }

    pub fn set_values(&mut self, values: DVector<f64>) -> Result<(), FormulationError> {
        if values.len() != self.values.len() {
            return Err(FormulationError::ParameterCountMismatch {
                subsystem: "variable set",
                expected: self.values.len(),
                got: values.len(),
            });
        }
        self.values = values;
        Ok(())
    }
}

/// Owns every variable set of the problem. The solver writes updated
/// iterates here; constraints read from it exactly once per iteration
/// through their `update_variables` call.
#[derive(Debug, Clone, Default)]
pub struct VariableRegistry {
    sets: Vec<VariableSet>,
}

impl VariableRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, set: VariableSet) -> Result<(), FormulationError> {
        if self.sets.iter().any(|s| s.id() == set.id()) {
            return Err(FormulationError::DuplicateVariableSet(set.id().to_owned()));
        }
        self.sets.push(set);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Result<&VariableSet, FormulationError> {
        self.sets
            .iter()
            .find(|s| s.id() == id)
            .ok_or_else(|| FormulationError::UnknownVariableSet(id.to_owned()))
    }

    /// Current values of one set, the read-only view constraints use.
    pub fn values(&self, id: &str) -> Result<&DVector<f64>, FormulationError> {
        Ok(self.get(id)?.values())
    }

    pub fn set_values(&mut self, id: &str, values: DVector<f64>) -> Result<(), FormulationError> {
        let set = self
            .sets
            .iter_mut()
            .find(|s| s.id() == id)
            .ok_or_else(|| FormulationError::UnknownVariableSet(id.to_owned()))?;
        set.set_values(values)
    }

    pub fn sets(&self) -> &[VariableSet] {
        &self.sets
    }

    /// Total scalar count across all sets.
    pub fn total_len(&self) -> usize {
        self.sets.iter().map(|s| s.len()).sum()
    }
}
