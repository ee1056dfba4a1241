//! The uniform contract every constraint and cost fulfills, plus the
//! shared machinery they are built from: sample-time grids, the explicit
//! cache for iteration-invariant Jacobian blocks, and the row layout that
//! keeps residual, bounds, and Jacobian assembly index-aligned.
//!
//! The external solver drives a strict per-iteration sequence against
//! every instance: `update_variables`, then `evaluate`, then `bounds`,
//! then one `jacobian_wrt` per coupled variable set. Everything after the
//! update is a pure function of the constraint's private snapshot.

pub mod contact_load;
pub mod convexity;
pub mod polygon_center;
pub mod range_of_motion;
pub mod spline_equality;
pub mod support_area;

pub use contact_load::ContactLoadConstraint;
pub use convexity::ConvexityConstraint;
pub use polygon_center::PolygonCenterConstraint;
pub use range_of_motion::RangeOfMotionBox;
pub use spline_equality::SplineEqualityConstraint;
pub use support_area::SupportAreaConstraint;

use nalgebra::DVector;

use crate::error::FormulationError;
use crate::math::Jacobian;
use crate::variables::{Bound, VariableRegistry};

/// One block of residual rows contributed to the optimization problem.
///
/// Implementations are stateless across iterations except for explicitly
/// cached, provably-constant Jacobian blocks (see [`Cached`]).
pub trait Constraint {
    fn name(&self) -> &'static str;

    /// Pulls current values for every variable set this constraint
    /// depends on into its private snapshot. This is the only point where
    /// external state enters.
    fn update_variables(&mut self, registry: &VariableRegistry) -> Result<(), FormulationError>;

    /// Residual vector, computed purely from the current snapshot.
    fn evaluate(&self) -> DVector<f64>;

    /// One bound per residual row.
    fn bounds(&self) -> Vec<Bound>;

    /// Partial derivatives of the residual with respect to one variable
    /// set; the empty block when this constraint does not couple to it.
    fn jacobian_wrt(&self, set_id: &str) -> Jacobian;
}

/// A scalar cost term with per-variable-set gradients.
pub trait Cost {
    fn name(&self) -> &'static str;

    fn update_variables(&mut self, registry: &VariableRegistry) -> Result<(), FormulationError>;

    fn value(&self) -> f64;

    /// Gradient with respect to one variable set; empty when uncoupled.
    fn gradient_wrt(&self, set_id: &str) -> DVector<f64>;
}

/// Sample instants `0, dt, 2dt, ...` up to the last multiple of `dt`
/// strictly below `total_time`. The terminal time never appears, not even
/// when it is an exact multiple of `dt`.
///
/// The small nudge before rounding keeps `total_time / dt` from gaining
/// or losing a grid point to floating-point roundoff at exact multiples.
pub fn sample_times(total_time: f64, dt: f64) -> Vec<f64> {
    debug_assert!(dt > 0.0);
    let n_samples = ((total_time / dt) - 1e-9).ceil().max(1.0) as usize;
    (0..n_samples).map(|i| i as f64 * dt).collect()
}

/// [`sample_times`] with `total_time` appended once more, so the terminal
/// configuration is sampled as well.
pub fn sample_times_with_terminal(total_time: f64, dt: f64) -> Vec<f64> {
    let mut times = sample_times(total_time, dt);
    times.push(total_time);
    times
}

/// Explicit two-state lifecycle for an iteration-invariant Jacobian
/// block: computed once at construction, handed out unchanged every
/// iteration, and cleared only when the coupling *structure* changes
/// (e.g. which contacts are active), never on mere value updates.
#[derive(Debug, Clone, Default)]
pub enum Cached<T> {
    #[default]
    Uninitialized,
    Cached(T),
}

impl<T> Cached<T> {
    pub fn cached(value: T) -> Self {
        Self::Cached(value)
    }

    pub fn get(&self) -> Option<&T> {
        match self {
            Self::Uninitialized => None,
            Self::Cached(value) => Some(value),
        }
    }

    pub fn is_cached(&self) -> bool {
        matches!(self, Self::Cached(_))
    }

    pub fn invalidate(&mut self) {
        *self = Self::Uninitialized;
    }
}

/// Row bookkeeping for constraints that emit a group of rows per
/// (sample time, entry) pair. Residual, bounds, and every Jacobian block
/// of a constraint go through the same layout, so the three can never
/// drift out of alignment.
#[derive(Debug, Clone)]
pub struct RowLayout {
    offsets: Vec<usize>,
    rows_per_entry: usize,
    n_rows: usize,
}

impl RowLayout {
    /// `counts[k]` is the number of entries at sample `k`; each entry
    /// spans `rows_per_entry` consecutive rows.
    pub fn from_counts(counts: &[usize], rows_per_entry: usize) -> Self {
        let mut offsets = Vec::with_capacity(counts.len());
        let mut n_rows = 0;
        for &count in counts {
            offsets.push(n_rows);
            n_rows += count * rows_per_entry;
        }
        Self {
            offsets,
            rows_per_entry,
            n_rows,
        }
    }

    pub fn row(&self, sample: usize, entry: usize, dim: usize) -> usize {
        self.offsets[sample] + entry * self.rows_per_entry + dim
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }
}

/// The closed set of constraints this layer can produce. The factory
/// selects variants by name; the solver treats them uniformly through the
/// [`Constraint`] impl below.
#[derive(Debug, Clone)]
pub enum ConstraintVariant {
    SupportArea(SupportAreaConstraint),
    Convexity(ConvexityConstraint),
    ContactLoad(ContactLoadConstraint),
    RangeOfMotion(RangeOfMotionBox),
    PolygonCenter(PolygonCenterConstraint),
    SplineEquality(SplineEqualityConstraint),
}

impl Constraint for ConstraintVariant {
    fn name(&self) -> &'static str {
        match self {
            Self::SupportArea(c) => c.name(),
            Self::Convexity(c) => c.name(),
            Self::ContactLoad(c) => c.name(),
            Self::RangeOfMotion(c) => c.name(),
            Self::PolygonCenter(c) => c.name(),
            Self::SplineEquality(c) => c.name(),
        }
    }

    fn update_variables(&mut self, registry: &VariableRegistry) -> Result<(), FormulationError> {
        match self {
            Self::SupportArea(c) => c.update_variables(registry),
            Self::Convexity(c) => c.update_variables(registry),
            Self::ContactLoad(c) => c.update_variables(registry),
            Self::RangeOfMotion(c) => c.update_variables(registry),
            Self::PolygonCenter(c) => c.update_variables(registry),
            Self::SplineEquality(c) => c.update_variables(registry),
        }
    }

    fn evaluate(&self) -> DVector<f64> {
        match self {
            Self::SupportArea(c) => c.evaluate(),
            Self::Convexity(c) => c.evaluate(),
            Self::ContactLoad(c) => c.evaluate(),
            Self::RangeOfMotion(c) => c.evaluate(),
            Self::PolygonCenter(c) => c.evaluate(),
            Self::SplineEquality(c) => c.evaluate(),
        }
    }

    fn bounds(&self) -> Vec<Bound> {
        match self {
            Self::SupportArea(c) => c.bounds(),
            Self::Convexity(c) => c.bounds(),
            Self::ContactLoad(c) => c.bounds(),
            Self::RangeOfMotion(c) => c.bounds(),
            Self::PolygonCenter(c) => c.bounds(),
            Self::SplineEquality(c) => c.bounds(),
        }
    }

    fn jacobian_wrt(&self, set_id: &str) -> Jacobian {
        match self {
            Self::SupportArea(c) => c.jacobian_wrt(set_id),
            Self::Convexity(c) => c.jacobian_wrt(set_id),
            Self::ContactLoad(c) => c.jacobian_wrt(set_id),
            Self::RangeOfMotion(c) => c.jacobian_wrt(set_id),
            Self::PolygonCenter(c) => c.jacobian_wrt(set_id),
            Self::SplineEquality(c) => c.jacobian_wrt(set_id),
        }
    }
}
