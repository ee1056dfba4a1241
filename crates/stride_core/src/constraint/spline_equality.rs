//! Equality constraint over the CoM spline coefficients, wrapping an
//! affine block from the equation builder: `Mx + v == 0` row by row.

use nalgebra::DVector;

use crate::constraint::{Cached, Constraint};
use crate::error::FormulationError;
use crate::math::{empty_jacobian, Jacobian, MatVec};
use crate::motion::ComSpline;
use crate::variables::{Bound, VariableRegistry};

/// Adapter turning boundary or continuity equations into the constraint
/// contract. `M` is constant, so its sparse view is cached up front.
#[derive(Debug, Clone)]
pub struct SplineEqualityConstraint {
    name: &'static str,
    motion: ComSpline,
    equation: MatVec,
    jac_motion: Cached<Jacobian>,
}

impl SplineEqualityConstraint {
    pub fn new(
        name: &'static str,
        motion: ComSpline,
        equation: MatVec,
    ) -> Result<Self, FormulationError> {
        if equation.cols() != motion.n_coeffs() {
            return Err(FormulationError::StructuralMismatch {
                left: equation.cols(),
                right: motion.n_coeffs(),
            });
        }
        let jac_motion = Cached::cached(equation.to_sparse());
        Ok(Self {
            name,
            motion,
            equation,
            jac_motion,
        })
    }
}

impl Constraint for SplineEqualityConstraint {
    fn name(&self) -> &'static str {
        self.name
    }

    fn update_variables(&mut self, registry: &VariableRegistry) -> Result<(), FormulationError> {
        let coeffs = registry.values(self.motion.id())?.clone();
        self.motion.set_params(coeffs)
    }

    fn evaluate(&self) -> DVector<f64> {
        &self.equation.m * self.motion.params() + &self.equation.v
    }

    fn bounds(&self) -> Vec<Bound> {
        vec![Bound::equality(0.0); self.equation.rows()]
    }

    fn jacobian_wrt(&self, set_id: &str) -> Jacobian {
        if set_id == self.motion.id() {
            self.jac_motion.get().cloned().unwrap_or_else(empty_jacobian)
        } else {
            empty_jacobian()
        }
    }
}
