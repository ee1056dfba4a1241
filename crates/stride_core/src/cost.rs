//! Cost terms: the quadratic spline cost produced by the equation
//! builder, and the adapter that relaxes any hard constraint into a
//! penalty.

use nalgebra::DVector;

use crate::constraint::{Constraint, ConstraintVariant, Cost};
use crate::error::FormulationError;
use crate::math::MatVec;
use crate::motion::ComSpline;
use crate::variables::VariableRegistry;

/// `value = x^T M x + v^T x` over the CoM spline coefficients.
#[derive(Debug, Clone)]
pub struct QuadraticSplineCost {
    motion: ComSpline,
    term: MatVec,
}

impl QuadraticSplineCost {
    pub fn new(motion: ComSpline, term: MatVec) -> Result<Self, FormulationError> {
        if term.rows() != motion.n_coeffs() || term.cols() != motion.n_coeffs() {
            return Err(FormulationError::StructuralMismatch {
                left: term.cols(),
                right: motion.n_coeffs(),
            });
        }
        Ok(Self { motion, term })
    }
}

impl Cost for QuadraticSplineCost {
    fn name(&self) -> &'static str {
        "com motion cost"
    }

    fn update_variables(&mut self, registry: &VariableRegistry) -> Result<(), FormulationError> {
        let coeffs = registry.values(self.motion.id())?.clone();
        self.motion.set_params(coeffs)
    }

    fn value(&self) -> f64 {
        let x = self.motion.params();
        (x.transpose() * &self.term.m * &x)[0] + self.term.v.dot(&x)
    }

    fn gradient_wrt(&self, set_id: &str) -> DVector<f64> {
        if set_id != self.motion.id() {
            return DVector::zeros(0);
        }
        let x = self.motion.params();
        (&self.term.m + self.term.m.transpose()) * x + &self.term.v
    }
}

/// Relaxes a hard constraint into `0.5 * ||g(x) - b||^2`, with `b` the
/// midpoint of each row's bounds — exact for the equality bounds this is
/// used with, the interval center otherwise. Gradients flow through the
/// wrapped constraint's own Jacobian blocks, so the penalty couples to
/// exactly the variable sets the constraint does.
#[derive(Debug, Clone)]
pub struct SoftConstraint {
    constraint: ConstraintVariant,
}

impl SoftConstraint {
    pub fn new(constraint: ConstraintVariant) -> Self {
        Self { constraint }
    }

    fn violation(&self) -> DVector<f64> {
        let g = self.constraint.evaluate();
        let bounds = self.constraint.bounds();
        let mut diff = g;
        for (row, bound) in bounds.iter().enumerate() {
            diff[row] -= 0.5 * (bound.lower + bound.upper);
        }
        diff
    }
}

impl Cost for SoftConstraint {
    fn name(&self) -> &'static str {
        self.constraint.name()
    }

    fn update_variables(&mut self, registry: &VariableRegistry) -> Result<(), FormulationError> {
        self.constraint.update_variables(registry)
    }

    fn value(&self) -> f64 {
        let diff = self.violation();
        0.5 * diff.dot(&diff)
    }

    fn gradient_wrt(&self, set_id: &str) -> DVector<f64> {
        let jac = self.constraint.jacobian_wrt(set_id);
        if jac.ncols() == 0 && jac.nrows() == 0 {
            return DVector::zeros(0);
        }

        let diff = self.violation();
        let mut grad = DVector::zeros(jac.ncols());
        for (row, col, value) in jac.triplet_iter() {
            grad[col] += value * diff[row];
        }
        grad
    }
}

/// The closed set of cost terms the factory can produce.
#[derive(Debug, Clone)]
pub enum CostVariant {
    QuadraticSpline(QuadraticSplineCost),
    Soft(SoftConstraint),
}

impl Cost for CostVariant {
    fn name(&self) -> &'static str {
        match self {
            Self::QuadraticSpline(c) => c.name(),
            Self::Soft(c) => c.name(),
        }
    }

    fn update_variables(&mut self, registry: &VariableRegistry) -> Result<(), FormulationError> {
        match self {
            Self::QuadraticSpline(c) => c.update_variables(registry),
            Self::Soft(c) => c.update_variables(registry),
        }
    }

    fn value(&self) -> f64 {
        match self {
            Self::QuadraticSpline(c) => c.value(),
            Self::Soft(c) => c.value(),
        }
    }

    fn gradient_wrt(&self, set_id: &str) -> DVector<f64> {
        match self {
            Self::QuadraticSpline(c) => c.gradient_wrt(set_id),
            Self::Soft(c) => c.gradient_wrt(set_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraint::ConvexityConstraint;
    use crate::contacts::ContactSchedule;
    use crate::load::{LoadDistribution, LOAD_ID};
    use crate::motion::COM_MOTION_ID;
    use crate::spline_equations::LinearSplineEquations;
    use crate::variables::VariableSet;
    use approx::assert_relative_eq;
    use nalgebra::{DVector, Vector2};

    fn quadratic_cost() -> QuadraticSplineCost {
        let motion = ComSpline::new(vec![1.0]);
        let term = MatVec {
            m: LinearSplineEquations::new(&motion).acceleration_cost([1.0, 1.0]),
            v: DVector::zeros(motion.n_coeffs()),
        };
        QuadraticSplineCost::new(motion, term).expect("dimensions match")
    }

    #[test]
    fn quadratic_cost_value_matches_integral() {
        let mut cost = quadratic_cost();

        let mut registry = VariableRegistry::new();
        let mut coeffs = DVector::zeros(8);
        coeffs[2] = 1.0; // x: t^2
        coeffs[3] = 1.0; // x: t^3
        registry
            .add(VariableSet::new(coeffs, COM_MOTION_ID))
            .expect("registration succeeds");
        cost.update_variables(&registry).expect("update succeeds");

        assert_relative_eq!(cost.value(), 28.0, epsilon = 1e-12);
    }

    #[test]
    fn quadratic_cost_gradient_matches_finite_differences() {
        let mut cost = quadratic_cost();

        let coeffs: DVector<f64> =
            DVector::from_iterator(8, (0..8).map(|i| 0.1 * i as f64 - 0.3));
        let mut registry = VariableRegistry::new();
        registry
            .add(VariableSet::new(coeffs.clone(), COM_MOTION_ID))
            .expect("registration succeeds");
        cost.update_variables(&registry).expect("update succeeds");

        let grad = cost.gradient_wrt(COM_MOTION_ID);
        assert_eq!(grad.len(), 8);

        let h = 1e-6;
        for i in 0..8 {
            let mut plus = coeffs.clone();
            plus[i] += h;
            registry
                .set_values(COM_MOTION_ID, plus)
                .expect("update succeeds");
            cost.update_variables(&registry).expect("update succeeds");
            let f_plus = cost.value();

            let mut minus = coeffs.clone();
            minus[i] -= h;
            registry
                .set_values(COM_MOTION_ID, minus)
                .expect("update succeeds");
            cost.update_variables(&registry).expect("update succeeds");
            let f_minus = cost.value();

            let fd = (f_plus - f_minus) / (2.0 * h);
            assert_relative_eq!(grad[i], fd, epsilon = 1e-5);
        }
    }

    #[test]
    fn quadratic_cost_rejects_mismatched_term() {
        let motion = ComSpline::new(vec![1.0]);
        let term = MatVec::zeros(4, 4);
        let err = QuadraticSplineCost::new(motion, term).expect_err("expected mismatch");
        assert!(matches!(err, FormulationError::StructuralMismatch { .. }));
    }

    fn soft_convexity() -> (SoftConstraint, VariableRegistry) {
        let mut schedule = ContactSchedule::new();
        let a = schedule.add_pinned_foothold(0, Vector2::new(0.0, 0.1));
        let b = schedule.add_free_foothold(1, Vector2::new(0.0, -0.1));
        schedule.add_phase(1.0, &[a, b]);
        let load = LoadDistribution::discretize(&schedule, 1.0);

        let soft = SoftConstraint::new(ConstraintVariant::Convexity(
            ConvexityConstraint::new(load),
        ));

        let mut registry = VariableRegistry::new();
        registry
            .add(VariableSet::new(
                DVector::from_vec(vec![0.5, 0.5]),
                LOAD_ID,
            ))
            .expect("registration succeeds");
        (soft, registry)
    }

    #[test]
    fn soft_constraint_is_zero_when_satisfied() {
        let (mut soft, registry) = soft_convexity();
        soft.update_variables(&registry).expect("update succeeds");
        assert_relative_eq!(soft.value(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn soft_constraint_penalizes_violation_quadratically() {
        let (mut soft, mut registry) = soft_convexity();
        registry
            .set_values(LOAD_ID, DVector::from_vec(vec![0.8, 0.5]))
            .expect("update succeeds");
        soft.update_variables(&registry).expect("update succeeds");

        // Sum is 1.3, target 1.0: value = 0.5 * 0.3^2.
        assert_relative_eq!(soft.value(), 0.045, epsilon = 1e-12);

        let grad = soft.gradient_wrt(LOAD_ID);
        assert_eq!(grad.len(), 2);
        assert_relative_eq!(grad[0], 0.3, epsilon = 1e-12);
        assert_relative_eq!(grad[1], 0.3, epsilon = 1e-12);
    }

    #[test]
    fn soft_constraint_uncoupled_gradient_is_empty() {
        let (soft, _) = soft_convexity();
        assert_eq!(soft.gradient_wrt("com-motion").len(), 0);
    }
}
