//! Contact load: boxes every load fraction into `[0, 1]`. Together with
//! the convexity rows this keeps each phase's distribution a physical
//! split of the carried weight.

use nalgebra::DVector;
use nalgebra_sparse::CooMatrix;

use crate::constraint::{Cached, Constraint};
use crate::error::FormulationError;
use crate::load::LoadDistribution;
use crate::math::{empty_jacobian, Jacobian};
use crate::variables::{Bound, VariableRegistry};

/// Identity residual over the lambda vector with `[0, 1]` bounds.
#[derive(Debug, Clone)]
pub struct ContactLoadConstraint {
    load: LoadDistribution,
    jac_load: Cached<Jacobian>,
}

impl ContactLoadConstraint {
    pub fn new(load: LoadDistribution) -> Self {
        let jac_load = Cached::cached(Self::build_identity(&load));
        Self { load, jac_load }
    }

    fn build_identity(load: &LoadDistribution) -> Jacobian {
        let n = load.n_params();
        let mut jac = CooMatrix::new(n, n);
        for i in 0..n {
            jac.push(i, i, 1.0);
        }
        jac
    }

    /// Rebuilds the cached identity after a structural change to the load
    /// discretization.
    pub fn refresh_structure(&mut self) {
        self.jac_load.invalidate();
        self.jac_load = Cached::cached(Self::build_identity(&self.load));
    }
}

impl Constraint for ContactLoadConstraint {
    fn name(&self) -> &'static str {
        "contact load"
    }

    fn update_variables(&mut self, registry: &VariableRegistry) -> Result<(), FormulationError> {
        let lambdas = registry.values(self.load.id())?.clone();
        self.load.set_params(lambdas)
    }

    fn evaluate(&self) -> DVector<f64> {
        self.load.params()
    }

    fn bounds(&self) -> Vec<Bound> {
        vec![Bound::new(0.0, 1.0); self.load.n_params()]
    }

    fn jacobian_wrt(&self, set_id: &str) -> Jacobian {
        if set_id == self.load.id() {
            self.jac_load.get().cloned().unwrap_or_else(empty_jacobian)
        } else {
            empty_jacobian()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contacts::ContactSchedule;
    use crate::load::LOAD_ID;
    use crate::math::jacobian_to_dense;
    use crate::variables::VariableSet;
    use nalgebra::{DMatrix, Vector2};

    fn load() -> LoadDistribution {
        let mut schedule = ContactSchedule::new();
        let a = schedule.add_pinned_foothold(0, Vector2::new(0.0, 0.1));
        let b = schedule.add_free_foothold(1, Vector2::new(0.0, -0.1));
        schedule.add_phase(1.0, &[a, b]);
        LoadDistribution::discretize(&schedule, 0.5)
    }

    #[test]
    fn residual_mirrors_lambda_vector() {
        let mut constraint = ContactLoadConstraint::new(load());

        let mut registry = VariableRegistry::new();
        let lambdas = DVector::from_vec(vec![0.9, 0.1, 0.4, 0.6]);
        registry
            .add(VariableSet::new(lambdas.clone(), LOAD_ID))
            .expect("registration succeeds");
        constraint
            .update_variables(&registry)
            .expect("update succeeds");

        assert_eq!(constraint.evaluate(), lambdas);
    }

    #[test]
    fn bounds_box_each_fraction() {
        let constraint = ContactLoadConstraint::new(load());
        let bounds = constraint.bounds();
        assert_eq!(bounds.len(), 4);
        assert!(bounds.iter().all(|b| b.lower == 0.0 && b.upper == 1.0));
    }

    #[test]
    fn jacobian_is_identity_for_load_only() {
        let constraint = ContactLoadConstraint::new(load());

        let dense = jacobian_to_dense(&constraint.jacobian_wrt(LOAD_ID));
        assert_eq!(dense, DMatrix::identity(4, 4));

        assert_eq!(constraint.jacobian_wrt("footholds").nrows(), 0);
    }
}
