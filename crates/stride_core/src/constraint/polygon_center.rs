//! Polygon center: quadratic deviation of each phase's load distribution
//! from the equal split, i.e. from the center of the support polygon.
//! Used through the soft-cost adapter to bias the optimizer toward
//! well-centered load, not as a hard constraint.

use nalgebra::DVector;
use nalgebra_sparse::CooMatrix;

use crate::constraint::Constraint;
use crate::error::FormulationError;
use crate::load::LoadDistribution;
use crate::math::{empty_jacobian, Jacobian};
use crate::variables::{Bound, VariableRegistry};

/// One row per load phase: `sum over active contacts of (lambda - 1/m)^2`
/// with `m` the number of contacts active in that phase.
#[derive(Debug, Clone)]
pub struct PolygonCenterConstraint {
    load: LoadDistribution,
}

impl PolygonCenterConstraint {
    pub fn new(load: LoadDistribution) -> Self {
        Self { load }
    }
}

impl Constraint for PolygonCenterConstraint {
    fn name(&self) -> &'static str {
        "polygon center"
    }

    fn update_variables(&mut self, registry: &VariableRegistry) -> Result<(), FormulationError> {
        let lambdas = registry.values(self.load.id())?.clone();
        self.load.set_params(lambdas)
    }

    fn evaluate(&self) -> DVector<f64> {
        let mut g = DVector::zeros(self.load.n_phases());
        for k in 0..self.load.n_phases() {
            let ees = self.load.ees_at_phase(k);
            let center = 1.0 / ees.len() as f64;
            g[k] = ees
                .iter()
                .map(|&ee| {
                    let dev = self.load.lambda(k, ee) - center;
                    dev * dev
                })
                .sum();
        }
        g
    }

    fn bounds(&self) -> Vec<Bound> {
        vec![Bound::equality(0.0); self.load.n_phases()]
    }

    fn jacobian_wrt(&self, set_id: &str) -> Jacobian {
        if set_id != self.load.id() {
            return empty_jacobian();
        }

        // Quadratic in lambda, so the block depends on the iterate and is
        // rebuilt every call.
        let mut jac = CooMatrix::new(self.load.n_phases(), self.load.n_params());
        for k in 0..self.load.n_phases() {
            let ees = self.load.ees_at_phase(k);
            let center = 1.0 / ees.len() as f64;
            for &ee in ees {
                if let Some(col) = self.load.col_of(k, ee) {
                    jac.push(k, col, 2.0 * (self.load.lambda(k, ee) - center));
                }
            }
        }
        jac
    }
}
