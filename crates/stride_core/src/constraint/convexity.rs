//! Load convexity: the fractions carried by the contacts of one load
//! phase must form a valid convex combination, i.e. sum to exactly one.

use nalgebra::DVector;
use nalgebra_sparse::CooMatrix;

use crate::constraint::{Cached, Constraint};
use crate::error::FormulationError;
use crate::load::LoadDistribution;
use crate::math::{empty_jacobian, Jacobian};
use crate::variables::{Bound, VariableRegistry};

/// One row per load phase, `sum of active lambdas == 1`.
///
/// The relation is linear with fixed structure, so the 0/1 selection
/// Jacobian is built once at construction and reused unchanged.
#[derive(Debug, Clone)]
pub struct ConvexityConstraint {
    load: LoadDistribution,
    jac_load: Cached<Jacobian>,
}

impl ConvexityConstraint {
    pub fn new(load: LoadDistribution) -> Self {
        let jac_load = Cached::cached(Self::build_selection(&load));
        Self { load, jac_load }
    }

    fn build_selection(load: &LoadDistribution) -> Jacobian {
        let mut jac = CooMatrix::new(load.n_phases(), load.n_params());
        for k in 0..load.n_phases() {
            for &ee in load.ees_at_phase(k) {
                if let Some(col) = load.col_of(k, ee) {
                    jac.push(k, col, 1.0);
                }
            }
        }
        jac
    }

    /// Rebuilds the cached selection matrix after a structural change to
    /// the load discretization.
    pub fn refresh_structure(&mut self) {
        self.jac_load.invalidate();
        self.jac_load = Cached::cached(Self::build_selection(&self.load));
    }
}

impl Constraint for ConvexityConstraint {
    fn name(&self) -> &'static str {
        "load convexity"
    }

    fn update_variables(&mut self, registry: &VariableRegistry) -> Result<(), FormulationError> {
        let lambdas = registry.values(self.load.id())?.clone();
        self.load.set_params(lambdas)
    }

    fn evaluate(&self) -> DVector<f64> {
        let mut g = DVector::zeros(self.load.n_phases());
        for k in 0..self.load.n_phases() {
            g[k] = self
                .load
                .ees_at_phase(k)
                .iter()
                .map(|&ee| self.load.lambda(k, ee))
                .sum();
        }
        g
    }

    fn bounds(&self) -> Vec<Bound> {
        vec![Bound::equality(1.0); self.load.n_phases()]
    }

    fn jacobian_wrt(&self, set_id: &str) -> Jacobian {
        if set_id == self.load.id() {
            self.jac_load.get().cloned().unwrap_or_else(empty_jacobian)
        } else {
            empty_jacobian()
        }
    }
}
