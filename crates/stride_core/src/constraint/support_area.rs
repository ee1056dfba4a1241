//! Support-area / pressure consistency: at every sampled time the
//! pressure reference point must coincide with the load-weighted centroid
//! of the active contacts. This is the coupling between stance geometry,
//! load distribution, and the pressure reference.

use nalgebra::DVector;
use nalgebra_sparse::CooMatrix;
use tracing::trace;

use crate::constraint::{sample_times, Constraint, RowLayout};
use crate::contacts::ContactSchedule;
use crate::error::FormulationError;
use crate::load::LoadDistribution;
use crate::math::{empty_jacobian, Jacobian, DIM2};
use crate::pressure::PressurePoint;
use crate::variables::{Bound, VariableRegistry};

/// Two rows (x, y) per sampled time:
/// `sum of lambda_ee * p_ee - pressure point == 0`.
///
/// The grid deliberately stops before the total duration; the terminal
/// stance is not sampled here, unlike the range-of-motion constraint.
#[derive(Debug, Clone)]
pub struct SupportAreaConstraint {
    contacts: ContactSchedule,
    load: LoadDistribution,
    pressure: PressurePoint,
    times: Vec<f64>,
    layout: RowLayout,
}

impl SupportAreaConstraint {
    pub fn new(
        contacts: ContactSchedule,
        load: LoadDistribution,
        pressure: PressurePoint,
        dt: f64,
    ) -> Self {
        let times = sample_times(contacts.total_time(), dt);
        let layout = RowLayout::from_counts(&vec![1; times.len()], DIM2);
        trace!(samples = times.len(), "support-area grid");
        Self {
            contacts,
            load,
            pressure,
            times,
            layout,
        }
    }

    fn jacobian_wrt_load(&self) -> Jacobian {
        let mut jac = CooMatrix::new(self.layout.n_rows(), self.load.n_params());
        for (k, &t) in self.times.iter().enumerate() {
            let phase = self.load.phase_index(t);
            for contact in self.contacts.contacts_at(t) {
                if let Some(col) = self.load.col_of(phase, contact.ee) {
                    for dim in 0..DIM2 {
                        jac.push(self.layout.row(k, 0, dim), col, contact.pos[dim]);
                    }
                }
            }
        }
        jac
    }

    fn jacobian_wrt_contacts(&self) -> Jacobian {
        let mut jac = CooMatrix::new(self.layout.n_rows(), self.contacts.n_params());
        for (k, &t) in self.times.iter().enumerate() {
            for contact in self.contacts.contacts_at(t) {
                let lambda = self.load.lambda_at(t, contact.ee);
                for dim in 0..DIM2 {
                    if let Some(col) = self.contacts.col_of(&contact, dim) {
                        jac.push(self.layout.row(k, 0, dim), col, lambda);
                    }
                }
            }
        }
        jac
    }

    fn jacobian_wrt_pressure(&self) -> Jacobian {
        let mut jac = CooMatrix::new(self.layout.n_rows(), self.pressure.n_params());
        for (k, &t) in self.times.iter().enumerate() {
            for dim in 0..DIM2 {
                jac.push(
                    self.layout.row(k, 0, dim),
                    self.pressure.param_col(t, dim),
                    -1.0,
                );
            }
        }
        jac
    }
}

impl Constraint for SupportAreaConstraint {
    fn name(&self) -> &'static str {
        "support area"
    }

    fn update_variables(&mut self, registry: &VariableRegistry) -> Result<(), FormulationError> {
        let lambdas = registry.values(self.load.id())?.clone();
        self.load.set_params(lambdas)?;
        let footholds = registry.values(self.contacts.id())?;
        self.contacts.set_params(footholds)?;
        let pressure = registry.values(self.pressure.id())?.clone();
        self.pressure.set_params(pressure)
    }

    fn evaluate(&self) -> DVector<f64> {
        let mut g = DVector::zeros(self.layout.n_rows());
        for (k, &t) in self.times.iter().enumerate() {
            let mut centroid = [0.0; DIM2];
            for contact in self.contacts.contacts_at(t) {
                let lambda = self.load.lambda_at(t, contact.ee);
                for dim in 0..DIM2 {
                    centroid[dim] += lambda * contact.pos[dim];
                }
            }

            let pressure = self.pressure.point_at(t);
            for dim in 0..DIM2 {
                g[self.layout.row(k, 0, dim)] = centroid[dim] - pressure[dim];
            }
        }
        g
    }

    fn bounds(&self) -> Vec<Bound> {
        vec![Bound::equality(0.0); self.layout.n_rows()]
    }

    fn jacobian_wrt(&self, set_id: &str) -> Jacobian {
        if set_id == self.load.id() {
            self.jacobian_wrt_load()
        } else if set_id == self.contacts.id() {
            self.jacobian_wrt_contacts()
        } else if set_id == self.pressure.id() {
            self.jacobian_wrt_pressure()
        } else {
            empty_jacobian()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contacts::CONTACTS_ID;
    use crate::load::LOAD_ID;
    use crate::math::jacobian_to_dense;
    use crate::pressure::PRESSURE_ID;
    use crate::variables::VariableSet;
    use approx::assert_relative_eq;
    use nalgebra::Vector2;

    fn fixture() -> SupportAreaConstraint {
        let mut contacts = ContactSchedule::new();
        let a = contacts.add_pinned_foothold(0, Vector2::new(0.0, 0.2));
        let b = contacts.add_free_foothold(1, Vector2::new(0.4, -0.2));
        contacts.add_phase(1.0, &[a, b]);

        let load = LoadDistribution::discretize(&contacts, 0.5);
        let pressure = PressurePoint::discretize(contacts.total_time(), 0.5);
        SupportAreaConstraint::new(contacts, load, pressure, 0.5)
    }

    fn registry_with(
        footholds: Vec<f64>,
        lambdas: Vec<f64>,
        pressure: Vec<f64>,
    ) -> VariableRegistry {
        let mut registry = VariableRegistry::new();
        registry
            .add(VariableSet::new(DVector::from_vec(footholds), CONTACTS_ID))
            .expect("registration succeeds");
        registry
            .add(VariableSet::new(DVector::from_vec(lambdas), LOAD_ID))
            .expect("registration succeeds");
        registry
            .add(VariableSet::new(DVector::from_vec(pressure), PRESSURE_ID))
            .expect("registration succeeds");
        registry
    }

    #[test]
    fn grid_excludes_terminal_time() {
        let constraint = fixture();
        assert_eq!(constraint.times.len(), 2);
        assert_relative_eq!(constraint.times[1], 0.5, epsilon = 1e-12);
        assert_eq!(constraint.layout.n_rows(), 4);
    }

    #[test]
    fn residual_vanishes_at_weighted_centroid() {
        let mut constraint = fixture();

        // Centroid of 0.7*(0, 0.2) + 0.3*(0.4, -0.2) = (0.12, 0.08).
        let registry = registry_with(
            vec![0.4, -0.2],
            vec![0.7, 0.3, 0.7, 0.3],
            vec![0.12, 0.08, 0.12, 0.08],
        );
        constraint
            .update_variables(&registry)
            .expect("update succeeds");

        let g = constraint.evaluate();
        for row in 0..4 {
            assert_relative_eq!(g[row], 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn residual_measures_centroid_offset() {
        let mut constraint = fixture();
        let registry = registry_with(
            vec![0.4, -0.2],
            vec![0.5, 0.5, 0.5, 0.5],
            vec![0.0, 0.0, 0.0, 0.0],
        );
        constraint
            .update_variables(&registry)
            .expect("update succeeds");

        let g = constraint.evaluate();
        assert_relative_eq!(g[0], 0.2, epsilon = 1e-12);
        assert_relative_eq!(g[1], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn bounds_are_equalities_on_zero() {
        let constraint = fixture();
        assert!(constraint
            .bounds()
            .iter()
            .all(|b| b.lower == 0.0 && b.upper == 0.0));
    }

    #[test]
    fn load_jacobian_carries_contact_positions() {
        let mut constraint = fixture();
        let registry = registry_with(
            vec![0.4, -0.2],
            vec![0.7, 0.3, 0.7, 0.3],
            vec![0.0; 4],
        );
        constraint
            .update_variables(&registry)
            .expect("update succeeds");

        let dense = jacobian_to_dense(&constraint.jacobian_wrt(LOAD_ID));
        assert_eq!(dense.nrows(), 4);
        assert_eq!(dense.ncols(), 4);
        // Sample 0: pinned contact position in column 0, free in column 1.
        assert_relative_eq!(dense[(0, 0)], 0.0, epsilon = 1e-12);
        assert_relative_eq!(dense[(1, 0)], 0.2, epsilon = 1e-12);
        assert_relative_eq!(dense[(0, 1)], 0.4, epsilon = 1e-12);
        assert_relative_eq!(dense[(1, 1)], -0.2, epsilon = 1e-12);
    }

    #[test]
    fn contact_jacobian_carries_lambdas_for_free_contacts() {
        let mut constraint = fixture();
        let registry = registry_with(
            vec![0.4, -0.2],
            vec![0.7, 0.3, 0.6, 0.4],
            vec![0.0; 4],
        );
        constraint
            .update_variables(&registry)
            .expect("update succeeds");

        let dense = jacobian_to_dense(&constraint.jacobian_wrt(CONTACTS_ID));
        assert_eq!(dense.ncols(), 2);
        // Free contact of sample 0 weighs lambda = 0.3 on both axes.
        assert_relative_eq!(dense[(0, 0)], 0.3, epsilon = 1e-12);
        assert_relative_eq!(dense[(1, 1)], 0.3, epsilon = 1e-12);
        // Sample 1 reads its own phase's lambda.
        assert_relative_eq!(dense[(2, 0)], 0.4, epsilon = 1e-12);
    }

    #[test]
    fn pressure_jacobian_is_negative_identity_per_sample() {
        let constraint = fixture();
        let dense = jacobian_to_dense(&constraint.jacobian_wrt(PRESSURE_ID));

        assert_eq!(dense.nrows(), 4);
        assert_eq!(dense.ncols(), 4);
        for row in 0..4 {
            for col in 0..4 {
                let expected = if row == col { -1.0 } else { 0.0 };
                assert_relative_eq!(dense[(row, col)], expected, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn uncoupled_set_yields_empty_block() {
        let constraint = fixture();
        let jac = constraint.jacobian_wrt("com-motion");
        assert_eq!(jac.nrows(), 0);
        assert_eq!(jac.ncols(), 0);
    }
}
