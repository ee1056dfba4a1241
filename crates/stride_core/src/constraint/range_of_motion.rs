//! Kinematic range of motion: every foothold must stay inside an
//! axis-aligned box around its leg's nominal stance position, expressed
//! relative to the body. Enforced on a dense time grid that includes the
//! terminal configuration.

use nalgebra::DVector;
use nalgebra_sparse::CooMatrix;
use tracing::trace;

use crate::constraint::{sample_times_with_terminal, Cached, Constraint, RowLayout};
use crate::contacts::ContactSchedule;
use crate::error::FormulationError;
use crate::math::{empty_jacobian, Jacobian, DIM2};
use crate::motion::{ComSpline, MotionDerivative};
use crate::variables::{Bound, VariableRegistry};

/// Box constraint on `foothold - body position` per sampled time and
/// active contact, two rows (x, y) each.
///
/// Pinned contacts keep their fixed position out of the residual; the
/// constant is folded into the bounds instead, so the residual stays
/// linear in the decision variables and both Jacobian blocks are
/// iteration-invariant.
#[derive(Debug, Clone)]
pub struct RangeOfMotionBox {
    motion: ComSpline,
    contacts: ContactSchedule,
    /// Per-leg nominal stance offset in the body frame, indexed by
    /// endeffector id.
    nominal_stance: Vec<[f64; 2]>,
    /// Maximum deviation from the nominal offset, per axis.
    max_deviation: [f64; 2],
    times: Vec<f64>,
    layout: RowLayout,
    jac_contacts: Cached<Jacobian>,
    jac_motion: Cached<Jacobian>,
}

impl RangeOfMotionBox {
    pub fn new(
        motion: ComSpline,
        contacts: ContactSchedule,
        dt: f64,
        max_deviation: [f64; 2],
        nominal_stance: Vec<[f64; 2]>,
    ) -> Self {
        let times = sample_times_with_terminal(contacts.total_time(), dt);
        let counts: Vec<usize> = times.iter().map(|&t| contacts.contacts_at(t).len()).collect();
        let layout = RowLayout::from_counts(&counts, DIM2);
        trace!(samples = times.len(), rows = layout.n_rows(), "range-of-motion grid");

        let mut constraint = Self {
            motion,
            contacts,
            nominal_stance,
            max_deviation,
            times,
            layout,
            jac_contacts: Cached::Uninitialized,
            jac_motion: Cached::Uninitialized,
        };
        constraint.refresh_structure();
        constraint
    }

    /// Recomputes the grid-dependent caches. Required again only if the
    /// contact structure (not the foothold values) changes.
    pub fn refresh_structure(&mut self) {
        self.jac_contacts.invalidate();
        self.jac_motion.invalidate();
        self.jac_contacts = Cached::cached(self.build_jac_contacts());
        self.jac_motion = Cached::cached(self.build_jac_motion());
    }

    fn build_jac_contacts(&self) -> Jacobian {
        let mut jac = CooMatrix::new(self.layout.n_rows(), self.contacts.n_params());
        for (k, &t) in self.times.iter().enumerate() {
            for (slot, contact) in self.contacts.contacts_at(t).iter().enumerate() {
                for dim in 0..DIM2 {
                    if let Some(col) = self.contacts.col_of(contact, dim) {
                        jac.push(self.layout.row(k, slot, dim), col, 1.0);
                    }
                }
            }
        }
        jac
    }

    fn build_jac_motion(&self) -> Jacobian {
        let mut jac = CooMatrix::new(self.layout.n_rows(), self.motion.n_coeffs());
        for (k, &t) in self.times.iter().enumerate() {
            for (slot, _) in self.contacts.contacts_at(t).iter().enumerate() {
                for dim in 0..DIM2 {
                    let basis = self
                        .motion
                        .coeff_jacobian(t, MotionDerivative::Position, dim);
                    let row = self.layout.row(k, slot, dim);
                    for (col, &value) in basis.iter().enumerate() {
                        if value != 0.0 {
                            jac.push(row, col, -value);
                        }
                    }
                }
            }
        }
        jac
    }
}

impl Constraint for RangeOfMotionBox {
    fn name(&self) -> &'static str {
        "range of motion"
    }

    fn update_variables(&mut self, registry: &VariableRegistry) -> Result<(), FormulationError> {
        let coeffs = registry.values(self.motion.id())?.clone();
        self.motion.set_params(coeffs)?;
        let footholds = registry.values(self.contacts.id())?;
        self.contacts.set_params(footholds)
    }

    fn evaluate(&self) -> DVector<f64> {
        let mut g = DVector::zeros(self.layout.n_rows());
        for (k, &t) in self.times.iter().enumerate() {
            let body = self.motion.point_at(t).p;
            for (slot, contact) in self.contacts.contacts_at(t).iter().enumerate() {
                for dim in 0..DIM2 {
                    let row = self.layout.row(k, slot, dim);
                    g[row] = if contact.is_pinned() {
                        -body[dim]
                    } else {
                        contact.pos[dim] - body[dim]
                    };
                }
            }
        }
        g
    }

    fn bounds(&self) -> Vec<Bound> {
        let mut bounds = vec![Bound::unbounded(); self.layout.n_rows()];
        for (k, &t) in self.times.iter().enumerate() {
            for (slot, contact) in self.contacts.contacts_at(t).iter().enumerate() {
                let nominal = self.nominal_stance[contact.ee];
                for dim in 0..DIM2 {
                    let mut bound = Bound::new(
                        nominal[dim] - self.max_deviation[dim],
                        nominal[dim] + self.max_deviation[dim],
                    );
                    if contact.is_pinned() {
                        bound = bound.shifted(-contact.pos[dim]);
                    }
                    bounds[self.layout.row(k, slot, dim)] = bound;
                }
            }
        }
        bounds
    }

    fn jacobian_wrt(&self, set_id: &str) -> Jacobian {
        if set_id == self.contacts.id() {
            self.jac_contacts
                .get()
                .cloned()
                .unwrap_or_else(empty_jacobian)
        } else if set_id == self.motion.id() {
            self.jac_motion.get().cloned().unwrap_or_else(empty_jacobian)
        } else {
            empty_jacobian()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contacts::CONTACTS_ID;
    use crate::math::jacobian_to_dense;
    use crate::motion::COM_MOTION_ID;
    use crate::variables::VariableSet;
    use approx::assert_relative_eq;
    use nalgebra::Vector2;

    fn fixture() -> RangeOfMotionBox {
        let motion = ComSpline::new(vec![0.5, 0.5]);

        let mut contacts = ContactSchedule::new();
        let pinned = contacts.add_pinned_foothold(0, Vector2::new(0.1, 0.2));
        let free = contacts.add_free_foothold(1, Vector2::new(0.3, -0.2));
        contacts.add_phase(0.5, &[pinned, free]);
        contacts.add_phase(0.5, &[free]);

        RangeOfMotionBox::new(
            motion,
            contacts,
            0.4,
            [0.15, 0.1],
            vec![[0.25, 0.2], [0.25, -0.2]],
        )
    }

    #[test]
    fn grid_appends_terminal_time() {
        let rom = fixture();
        // [0.0, 0.4, 0.8] plus the terminal 1.0.
        assert_eq!(rom.times.len(), 4);
        assert_relative_eq!(rom.times[3], 1.0, epsilon = 1e-12);
        // Samples 0 and 1 carry two contacts, samples 2 and 3 one.
        assert_eq!(rom.layout.n_rows(), (2 + 2 + 1 + 1) * 2);
    }

    #[test]
    fn residual_splits_free_and_pinned_contacts() {
        let mut rom = fixture();

        let mut registry = VariableRegistry::new();
        // Constant body position (0.05, -0.05) on both segments.
        let mut coeffs = DVector::zeros(16);
        coeffs[0] = 0.05;
        coeffs[4] = -0.05;
        coeffs[8] = 0.05;
        coeffs[12] = -0.05;
        registry
            .add(VariableSet::new(coeffs, COM_MOTION_ID))
            .expect("registration succeeds");
        registry
            .add(VariableSet::new(
                DVector::from_vec(vec![0.3, -0.2]),
                CONTACTS_ID,
            ))
            .expect("registration succeeds");
        rom.update_variables(&registry).expect("update succeeds");

        let g = rom.evaluate();
        // Sample 0, pinned contact: -(body).
        assert_relative_eq!(g[0], -0.05, epsilon = 1e-12);
        assert_relative_eq!(g[1], 0.05, epsilon = 1e-12);
        // Sample 0, free contact: foothold - body.
        assert_relative_eq!(g[2], 0.3 - 0.05, epsilon = 1e-12);
        assert_relative_eq!(g[3], -0.2 + 0.05, epsilon = 1e-12);
    }

    #[test]
    fn bounds_center_on_nominal_stance() {
        let rom = fixture();
        let bounds = rom.bounds();

        // Pinned contact (ee 0): nominal ± deviation, shifted by -p.
        assert_relative_eq!(bounds[0].lower, 0.25 - 0.15 - 0.1, epsilon = 1e-12);
        assert_relative_eq!(bounds[0].upper, 0.25 + 0.15 - 0.1, epsilon = 1e-12);
        assert_relative_eq!(bounds[1].lower, 0.2 - 0.1 - 0.2, epsilon = 1e-12);

        // Free contact (ee 1): nominal ± deviation, unshifted.
        assert_relative_eq!(bounds[2].lower, 0.25 - 0.15, epsilon = 1e-12);
        assert_relative_eq!(bounds[2].upper, 0.25 + 0.15, epsilon = 1e-12);
        assert_relative_eq!(bounds[3].lower, -0.2 - 0.1, epsilon = 1e-12);
        assert_relative_eq!(bounds[3].upper, -0.2 + 0.1, epsilon = 1e-12);
    }

    #[test]
    fn contact_jacobian_marks_free_columns_only() {
        let rom = fixture();
        let dense = jacobian_to_dense(&rom.jacobian_wrt(CONTACTS_ID));

        assert_eq!(dense.nrows(), 12);
        assert_eq!(dense.ncols(), 2);
        // Pinned rows contribute nothing.
        assert_eq!(dense[(0, 0)], 0.0);
        assert_eq!(dense[(1, 1)], 0.0);
        // Free rows carry the identity coupling.
        assert_eq!(dense[(2, 0)], 1.0);
        assert_eq!(dense[(3, 1)], 1.0);
    }

    #[test]
    fn motion_jacobian_is_negated_position_basis() {
        let rom = fixture();
        let dense = jacobian_to_dense(&rom.jacobian_wrt(COM_MOTION_ID));

        assert_eq!(dense.ncols(), 16);
        // Sample 0 (t = 0), x row of the pinned contact: -[1, 0, 0, 0]
        // in the first segment's x block.
        assert_relative_eq!(dense[(0, 0)], -1.0, epsilon = 1e-12);
        assert_relative_eq!(dense[(0, 1)], 0.0, epsilon = 1e-12);
        // y row reads the y coefficient block.
        assert_relative_eq!(dense[(1, 4)], -1.0, epsilon = 1e-12);

        // Terminal sample lives in the second segment (tau = 0.5).
        let last_x_row = rom.layout.row(3, 0, 0);
        assert_relative_eq!(dense[(last_x_row, 8)], -1.0, epsilon = 1e-12);
        assert_relative_eq!(dense[(last_x_row, 9)], -0.5, epsilon = 1e-12);
        assert_relative_eq!(dense[(last_x_row, 10)], -0.25, epsilon = 1e-12);
        assert_relative_eq!(dense[(last_x_row, 11)], -0.125, epsilon = 1e-12);
    }

    #[test]
    fn uncoupled_set_yields_empty_block() {
        let rom = fixture();
        let jac = rom.jacobian_wrt("ee-load");
        assert_eq!(jac.nrows(), 0);
        assert_eq!(jac.ncols(), 0);
    }
}
