//! Builds affine relations `Mx + v` over the CoM spline's free
//! coefficients: boundary conditions, inter-segment continuity, and the
//! quadratic matrices for derivative-penalizing costs.

use nalgebra::DMatrix;

use crate::math::{MatVec, DIM2};
use crate::motion::{ComSpline, MotionDerivative, State2d, COEFF_COUNT};

/// Equation builder borrowed against one spline's structure.
pub struct LinearSplineEquations<'a> {
    motion: &'a ComSpline,
}

impl<'a> LinearSplineEquations<'a> {
    pub fn new(motion: &'a ComSpline) -> Self {
        Self { motion }
    }

    fn boundary(&self, t: f64, state: State2d, derivs: &[MotionDerivative]) -> MatVec {
        let mut eq = MatVec::zeros(derivs.len() * DIM2, self.motion.n_coeffs());
        for (i, &deriv) in derivs.iter().enumerate() {
            let target = state.derivative(deriv);
            for dim in 0..DIM2 {
                let row = i * DIM2 + dim;
                eq.m
                    .row_mut(row)
                    .copy_from(&self.motion.coeff_jacobian(t, deriv, dim));
                eq.v[row] = -target[dim];
            }
        }
        eq
    }

    /// Rows forcing the spline to start in `state`, restricted to the
    /// given derivatives.
    pub fn initial(&self, state: State2d, derivs: &[MotionDerivative]) -> MatVec {
        self.boundary(0.0, state, derivs)
    }

    /// Rows forcing the spline to end in `state`.
    pub fn final_state(&self, state: State2d, derivs: &[MotionDerivative]) -> MatVec {
        self.boundary(self.motion.total_time(), state, derivs)
    }

    /// Continuity rows at every interior segment boundary: the end of one
    /// polynomial must match the start of the next in every requested
    /// derivative, on both axes.
    pub fn junction(&self, derivs: &[MotionDerivative]) -> MatVec {
        let n_junctions = self.motion.n_segments().saturating_sub(1);
        let mut eq = MatVec::zeros(
            n_junctions * derivs.len() * DIM2,
            self.motion.n_coeffs(),
        );

        let mut row = 0;
        for seg in 0..n_junctions {
            let duration = self.motion.durations()[seg];
            for &deriv in derivs {
                for dim in 0..DIM2 {
                    let end = self
                        .motion
                        .coeff_jacobian_local(seg, duration, deriv, dim);
                    let start = self.motion.coeff_jacobian_local(seg + 1, 0.0, deriv, dim);
                    eq.m.row_mut(row).copy_from(&(end - start));
                    row += 1;
                }
            }
        }
        eq
    }

    /// Symmetric quadratic-cost matrix for the integrated squared
    /// acceleration, scaled per axis. With the cubic basis the integral
    /// over one segment of duration `T` has the closed form
    /// `4c^2 T + 12cd T^2 + 12d^2 T^3`.
    pub fn acceleration_cost(&self, weights: [f64; DIM2]) -> DMatrix<f64> {
        let n = self.motion.n_coeffs();
        let mut m = DMatrix::zeros(n, n);
        for seg in 0..self.motion.n_segments() {
            let t = self.motion.durations()[seg];
            for dim in 0..DIM2 {
                let w = weights[dim];
                let c = self.motion.coeff_index(seg, dim, 2);
                let d = self.motion.coeff_index(seg, dim, 3);
                m[(c, c)] += w * 4.0 * t;
                m[(c, d)] += w * 6.0 * t * t;
                m[(d, c)] += w * 6.0 * t * t;
                m[(d, d)] += w * 12.0 * t * t * t;
            }
        }
        m
    }

    /// Quadratic-cost matrix for the integrated squared jerk; the cubic's
    /// jerk is the constant `6d`, so only the cubic coefficients couple.
    pub fn jerk_cost(&self, weights: [f64; DIM2]) -> DMatrix<f64> {
        let n = self.motion.n_coeffs();
        let mut m = DMatrix::zeros(n, n);
        for seg in 0..self.motion.n_segments() {
            let t = self.motion.durations()[seg];
            for dim in 0..DIM2 {
                let d = self.motion.coeff_index(seg, dim, 3);
                m[(d, d)] += weights[dim] * 36.0 * t;
            }
        }
        m
    }
}
