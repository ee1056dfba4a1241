//! Planar center-of-mass motion represented as a piecewise cubic
//! polynomial. The free coefficients are decision variables; everything a
//! constraint needs is a linear function of them, which is what makes the
//! closed-form Jacobians in the rest of the crate possible.

use nalgebra::{DVector, RowDVector, Vector2};
use serde::{Deserialize, Serialize};

use crate::error::FormulationError;
use crate::math::DIM2;

/// Variable-set id under which the spline coefficients are registered.
pub const COM_MOTION_ID: &str = "com-motion";

/// Coefficients per polynomial segment and axis (cubic).
pub const COEFF_COUNT: usize = 4;

/// Selects which time derivative of the motion a query refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MotionDerivative {
    Position,
    Velocity,
    Acceleration,
    Jerk,
}

/// Planar kinematic state up to acceleration.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct State2d {
    pub p: Vector2<f64>,
    pub v: Vector2<f64>,
    pub a: Vector2<f64>,
}

impl State2d {
    pub fn derivative(&self, deriv: MotionDerivative) -> Vector2<f64> {
        match deriv {
            MotionDerivative::Position => self.p,
            MotionDerivative::Velocity => self.v,
            MotionDerivative::Acceleration => self.a,
            MotionDerivative::Jerk => Vector2::zeros(),
        }
    }
}

/// Piecewise cubic CoM spline over fixed segment durations.
///
/// Coefficient layout: segment-major, then axis, then monomial order, so
/// segment `s`, axis `d` occupies
/// `[s*2*COEFF_COUNT + d*COEFF_COUNT, ..+COEFF_COUNT)` and the polynomial
/// reads `a + b*tau + c*tau^2 + d*tau^3` in segment-local time `tau`.
#[derive(Debug, Clone)]
pub struct ComSpline {
    durations: Vec<f64>,
    coeffs: DVector<f64>,
}

impl ComSpline {
    pub fn new(durations: Vec<f64>) -> Self {
        debug_assert!(durations.iter().all(|d| *d > 0.0));
        let n = durations.len() * DIM2 * COEFF_COUNT;
        Self {
            durations,
            coeffs: DVector::zeros(n),
        }
    }

    pub fn id(&self) -> &'static str {
        COM_MOTION_ID
    }

    pub fn n_segments(&self) -> usize {
        self.durations.len()
    }

    pub fn durations(&self) -> &[f64] {
        &self.durations
    }

    pub fn total_time(&self) -> f64 {
        self.durations.iter().sum()
    }

    /// Number of free coefficients (the variable-set length).
    pub fn n_coeffs(&self) -> usize {
        self.coeffs.len()
    }

    pub fn params(&self) -> DVector<f64> {
        self.coeffs.clone()
    }

    pub fn set_params(&mut self, params: DVector<f64>) -> Result<(), FormulationError> {
        if params.len() != self.coeffs.len() {
            return Err(FormulationError::ParameterCountMismatch {
                subsystem: "com spline",
                expected: self.coeffs.len(),
                got: params.len(),
            });
        }
        self.coeffs = params;
        Ok(())
    }

    /// Column of coefficient `k` of axis `dim` in segment `seg`.
    pub fn coeff_index(&self, seg: usize, dim: usize, k: usize) -> usize {
        seg * DIM2 * COEFF_COUNT + dim * COEFF_COUNT + k
    }

    /// Maps global time to (segment index, segment-local time). Times at
    /// or past the total duration land in the last segment.
    pub fn segment_at(&self, t: f64) -> (usize, f64) {
        let mut remaining = t.max(0.0);
        for (seg, &duration) in self.durations.iter().enumerate() {
            if remaining <= duration || seg + 1 == self.durations.len() {
                return (seg, remaining.min(duration));
            }
            remaining -= duration;
        }
        (0, 0.0) // unreachable for non-empty splines
    }

    fn basis(deriv: MotionDerivative, tau: f64) -> [f64; COEFF_COUNT] {
        match deriv {
            MotionDerivative::Position => [1.0, tau, tau * tau, tau * tau * tau],
            MotionDerivative::Velocity => [0.0, 1.0, 2.0 * tau, 3.0 * tau * tau],
            MotionDerivative::Acceleration => [0.0, 0.0, 2.0, 6.0 * tau],
            MotionDerivative::Jerk => [0.0, 0.0, 0.0, 6.0],
        }
    }

    /// Value of one derivative on one axis at global time `t`.
    pub fn value_at(&self, t: f64, deriv: MotionDerivative, dim: usize) -> f64 {
        let (seg, tau) = self.segment_at(t);
        let basis = Self::basis(deriv, tau);
        (0..COEFF_COUNT)
            .map(|k| basis[k] * self.coeffs[self.coeff_index(seg, dim, k)])
            .sum()
    }

    /// Full planar state at global time `t`.
    pub fn point_at(&self, t: f64) -> State2d {
        let mut state = State2d::default();
        for dim in 0..DIM2 {
            state.p[dim] = self.value_at(t, MotionDerivative::Position, dim);
            state.v[dim] = self.value_at(t, MotionDerivative::Velocity, dim);
            state.a[dim] = self.value_at(t, MotionDerivative::Acceleration, dim);
        }
        state
    }

    /// Row of basis coefficients such that
    /// `row * coeffs == value_at(t, deriv, dim)`. Dense within the active
    /// segment, zero elsewhere.
    pub fn coeff_jacobian(&self, t: f64, deriv: MotionDerivative, dim: usize) -> RowDVector<f64> {
        let (seg, tau) = self.segment_at(t);
        self.coeff_jacobian_local(seg, tau, deriv, dim)
    }

    /// Same as [`coeff_jacobian`], addressed by segment and local time.
    /// The junction builder uses this to reach the *end* of a segment and
    /// the *start* of the next without ambiguity at the shared instant.
    pub fn coeff_jacobian_local(
        &self,
        seg: usize,
        tau: f64,
        deriv: MotionDerivative,
        dim: usize,
    ) -> RowDVector<f64> {
        let mut row = RowDVector::zeros(self.n_coeffs());
        let basis = Self::basis(deriv, tau);
        for k in 0..COEFF_COUNT {
            row[self.coeff_index(seg, dim, k)] = basis[k];
        }
        row
    }
}
