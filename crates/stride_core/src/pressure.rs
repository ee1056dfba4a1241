//! Pressure reference point: a planar anchor for the load-distribution
//! consistency condition, parametrized by its sampled coordinates.

use nalgebra::{DVector, Vector2};

use crate::constraint::sample_times;
use crate::error::FormulationError;
use crate::math::DIM2;

/// Variable-set id for the pressure-point parameters.
pub const PRESSURE_ID: &str = "pressure-point";

/// Piecewise-constant planar point on its own `dt` grid. Sample `k`
/// covers `[k*dt, (k+1)*dt)`; parameters are the sampled x/y values.
#[derive(Debug, Clone)]
pub struct PressurePoint {
    dt: f64,
    params: DVector<f64>,
}

impl PressurePoint {
    pub fn discretize(total_time: f64, dt: f64) -> Self {
        let n_samples = sample_times(total_time, dt).len();
        Self {
            dt,
            params: DVector::zeros(n_samples * DIM2),
        }
    }

    pub fn id(&self) -> &'static str {
        PRESSURE_ID
    }

    pub fn n_samples(&self) -> usize {
        self.params.len() / DIM2
    }

    pub fn n_params(&self) -> usize {
        self.params.len()
    }

    pub fn params(&self) -> DVector<f64> {
        self.params.clone()
    }

    pub fn set_params(&mut self, params: DVector<f64>) -> Result<(), FormulationError> {
        if params.len() != self.params.len() {
            return Err(FormulationError::ParameterCountMismatch {
                subsystem: "pressure point",
                expected: self.params.len(),
                got: params.len(),
            });
        }
        self.params = params;
        Ok(())
    }

    fn sample_index(&self, t: f64) -> usize {
        let k = ((t / self.dt) + 1e-9).floor().max(0.0) as usize;
        k.min(self.n_samples().saturating_sub(1))
    }

    /// Current point at time `t`.
    pub fn point_at(&self, t: f64) -> Vector2<f64> {
        let k = self.sample_index(t);
        Vector2::new(self.params[k * DIM2], self.params[k * DIM2 + 1])
    }

    /// Column of the parameter that axis `dim` of the point at time `t`
    /// reads from. The parametrization is the identity on samples, so the
    /// derivative coefficient is always 1.
    pub fn param_col(&self, t: f64, dim: usize) -> usize {
        self.sample_index(t) * DIM2 + dim
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn discretize_excludes_terminal_sample() {
        let pressure = PressurePoint::discretize(1.0, 0.3);
        // Grid [0.0, 0.3, 0.6, 0.9]: four samples, two params each.
        assert_eq!(pressure.n_samples(), 4);
        assert_eq!(pressure.n_params(), 8);
    }

    #[test]
    fn point_reads_its_samples_parameters() {
        let mut pressure = PressurePoint::discretize(1.0, 0.5);
        pressure
            .set_params(DVector::from_vec(vec![0.1, 0.2, 0.3, 0.4]))
            .expect("length matches");

        assert_relative_eq!(pressure.point_at(0.0)[0], 0.1, epsilon = 1e-12);
        assert_relative_eq!(pressure.point_at(0.25)[1], 0.2, epsilon = 1e-12);
        assert_relative_eq!(pressure.point_at(0.5)[0], 0.3, epsilon = 1e-12);
        // Past the grid clamps to the last sample.
        assert_relative_eq!(pressure.point_at(2.0)[1], 0.4, epsilon = 1e-12);
    }

    #[test]
    fn param_col_matches_point_lookup() {
        let pressure = PressurePoint::discretize(1.0, 0.25);
        assert_eq!(pressure.param_col(0.0, 0), 0);
        assert_eq!(pressure.param_col(0.0, 1), 1);
        assert_eq!(pressure.param_col(0.75, 0), 6);
        assert_eq!(pressure.param_col(0.75, 1), 7);
    }
}
