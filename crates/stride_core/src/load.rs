//! Per-phase load distribution: one fraction of the carried weight per
//! (load phase, active endeffector). The fractions are decision variables;
//! the convexity and support-area constraints tie them to the geometry.

use nalgebra::DVector;

use crate::constraint::sample_times;
use crate::contacts::{ContactSchedule, EndeffectorId};
use crate::error::FormulationError;

/// Variable-set id for the load fractions.
pub const LOAD_ID: &str = "ee-load";

#[derive(Debug, Clone)]
struct LoadPhase {
    ees: Vec<EndeffectorId>,
    /// First column of this phase in the lambda vector.
    offset: usize,
}

/// Load fractions discretized on the distribution's own `dt` grid. Phase
/// `k` covers `[k*dt, (k+1)*dt)`; the terminal time belongs to the last
/// phase.
#[derive(Debug, Clone)]
pub struct LoadDistribution {
    dt: f64,
    phases: Vec<LoadPhase>,
    lambdas: DVector<f64>,
}

impl LoadDistribution {
    /// Builds the phase structure from the contact schedule and
    /// initializes every phase to an equal split across its contacts.
    pub fn discretize(schedule: &ContactSchedule, dt: f64) -> Self {
        let mut phases = Vec::new();
        let mut offset = 0;
        for t in sample_times(schedule.total_time(), dt) {
            let ees: Vec<EndeffectorId> =
                schedule.contacts_at(t).iter().map(|c| c.ee).collect();
            let count = ees.len();
            phases.push(LoadPhase { ees, offset });
            offset += count;
        }

        let mut lambdas = DVector::zeros(offset);
        for phase in &phases {
            let share = 1.0 / phase.ees.len() as f64;
            for i in 0..phase.ees.len() {
                lambdas[phase.offset + i] = share;
            }
        }

        Self { dt, phases, lambdas }
    }

    pub fn id(&self) -> &'static str {
        LOAD_ID
    }

    pub fn n_phases(&self) -> usize {
        self.phases.len()
    }

    pub fn n_params(&self) -> usize {
        self.lambdas.len()
    }

    pub fn params(&self) -> DVector<f64> {
        self.lambdas.clone()
    }

    pub fn set_params(&mut self, params: DVector<f64>) -> Result<(), FormulationError> {
        if params.len() != self.lambdas.len() {
            return Err(FormulationError::ParameterCountMismatch {
                subsystem: "load distribution",
                expected: self.lambdas.len(),
                got: params.len(),
            });
        }
        self.lambdas = params;
        Ok(())
    }

    /// Phase holding time `t`. The small forward nudge keeps grid points
    /// that were accumulated in floating point inside their own phase.
    pub fn phase_index(&self, t: f64) -> usize {
        let k = ((t / self.dt) + 1e-9).floor().max(0.0) as usize;
        k.min(self.phases.len().saturating_sub(1))
    }

    /// Endeffectors carrying load in phase `k`.
    pub fn ees_at_phase(&self, k: usize) -> &[EndeffectorId] {
        &self.phases[k].ees
    }

    /// Column of endeffector `ee`'s fraction in phase `k`, if it carries
    /// load then.
    pub fn col_of(&self, k: usize, ee: EndeffectorId) -> Option<usize> {
        let phase = &self.phases[k];
        phase
            .ees
            .iter()
            .position(|&e| e == ee)
            .map(|i| phase.offset + i)
    }

    /// Current fraction for endeffector `ee` in phase `k`; zero when the
    /// endeffector carries no load in that phase.
    pub fn lambda(&self, k: usize, ee: EndeffectorId) -> f64 {
        self.col_of(k, ee).map_or(0.0, |col| self.lambdas[col])
    }

    /// Current fraction for endeffector `ee` at time `t`.
    pub fn lambda_at(&self, t: f64, ee: EndeffectorId) -> f64 {
        self.lambda(self.phase_index(t), ee)
    }
}
