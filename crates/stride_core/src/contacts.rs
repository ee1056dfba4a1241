//! Contact schedule: which endeffectors touch the ground when, and where.
//!
//! Footholds are shared across the phases they support. A *free* foothold
//! is part of the decision vector and carries its column index; a *pinned*
//! foothold comes from the start stance and never moves.

use nalgebra::{DVector, Vector2};

use crate::error::FormulationError;
use crate::math::DIM2;

/// Variable-set id for the free foothold positions.
pub const CONTACTS_ID: &str = "footholds";

/// Identifies one leg/endeffector of the robot.
pub type EndeffectorId = usize;

/// One ground contact. `free_index` is the foothold's slot among the
/// decision variables; `None` marks a contact pinned by the start stance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    pub ee: EndeffectorId,
    pub pos: Vector2<f64>,
    pub free_index: Option<usize>,
}

impl Contact {
    pub fn pinned(ee: EndeffectorId, pos: Vector2<f64>) -> Self {
        Self {
            ee,
            pos,
            free_index: None,
        }
    }

    pub fn is_pinned(&self) -> bool {
        self.free_index.is_none()
    }
}

#[derive(Debug, Clone)]
struct Phase {
    duration: f64,
    /// Indices into the shared foothold list.
    contacts: Vec<usize>,
}

/// Phases of fixed duration, each supported by a subset of the footholds.
#[derive(Debug, Clone)]
pub struct ContactSchedule {
    footholds: Vec<Contact>,
    phases: Vec<Phase>,
    n_free: usize,
}

/// Builder-style assembly: add footholds first, then phases referencing
/// them by index.
impl ContactSchedule {
    pub fn new() -> Self {
        Self {
            footholds: Vec::new(),
            phases: Vec::new(),
            n_free: 0,
        }
    }

    /// Adds a pinned foothold (start stance) and returns its index.
    pub fn add_pinned_foothold(&mut self, ee: EndeffectorId, pos: Vector2<f64>) -> usize {
        self.footholds.push(Contact::pinned(ee, pos));
        self.footholds.len() - 1
    }

    /// Adds an optimized foothold and returns its index. The initial
    /// position doubles as the optimization starting point.
    pub fn add_free_foothold(&mut self, ee: EndeffectorId, pos: Vector2<f64>) -> usize {
        let free_index = self.n_free;
        self.n_free += 1;
        self.footholds.push(Contact {
            ee,
            pos,
            free_index: Some(free_index),
        });
        self.footholds.len() - 1
    }

    /// Appends a phase supported by the given footholds.
    pub fn add_phase(&mut self, duration: f64, footholds: &[usize]) {
        debug_assert!(duration > 0.0);
        debug_assert!(footholds.iter().all(|&i| i < self.footholds.len()));
        self.phases.push(Phase {
            duration,
            contacts: footholds.to_vec(),
        });
    }

    pub fn id(&self) -> &'static str {
        CONTACTS_ID
    }

    pub fn total_time(&self) -> f64 {
        self.phases.iter().map(|p| p.duration).sum()
    }

    pub fn n_free_contacts(&self) -> usize {
        self.n_free
    }

    /// Length of this subsystem's variable set.
    pub fn n_params(&self) -> usize {
        self.n_free * DIM2
    }

    fn phase_at(&self, t: f64) -> Option<&Phase> {
        let mut remaining = t.max(0.0);
        for (i, phase) in self.phases.iter().enumerate() {
            if remaining <= phase.duration || i + 1 == self.phases.len() {
                return Some(phase);
            }
            remaining -= phase.duration;
        }
        None
    }

    /// Contacts supporting the robot at time `t`. The phase boundary
    /// itself belongs to the earlier phase, matching the sample grids.
    pub fn contacts_at(&self, t: f64) -> Vec<Contact> {
        match self.phase_at(t) {
            Some(phase) => phase.contacts.iter().map(|&i| self.footholds[i]).collect(),
            None => Vec::new(),
        }
    }

    pub fn footholds(&self) -> &[Contact] {
        &self.footholds
    }

    /// Column of axis `dim` of a free contact in the decision vector.
    pub fn col_of(&self, contact: &Contact, dim: usize) -> Option<usize> {
        contact.free_index.map(|idx| idx * DIM2 + dim)
    }

    /// Flattened free foothold positions, ordered by free index.
    pub fn params(&self) -> DVector<f64> {
        let mut params = DVector::zeros(self.n_params());
        for foothold in &self.footholds {
            if let Some(idx) = foothold.free_index {
                params[idx * DIM2] = foothold.pos[0];
                params[idx * DIM2 + 1] = foothold.pos[1];
            }
        }
        params
    }

    pub fn set_params(&mut self, params: &DVector<f64>) -> Result<(), FormulationError> {
        if params.len() != self.n_params() {
            return Err(FormulationError::ParameterCountMismatch {
                subsystem: "contact schedule",
                expected: self.n_params(),
                got: params.len(),
            });
        }
        for foothold in &mut self.footholds {
            if let Some(idx) = foothold.free_index {
                foothold.pos[0] = params[idx * DIM2];
                foothold.pos[1] = params[idx * DIM2 + 1];
            }
        }
        Ok(())
    }
}

impl Default for ContactSchedule {
    fn default() -> Self {
        Self::new()
    }
}
