//! Single assembly point for constraints and costs. The factory owns the
//! subsystem prototypes and the discretization/weight configuration, and
//! hands out fully wired instances by name. Constraints receive their own
//! clones of the subsystems they need; the registry stays the only writer
//! afterwards.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::constraint::{
    ContactLoadConstraint, ConvexityConstraint, ConstraintVariant, PolygonCenterConstraint,
    RangeOfMotionBox, SplineEqualityConstraint, SupportAreaConstraint,
};
use crate::contacts::ContactSchedule;
use crate::cost::{CostVariant, QuadraticSplineCost, SoftConstraint};
use crate::error::FormulationError;
use crate::load::LoadDistribution;
use crate::math::MatVec;
use crate::motion::{ComSpline, MotionDerivative, State2d};
use crate::pressure::PressurePoint;
use crate::spline_equations::LinearSplineEquations;
use crate::variables::{Bound, VariableSet};

/// Discretization and weighting knobs shared by the factory's recipes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormulationParams {
    /// Time step used to discretize continuous-time constraints.
    pub dt: f64,
    /// Maximum foothold deviation from the nominal stance, per axis.
    pub max_deviation: [f64; 2],
    /// Nominal stance offset in the body frame, indexed by endeffector.
    pub nominal_stance: Vec<[f64; 2]>,
    /// Per-axis weight of the CoM acceleration cost.
    pub motion_weights: [f64; 2],
}

/// Constraint recipes the factory understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConstraintName {
    InitialCom,
    FinalCom,
    JunctionCom,
    Convexity,
    RomBox,
    FinalStance,
    Obstacle,
}

impl FromStr for ConstraintName {
    type Err = FormulationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "initial-com" => Ok(Self::InitialCom),
            "final-com" => Ok(Self::FinalCom),
            "junction-com" => Ok(Self::JunctionCom),
            "convexity" => Ok(Self::Convexity),
            "rom-box" => Ok(Self::RomBox),
            "final-stance" => Ok(Self::FinalStance),
            "obstacle" => Ok(Self::Obstacle),
            other => Err(FormulationError::Configuration(other.to_owned())),
        }
    }
}

/// Cost recipes the factory understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CostName {
    ComMotion,
    RangeOfMotion,
    PolygonCenter,
    FinalCom,
}

impl FromStr for CostName {
    type Err = FormulationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "com-motion" => Ok(Self::ComMotion),
            "range-of-motion" => Ok(Self::RangeOfMotion),
            "polygon-center" => Ok(Self::PolygonCenter),
            "final-com" => Ok(Self::FinalCom),
            other => Err(FormulationError::Configuration(other.to_owned())),
        }
    }
}

/// Builds named constraints and costs against shared subsystem state.
#[derive(Debug, Clone)]
pub struct ConstraintFactory {
    motion: ComSpline,
    contacts: ContactSchedule,
    load: LoadDistribution,
    pressure: PressurePoint,
    params: FormulationParams,
    initial_state: State2d,
    final_state: State2d,
}

impl ConstraintFactory {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        motion: ComSpline,
        contacts: ContactSchedule,
        load: LoadDistribution,
        pressure: PressurePoint,
        params: FormulationParams,
        initial_state: State2d,
        final_state: State2d,
    ) -> Self {
        Self {
            motion,
            contacts,
            load,
            pressure,
            params,
            initial_state,
            final_state,
        }
    }

    /// Builds the instances behind one constraint name. Some recipes
    /// expand into several cooperating constraints; the order is fixed.
    pub fn constraint(
        &self,
        name: ConstraintName,
    ) -> Result<Vec<ConstraintVariant>, FormulationError> {
        debug!(?name, "building constraint");
        match name {
            ConstraintName::InitialCom => Ok(vec![self.make_initial()?]),
            ConstraintName::FinalCom => Ok(vec![self.make_final()?]),
            ConstraintName::JunctionCom => Ok(vec![self.make_junction()?]),
            ConstraintName::Convexity => Ok(self.make_convexity_recipe()),
            ConstraintName::RomBox => Ok(vec![self.make_rom_box()]),
            ConstraintName::FinalStance => Err(FormulationError::Configuration(
                "final-stance constraint is not implemented".to_owned(),
            )),
            ConstraintName::Obstacle => Err(FormulationError::Configuration(
                "obstacle constraint is not implemented".to_owned(),
            )),
        }
    }

    /// Builds the cost term behind one cost name.
    pub fn cost(&self, name: CostName) -> Result<CostVariant, FormulationError> {
        debug!(?name, "building cost");
        match name {
            CostName::ComMotion => {
                let eq = LinearSplineEquations::new(&self.motion);
                let term = MatVec {
                    m: eq.acceleration_cost(self.params.motion_weights),
                    v: nalgebra::DVector::zeros(self.motion.n_coeffs()),
                };
                Ok(CostVariant::QuadraticSpline(QuadraticSplineCost::new(
                    self.motion.clone(),
                    term,
                )?))
            }
            CostName::RangeOfMotion => Ok(self.to_cost(self.make_rom_box())),
            CostName::PolygonCenter => Ok(self.to_cost(ConstraintVariant::PolygonCenter(
                PolygonCenterConstraint::new(self.load.clone()),
            ))),
            CostName::FinalCom => Ok(self.to_cost(self.make_final()?)),
        }
    }

    /// Relaxes any hard constraint into a soft cost.
    pub fn to_cost(&self, constraint: ConstraintVariant) -> CostVariant {
        CostVariant::Soft(SoftConstraint::new(constraint))
    }

    /// Initial variable set of every subsystem, with type-appropriate
    /// default bounds. Load fractions are boxed to `[0, 1]` and start at
    /// the equal split the discretization was initialized with.
    pub fn variable_sets(&self) -> Vec<VariableSet> {
        vec![
            VariableSet::new(self.motion.params(), self.motion.id()),
            VariableSet::new(self.contacts.params(), self.contacts.id()),
            VariableSet::with_uniform_bound(
                self.load.params(),
                self.load.id(),
                Bound::new(0.0, 1.0),
            ),
            VariableSet::new(self.pressure.params(), self.pressure.id()),
        ]
    }

    fn boundary_derivs() -> [MotionDerivative; 3] {
        [
            MotionDerivative::Position,
            MotionDerivative::Velocity,
            MotionDerivative::Acceleration,
        ]
    }

    fn make_initial(&self) -> Result<ConstraintVariant, FormulationError> {
        let eq = LinearSplineEquations::new(&self.motion)
            .initial(self.initial_state, &Self::boundary_derivs());
        Ok(ConstraintVariant::SplineEquality(
            SplineEqualityConstraint::new("initial com state", self.motion.clone(), eq)?,
        ))
    }

    fn make_final(&self) -> Result<ConstraintVariant, FormulationError> {
        let eq = LinearSplineEquations::new(&self.motion)
            .final_state(self.final_state, &Self::boundary_derivs());
        Ok(ConstraintVariant::SplineEquality(
            SplineEqualityConstraint::new("final com state", self.motion.clone(), eq)?,
        ))
    }

    fn make_junction(&self) -> Result<ConstraintVariant, FormulationError> {
        let eq = LinearSplineEquations::new(&self.motion).junction(&Self::boundary_derivs());
        Ok(ConstraintVariant::SplineEquality(
            SplineEqualityConstraint::new("com junction", self.motion.clone(), eq)?,
        ))
    }

    /// Support area, convexity, and contact load are built together: they
    /// share the load discretization and only make sense as a group.
    fn make_convexity_recipe(&self) -> Vec<ConstraintVariant> {
        vec![
            ConstraintVariant::SupportArea(SupportAreaConstraint::new(
                self.contacts.clone(),
                self.load.clone(),
                self.pressure.clone(),
                self.params.dt,
            )),
            ConstraintVariant::Convexity(ConvexityConstraint::new(self.load.clone())),
            ConstraintVariant::ContactLoad(ContactLoadConstraint::new(self.load.clone())),
        ]
    }

    fn make_rom_box(&self) -> ConstraintVariant {
        ConstraintVariant::RangeOfMotion(RangeOfMotionBox::new(
            self.motion.clone(),
            self.contacts.clone(),
            self.params.dt,
            self.params.max_deviation,
            self.params.nominal_stance.clone(),
        ))
    }
}
