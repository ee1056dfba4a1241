pub mod constraint;
pub mod contacts;
pub mod cost;
pub mod error;
pub mod factory;
/// The `stride_core` crate is the constraint/cost formulation layer of a
/// legged-robot trajectory optimizer. It turns physical and kinematic
/// requirements into residual vectors, bounds, and sparse Jacobian blocks
/// that a generic nonlinear solver consumes per iteration.
///
/// Key components:
/// - **Variables**: `Bound`, `VariableSet`, and the `VariableRegistry` the
///   solver reads and writes between iterations.
/// - **Subsystems**: CoM spline, contact schedule, load distribution, and
///   pressure point, each owning one named variable set.
/// - **Constraints**: range-of-motion box, support-area consistency, load
///   convexity and friends, all behind one `Constraint` contract.
/// - **Factory**: maps symbolic names to fully wired constraint and cost
///   instances.
pub mod load;
pub mod math;
pub mod motion;
pub mod pressure;
pub mod spline_equations;
pub mod variables;
