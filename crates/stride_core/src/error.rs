use thiserror::Error;

/// Errors raised while assembling the optimization problem.
///
/// Every variant indicates a setup-time defect. Evaluation itself is a
/// deterministic function of the current iterate and never fails, so there
/// is no retry or partial-result path anywhere in this layer. Querying a
/// constraint for a variable set it does not couple to is *not* an error;
/// it yields an empty Jacobian block instead.
#[derive(Debug, Error)]
pub enum FormulationError {
    /// The factory was asked for a constraint or cost it cannot build.
    #[error("no constraint or cost registered under name `{0}`")]
    Configuration(String),

    /// Two affine blocks were stacked with disagreeing column counts.
    #[error("cannot stack affine blocks: {left} columns vs {right} columns")]
    StructuralMismatch { left: usize, right: usize },

    /// A constraint pulled a variable set the registry does not hold.
    #[error("variable set `{0}` is missing from the registry")]
    UnknownVariableSet(String),

    /// A second variable set was registered under an already-taken id.
    #[error("variable set `{0}` is already registered")]
    DuplicateVariableSet(String),

    /// A variable set was built with unequal value and bound counts.
    #[error("variable set `{id}` has {values} values but {bounds} bounds")]
    BoundCountMismatch {
        id: String,
        values: usize,
        bounds: usize,
    },

    /// A parameter vector of the wrong length was pushed into a subsystem.
    #[error("{subsystem} expects {expected} parameters, got {got}")]
    ParameterCountMismatch {
        subsystem: &'static str,
        expected: usize,
        got: usize,
    },
}
