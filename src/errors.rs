use thiserror::Error;

/// Reason a candidate rotation matrix was rejected by `Rotation::from_matrix`.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationMatrixError {
    #[error("matrix is not 3x3")]
    Dimension,
    #[error("orthogonalized matrix has negative determinant")]
    NegativeDeterminant,
    #[error("Björck orthogonalization did not converge after {iters} iterations")]
    NoOrthogonalConvergence { iters: usize },
}

/// The closed set of errors this crate can return.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OdeError {
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("zero norm where a non-zero vector was required")]
    ZeroNorm,

    #[error("step size {requested} is smaller than the minimum step {min_step}")]
    StepTooSmall { requested: f64, min_step: f64 },

    #[error("evaluation budget of {max} right-hand-side calls exceeded")]
    MaxCountExceeded { max: u64 },

    #[error("event root finder could not bracket a sign change")]
    NoBracketing,

    #[error("Cardan/Euler angle extraction hit a singular configuration (is_cardan={is_cardan})")]
    CardanEulerSingularity { is_cardan: bool },

    #[error("not a rotation matrix: {0}")]
    NotARotationMatrix(RotationMatrixError),

    #[error("construction parameter is too small")]
    NumberIsTooSmall,
}

pub type OdeResult<T> = Result<T, OdeError>;
