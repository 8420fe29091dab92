//! Crate-wide error type.
use galerkin_optimize::newton::NewtonError;
use galerkin_sparse::SolveError;
use std::error::Error;
use std::fmt;
use std::fmt::Display;

#[derive(Debug)]
#[non_exhaustive]
pub enum FemError {
    /// Malformed input data, such as a mesh with out-of-range or repeated indices.
    Consistency(String),
    /// The element (or element/cell combination) is not supported.
    UnsupportedElement(String),
    /// Two objects that must agree in size do not.
    DimensionMismatch {
        what: String,
        expected: usize,
        actual: usize,
    },
    /// An iterative procedure failed to converge.
    Convergence(String),
    /// A form kernel returned an error.
    FormEvaluation(eyre::Report),
}

pub type Result<T> = std::result::Result<T, FemError>;

impl FemError {
    pub(crate) fn consistency(message: impl Into<String>) -> Self {
        Self::Consistency(message.into())
    }

    pub(crate) fn dimension_mismatch(what: impl Into<String>, expected: usize, actual: usize) -> Self {
        Self::DimensionMismatch {
            what: what.into(),
            expected,
            actual,
        }
    }
}

impl Display for FemError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FemError::Consistency(message) => write!(f, "Inconsistent data: {}", message),
            FemError::UnsupportedElement(message) => write!(f, "Unsupported element: {}", message),
            FemError::DimensionMismatch { what, expected, actual } => {
                write!(f, "Dimension mismatch for {}: expected {}, got {}.", what, expected, actual)
            }
            FemError::Convergence(message) => write!(f, "{}", message),
            FemError::FormEvaluation(report) => write!(f, "Form evaluation failed: {}", report),
        }
    }
}

impl Error for FemError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            FemError::FormEvaluation(report) => Some(report.as_ref()),
            _ => None,
        }
    }
}

impl From<galerkin_quadrature::Error> for FemError {
    fn from(err: galerkin_quadrature::Error) -> Self {
        FemError::UnsupportedElement(err.to_string())
    }
}

impl From<NewtonError> for FemError {
    fn from(err: NewtonError) -> Self {
        FemError::Convergence(format!("Time slab system did not converge. {}", err))
    }
}

impl From<SolveError> for FemError {
    fn from(err: SolveError) -> Self {
        FemError::Convergence(err.to_string())
    }
}
