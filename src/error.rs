//! Error types for training and applying SVD-based PCA models.

use thiserror::Error;

use crate::sample_store::ElementType;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Samples are not stored with the element type the trainer works in.
    #[error("element type mismatch: found {found}, expected {expected}")]
    TypeMismatch {
        found: ElementType,
        expected: ElementType,
    },
    /// Samples do not have the rank the trainer works with.
    #[error("sample rank mismatch: found rank {found}, expected rank {expected}")]
    ShapeMismatch { found: usize, expected: usize },
    /// Variance cannot be estimated from fewer than `required` samples.
    #[error("at least {required} samples are required to estimate variance, found {found}")]
    InsufficientSamples { found: usize, required: usize },
    #[error("samples have zero features")]
    EmptyFeatures,
    /// The singular value decomposition did not produce a result.
    #[error("singular value decomposition failed: {0}")]
    FactorizationFailure(String),
    #[error("{what} has length {found}, expected {expected}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },
    /// Weight matrices are laid out as (outputs, inputs).
    #[error("weight matrix has shape {found:?}, expected {expected:?} (outputs, inputs)")]
    WeightShape {
        expected: (usize, usize),
        found: (usize, usize),
    },
    #[error("sample has shape {found:?}, arrayset holds samples of shape {expected:?}")]
    SampleShape {
        expected: Vec<usize>,
        found: Vec<usize>,
    },
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization failed: {0}")]
    Serialization(String),
}
