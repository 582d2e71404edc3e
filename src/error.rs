//! Error types shared by the registry, the operator cache and the kernels.

use thiserror::Error;

use crate::tensor::{DType, TensorId};

/// Result alias used across the backend.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Reasons an operator could not be built for a weights tensor.
///
/// A failed construction never leaves a partial entry in the cache.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConstructionError {
    #[error("weights tensor {0} is not registered")]
    UnknownWeights(TensorId),
    #[error("weights tensor {id} has dtype {dtype}, expected float32")]
    UnsupportedDType { id: TensorId, dtype: DType },
    #[error("weights tensor {id} has rank {rank}, maximum supported rank is {max}")]
    UnsupportedRank { id: TensorId, rank: usize, max: usize },
    #[error("weights tensor {0} has no elements")]
    EmptyWeights(TensorId),
}

/// Errors reported through the backend's error channel.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("unknown tensor id {0}")]
    UnknownTensor(TensorId),
    #[error("tensor id {0} is already registered")]
    DuplicateTensor(TensorId),
    #[error("invalid shape {shape:?} for a buffer of {len} elements")]
    InvalidShape { shape: Vec<usize>, len: usize },
    #[error("tensor {id} has dtype {actual}, expected {expected}")]
    DTypeMismatch {
        id: TensorId,
        expected: DType,
        actual: DType,
    },
    #[error("element count {requested} exceeds the {available} elements of tensor {id}")]
    ElementCountOutOfRange {
        id: TensorId,
        requested: usize,
        available: usize,
    },
    #[error("operator for weights tensor {0} has already been destroyed")]
    OperatorReleased(TensorId),
    #[error("operator construction failed: {0}")]
    Construction(#[from] ConstructionError),
}

/// Error type for dtype parsing
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseDTypeError {
    #[error("invalid dtype name `{0}`")]
    Name(String),
    #[error("invalid dtype tag {0}")]
    Tag(u32),
}
