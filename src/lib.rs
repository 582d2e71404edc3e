//! Operator-instance cache for a tensor backend
//!
//! This library provides a tensor registry, a weights-keyed operator cache
//! that builds each kernel operator once per weights tensor and destroys it
//! when that tensor is disposed, and the PReLU kernel entry point that runs
//! through the cache.

pub mod backend;
pub mod error;
pub mod tensor;

// Re-export commonly used types for convenience
pub use backend::{BackendConfig, BackendContext};
pub use error::{BackendError, ConstructionError, Result};
pub use tensor::{DType, TensorData, TensorId, TensorInfo};
