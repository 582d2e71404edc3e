//! Tensor module containing the tensor model, the registry and the kernels
//!
//! This module provides the `TensorInfo` record the backend stores for every
//! registered tensor, the `TensorRegistry` that owns those records, and the
//! kernels (with their operator cache) that run against them.

mod core;
pub mod kernels;
pub mod registry;

// Re-export the tensor model for convenience
pub use self::core::{DType, TensorData, TensorId, TensorInfo};
pub use registry::TensorRegistry;
