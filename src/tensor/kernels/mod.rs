//! Kernel implementations for tensor operations
//!
//! This module contains the PReLU kernel: the CPU loop, the operator object
//! that packs its weights, the weights-keyed operator cache, and the entry
//! point the dispatch layer calls.

/// Inputs of one PReLU run over a contiguous span of elements
///
/// Computes: out[i] = x[i] < 0 ? x[i] * weights[i % weights.len()] : x[i]
///
/// # Arguments
/// * `x_data` - Input elements
/// * `weights` - Per-channel slopes, cycled across `x_data`
/// * `out_data` - Output buffer, same length as `x_data`
struct PreluParams<'a> {
    x_data: &'a [f32],
    weights: &'a [f32],
    out_data: &'a mut [f32],
}

pub mod cache;
pub mod cpu_prelu;
pub mod operator;
pub mod prelu;

pub use cache::{CacheStats, OperatorCache};
pub use operator::{Operator, PreluOperator};
pub use prelu::prelu;
