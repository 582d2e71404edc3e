//! Operator objects: configured computation handles built from a weights tensor
//!
//! An operator is constructed once against the weights tensor's current data
//! and shape, then run any number of times against different inputs. Its
//! resources are released by an explicit [`Operator::destroy`] call, which the
//! operator cache issues exactly once per operator.

use std::cell::RefCell;

use tracing::{debug_span, instrument};

use super::cpu_prelu;
use crate::backend::BackendConfig;
use crate::error::{BackendError, ConstructionError, Result};
use crate::tensor::{DType, TensorId, TensorInfo};

/// A computation object parameterized by one weights tensor
pub trait Operator {
    /// Short kernel name used in logs
    const NAME: &'static str;

    /// Build an operator from the weights tensor's current buffer and shape
    fn create(
        weights: &TensorInfo,
        config: &BackendConfig,
    ) -> std::result::Result<Self, ConstructionError>
    where
        Self: Sized;

    /// Release the operator's resources; later runs must fail
    fn destroy(&self);

    /// Whether `destroy` has not been called yet
    fn is_live(&self) -> bool;
}

/// PReLU operator with its slopes packed into an operator-owned buffer
#[derive(Debug)]
pub struct PreluOperator {
    weights_id: TensorId,
    channels: usize,
    // `None` once destroyed
    packed_weights: RefCell<Option<Box<[f32]>>>,
}

impl PreluOperator {
    pub fn weights_id(&self) -> TensorId {
        self.weights_id
    }

    /// Number of channels (the weights element count)
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Run over `x_data`, writing `out_data`; both spans must have equal length
    #[instrument(skip_all, fields(
        op = "prelu",
        weights = %self.weights_id,
        channels = self.channels,
        len = x_data.len()
    ))]
    pub fn run(&self, x_data: &[f32], out_data: &mut [f32]) -> Result<()> {
        let packed = self.packed_weights.borrow();
        let weights = packed
            .as_deref()
            .ok_or(BackendError::OperatorReleased(self.weights_id))?;

        debug_span!("PreluRun").in_scope(|| {
            cpu_prelu::prelu_core(super::PreluParams {
                x_data,
                weights,
                out_data,
            })
        });
        Ok(())
    }

    /// Run with input and output sharing one buffer
    #[instrument(skip_all, fields(op = "prelu", weights = %self.weights_id, len = data.len()))]
    pub fn run_in_place(&self, data: &mut [f32]) -> Result<()> {
        let packed = self.packed_weights.borrow();
        let weights = packed
            .as_deref()
            .ok_or(BackendError::OperatorReleased(self.weights_id))?;

        debug_span!("PreluRunInPlace").in_scope(|| cpu_prelu::prelu_in_place(data, weights));
        Ok(())
    }
}

impl Operator for PreluOperator {
    const NAME: &'static str = "prelu";

    fn create(
        weights: &TensorInfo,
        config: &BackendConfig,
    ) -> std::result::Result<Self, ConstructionError> {
        let id = weights.id();
        if weights.dtype() != DType::Float32 {
            return Err(ConstructionError::UnsupportedDType {
                id,
                dtype: weights.dtype(),
            });
        }
        if weights.rank() > config.max_weights_rank {
            return Err(ConstructionError::UnsupportedRank {
                id,
                rank: weights.rank(),
                max: config.max_weights_rank,
            });
        }
        if weights.size() == 0 {
            return Err(ConstructionError::EmptyWeights(id));
        }

        let values = weights
            .f32()
            .map_err(|_| ConstructionError::UnsupportedDType {
                id,
                dtype: weights.dtype(),
            })?;
        let packed: Box<[f32]> =
            debug_span!("PackWeights", channels = values.len()).in_scope(|| values.into());

        Ok(PreluOperator {
            weights_id: id,
            channels: packed.len(),
            packed_weights: RefCell::new(Some(packed)),
        })
    }

    fn destroy(&self) {
        self.packed_weights.borrow_mut().take();
    }

    fn is_live(&self) -> bool {
        self.packed_weights.borrow().is_some()
    }
}
