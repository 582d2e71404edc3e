//! Tensor registry: owns every live tensor buffer, keyed by id.

use std::collections::HashMap;

use tracing::{debug, instrument};

use super::core::{TensorData, TensorId, TensorInfo};
use crate::error::{BackendError, Result};

#[derive(Debug, Default)]
pub struct TensorRegistry {
    tensors: HashMap<TensorId, TensorInfo>,
}

impl TensorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tensor under `id`.
    ///
    /// Fails if the shape does not describe the buffer or if `id` is
    /// already live. The registry is left unchanged on failure.
    #[instrument(skip(self, data), fields(dtype = %data.dtype(), numel = data.len()))]
    pub fn register(&mut self, id: TensorId, shape: Vec<usize>, data: TensorData) -> Result<()> {
        if self.tensors.contains_key(&id) {
            return Err(BackendError::DuplicateTensor(id));
        }
        let info = TensorInfo::new(id, shape, data)?;
        self.tensors.insert(id, info);
        Ok(())
    }

    pub fn get(&self, id: TensorId) -> Result<&TensorInfo> {
        self.tensors.get(&id).ok_or(BackendError::UnknownTensor(id))
    }

    pub fn get_mut(&mut self, id: TensorId) -> Result<&mut TensorInfo> {
        self.tensors
            .get_mut(&id)
            .ok_or(BackendError::UnknownTensor(id))
    }

    /// Borrow an input tensor and a distinct output tensor at the same time.
    ///
    /// `input` and `output` must differ; aliasing callers go through
    /// [`TensorRegistry::get_mut`] instead.
    pub fn get_pair_mut(
        &mut self,
        input: TensorId,
        output: TensorId,
    ) -> Result<(&TensorInfo, &mut TensorInfo)> {
        debug_assert_ne!(input, output, "input and output tensors alias");
        match self.tensors.get_disjoint_mut([&input, &output]) {
            [Some(x), Some(out)] => Ok((&*x, out)),
            [None, _] => Err(BackendError::UnknownTensor(input)),
            [_, None] => Err(BackendError::UnknownTensor(output)),
        }
    }

    pub fn contains(&self, id: TensorId) -> bool {
        self.tensors.contains_key(&id)
    }

    /// Remove a tensor, returning it if it was live.
    ///
    /// Unknown ids are ignored so disposal stays total.
    pub fn dispose(&mut self, id: TensorId) -> Option<TensorInfo> {
        let removed = self.tensors.remove(&id);
        if removed.is_none() {
            debug!(id = %id, "dispose of unregistered tensor ignored");
        }
        removed
    }

    pub fn num_tensors(&self) -> usize {
        self.tensors.len()
    }

    /// Drop every tensor
    pub fn clear(&mut self) {
        self.tensors.clear();
    }
}
