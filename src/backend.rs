//! Backend context: configuration, tensor registry and kernel operator caches
//!
//! A `BackendContext` is created by [`BackendContext::init`] and torn down by
//! [`BackendContext::dispose`]. It owns every piece of mutable backend state,
//! so there is no process-wide registry or cache.
//!
//! The configuration can be controlled via:
//! 1. Runtime configuration (`BackendConfig` builder methods)
//! 2. Environment variables (for easy experimentation)

use tracing::{info, instrument, warn};

use crate::error::Result;
use crate::tensor::kernels::{self, CacheStats, OperatorCache, PreluOperator};
use crate::tensor::{TensorData, TensorId, TensorInfo, TensorRegistry};

/// Environment variable overriding [`BackendConfig::max_weights_rank`]
pub const MAX_RANK_ENV: &str = "TENSOR_OPCACHE_MAX_RANK";
/// Environment variable enabling [`BackendConfig::debug_cache_events`]
pub const DEBUG_CACHE_ENV: &str = "TENSOR_OPCACHE_DEBUG_CACHE";

const DEFAULT_MAX_WEIGHTS_RANK: usize = 4;

/// Configuration for operator construction and cache logging
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    /// Highest weights rank an operator accepts at construction
    pub max_weights_rank: usize,
    /// Log cache hits, misses and destroys at info level instead of debug
    pub debug_cache_events: bool,
}

impl Default for BackendConfig {
    fn default() -> Self {
        // Check environment variables for overrides
        let max_weights_rank = std::env::var(MAX_RANK_ENV)
            .ok()
            .and_then(|s| s.trim().parse().ok())
            .filter(|&rank: &usize| rank > 0)
            .unwrap_or(DEFAULT_MAX_WEIGHTS_RANK);

        let debug_cache_events = std::env::var(DEBUG_CACHE_ENV)
            .map(|v| v == "1" || v.to_lowercase() == "true")
            .unwrap_or(false);

        Self {
            max_weights_rank,
            debug_cache_events,
        }
    }
}

impl BackendConfig {
    /// Create a config with a specific maximum weights rank
    pub fn with_max_weights_rank(mut self, max_weights_rank: usize) -> Self {
        self.max_weights_rank = max_weights_rank;
        self
    }

    /// Create a config with cache event logging switched on or off
    pub fn with_debug_cache_events(mut self, enabled: bool) -> Self {
        self.debug_cache_events = enabled;
        self
    }
}

/// Owned backend state for one session
#[derive(Debug)]
pub struct BackendContext {
    config: BackendConfig,
    registry: TensorRegistry,
    prelu_cache: OperatorCache<PreluOperator>,
}

impl BackendContext {
    /// Start a session with an empty registry and empty caches
    pub fn init() -> Self {
        Self::with_config(BackendConfig::default())
    }

    pub fn with_config(config: BackendConfig) -> Self {
        info!(?config, "backend initialized");
        Self {
            prelu_cache: OperatorCache::new(config.clone()),
            registry: TensorRegistry::new(),
            config,
        }
    }

    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    /// Register a tensor; its dtype is the dtype of `data`
    #[instrument(skip(self, data))]
    pub fn register_tensor(
        &mut self,
        id: TensorId,
        shape: Vec<usize>,
        data: impl Into<TensorData>,
    ) -> Result<()> {
        self.registry.register(id, shape, data.into())
    }

    /// Dispose a tensor and drop any operator it parameterized.
    ///
    /// Registry removal happens first, then cache invalidation, both before
    /// this returns. Unknown ids are accepted. Returns whether a tensor was
    /// removed.
    #[instrument(skip(self))]
    pub fn dispose_data(&mut self, id: TensorId) -> bool {
        let removed = self.registry.dispose(id).is_some();
        self.prelu_cache.invalidate(id);
        removed
    }

    pub fn tensor(&self, id: TensorId) -> Result<&TensorInfo> {
        self.registry.get(id)
    }

    /// Mutable access to a registered tensor.
    ///
    /// Writing a weights tensor in place does not rebuild operators already
    /// built from it; only disposal does.
    pub fn tensor_mut(&mut self, id: TensorId) -> Result<&mut TensorInfo> {
        self.registry.get_mut(id)
    }

    pub fn num_tensors(&self) -> usize {
        self.registry.num_tensors()
    }

    /// Number of live operators across all kernel caches
    pub fn operator_count(&self) -> usize {
        self.prelu_cache.size()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.prelu_cache.stats()
    }

    /// PReLU kernel: `out[..x_size] = prelu(x[..x_size], weights)`.
    ///
    /// Failures are logged and returned; the cache and every tensor other
    /// than `out_id` are unaffected.
    pub fn prelu(
        &mut self,
        x_id: TensorId,
        x_size: usize,
        weights_id: TensorId,
        out_id: TensorId,
    ) -> Result<()> {
        kernels::prelu(
            &mut self.registry,
            &mut self.prelu_cache,
            x_id,
            x_size,
            weights_id,
            out_id,
        )
        .inspect_err(|err| warn!(%err, kernel = "prelu", "kernel invocation failed"))
    }

    /// End the session: destroy every operator, then drop every tensor
    pub fn dispose(mut self) {
        let destroyed = self.prelu_cache.teardown();
        let tensors = self.registry.num_tensors();
        self.registry.clear();
        info!(destroyed, tensors, "backend disposed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builders() {
        let config = BackendConfig::default()
            .with_max_weights_rank(2)
            .with_debug_cache_events(true);
        assert_eq!(config.max_weights_rank, 2);
        assert!(config.debug_cache_events);
    }

    #[test]
    fn test_init_is_empty() {
        let backend = BackendContext::init();
        assert_eq!(backend.num_tensors(), 0);
        assert_eq!(backend.operator_count(), 0);
        assert_eq!(backend.cache_stats(), CacheStats::default());
        backend.dispose();
    }

    #[test]
    fn test_dispose_of_unknown_id_is_accepted() {
        let mut backend = BackendContext::init();
        assert!(!backend.dispose_data(TensorId(12)));
        assert_eq!(backend.operator_count(), 0);
    }

    #[test]
    fn test_disposing_weights_drops_operator() {
        let mut backend = BackendContext::init();
        backend
            .register_tensor(TensorId(0), vec![2], vec![-1.0f32, 1.0])
            .unwrap();
        backend
            .register_tensor(TensorId(1), vec![1], vec![0.5f32])
            .unwrap();

        backend
            .prelu(TensorId(0), 2, TensorId(1), TensorId(0))
            .unwrap();
        assert_eq!(backend.operator_count(), 1);

        assert!(backend.dispose_data(TensorId(1)));
        assert_eq!(backend.operator_count(), 0);
        assert_eq!(backend.num_tensors(), 1);
        assert_eq!(backend.tensor(TensorId(0)).unwrap().f32().unwrap(), &[-0.5, 1.0]);
    }
}
