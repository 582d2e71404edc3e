//! Weights-keyed operator cache
//!
//! Operators are expensive to build, so each kernel keeps the operator it
//! built for a weights tensor and hands the same handle back for every later
//! call with that weights id. The key is the tensor's identity, never its
//! contents. An entry lives until its weights tensor is disposed (see
//! [`OperatorCache::invalidate`]) or the whole cache is torn down.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use tracing::{debug, info, instrument, warn};

use super::operator::Operator;
use crate::backend::BackendConfig;
use crate::error::ConstructionError;
use crate::tensor::{TensorId, TensorRegistry};

struct CacheEntry<O> {
    operator: Rc<O>,
    reuse_count: u64,
}

impl<O> CacheEntry<O> {
    fn new(operator: Rc<O>) -> Self {
        Self {
            operator,
            reuse_count: 0,
        }
    }
}

#[derive(Debug, Default)]
struct CacheCounters {
    hits: u64,
    misses: u64,
    constructed: u64,
    destroyed: u64,
}

/// Snapshot of an operator cache's counters.
///
/// `constructed - destroyed` always equals `live`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub live: usize,
    pub hits: u64,
    pub misses: u64,
    pub constructed: u64,
    pub destroyed: u64,
}

pub struct OperatorCache<O: Operator> {
    entries: HashMap<TensorId, CacheEntry<O>>,
    counters: CacheCounters,
    config: BackendConfig,
}

impl<O: Operator> OperatorCache<O> {
    pub fn new(config: BackendConfig) -> Self {
        Self {
            entries: HashMap::new(),
            counters: CacheCounters::default(),
            config,
        }
    }

    /// Return the operator built for `weights_id`, building it on first use.
    ///
    /// A cached operator is returned as-is: the weights buffer is not read
    /// again. On a miss the weights tensor is looked up in `registry` and the
    /// new operator is inserted. A failed construction leaves the cache as it
    /// was.
    #[instrument(skip(self, registry), fields(kernel = O::NAME))]
    pub fn acquire(
        &mut self,
        weights_id: TensorId,
        registry: &TensorRegistry,
    ) -> Result<Rc<O>, ConstructionError> {
        if let Some(entry) = self.entries.get_mut(&weights_id) {
            entry.reuse_count += 1;
            self.counters.hits += 1;
            let operator = Rc::clone(&entry.operator);
            self.log_event("hit", weights_id);
            return Ok(operator);
        }

        self.counters.misses += 1;
        let weights = registry
            .get(weights_id)
            .map_err(|_| ConstructionError::UnknownWeights(weights_id))?;
        let operator = Rc::new(O::create(weights, &self.config)?);

        self.counters.constructed += 1;
        self.entries
            .insert(weights_id, CacheEntry::new(Rc::clone(&operator)));
        self.log_event("create", weights_id);
        Ok(operator)
    }

    /// Destroy the operator keyed by `tensor_id`, if there is one.
    ///
    /// Called for every disposed tensor. Ids that are not cache keys (inputs,
    /// outputs, already invalidated weights) are a no-op. Returns whether an
    /// operator was destroyed.
    pub fn invalidate(&mut self, tensor_id: TensorId) -> bool {
        let Some(entry) = self.entries.remove(&tensor_id) else {
            return false;
        };
        entry.operator.destroy();
        self.counters.destroyed += 1;
        self.log_event("destroy", tensor_id);
        true
    }

    /// Destroy every remaining operator. Returns how many were destroyed.
    pub fn teardown(&mut self) -> usize {
        let count = self.entries.len();
        for (_, entry) in self.entries.drain() {
            entry.operator.destroy();
        }
        self.counters.destroyed += count as u64;
        if count > 0 {
            debug!(kernel = O::NAME, destroyed = count, "operator cache torn down");
        }
        count
    }

    /// Number of live operators
    pub fn size(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, weights_id: TensorId) -> bool {
        self.entries.contains_key(&weights_id)
    }

    /// How many hits the entry for `weights_id` has served
    pub fn reuse_count(&self, weights_id: TensorId) -> Option<u64> {
        self.entries.get(&weights_id).map(|entry| entry.reuse_count)
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            live: self.entries.len(),
            hits: self.counters.hits,
            misses: self.counters.misses,
            constructed: self.counters.constructed,
            destroyed: self.counters.destroyed,
        }
    }

    fn log_event(&self, event: &'static str, weights_id: TensorId) {
        if self.config.debug_cache_events {
            info!(kernel = O::NAME, event, weights = %weights_id, live = self.entries.len(), "operator cache");
        } else {
            debug!(kernel = O::NAME, event, weights = %weights_id, live = self.entries.len(), "operator cache");
        }
    }
}

impl<O: Operator> Drop for OperatorCache<O> {
    fn drop(&mut self) {
        if !self.entries.is_empty() {
            warn!(
                kernel = O::NAME,
                live = self.entries.len(),
                "operator cache dropped without teardown"
            );
            self.teardown();
        }
    }
}

impl<O: Operator> fmt::Debug for OperatorCache<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<_> = self.entries.keys().copied().collect();
        keys.sort();
        f.debug_struct("OperatorCache")
            .field("kernel", &O::NAME)
            .field("keys", &keys)
            .field("counters", &self.counters)
            .finish()
    }
}
