//! PReLU kernel entry point called by the dispatch layer.

use tracing::instrument;

use super::cache::OperatorCache;
use super::operator::PreluOperator;
use crate::error::{BackendError, Result};
use crate::tensor::{DType, TensorId, TensorInfo, TensorRegistry};

/// Run PReLU over the first `x_size` elements of `x_id`, writing into `out_id`.
///
/// The operator is resolved through `cache` keyed by `weights_id`, so the
/// weights are only read the first time that id is seen. `x_id` and `out_id`
/// may name the same tensor. On error nothing in the cache changes and
/// `out_id`'s buffer is left untouched.
#[instrument(skip(registry, cache), fields(x = %x_id, weights = %weights_id, out = %out_id))]
pub fn prelu(
    registry: &mut TensorRegistry,
    cache: &mut OperatorCache<PreluOperator>,
    x_id: TensorId,
    x_size: usize,
    weights_id: TensorId,
    out_id: TensorId,
) -> Result<()> {
    check_operand(registry.get(x_id)?, x_size)?;
    check_operand(registry.get(out_id)?, x_size)?;

    let operator = cache.acquire(weights_id, registry)?;

    if x_id == out_id {
        let data = registry.get_mut(out_id)?.f32_write()?;
        operator.run_in_place(&mut data[..x_size])
    } else {
        let (x, out) = registry.get_pair_mut(x_id, out_id)?;
        operator.run(&x.f32()?[..x_size], &mut out.f32_write()?[..x_size])
    }
}

fn check_operand(tensor: &TensorInfo, x_size: usize) -> Result<()> {
    if tensor.dtype() != DType::Float32 {
        return Err(BackendError::DTypeMismatch {
            id: tensor.id(),
            expected: DType::Float32,
            actual: tensor.dtype(),
        });
    }
    if x_size > tensor.size() {
        return Err(BackendError::ElementCountOutOfRange {
            id: tensor.id(),
            requested: x_size,
            available: tensor.size(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::BackendConfig;
    use crate::error::ConstructionError;

    fn setup(tensors: &[(u32, Vec<usize>, Vec<f32>)]) -> (TensorRegistry, OperatorCache<PreluOperator>) {
        let mut registry = TensorRegistry::new();
        for (id, shape, values) in tensors {
            registry
                .register(TensorId(*id), shape.clone(), values.clone().into())
                .unwrap();
        }
        (registry, OperatorCache::new(BackendConfig::default()))
    }

    fn values(registry: &TensorRegistry, id: u32) -> Vec<f32> {
        registry.get(TensorId(id)).unwrap().f32().unwrap().to_vec()
    }

    #[test]
    fn test_prelu_writes_output() {
        let (mut registry, mut cache) = setup(&[
            (0, vec![2], vec![-2.0, 3.0]),
            (1, vec![2], vec![0.5, 0.5]),
            (2, vec![2], vec![0.0, 0.0]),
        ]);

        prelu(&mut registry, &mut cache, TensorId(0), 2, TensorId(1), TensorId(2)).unwrap();
        assert_eq!(values(&registry, 2), vec![-1.0, 3.0]);
        assert_eq!(values(&registry, 0), vec![-2.0, 3.0]);
    }

    #[test]
    fn test_partial_element_count_leaves_tail() {
        let (mut registry, mut cache) = setup(&[
            (0, vec![3], vec![-2.0, -2.0, -2.0]),
            (1, vec![1], vec![0.5]),
            (2, vec![3], vec![9.0, 9.0, 9.0]),
        ]);

        prelu(&mut registry, &mut cache, TensorId(0), 2, TensorId(1), TensorId(2)).unwrap();
        assert_eq!(values(&registry, 2), vec![-1.0, -1.0, 9.0]);
    }

    #[test]
    fn test_in_place_when_x_is_out() {
        let (mut registry, mut cache) = setup(&[
            (0, vec![2, 2], vec![-1.0, -2.0, 3.0, -4.0]),
            (1, vec![2], vec![2.0, 0.5]),
        ]);

        prelu(&mut registry, &mut cache, TensorId(0), 4, TensorId(1), TensorId(0)).unwrap();
        assert_eq!(values(&registry, 0), vec![-2.0, -1.0, 3.0, -2.0]);
    }

    #[test]
    fn test_unknown_operands_do_not_touch_cache() {
        let (mut registry, mut cache) = setup(&[(0, vec![1], vec![1.0]), (1, vec![1], vec![1.0])]);

        assert_eq!(
            prelu(&mut registry, &mut cache, TensorId(9), 1, TensorId(1), TensorId(0)),
            Err(BackendError::UnknownTensor(TensorId(9)))
        );
        assert_eq!(
            prelu(&mut registry, &mut cache, TensorId(0), 1, TensorId(1), TensorId(8)),
            Err(BackendError::UnknownTensor(TensorId(8)))
        );
        assert_eq!(cache.size(), 0);
    }

    #[test]
    fn test_unknown_weights_is_a_construction_error() {
        let (mut registry, mut cache) = setup(&[(0, vec![1], vec![1.0]), (1, vec![1], vec![0.0])]);

        assert_eq!(
            prelu(&mut registry, &mut cache, TensorId(0), 1, TensorId(4), TensorId(1)),
            Err(BackendError::Construction(ConstructionError::UnknownWeights(TensorId(4))))
        );
        assert_eq!(cache.size(), 0);
        assert_eq!(values(&registry, 1), vec![0.0]);
    }

    #[test]
    fn test_element_count_bounds() {
        let (mut registry, mut cache) = setup(&[
            (0, vec![2], vec![-1.0, -1.0]),
            (1, vec![1], vec![0.5]),
            (2, vec![1], vec![0.0]),
        ]);

        assert_eq!(
            prelu(&mut registry, &mut cache, TensorId(0), 2, TensorId(1), TensorId(2)),
            Err(BackendError::ElementCountOutOfRange {
                id: TensorId(2),
                requested: 2,
                available: 1
            })
        );
        assert_eq!(cache.size(), 0);
    }

    #[test]
    fn test_non_float_input_rejected() {
        let (mut registry, mut cache) = setup(&[(1, vec![1], vec![0.5]), (2, vec![1], vec![0.0])]);
        registry
            .register(TensorId(0), vec![1], vec![-1i32].into())
            .unwrap();

        assert!(matches!(
            prelu(&mut registry, &mut cache, TensorId(0), 1, TensorId(1), TensorId(2)),
            Err(BackendError::DTypeMismatch { .. })
        ));
    }
}
