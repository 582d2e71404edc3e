use crate::tensor::kernels::PreluParams;

/// Parametric ReLU over a span, writing into a separate output buffer
pub(crate) fn prelu_core(params: PreluParams) {
    let PreluParams {
        x_data,
        weights,
        out_data,
    } = params;

    assert!(!weights.is_empty(), "PReLU needs at least one channel");
    assert_eq!(x_data.len(), out_data.len(), "Output buffer size mismatch");

    // Weights repeat every `channels` elements
    for (row_x, row_out) in x_data
        .chunks(weights.len())
        .zip(out_data.chunks_mut(weights.len()))
    {
        for ((out, &x), &w) in row_out.iter_mut().zip(row_x).zip(weights) {
            *out = if x < 0.0 { x * w } else { x };
        }
    }
}

/// Same rule as [`prelu_core`], for callers whose input and output alias
pub(crate) fn prelu_in_place(data: &mut [f32], weights: &[f32]) {
    assert!(!weights.is_empty(), "PReLU needs at least one channel");

    for row in data.chunks_mut(weights.len()) {
        for (v, &w) in row.iter_mut().zip(weights) {
            if *v < 0.0 {
                *v *= w;
            }
        }
    }
}

/// Applies PReLU and returns a freshly allocated output
///
/// # Arguments
/// * `x_data` - Input elements
/// * `weights` - Per-channel slopes, cycled across the input
///
/// # Panics
/// * If `weights` is empty
pub fn prelu(x_data: &[f32], weights: &[f32]) -> Vec<f32> {
    let mut result = vec![0.0; x_data.len()];

    prelu_core(PreluParams {
        x_data,
        weights,
        out_data: &mut result,
    });

    result
}
