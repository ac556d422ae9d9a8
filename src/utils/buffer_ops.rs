/// Dot product of `kernel` against a delay window whose newest sample is last.
///
/// `kernel[0]` multiplies the newest sample, `kernel[n - 1]` the oldest.
/// Accumulates in four independent lanes; both slices must have the same
/// length, a multiple of four.
#[inline]
pub fn convolve_window(kernel: &[f32], window: &[f32]) -> f32 {
    debug_assert_eq!(kernel.len(), window.len());
    debug_assert_eq!(kernel.len() % 4, 0);

    let mut acc = [0.0f32; 4];
    for (k, w) in kernel.chunks_exact(4).zip(window.rchunks_exact(4)) {
        // `w` is in time order, so the newest sample of this chunk is w[3].
        acc[0] += k[0] * w[3];
        acc[1] += k[1] * w[2];
        acc[2] += k[2] * w[1];
        acc[3] += k[3] * w[0];
    }
    (acc[0] + acc[1]) + (acc[2] + acc[3])
}

/// Sum of absolute values.
#[inline]
pub fn l1_norm(values: &[f32]) -> f32 {
    values.iter().map(|v| v.abs()).sum()
}

#[inline]
pub fn scale_buffer(buffer: &mut [f32], factor: f32) {
    for sample in buffer.iter_mut() {
        *sample *= factor;
    }
}

#[inline(always)]
pub fn db_to_linear(db: f32) -> f32 {
    10.0_f32.powf(db * 0.05) // 0.05 is 1/20
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convolve_window_reverses_time() {
        let kernel = vec![1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.5];
        let window = vec![8.0, 7.0, 6.0, 5.0, 4.0, 3.0, 2.0, 1.0];

        // newest (1.0) * 1.0 + oldest (8.0) * 0.5
        assert_eq!(convolve_window(&kernel, &window), 5.0);
    }

    #[test]
    fn test_convolve_window_matches_naive_sum() {
        let kernel: Vec<f32> = (0..64).map(|i| ((i * 7) % 13) as f32 * 0.01 - 0.06).collect();
        let window: Vec<f32> = (0..64).map(|i| (i as f32 * 0.37).sin()).collect();

        let naive: f32 = kernel
            .iter()
            .enumerate()
            .map(|(j, k)| k * window[window.len() - 1 - j])
            .sum();

        assert!((convolve_window(&kernel, &window) - naive).abs() < 1e-5);
    }

    #[test]
    fn test_db_to_linear() {
        assert!((db_to_linear(0.0) - 1.0).abs() < 1e-6);
        assert!((db_to_linear(20.0) - 10.0).abs() < 1e-4);
        assert!((db_to_linear(-6.0) - 0.501_187).abs() < 1e-5);
    }

    #[test]
    fn test_l1_norm_and_scale() {
        let mut buffer = vec![1.0, -2.0, 3.0, -4.0];
        assert_eq!(l1_norm(&buffer), 10.0);
        scale_buffer(&mut buffer, 0.1);
        assert!((l1_norm(&buffer) - 1.0).abs() < 1e-6);
    }
}
