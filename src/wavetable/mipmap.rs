use dasp_sample::Sample;
use rustfft::{num_complex::Complex, FftPlanner};

use super::{WaveTableBuffer, WavetableInfo, MAX_LEVEL_SIZE, MAX_WAVES, MIP_LEVELS};
use crate::error::LoadError;

/// Writes every frame into the buffer at each level in [`MIP_LEVELS`].
///
/// Each level is band-limited by discarding the partials that do not fit
/// below its Nyquist bin, then resynthesised at the level's length. Frames
/// may have any length; shorter frames are zero-padded in the spectrum.
pub fn write_mipmaps<F: AsRef<[f32]>>(
    frames: &[F],
    buffer: &mut WaveTableBuffer,
) -> Result<WavetableInfo, LoadError> {
    let num_waves = frames.len();
    if num_waves == 0 {
        return Err(LoadError::Empty);
    }
    if num_waves > MAX_WAVES || 2 * MAX_LEVEL_SIZE * num_waves > buffer.capacity() {
        return Err(LoadError::TooManyWaves(num_waves));
    }

    buffer.clear();

    let mut planner = FftPlanner::<f32>::new();
    let mut spectrum: Vec<Complex<f32>> = Vec::new();
    let mut level: Vec<Complex<f32>> = Vec::with_capacity(MAX_LEVEL_SIZE);

    for (wave, frame) in frames.iter().enumerate() {
        let frame = frame.as_ref();
        let frame_len = frame.len();
        if frame_len == 0 {
            continue;
        }

        spectrum.clear();
        spectrum.extend(frame.iter().map(|&s| Complex::new(s, 0.0)));
        planner.plan_fft_forward(frame_len).process(&mut spectrum);

        let scale = 1.0 / frame_len as f32;
        for &size in MIP_LEVELS.iter() {
            level.clear();
            level.resize(size, Complex::new(0.0, 0.0));

            // Copy partials 1..half, keeping DC; the level's Nyquist stays zero.
            let half = size.min(frame_len) / 2;
            level[0] = spectrum[0];
            for k in 1..half {
                level[k] = spectrum[k];
                level[size - k] = spectrum[frame_len - k];
            }

            planner.plan_fft_inverse(size).process(&mut level);

            if let Some(dest) = buffer.snapshot_mut(size, num_waves, wave) {
                for (d, c) in dest.iter_mut().zip(level.iter()) {
                    *d = (c.re * scale).clamp(-1.0, 1.0).to_sample::<i16>();
                }
            }
        }
    }

    let info = WavetableInfo {
        num_waves,
        using_mipmaps: true,
    };
    buffer.set_info(info);
    Ok(info)
}
