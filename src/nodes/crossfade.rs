/// Linear ramp between the active and pending kernel sets.
///
/// One ramp is shared by every channel and advanced once per sample. The
/// ramp length is counted in whole samples so a fade always lasts exactly
/// `ceil(1 / rate)` steps.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Crossfade {
    mixing: bool,
    elapsed: u32,
    length: u32,
    rate: f32,
}

impl Crossfade {
    pub fn new(crossfade_ms: f32, sample_rate: f32) -> Self {
        // ms * sr first keeps whole-sample fades exact
        let samples = (f64::from(crossfade_ms) * f64::from(sample_rate) / 1000.0).max(1.0);
        Self {
            mixing: false,
            elapsed: 0,
            length: samples.ceil() as u32,
            rate: (1.0 / samples) as f32,
        }
    }

    /// Starts (or restarts) a fade from zero.
    pub fn start(&mut self) {
        self.mixing = true;
        self.elapsed = 0;
    }

    pub fn cancel(&mut self) {
        self.mixing = false;
        self.elapsed = 0;
    }

    pub fn is_mixing(&self) -> bool {
        self.mixing
    }

    pub fn mix(&self) -> f32 {
        (self.elapsed as f32 * self.rate).min(1.0)
    }

    pub fn rate(&self) -> f32 {
        self.rate
    }

    /// Number of samples a full fade takes.
    pub fn length(&self) -> usize {
        self.length as usize
    }

    /// Steps the ramp by one sample. Returns true when the fade just ended
    /// and the pending set should become active.
    #[inline]
    pub fn advance(&mut self) -> bool {
        if !self.mixing {
            return false;
        }
        self.elapsed += 1;
        if self.elapsed >= self.length {
            self.mixing = false;
            self.elapsed = 0;
            return true;
        }
        false
    }

    #[inline]
    pub fn blend(&self, old: f32, new: f32) -> f32 {
        let mix = self.mix();
        old * (1.0 - mix) + new * mix
    }
}
