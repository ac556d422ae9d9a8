/// Amounts below this leave the signal untouched.
pub const SATURATION_THRESHOLD: f32 = 1e-3;

/// Normalized tanh soft clipper.
///
/// `drive = 1 + 4 * amount`, and the curve is divided by `tanh(drive)` so a
/// full-scale input still maps to full scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SoftClip {
    drive: f32,
    norm: f32,
}

impl SoftClip {
    /// `None` when `amount` is too small to have any effect.
    pub fn new(amount: f32) -> Option<Self> {
        if amount < SATURATION_THRESHOLD {
            return None;
        }
        let drive = 1.0 + 4.0 * amount;
        Some(Self {
            drive,
            norm: 1.0 / drive.tanh(),
        })
    }

    pub fn drive(&self) -> f32 {
        self.drive
    }

    #[inline]
    pub fn apply(&self, x: f32) -> f32 {
        (x * self.drive).tanh() * self.norm
    }
}
