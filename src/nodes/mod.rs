pub mod convolver;
pub mod crossfade;
pub mod saturation;

pub use convolver::*;
pub use crossfade::*;
pub use saturation::*;
