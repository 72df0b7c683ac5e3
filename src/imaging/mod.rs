//! Pure image processing used by the picker. Nothing in here knows about
//! widgets; every function takes buffers in and hands new buffers back.

pub mod color;
pub mod distance;
pub mod loader;
pub mod mask;
pub mod median;
pub mod overlay;
pub mod sampler;
pub mod scaler;

pub use color::ReferenceColor;
pub use distance::{compute_distance_map, round_cutoff, threshold, Thresholded};
pub use loader::load_image;
pub use mask::ThresholdMask;
pub use median::{median_filter, MedianWindow};
pub use overlay::{compose, Derived};
pub use sampler::sample_mean;
pub use scaler::{scale_mask, scale_rgb};
