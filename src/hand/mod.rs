pub mod landmark;

pub use landmark::{HandJointIndex, HandSnapshot, Handedness, Landmark, LandmarkSet};
