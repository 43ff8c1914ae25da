//! Data profiling primitives reported before normalization.

mod depth;

pub use depth::{profile_depth, DepthProfile};
