//! Pipeline depth of each engine.
//!
//! Every stage is one register; the pipeline never stalls, so latency is a
//! pure function of the geometry.
//!
//! ```text
//! linear:  multiply │ tree level × ⌈log2 N⌉ │ rescale+saturate+classify
//! kernel:  distance │ lookup │ weight │ tree level × ⌈log2 M⌉ │ rescale+saturate+classify
//! ```
//!
//! Reference build (N=16): linear 6 cycles; kernel with M=16: 8 cycles.

use crate::geometry::{Engine, Geometry};

/// Stages outside the tree in the linear engine (multiply, output).
pub const LINEAR_FIXED_STAGES: u32 = 2;
/// Stages outside the tree in the kernel engine (distance, lookup, weight, output).
pub const KERNEL_FIXED_STAGES: u32 = 4;

/// Levels of a pairwise reduction over `inputs` terms: ⌈log2 inputs⌉.
///
/// A single term needs no level.
#[must_use]
pub const fn tree_levels(inputs: usize) -> u32 {
    if inputs <= 1 {
        0
    } else {
        usize::BITS - (inputs - 1).leading_zeros()
    }
}

/// Cycles from the input-valid cycle to the output-valid cycle.
#[must_use]
pub const fn latency(geometry: &Geometry) -> u32 {
    let fixed = match geometry.engine {
        Engine::Linear => LINEAR_FIXED_STAGES,
        Engine::Kernel => KERNEL_FIXED_STAGES,
    };
    fixed + tree_levels(geometry.reduction_inputs())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tree_levels_is_ceil_log2() {
        assert_eq!(tree_levels(0), 0);
        assert_eq!(tree_levels(1), 0);
        assert_eq!(tree_levels(2), 1);
        assert_eq!(tree_levels(3), 2);
        assert_eq!(tree_levels(16), 4);
        assert_eq!(tree_levels(17), 5);
        assert_eq!(tree_levels(20), 5);
    }

    #[test]
    fn reference_build_latencies() {
        assert_eq!(latency(&Geometry::linear(16)), 6);
        assert_eq!(latency(&Geometry::kernel(16, 16)), 8);
        assert_eq!(latency(&Geometry::linear(1)), 2);
        assert_eq!(latency(&Geometry::kernel(16, 1)), 4);
    }
}
