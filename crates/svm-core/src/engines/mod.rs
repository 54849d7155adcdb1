//! Pipelined scoring engines
//!
//! - **Linear**: multiply, reduce over N, bias, saturate.
//! - **Kernel**: distance to each of M support vectors, table lookup,
//!   coefficient weighting, reduce over M, bias, saturate.
//!
//! Both share the reduction tree and output stage in [`tree`].

pub mod kernel;
pub mod linear;
mod tree;

pub use kernel::KernelScorer;
pub use linear::LinearScorer;
