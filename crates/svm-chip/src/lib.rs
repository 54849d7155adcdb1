//! Silicon model of the fixed-point SVM classifier core.
//!
//! This crate has **no dependencies** and **no simulation state**. It is a
//! pure description of the hardware block as the host sees it: register
//! offsets and bit definitions, the build-time geometry (feature count N,
//! support-vector count M), the register-block layout derived from that
//! geometry, and the pipeline latency formulas.
//!
//! # Crate organisation
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`regs`] | Fixed register offsets and control/status bit definitions |
//! | [`geometry`] | Engine selection and N/M build parameters |
//! | [`layout`] | Operand block placement and address decoding |
//! | [`timing`] | Reduction-tree depth and end-to-end latency per engine |

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod geometry;
pub mod layout;
pub mod regs;
pub mod timing;

pub use geometry::{Engine, Geometry};
pub use layout::{Register, RegisterMap};
