//! Cycle-accurate model of a fixed-point SVM classifier core.
//!
//! One core is a 32-bit memory-mapped slave with a control/status state
//! machine in front of one of two pipelined scoring engines:
//!
//! ```text
//!   bus ──▶ RegisterFile ──▶ ControlState ──input_valid──▶ dyn Scorer
//!    ▲            │                ▲                           │
//!    └── BusPort ◀┘                └──────── output ───────────┘
//! ```
//!
//! - [`LinearScorer`]: `Σ xᵢ·wᵢ + b`, latency `⌈log2 N⌉ + 2`.
//! - [`KernelScorer`]: `Σ αⱼ·K(x, svⱼ) + b` with a table-approximated RBF
//!   kernel, latency `⌈log2 M⌉ + 4`.
//!
//! All arithmetic is signed fixed point ([`QFormat`], Q8.8 by default),
//! bit-identical to the [`reference`] model.
//!
//! # Quick start
//!
//! ```
//! use svm_core::{Accelerator, Core, CoreConfig, LinearModel, QFormat};
//!
//! # fn main() -> svm_core::Result<()> {
//! let q = QFormat::Q8_8;
//! let mut acc = Accelerator::new(Core::new(CoreConfig::linear(2))?);
//! acc.load_linear(&LinearModel::quantize(&q, &[1.0, 1.0], -0.5))?;
//! let out = acc.predict(&[q.quantize(0.25), q.quantize(0.5)])?;
//! assert_eq!(out.decision, 64);
//! assert_eq!(out.latency_cycles, 3);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::doc_markdown)]

pub mod bus;
mod config;
pub mod control;
mod device;
pub mod engines;
mod error;
pub mod fixed;
pub mod host;
mod lut;
mod operands;
pub mod reference;
mod regfile;
mod scorer;

pub use bus::{BusRequest, BusResponse, ReadData, ReadRequest, Response, WriteRequest};
pub use config::{CoreConfig, OperandLatch, MAX_ACCUMULATOR_BITS, MAX_WINDOW_WORDS};
pub use control::{ControlState, Phase};
pub use device::Core;
pub use engines::{KernelScorer, LinearScorer};
pub use error::{Result, SvmError};
pub use fixed::{Lane, QFormat};
pub use host::{Accelerator, Evaluation, Inference, KernelModel, LinearModel};
pub use lut::{KernelLut, MAX_ADDR_BITS};
pub use operands::{KernelOperands, LinearOperands, OperandBank};
pub use reference::{OpCounts, ReferenceModel};
pub use regfile::{Access, RegisterFile};
pub use scorer::{build_scorer, Score, Scorer};

/// Commonly used types.
pub mod prelude {
    pub use crate::{
        Accelerator, Core, CoreConfig, Evaluation, Inference, KernelLut, KernelModel, Lane,
        LinearModel, OperandLatch, QFormat, ReferenceModel, Result, Score, SvmError,
    };
}
