//! Register-block layout for one build and the address decoder.
//!
//! ```text
//! linear:  0x20 weights[N]        0x80 features[N]
//! kernel:  0x20 coefficients[M]   0x80 features[N]   0x100.. sv[M][N] (row-major)
//! ```
//!
//! A block that would run into the next one pushes it up to the next
//! [`regs::BLOCK_ALIGN`] boundary; the support-vector block always starts on a
//! [`regs::SUPPORT_ALIGN`] boundary.

use crate::geometry::{Engine, Geometry};
use crate::regs;

/// One decoded register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Register {
    /// Control register.
    Control,
    /// Status register.
    Status,
    /// Result register.
    Result,
    /// Latency register.
    Latency,
    /// Bias register.
    Bias,
    /// Linear weight lane.
    Weight(usize),
    /// Dual coefficient of one support vector.
    Coefficient(usize),
    /// Feature lane.
    Feature(usize),
    /// One lane of one support vector.
    SupportVector {
        /// Support-vector index (0..M).
        vector: usize,
        /// Feature lane (0..N).
        lane: usize,
    },
}

impl Register {
    /// True if host writes reach this register.
    #[must_use]
    pub const fn is_writable(&self) -> bool {
        !matches!(self, Self::Status | Self::Result | Self::Latency)
    }
}

/// Placement of every register for one geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterMap {
    geometry: Geometry,
    operand_base: u32,
    feature_base: u32,
    support_base: u32,
}

#[allow(clippy::cast_possible_truncation)]
const fn words(count: usize) -> u32 {
    count as u32 * regs::WORD_BYTES
}

const fn align_up(value: u32, align: u32) -> u32 {
    (value + align - 1) & !(align - 1)
}

impl RegisterMap {
    /// Lay out the operand blocks for `geometry`.
    #[must_use]
    pub const fn new(geometry: Geometry) -> Self {
        let operand_base = regs::OPERAND_BASE;
        let operand_end = operand_base + words(geometry.operand_words());
        let moved = align_up(operand_end, regs::BLOCK_ALIGN);
        let feature_base = if moved > regs::FEATURE_BASE {
            moved
        } else {
            regs::FEATURE_BASE
        };
        let feature_end = feature_base + words(geometry.features);
        let support_base = align_up(feature_end, regs::SUPPORT_ALIGN);
        Self {
            geometry,
            operand_base,
            feature_base,
            support_base,
        }
    }

    /// Geometry this map was built for.
    #[must_use]
    pub const fn geometry(&self) -> Geometry {
        self.geometry
    }

    /// Base of the weight (linear) or coefficient (kernel) block.
    #[must_use]
    pub const fn operand_base(&self) -> u32 {
        self.operand_base
    }

    /// Base of the feature block.
    #[must_use]
    pub const fn feature_base(&self) -> u32 {
        self.feature_base
    }

    /// Base of the support-vector block, `None` for linear builds.
    #[must_use]
    pub const fn support_base(&self) -> Option<u32> {
        match self.geometry.engine {
            Engine::Linear => None,
            Engine::Kernel => Some(self.support_base),
        }
    }

    /// One past the last mapped byte.
    #[must_use]
    pub const fn end(&self) -> u32 {
        match self.geometry.engine {
            Engine::Linear => self.feature_base + words(self.geometry.features),
            Engine::Kernel => self.support_base + words(self.geometry.support_words()),
        }
    }

    /// Byte offset of `reg`.
    #[must_use]
    pub const fn offset(&self, reg: Register) -> u32 {
        match reg {
            Register::Control => regs::CONTROL,
            Register::Status => regs::STATUS,
            Register::Result => regs::RESULT,
            Register::Latency => regs::LATENCY,
            Register::Bias => regs::BIAS,
            Register::Weight(i) | Register::Coefficient(i) => self.operand_base + words(i),
            Register::Feature(i) => self.feature_base + words(i),
            Register::SupportVector { vector, lane } => {
                self.support_base + words(vector * self.geometry.features + lane)
            }
        }
    }

    /// Decode a bus address. Byte-lane bits are ignored; unmapped words give `None`.
    #[must_use]
    pub fn decode(&self, addr: u32) -> Option<Register> {
        let addr = addr & regs::WORD_MASK;
        match addr {
            regs::CONTROL => return Some(Register::Control),
            regs::STATUS => return Some(Register::Status),
            regs::RESULT => return Some(Register::Result),
            regs::LATENCY => return Some(Register::Latency),
            regs::BIAS => return Some(Register::Bias),
            _ => {}
        }

        let index_in = |base: u32, count: usize| -> Option<usize> {
            let idx = (addr.checked_sub(base)? / regs::WORD_BYTES) as usize;
            (idx < count).then_some(idx)
        };

        if let Some(i) = index_in(self.operand_base, self.geometry.operand_words()) {
            return Some(match self.geometry.engine {
                Engine::Linear => Register::Weight(i),
                Engine::Kernel => Register::Coefficient(i),
            });
        }
        if let Some(i) = index_in(self.feature_base, self.geometry.features) {
            return Some(Register::Feature(i));
        }
        if self.geometry.engine == Engine::Kernel && self.geometry.features > 0 {
            if let Some(i) = index_in(self.support_base, self.geometry.support_words()) {
                return Some(Register::SupportVector {
                    vector: i / self.geometry.features,
                    lane: i % self.geometry.features,
                });
            }
        }
        None
    }
}
