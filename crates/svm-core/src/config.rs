//! Build configuration of one classifier core.
//!
//! Everything here is fixed when a [`crate::Core`] is constructed. The host
//! can rewrite operand registers at will, but never the lane counts, the
//! fixed-point format or the kernel table.

use crate::error::{Result, SvmError};
use crate::fixed::QFormat;
use crate::lut::KernelLut;
use svm_chip::timing::tree_levels;
use svm_chip::{Engine, Geometry, RegisterMap};
use tracing::debug;

/// Widest intermediate the software model carries.
pub const MAX_ACCUMULATOR_BITS: u32 = 63;

/// Largest register window, in 32-bit words, a build may occupy (16 MB).
pub const MAX_WINDOW_WORDS: usize = 1 << 22;

/// When the scorer takes its copy of the operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OperandLatch {
    /// Every operand is captured into pipeline state in the start cycle.
    /// Host writes after the start edge cannot reach the in-flight inference.
    #[default]
    OnStart,
    /// Stages read the register file in the cycle they need an operand:
    /// features, weights and support vectors at entry, coefficients at the
    /// weighting stage, bias at the final adder. Rewriting those mid-flight
    /// changes the result.
    Live,
}

/// Complete build description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    /// Engine and lane counts.
    pub geometry: Geometry,
    /// Operand format shared by every register and stage.
    pub format: QFormat,
    /// Kernel table; ignored by linear builds.
    pub lut: KernelLut,
    /// Operand capture policy.
    pub latch: OperandLatch,
    /// Answer SLVERR for unmapped or read-only accesses instead of OKAY.
    pub decode_errors: bool,
}

impl CoreConfig {
    /// Linear build with `features` lanes and otherwise default settings.
    #[must_use]
    pub fn linear(features: usize) -> Self {
        Self {
            geometry: Geometry::linear(features),
            ..Self::default()
        }
    }

    /// Kernel build over `support_vectors` references with the given table.
    #[must_use]
    pub fn kernel(features: usize, support_vectors: usize, lut: KernelLut) -> Self {
        Self {
            geometry: Geometry::kernel(features, support_vectors),
            lut,
            ..Self::default()
        }
    }

    /// Set the operand format.
    #[must_use]
    pub fn with_format(mut self, format: QFormat) -> Self {
        self.format = format;
        self
    }

    /// Set the operand capture policy.
    #[must_use]
    pub fn with_latch(mut self, latch: OperandLatch) -> Self {
        self.latch = latch;
        self
    }

    /// Enable or disable SLVERR responses.
    #[must_use]
    pub fn with_decode_errors(mut self, enabled: bool) -> Self {
        self.decode_errors = enabled;
        self
    }

    /// Cycles from input-valid to output-valid.
    #[must_use]
    pub fn latency(&self) -> u32 {
        svm_chip::timing::latency(&self.geometry)
    }

    /// Register layout of this build.
    #[must_use]
    pub fn register_map(&self) -> RegisterMap {
        RegisterMap::new(self.geometry)
    }

    /// Width of the widest intermediate value in the datapath.
    ///
    /// Linear: product plus one guard bit per tree level plus one for the bias.
    /// Kernel: the larger of the distance accumulator (squared difference of
    /// two lanes, rescaled, summed over N) and the weighted-sum tree.
    #[must_use]
    pub fn accumulator_bits(&self) -> u32 {
        let reduce = self.format.product_bits() + tree_levels(self.geometry.reduction_inputs()) + 1;
        match self.geometry.engine {
            Engine::Linear => reduce,
            Engine::Kernel => {
                let diff_bits = self.format.word_bits() + 1;
                let distance =
                    2 * diff_bits - self.format.frac_bits() + tree_levels(self.geometry.features);
                distance.max(reduce)
            }
        }
    }

    /// Check that the build can be realised.
    ///
    /// # Errors
    ///
    /// Returns [`SvmError::InvalidConfig`] for empty lane counts, a register
    /// window beyond [`MAX_WINDOW_WORDS`], an accumulator wider than
    /// [`MAX_ACCUMULATOR_BITS`], or a kernel table quantized in another format.
    pub fn validate(&self) -> Result<()> {
        let g = &self.geometry;
        if g.features == 0 {
            return Err(SvmError::invalid_config("a build needs at least one feature lane"));
        }
        if g.engine == Engine::Kernel && g.support_vectors == 0 {
            return Err(SvmError::invalid_config(
                "a kernel build needs at least one support vector",
            ));
        }
        let window = g
            .checked_support_words()
            .and_then(|w| w.checked_add(g.features))
            .and_then(|w| w.checked_add(g.operand_words()));
        match window {
            Some(w) if w <= MAX_WINDOW_WORDS => {}
            _ => {
                return Err(SvmError::invalid_config(format!(
                    "N={} M={} does not fit a {MAX_WINDOW_WORDS}-word register window",
                    g.features, g.support_vectors
                )))
            }
        }
        let acc = self.accumulator_bits();
        if acc > MAX_ACCUMULATOR_BITS {
            return Err(SvmError::invalid_config(format!(
                "accumulator needs {acc} bits, limit is {MAX_ACCUMULATOR_BITS}"
            )));
        }
        if g.engine == Engine::Kernel && self.lut.format() != self.format {
            return Err(SvmError::invalid_config(format!(
                "kernel table quantized in {}, datapath runs {}",
                self.lut.format(),
                self.format
            )));
        }
        debug!(
            "config ok: {} N={} M={} {} latency={} acc={}b",
            g.engine,
            g.features,
            g.support_vectors,
            self.format,
            self.latency(),
            acc
        );
        Ok(())
    }
}

impl Default for CoreConfig {
    /// Reference build: linear, N=16, Q8.8, 256-entry table, operands latched on start.
    fn default() -> Self {
        Self {
            geometry: Geometry::default(),
            format: QFormat::Q8_8,
            lut: KernelLut::default(),
            latch: OperandLatch::OnStart,
            decode_errors: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_reference_build() {
        let cfg = CoreConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.geometry, Geometry::linear(16));
        assert_eq!(cfg.latency(), 6);
        assert_eq!(cfg.accumulator_bits(), 32 + 4 + 1);
        assert_eq!(cfg.latch, OperandLatch::OnStart);
        assert!(!cfg.decode_errors);
    }

    #[test]
    fn kernel_accumulator_covers_distance_sum() {
        let cfg = CoreConfig::kernel(16, 16, KernelLut::default());
        // (17+17-8) + 4 = 30 vs 32 + 4 + 1 = 37
        assert_eq!(cfg.accumulator_bits(), 37);
        assert_eq!(cfg.latency(), 8);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn rejects_empty_geometry() {
        assert!(CoreConfig::linear(0).validate().is_err());
        assert!(CoreConfig::kernel(4, 0, KernelLut::default()).validate().is_err());
    }

    #[test]
    fn rejects_oversized_window() {
        let cfg = CoreConfig::kernel(1 << 12, 1 << 12, KernelLut::default());
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_overflowing_geometry() {
        let cfg = CoreConfig::kernel(usize::MAX / 2, usize::MAX / 2, KernelLut::default());
        assert!(matches!(cfg.validate(), Err(SvmError::InvalidConfig { .. })));
    }

    #[test]
    fn rejects_table_in_another_format() {
        let q4_12 = QFormat::new(16, 12).unwrap();
        let cfg = CoreConfig::kernel(2, 1, KernelLut::default()).with_format(q4_12);
        assert!(matches!(cfg.validate(), Err(SvmError::InvalidConfig { .. })));

        let cfg = CoreConfig::kernel(2, 1, KernelLut::rbf(1.0 / 16.0, q4_12, 8, 4).unwrap())
            .with_format(q4_12);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn linear_build_ignores_table_format() {
        let cfg = CoreConfig::linear(4).with_format(QFormat::new(8, 4).unwrap());
        assert!(cfg.validate().is_ok());
    }
}
