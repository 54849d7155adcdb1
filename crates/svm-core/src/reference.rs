//! Bit-accurate golden model.
//!
//! Same arithmetic as the pipelines, computed in one call with no clock:
//! full-width products, the same pairwise tree, bias aligned by `<< F`, then
//! rescale and saturate. Any disagreement with a pipeline is a pipeline bug.

use crate::config::CoreConfig;
use crate::engines::kernel::squared_distance;
use crate::error::{Result, SvmError};
use crate::fixed::{mul_wide, tree_sum, QFormat};
use crate::lut::KernelLut;
use crate::operands::{KernelOperands, LinearOperands, OperandBank};
use crate::scorer::Score;
use svm_chip::{Engine, Geometry};

/// Arithmetic operations one inference performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OpCounts {
    /// Multiplications (products and squares).
    pub multiplies: u64,
    /// Additions and subtractions.
    pub additions: u64,
    /// Kernel table reads.
    pub lookups: u64,
    /// Sign comparisons.
    pub comparisons: u64,
}

impl OpCounts {
    /// Linear engine: N products, N−1 tree adds, one bias add, one sign test.
    #[must_use]
    pub const fn linear(features: u64) -> Self {
        Self {
            multiplies: features,
            additions: features.saturating_sub(1) + 1,
            lookups: 0,
            comparisons: 1,
        }
    }

    /// Kernel engine.
    ///
    /// Per support vector: N subtractions, N squares, N−1 distance adds, one
    /// lookup and one coefficient product. Then M−1 tree adds, the bias add
    /// and the sign test.
    #[must_use]
    pub const fn kernel(features: u64, support_vectors: u64) -> Self {
        let m = support_vectors;
        Self {
            multiplies: m * (features + 1),
            additions: m * (features + features.saturating_sub(1)) + m.saturating_sub(1) + 1,
            lookups: m,
            comparisons: 1,
        }
    }

    /// Counts for a build geometry.
    #[must_use]
    pub const fn for_geometry(geometry: &Geometry) -> Self {
        match geometry.engine {
            Engine::Linear => Self::linear(geometry.features as u64),
            Engine::Kernel => Self::kernel(geometry.features as u64, geometry.support_vectors as u64),
        }
    }

    /// Every operation.
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.multiplies + self.additions + self.lookups + self.comparisons
    }
}

/// Linear decision.
#[must_use]
pub fn linear_score(format: &QFormat, ops: &LinearOperands) -> Score {
    let products: Vec<i64> = ops
        .features
        .iter()
        .zip(&ops.weights)
        .map(|(&x, &w)| mul_wide(x, w))
        .collect();
    Score::from_sum(format, tree_sum(&products) + format.align(ops.bias))
}

/// Kernel decision.
#[must_use]
pub fn kernel_score(format: &QFormat, lut: &KernelLut, ops: &KernelOperands) -> Score {
    let weighted: Vec<i64> = ops
        .support_vectors
        .iter()
        .zip(&ops.coefficients)
        .map(|(sv, &c)| mul_wide(c, lut.lookup(squared_distance(format, &ops.features, sv))))
        .collect();
    Score::from_sum(format, tree_sum(&weighted) + format.align(ops.bias))
}

/// Golden model for one build.
#[derive(Debug, Clone)]
pub struct ReferenceModel {
    config: CoreConfig,
}

impl ReferenceModel {
    /// Reference model for `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if `config` fails [`CoreConfig::validate`].
    pub fn new(config: CoreConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Build configuration.
    #[must_use]
    pub const fn config(&self) -> &CoreConfig {
        &self.config
    }

    /// Operations per inference.
    #[must_use]
    pub const fn op_counts(&self) -> OpCounts {
        OpCounts::for_geometry(&self.config.geometry)
    }

    /// Score whatever the operand registers hold.
    #[must_use]
    pub fn score_bank(&self, bank: &OperandBank) -> Score {
        match self.config.geometry.engine {
            Engine::Linear => linear_score(&self.config.format, &bank.linear_operands()),
            Engine::Kernel => kernel_score(
                &self.config.format,
                &self.config.lut,
                &bank.kernel_operands(),
            ),
        }
    }

    /// Score linear operands.
    ///
    /// # Errors
    ///
    /// Returns [`SvmError::InvalidState`] on a kernel build and
    /// [`SvmError::OperandLength`] when the vectors do not match N.
    pub fn score_linear(&self, ops: &LinearOperands) -> Result<Score> {
        let g = &self.config.geometry;
        if g.engine != Engine::Linear {
            return Err(SvmError::invalid_state("linear operands on a kernel build"));
        }
        SvmError::check_len("features", ops.features.len(), g.features)?;
        SvmError::check_len("weights", ops.weights.len(), g.features)?;
        Ok(linear_score(&self.config.format, ops))
    }

    /// Score kernel operands.
    ///
    /// # Errors
    ///
    /// Returns [`SvmError::InvalidState`] on a linear build and
    /// [`SvmError::OperandLength`] when any block does not match N or M.
    pub fn score_kernel(&self, ops: &KernelOperands) -> Result<Score> {
        let g = &self.config.geometry;
        if g.engine != Engine::Kernel {
            return Err(SvmError::invalid_state("kernel operands on a linear build"));
        }
        SvmError::check_len("features", ops.features.len(), g.features)?;
        SvmError::check_len("coefficients", ops.coefficients.len(), g.support_vectors)?;
        SvmError::check_len("support_vectors", ops.support_vectors.len(), g.support_vectors)?;
        for sv in &ops.support_vectors {
            SvmError::check_len("support_vector", sv.len(), g.features)?;
        }
        Ok(kernel_score(&self.config.format, &self.config.lut, ops))
    }
}
