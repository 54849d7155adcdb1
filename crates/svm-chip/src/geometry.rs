//! Build-time geometry: which scoring engine is instantiated and how wide it is.
//!
//! N (features) and M (support vectors) are fixed when the core is built.
//! Nothing in the register interface can change them.

/// Scoring engine instantiated behind the register file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Engine {
    /// Dot product of features and weights plus bias.
    Linear,
    /// Table-approximated RBF kernel over M support vectors plus bias.
    Kernel,
}

impl std::fmt::Display for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Linear => write!(f, "linear"),
            Self::Kernel => write!(f, "kernel"),
        }
    }
}

/// Lane counts of one build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Geometry {
    /// Engine behind the register file.
    pub engine: Engine,
    /// Feature lanes (N).
    pub features: usize,
    /// Support vectors (M). Zero for linear builds.
    pub support_vectors: usize,
}

impl Geometry {
    /// Linear build with `features` lanes.
    #[must_use]
    pub const fn linear(features: usize) -> Self {
        Self {
            engine: Engine::Linear,
            features,
            support_vectors: 0,
        }
    }

    /// Kernel build with `features` lanes and `support_vectors` reference vectors.
    #[must_use]
    pub const fn kernel(features: usize, support_vectors: usize) -> Self {
        Self {
            engine: Engine::Kernel,
            features,
            support_vectors,
        }
    }

    /// Number of terms the final reduction tree sums.
    #[must_use]
    pub const fn reduction_inputs(&self) -> usize {
        match self.engine {
            Engine::Linear => self.features,
            Engine::Kernel => self.support_vectors,
        }
    }

    /// Words in the block at [`crate::regs::OPERAND_BASE`]: weights or coefficients.
    #[must_use]
    pub const fn operand_words(&self) -> usize {
        self.reduction_inputs()
    }

    /// Words in the support-vector block (kernel builds only).
    ///
    /// Panics on overflow; unvalidated geometry goes through
    /// [`Self::checked_support_words`].
    #[must_use]
    pub const fn support_words(&self) -> usize {
        match self.engine {
            Engine::Linear => 0,
            Engine::Kernel => self.support_vectors * self.features,
        }
    }

    /// [`Self::support_words`], or `None` if `M × N` overflows.
    #[must_use]
    pub const fn checked_support_words(&self) -> Option<usize> {
        match self.engine {
            Engine::Linear => Some(0),
            Engine::Kernel => self.support_vectors.checked_mul(self.features),
        }
    }
}

impl Default for Geometry {
    /// The 16-feature linear build the host driver targets.
    fn default() -> Self {
        Self::linear(16)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reduction_inputs_follow_engine() {
        assert_eq!(Geometry::linear(20).reduction_inputs(), 20);
        assert_eq!(Geometry::kernel(20, 7).reduction_inputs(), 7);
        assert_eq!(Geometry::kernel(4, 3).support_words(), 12);
        assert_eq!(Geometry::linear(4).support_words(), 0);
    }

    #[test]
    fn checked_support_words_reports_overflow() {
        assert_eq!(Geometry::kernel(4, 3).checked_support_words(), Some(12));
        assert_eq!(Geometry::linear(usize::MAX).checked_support_words(), Some(0));
        assert_eq!(Geometry::kernel(1 << 40, 1 << 40).checked_support_words(), None);
    }
}
