//! Scoring-engine abstraction.
//!
//! Both engines share one external contract: an input-valid cycle in, exactly
//! one output-valid cycle out, [`Scorer::latency`] cycles later, carrying a
//! saturated decision and a class bit. The register file and control FSM
//! only ever talk to a `dyn Scorer`.

use crate::config::CoreConfig;
use crate::engines::{KernelScorer, LinearScorer};
use crate::fixed::{classify, Lane, QFormat};
use crate::operands::OperandBank;
use svm_chip::Engine;
use tracing::info;

/// Output of one inference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Score {
    /// Saturated single-width decision value.
    pub decision: Lane,
    /// Class bit: sign of the full-width sum, not of `decision`.
    pub class: bool,
    /// Full-width sum after the bias add, before rescaling.
    pub sum: i64,
}

impl Score {
    /// Output stage: rescale, saturate, classify.
    #[must_use]
    pub const fn from_sum(format: &QFormat, sum: i64) -> Self {
        Self {
            decision: format.narrow(sum),
            class: classify(sum),
            sum,
        }
    }

    /// True if the clamp changed the value.
    #[must_use]
    pub const fn saturated(&self, format: &QFormat) -> bool {
        format.rescale(self.sum) != self.decision as i64
    }

    /// Decision as a real number.
    #[must_use]
    pub fn decision_f64(&self, format: &QFormat) -> f64 {
        format.to_f64(i64::from(self.decision))
    }
}

/// One clocked scoring pipeline.
///
/// `tick` applies one clock edge: the next state of every stage is computed
/// from the current state and only then committed, so no stage ever sees a
/// value another stage produced in the same edge.
pub trait Scorer: std::fmt::Debug + Send {
    /// Which engine this is.
    fn engine(&self) -> Engine;

    /// Cycles from input-valid to output-valid.
    fn latency(&self) -> u32;

    /// Output register as visible during the current cycle.
    fn output(&self) -> Option<Score>;

    /// Advance one clock. `input_valid` marks the cycle the operands in `bank` are accepted.
    fn tick(&mut self, input_valid: bool, bank: &OperandBank);

    /// Drop every in-flight value (soft reset).
    fn flush(&mut self);

    /// Number of stages currently holding a valid value.
    fn occupancy(&self) -> usize;
}

/// Instantiate the engine a build asks for.
#[must_use]
pub fn build_scorer(config: &CoreConfig) -> Box<dyn Scorer> {
    let scorer: Box<dyn Scorer> = match config.geometry.engine {
        Engine::Linear => Box::new(LinearScorer::new(config)),
        Engine::Kernel => Box::new(KernelScorer::new(config)),
    };
    info!(
        "{} scorer: N={} M={} {} latency={} cycles",
        config.geometry.engine,
        config.geometry.features,
        config.geometry.support_vectors,
        config.format,
        scorer.latency()
    );
    scorer
}
