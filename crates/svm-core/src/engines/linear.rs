//! Linear scoring engine.
//!
//! ```text
//! cycle 0        products[k] = feature[k] × weight[k]      (2W bits)
//!                bias << F enters the delay line
//! cycle 1..=D    pairwise tree, one guard bit per level; bias added at level D
//! cycle D+1      >> F, saturate, classify
//! ```
//!
//! Latency is `⌈log2 N⌉ + 2`.

use super::tree::{ReductionTree, Token};
use crate::config::{CoreConfig, OperandLatch};
use crate::fixed::{mul_wide, QFormat};
use crate::operands::OperandBank;
use crate::scorer::{Score, Scorer};
use svm_chip::Engine;

#[derive(Debug, Clone, PartialEq, Eq)]
struct LinearState {
    products: Option<Token>,
    tree: ReductionTree,
}

/// Dot product of features and weights plus bias, one inference per cycle.
#[derive(Debug, Clone)]
pub struct LinearScorer {
    format: QFormat,
    latch: OperandLatch,
    latency: u32,
    features: usize,
    state: LinearState,
}

impl LinearScorer {
    /// Empty pipeline for `config`.
    #[must_use]
    pub fn new(config: &CoreConfig) -> Self {
        let features = config.geometry.features;
        Self {
            format: config.format,
            latch: config.latch,
            latency: svm_chip::timing::latency(&svm_chip::Geometry::linear(features)),
            features,
            state: Self::empty(features),
        }
    }

    fn empty(features: usize) -> LinearState {
        LinearState {
            products: None,
            tree: ReductionTree::new(features),
        }
    }

    fn next_state(&self, input_valid: bool, bank: &OperandBank) -> LinearState {
        let products = input_valid.then(|| {
            let ops = bank.linear_operands();
            Token {
                terms: ops
                    .features
                    .iter()
                    .zip(&ops.weights)
                    .map(|(&x, &w)| mul_wide(x, w))
                    .collect(),
                bias: self.format.align(ops.bias),
            }
        });
        let live_bias = match self.latch {
            OperandLatch::OnStart => None,
            OperandLatch::Live => Some(self.format.align(bank.bias())),
        };
        LinearState {
            products,
            tree: self
                .state
                .tree
                .next(self.state.products.as_ref(), live_bias, &self.format),
        }
    }
}

impl Scorer for LinearScorer {
    fn engine(&self) -> Engine {
        Engine::Linear
    }

    fn latency(&self) -> u32 {
        self.latency
    }

    fn output(&self) -> Option<Score> {
        self.state.tree.output()
    }

    fn tick(&mut self, input_valid: bool, bank: &OperandBank) {
        self.state = self.next_state(input_valid, bank);
    }

    fn flush(&mut self) {
        self.state = Self::empty(self.features);
    }

    fn occupancy(&self) -> usize {
        usize::from(self.state.products.is_some()) + self.state.tree.occupancy()
    }
}
