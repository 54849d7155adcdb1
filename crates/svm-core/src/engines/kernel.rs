//! Kernel scoring engine: table-approximated RBF over M support vectors.
//!
//! ```text
//! cycle 0        dist[m] = Σk ((x[k] - sv[m][k])² >> F)     all m in parallel
//! cycle 1        k[m]    = LUT[addr(dist[m])]
//! cycle 2        w[m]    = coef[m] × k[m]                    (2W bits)
//! cycle 3..=D+2  pairwise tree over M; bias added at the last level
//! cycle D+3      >> F, saturate, classify
//! ```
//!
//! Latency is `⌈log2 M⌉ + 4`. Accuracy is bounded by M: a model whose
//! decision signal is spread over many small per-vector contributions cannot
//! be reconstructed from a handful of vectors.

use super::tree::{ReductionTree, Token};
use crate::config::{CoreConfig, OperandLatch};
use crate::fixed::{mul_wide, Lane, QFormat};
use crate::lut::KernelLut;
use crate::operands::OperandBank;
use crate::scorer::{Score, Scorer};
use svm_chip::Engine;

/// Distance stage register.
#[derive(Debug, Clone, PartialEq, Eq)]
struct DistanceToken {
    distances: Vec<i64>,
    coefficients: Vec<Lane>,
    bias: i64,
}

/// Lookup stage register.
#[derive(Debug, Clone, PartialEq, Eq)]
struct LookupToken {
    kernel: Vec<Lane>,
    coefficients: Vec<Lane>,
    bias: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct KernelState {
    distance: Option<DistanceToken>,
    lookup: Option<LookupToken>,
    weighted: Option<Token>,
    tree: ReductionTree,
}

/// Squared distance at single-width scale: each squared difference is
/// rescaled by F before accumulation.
#[must_use]
pub fn squared_distance(format: &QFormat, x: &[Lane], sv: &[Lane]) -> i64 {
    x.iter()
        .zip(sv)
        .map(|(&a, &b)| {
            let diff = i64::from(a) - i64::from(b);
            format.rescale(diff * diff)
        })
        .sum()
}

/// RBF-approximating scorer.
#[derive(Debug, Clone)]
pub struct KernelScorer {
    format: QFormat,
    latch: OperandLatch,
    lut: KernelLut,
    latency: u32,
    support_vectors: usize,
    state: KernelState,
}

impl KernelScorer {
    /// Empty pipeline for `config`.
    #[must_use]
    pub fn new(config: &CoreConfig) -> Self {
        let g = config.geometry;
        Self {
            format: config.format,
            latch: config.latch,
            lut: config.lut.clone(),
            latency: svm_chip::timing::latency(&svm_chip::Geometry::kernel(
                g.features,
                g.support_vectors,
            )),
            support_vectors: g.support_vectors,
            state: Self::empty(g.support_vectors),
        }
    }

    fn empty(support_vectors: usize) -> KernelState {
        KernelState {
            distance: None,
            lookup: None,
            weighted: None,
            tree: ReductionTree::new(support_vectors),
        }
    }

    fn next_state(&self, input_valid: bool, bank: &OperandBank) -> KernelState {
        let s = &self.state;

        let distance = input_valid.then(|| {
            let ops = bank.kernel_operands();
            DistanceToken {
                distances: ops
                    .support_vectors
                    .iter()
                    .map(|sv| squared_distance(&self.format, &ops.features, sv))
                    .collect(),
                coefficients: ops.coefficients,
                bias: self.format.align(ops.bias),
            }
        });

        let lookup = s.distance.as_ref().map(|t| LookupToken {
            kernel: t.distances.iter().map(|&d| self.lut.lookup(d)).collect(),
            coefficients: t.coefficients.clone(),
            bias: t.bias,
        });

        let weighted = s.lookup.as_ref().map(|t| Token {
            terms: t
                .kernel
                .iter()
                .enumerate()
                .map(|(m, &k)| {
                    let coef = match self.latch {
                        OperandLatch::OnStart => t.coefficients[m],
                        OperandLatch::Live => bank.coefficient(m),
                    };
                    mul_wide(coef, k)
                })
                .collect(),
            bias: t.bias,
        });

        let live_bias = match self.latch {
            OperandLatch::OnStart => None,
            OperandLatch::Live => Some(self.format.align(bank.bias())),
        };

        KernelState {
            distance,
            lookup,
            weighted,
            tree: s.tree.next(s.weighted.as_ref(), live_bias, &self.format),
        }
    }
}

impl Scorer for KernelScorer {
    fn engine(&self) -> Engine {
        Engine::Kernel
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
        self.state = Self::empty(self.support_vectors);
    }

    fn occupancy(&self) -> usize {
        let s = &self.state;
        usize::from(s.distance.is_some())
            + usize::from(s.lookup.is_some())
            + usize::from(s.weighted.is_some())
            + s.tree.occupancy()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use svm_chip::Register;

    fn program(cfg: &CoreConfig, x: &[Lane], svs: &[Vec<Lane>], coefs: &[Lane], bias: Lane) -> OperandBank {
        let mut bank = OperandBank::new(cfg);
        for (k, &v) in x.iter().enumerate() {
            bank.set_word(Register::Feature(k), v as u32);
        }
        for (m, sv) in svs.iter().enumerate() {
            for (k, &v) in sv.iter().enumerate() {
                bank.set_word(Register::SupportVector { vector: m, lane: k }, v as u32);
            }
        }
        for (m, &c) in coefs.iter().enumerate() {
            bank.set_word(Register::Coefficient(m), c as u32);
        }
        bank.set_word(Register::Bias, bias as u32);
        bank
    }

    fn run(scorer: &mut KernelScorer, bank: &OperandBank) -> (u32, Score) {
        scorer.tick(true, bank);
        for cycle in 1..=64 {
            if let Some(score) = scorer.output() {
                return (cycle, score);
            }
            scorer.tick(false, bank);
        }
        panic!("no output within 64 cycles");
    }

    #[test]
    fn squared_distance_rescales_each_term() {
        let q = QFormat::Q8_8;
        // (1.0)² + (0.5)² = 1.25
        assert_eq!(squared_distance(&q, &[256, 128], &[0, 0]), 256 + 64);
        // (1/256)² floors to zero per term
        assert_eq!(squared_distance(&q, &[1, 1], &[0, 0]), 0);
        assert_eq!(squared_distance(&q, &[i16::MAX], &[i16::MIN]), (65535i64 * 65535) >> 8);
    }

    #[test]
    fn matching_vector_yields_table_peak_plus_bias() {
        let cfg = CoreConfig::kernel(4, 4, KernelLut::rbf(1.0, QFormat::Q8_8, 8, 4).unwrap());
        let mut scorer = KernelScorer::new(&cfg);
        let x = vec![256, -512, 64, 0];
        let svs = vec![
            vec![3000, 3000, 3000, 3000],
            x.clone(),
            vec![-5000, 0, 0, 0],
            vec![0, 0, 0, 0],
        ];
        let bank = program(&cfg, &x, &svs, &[0, 256, 0, 0], -64);
        let (cycles, score) = run(&mut scorer, &bank);
        assert_eq!(cycles, 2 + 4);
        assert_eq!(score.decision, 256 - 64);
        assert!(score.class);
    }

    #[test]
    fn far_vectors_hit_the_table_boundary() {
        let cfg = CoreConfig::kernel(2, 2, KernelLut::rbf(1.0, QFormat::Q8_8, 8, 4).unwrap());
        let mut scorer = KernelScorer::new(&cfg);
        let bank = program(&cfg, &[0, 0], &[vec![20_000, 20_000], vec![-20_000, 0]], &[256, 256], 0);
        let (_, score) = run(&mut scorer, &bank);
        assert_eq!(score.decision, 0);
        assert!(score.class);
    }

    #[test]
    fn single_support_vector_latency() {
        let cfg = CoreConfig::kernel(3, 1, KernelLut::default());
        let mut scorer = KernelScorer::new(&cfg);
        let bank = program(&cfg, &[0; 3], &[vec![0; 3]], &[-256], 0);
        let (cycles, score) = run(&mut scorer, &bank);
        assert_eq!(cycles, 4);
        assert_eq!(score.decision, -256);
        assert!(!score.class);
    }

    #[test]
    fn latched_coefficients_ignore_mid_flight_writes() {
        for (latch, expected) in [(OperandLatch::OnStart, 256), (OperandLatch::Live, -256)] {
            let cfg = CoreConfig::kernel(1, 1, KernelLut::default()).with_latch(latch);
            let mut scorer = KernelScorer::new(&cfg);
            let mut bank = program(&cfg, &[0], &[vec![0]], &[256], 0);
            scorer.tick(true, &bank);
            bank.set_word(Register::Coefficient(0), (-256i16) as u32);
            let mut out = None;
            for _ in 0..8 {
                scorer.tick(false, &bank);
                out = out.or(scorer.output());
            }
            assert_eq!(out.map(|s| i32::from(s.decision)), Some(expected), "{latch:?}");
        }
    }
}
