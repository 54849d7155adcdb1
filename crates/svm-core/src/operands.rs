//! Operand storage behind the register file and the snapshots the engines consume.
//!
//! Registers keep the full 32-bit word the host wrote, so a read returns
//! exactly what went in. The datapath only sees the low word-width bits,
//! sign-extended, through [`OperandBank`]'s lane accessors.

use crate::config::CoreConfig;
use crate::fixed::{Lane, QFormat};
use svm_chip::Register;

/// Operands of one linear inference.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LinearOperands {
    /// Feature vector, N lanes.
    pub features: Vec<Lane>,
    /// Weight vector, N lanes.
    pub weights: Vec<Lane>,
    /// Bias, same scale as the operands.
    pub bias: Lane,
}

/// Operands of one kernel inference.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct KernelOperands {
    /// Feature vector, N lanes.
    pub features: Vec<Lane>,
    /// M support vectors of N lanes each.
    pub support_vectors: Vec<Vec<Lane>>,
    /// M dual coefficients.
    pub coefficients: Vec<Lane>,
    /// Bias, same scale as the operands.
    pub bias: Lane,
}

/// Host-writable operand registers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperandBank {
    format: QFormat,
    features_n: usize,
    bias: u32,
    /// Weights (linear) or dual coefficients (kernel).
    block: Vec<u32>,
    features: Vec<u32>,
    /// Row-major M × N.
    support: Vec<u32>,
}

impl OperandBank {
    /// Zeroed bank sized for `config`.
    #[must_use]
    pub fn new(config: &CoreConfig) -> Self {
        let g = &config.geometry;
        Self {
            format: config.format,
            features_n: g.features,
            bias: 0,
            block: vec![0; g.operand_words()],
            features: vec![0; g.features],
            support: vec![0; g.support_words()],
        }
    }

    /// Zero every operand register.
    pub fn clear(&mut self) {
        self.bias = 0;
        self.block.fill(0);
        self.features.fill(0);
        self.support.fill(0);
    }

    /// Stored word of an operand register; `None` for registers this bank does not hold.
    #[must_use]
    pub fn word(&self, reg: Register) -> Option<u32> {
        match reg {
            Register::Bias => Some(self.bias),
            Register::Weight(i) | Register::Coefficient(i) => self.block.get(i).copied(),
            Register::Feature(i) => self.features.get(i).copied(),
            Register::SupportVector { vector, lane } => self
                .support
                .get(vector * self.features_n + lane)
                .copied(),
            _ => None,
        }
    }

    /// Store a word; returns false if `reg` is not an operand register of this build.
    pub fn set_word(&mut self, reg: Register, word: u32) -> bool {
        let slot = match reg {
            Register::Bias => Some(&mut self.bias),
            Register::Weight(i) | Register::Coefficient(i) => self.block.get_mut(i),
            Register::Feature(i) => self.features.get_mut(i),
            Register::SupportVector { vector, lane } => {
                self.support.get_mut(vector * self.features_n + lane)
            }
            _ => None,
        };
        match slot {
            Some(slot) => {
                *slot = word;
                true
            }
            None => false,
        }
    }

    fn lanes(&self, words: &[u32]) -> Vec<Lane> {
        words.iter().map(|&w| self.format.lane_from_word(w)).collect()
    }

    /// Bias lane.
    #[must_use]
    pub fn bias(&self) -> Lane {
        self.format.lane_from_word(self.bias)
    }

    /// Dual coefficient `m` as the datapath sees it.
    #[must_use]
    pub fn coefficient(&self, m: usize) -> Lane {
        self.block
            .get(m)
            .map_or(0, |&w| self.format.lane_from_word(w))
    }

    /// Feature lanes.
    #[must_use]
    pub fn features(&self) -> Vec<Lane> {
        self.lanes(&self.features)
    }

    /// Weight or coefficient lanes.
    #[must_use]
    pub fn block(&self) -> Vec<Lane> {
        self.lanes(&self.block)
    }

    /// Support vector `m`.
    #[must_use]
    pub fn support_vector(&self, m: usize) -> Vec<Lane> {
        let n = self.features_n;
        self.support
            .get(m * n..(m + 1) * n)
            .map(|row| self.lanes(row))
            .unwrap_or_default()
    }

    /// Snapshot for a linear inference.
    #[must_use]
    pub fn linear_operands(&self) -> LinearOperands {
        LinearOperands {
            features: self.features(),
            weights: self.block(),
            bias: self.bias(),
        }
    }

    /// Snapshot for a kernel inference.
    #[must_use]
    pub fn kernel_operands(&self) -> KernelOperands {
        let m = if self.features_n == 0 {
            0
        } else {
            self.support.len() / self.features_n
        };
        KernelOperands {
            features: self.features(),
            support_vectors: (0..m).map(|i| self.support_vector(i)).collect(),
            coefficients: self.block(),
            bias: self.bias(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lut::KernelLut;

    #[test]
    fn words_round_trip_and_lanes_truncate() {
        let mut bank = OperandBank::new(&CoreConfig::linear(4));
        assert!(bank.set_word(Register::Bias, 0xAAAA));
        assert_eq!(bank.word(Register::Bias), Some(0xAAAA));
        assert_eq!(bank.bias(), -21846);
        assert!(bank.set_word(Register::Weight(3), 0x0001_0100));
        assert_eq!(bank.block(), vec![0, 0, 0, 256]);
        assert!(!bank.set_word(Register::Weight(4), 1));
        assert!(!bank.set_word(Register::Status, 1));
        assert_eq!(bank.word(Register::Control), None);
    }

    #[test]
    fn kernel_snapshot_is_row_major() {
        let mut bank = OperandBank::new(&CoreConfig::kernel(2, 3, KernelLut::default()));
        for m in 0..3 {
            for k in 0..2 {
                let v = u32::try_from(10 * m + k).unwrap();
                bank.set_word(Register::SupportVector { vector: m, lane: k }, v);
            }
        }
        bank.set_word(Register::Coefficient(1), 0xFFFF);
        let ops = bank.kernel_operands();
        assert_eq!(ops.support_vectors, vec![vec![0, 1], vec![10, 11], vec![20, 21]]);
        assert_eq!(ops.coefficients, vec![0, -1, 0]);
        assert_eq!(bank.coefficient(1), -1);
        assert_eq!(bank.coefficient(9), 0);
    }

    #[test]
    fn clear_zeroes_everything() {
        let mut bank = OperandBank::new(&CoreConfig::linear(2));
        bank.set_word(Register::Feature(1), 7);
        bank.set_word(Register::Bias, 7);
        bank.clear();
        assert_eq!(bank.linear_operands(), LinearOperands {
            features: vec![0, 0],
            weights: vec![0, 0],
            bias: 0,
        });
    }
}
