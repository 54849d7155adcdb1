//! Shared helpers for the benchmark binaries: a seeded operand generator and
//! flag parsing.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

use svm_core::Lane;

/// Seeded SplitMix64 stream. The same seed yields the same operands on every
/// platform, so bench tables are reproducible run to run.
#[derive(Debug, Clone)]
pub struct OperandRng {
    state: u64,
}

impl OperandRng {
    /// Stream starting from `seed`.
    #[must_use]
    pub const fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    /// Next raw 64-bit value.
    pub fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9e37_79b9_7f4a_7c15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
        z ^ (z >> 31)
    }

    /// Uniform in `[0, 1)`.
    #[allow(clippy::cast_precision_loss)]
    pub fn unit(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Uniform in `[0, bound)`; `bound` must be non-zero.
    pub fn below(&mut self, bound: u64) -> u64 {
        (self.next_u64() >> 32) % bound
    }

    /// Uniform raw lane in `-span..span`.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_possible_wrap,
        clippy::cast_sign_loss
    )]
    pub fn lane(&mut self, span: u16) -> Lane {
        let span = i64::from(span.max(1));
        (self.below(2 * span as u64) as i64 - span) as Lane
    }

    /// `len` lanes from [`Self::lane`].
    pub fn lanes(&mut self, len: usize, span: u16) -> Vec<Lane> {
        (0..len).map(|_| self.lane(span)).collect()
    }

    /// Fisher-Yates shuffle in place.
    #[allow(clippy::cast_possible_truncation)]
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        for i in (1..items.len()).rev() {
            let j = self.below(i as u64 + 1) as usize;
            items.swap(i, j);
        }
    }
}

/// Value following `flag` in `args`, or `default` when absent or unparsable.
#[must_use]
pub fn parse_arg(args: &[String], flag: &str, default: usize) -> usize {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_stream() {
        let mut a = OperandRng::new(7);
        let mut b = OperandRng::new(7);
        let xs: Vec<u64> = (0..8).map(|_| a.next_u64()).collect();
        let ys: Vec<u64> = (0..8).map(|_| b.next_u64()).collect();
        assert_eq!(xs, ys);
        assert_ne!(OperandRng::new(8).next_u64(), xs[0]);
    }

    #[test]
    fn lanes_stay_in_span() {
        let mut rng = OperandRng::new(1);
        let xs = rng.lanes(1000, 512);
        assert!(xs.iter().all(|&v| (-512..512).contains(&v)));
        assert!(xs.iter().any(|&v| v < 0) && xs.iter().any(|&v| v > 0));
    }

    #[test]
    fn unit_is_half_open() {
        let mut rng = OperandRng::new(3);
        assert!((0..1000).map(|_| rng.unit()).all(|u| (0.0..1.0).contains(&u)));
    }

    #[test]
    fn shuffle_keeps_elements() {
        let mut rng = OperandRng::new(11);
        let mut v: Vec<u32> = (0..32).collect();
        rng.shuffle(&mut v);
        let mut sorted = v.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..32).collect::<Vec<_>>());
    }

    #[test]
    fn parse_arg_falls_back() {
        let args: Vec<String> = ["bench", "--points", "8", "--clusters", "x"]
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(parse_arg(&args, "--points", 4), 8);
        assert_eq!(parse_arg(&args, "--clusters", 32), 32);
        assert_eq!(parse_arg(&args, "--missing", 1), 1);
    }
}
