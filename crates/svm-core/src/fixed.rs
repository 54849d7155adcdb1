//! Fixed-point arithmetic primitives shared by both scoring engines.
//!
//! Operands are signed `I.F` values stored one per lane as [`Lane`] (`i16`),
//! so the word width is at most 16 bits. Products are double width, the
//! reduction tree grows one guard bit per level, and the final value comes
//! back to single width through an arithmetic right shift followed by a
//! saturating clamp. Wide intermediates are carried in `i64`; [`QFormat`]
//! reports the width each stage needs so a build can be rejected if it would
//! not fit.
//!
//! ```text
//! lane (W bits) × lane (W bits)  →  product (2W bits, 2F fractional)
//! tree level d                   →  2W + d bits
//! + (bias << F)                  →  aligned sum
//! >> F, clamp                    →  decision (W bits)
//! ```

use crate::error::{Result, SvmError};

/// One fixed-point operand lane.
pub type Lane = i16;

/// Signed fixed-point format with `word_bits` total and `frac_bits` fractional bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QFormat {
    word_bits: u32,
    frac_bits: u32,
}

impl QFormat {
    /// Q8.8 in 16 bits, the reference build.
    pub const Q8_8: Self = Self {
        word_bits: 16,
        frac_bits: 8,
    };

    /// Build a format.
    ///
    /// # Errors
    ///
    /// Returns [`SvmError::InvalidConfig`] unless `2 <= word_bits <= 16` and
    /// `frac_bits < word_bits`.
    pub fn new(word_bits: u32, frac_bits: u32) -> Result<Self> {
        if !(2..=Lane::BITS).contains(&word_bits) {
            return Err(SvmError::invalid_config(format!(
                "word width {word_bits} outside 2..={}",
                Lane::BITS
            )));
        }
        if frac_bits >= word_bits {
            return Err(SvmError::invalid_config(format!(
                "{frac_bits} fractional bits leave no sign bit in a {word_bits}-bit word"
            )));
        }
        Ok(Self {
            word_bits,
            frac_bits,
        })
    }

    /// Total bits per operand.
    #[must_use]
    pub const fn word_bits(&self) -> u32 {
        self.word_bits
    }

    /// Fractional bits (F).
    #[must_use]
    pub const fn frac_bits(&self) -> u32 {
        self.frac_bits
    }

    /// Integer bits including sign (I).
    #[must_use]
    pub const fn int_bits(&self) -> u32 {
        self.word_bits - self.frac_bits
    }

    /// Smallest representable raw value.
    #[must_use]
    pub const fn min(&self) -> i64 {
        -(1i64 << (self.word_bits - 1))
    }

    /// Largest representable raw value.
    #[must_use]
    pub const fn max(&self) -> i64 {
        (1i64 << (self.word_bits - 1)) - 1
    }

    /// Raw encoding of 1.0. Saturates when the format has no integer bits above sign.
    #[must_use]
    pub const fn one(&self) -> Lane {
        let one = 1i64 << self.frac_bits;
        if one > self.max() {
            self.max() as Lane
        } else {
            one as Lane
        }
    }

    /// Width of a full product.
    #[must_use]
    pub const fn product_bits(&self) -> u32 {
        2 * self.word_bits
    }

    /// Quantize a real number: round to nearest, saturate.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn quantize(&self, value: f64) -> Lane {
        let scaled = (value * f64::from(1u32 << self.frac_bits)).round();
        scaled.clamp(self.min() as f64, self.max() as f64) as Lane
    }

    /// Real value of a raw encoding.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn to_f64(&self, raw: i64) -> f64 {
        raw as f64 / f64::from(1u32 << self.frac_bits)
    }

    /// Take the low `word_bits` of a bus word as a signed lane.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    pub const fn lane_from_word(&self, word: u32) -> Lane {
        let shift = 32 - self.word_bits;
        (((word << shift) as i32) >> shift) as Lane
    }

    /// Arithmetic right shift by F: round toward negative infinity.
    #[must_use]
    pub const fn rescale(&self, wide: i64) -> i64 {
        wide >> self.frac_bits
    }

    /// Left shift by F: bring a single-width value to product scale.
    #[must_use]
    pub const fn align(&self, lane: Lane) -> i64 {
        (lane as i64) << self.frac_bits
    }

    /// Clamp a value to single width.
    ///
    /// The bits above the sign position must all equal the sign bit for the
    /// value to survive; otherwise it pins to the extreme on the side of the
    /// value's sign.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn saturate(&self, value: i64) -> Lane {
        let high = value >> (self.word_bits - 1);
        if high == 0 || high == -1 {
            value as Lane
        } else if value < 0 {
            self.min() as Lane
        } else {
            self.max() as Lane
        }
    }

    /// Rescale then saturate: the output stage of both engines.
    #[must_use]
    pub const fn narrow(&self, aligned_sum: i64) -> Lane {
        self.saturate(self.rescale(aligned_sum))
    }

    /// `a × b` as a single-width fixed-point value.
    #[must_use]
    pub const fn mul(&self, a: Lane, b: Lane) -> Lane {
        self.narrow(mul_wide(a, b))
    }
}

impl Default for QFormat {
    fn default() -> Self {
        Self::Q8_8
    }
}

impl std::fmt::Display for QFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Q{}.{}", self.int_bits(), self.frac_bits)
    }
}

/// Full-precision product of two lanes.
#[must_use]
pub const fn mul_wide(a: Lane, b: Lane) -> i64 {
    a as i64 * b as i64
}

/// One reduction-tree level: adjacent pairs summed, an odd last term passed through.
#[must_use]
pub fn tree_level(terms: &[i64]) -> Vec<i64> {
    terms.chunks(2).map(|pair| pair.iter().sum()).collect()
}

/// Sum through the full tree, level by level, in the same pairing order the pipeline uses.
#[must_use]
pub fn tree_sum(terms: &[i64]) -> i64 {
    let mut level = terms.to_vec();
    while level.len() > 1 {
        level = tree_level(&level);
    }
    level.first().copied().unwrap_or(0)
}

/// Classification rule: class 1 iff the full-width sum is non-negative.
#[must_use]
pub const fn classify(aligned_sum: i64) -> bool {
    aligned_sum >= 0
}
