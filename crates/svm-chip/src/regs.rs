//! Register map of the classifier core (32-bit AXI4-Lite slave).
//!
//! Offsets are byte addresses of 32-bit words. Only the fixed registers live
//! here; the operand blocks (weights, coefficients, features, support
//! vectors) move with the build geometry, see [`crate::layout`].
//!
//! ```text
//! 0x00  control   R/W  bit0 start (edge-triggered), bit1 soft_reset (level)
//! 0x04  status    RO   bit0 done, bit1 busy, bit2 prediction
//! 0x08  result    RO   decision value, sign-extended to 32 bits
//! 0x0C  latency   RO   cycles from start to done
//! 0x10  bias      R/W  fixed-point bias (low word bits used)
//! 0x20  operands  R/W  weights[N] (linear) or dual coefficients[M] (kernel)
//! 0x80  features  R/W  features[N]
//! ```

// ── Fixed registers ──────────────────────────────────────────────────────────

/// Control register.
pub const CONTROL: u32 = 0x00;
/// Status register.
pub const STATUS: u32 = 0x04;
/// Decision value of the last completed inference.
pub const RESULT: u32 = 0x08;
/// Cycles elapsed between the accepted start edge and done.
pub const LATENCY: u32 = 0x0C;
/// Bias scalar.
pub const BIAS: u32 = 0x10;

// ── Operand blocks (default placement) ───────────────────────────────────────

/// First word of the weight block (linear) or coefficient block (kernel).
pub const OPERAND_BASE: u32 = 0x20;
/// First word of the feature block when the operand block fits below it.
pub const FEATURE_BASE: u32 = 0x80;
/// Blocks start on this boundary when they have to move.
pub const BLOCK_ALIGN: u32 = 0x20;
/// Support-vector block alignment (kernel builds).
pub const SUPPORT_ALIGN: u32 = 0x100;

/// Bytes per register word.
pub const WORD_BYTES: u32 = 4;
/// Byte-lane bits ignored by the address decoder.
pub const WORD_MASK: u32 = !(WORD_BYTES - 1);

// ── Status register bit definitions ──────────────────────────────────────────

/// Status register bits.
pub mod status {
    /// Result, prediction and latency are valid and stable.
    pub const DONE: u32 = 1 << 0;
    /// An inference is in flight.
    pub const BUSY: u32 = 1 << 1;
    /// Class of the last completed inference.
    pub const PREDICTION: u32 = 1 << 2;
}

// ── Control register bit definitions ─────────────────────────────────────────

/// Control register bits.
pub mod control {
    /// Start an inference on the 0→1 transition.
    pub const START: u32 = 1 << 0;
    /// Hold the scoring pipeline in reset while set.
    pub const SOFT_RESET: u32 = 1 << 1;
    /// Bits that read back; everything else is dropped on write.
    pub const MASK: u32 = START | SOFT_RESET;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_registers_are_distinct_words() {
        let regs = [CONTROL, STATUS, RESULT, LATENCY, BIAS];
        for (i, a) in regs.iter().enumerate() {
            assert_eq!(a % WORD_BYTES, 0);
            for b in &regs[i + 1..] {
                assert_ne!(a, b);
            }
        }
        assert!(BIAS < OPERAND_BASE);
    }

    #[test]
    fn status_bits_match_host_driver() {
        assert_eq!(status::DONE, 0x1);
        assert_eq!(status::BUSY, 0x2);
        assert_eq!(status::PREDICTION, 0x4);
        assert_eq!(control::MASK, 0x3);
    }
}
