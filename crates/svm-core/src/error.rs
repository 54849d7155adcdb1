//! Error types for host-side construction and programming of the core.
//!
//! The clocked core itself never errors: overflow saturates and unmapped
//! addresses are absorbed. These errors come from building a core with an
//! impossible geometry, handing the host driver operands of the wrong shape,
//! or a host poll loop running out of cycles.

use thiserror::Error;

/// Result type alias for classifier-core operations
pub type Result<T> = std::result::Result<T, SvmError>;

/// Errors raised outside the clocked datapath
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SvmError {
    /// Build configuration cannot be realised
    #[error("Invalid configuration: {reason}")]
    InvalidConfig {
        /// Reason for rejection
        reason: String,
    },

    /// Operand slice does not match the build geometry
    #[error("Operand length mismatch for {what}: got {got}, expected {expected}")]
    OperandLength {
        /// Operand block name
        what: &'static str,
        /// Length supplied
        got: usize,
        /// Length the geometry requires
        expected: usize,
    },

    /// Kernel lookup table rejected
    #[error("Invalid kernel table: {reason}")]
    InvalidLut {
        /// Reason for rejection
        reason: String,
    },

    /// Host polled status for longer than its cycle budget
    #[error("Core did not signal done within {cycles} cycles")]
    Timeout {
        /// Cycles spent polling
        cycles: u64,
    },

    /// Bus answered SLVERR (only with decode-error reporting enabled)
    #[error("Bus error response at {addr:#06x}")]
    BusError {
        /// Address of the rejected access
        addr: u32,
    },

    /// Operation not valid in the current state
    #[error("Core in invalid state: {state}")]
    InvalidState {
        /// Current state description
        state: String,
    },
}

impl SvmError {
    /// Create an invalid configuration error
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Create an invalid kernel table error
    pub fn invalid_lut(reason: impl Into<String>) -> Self {
        Self::InvalidLut {
            reason: reason.into(),
        }
    }

    /// Create an invalid state error
    pub fn invalid_state(state: impl Into<String>) -> Self {
        Self::InvalidState {
            state: state.into(),
        }
    }

    /// Check an operand slice length against the geometry
    ///
    /// # Errors
    ///
    /// Returns [`SvmError::OperandLength`] when `got != expected`.
    pub fn check_len(what: &'static str, got: usize, expected: usize) -> Result<()> {
        if got == expected {
            Ok(())
        } else {
            Err(Self::OperandLength {
                what,
                got,
                expected,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_problem() {
        let e = SvmError::check_len("weights", 3, 16).unwrap_err();
        assert_eq!(
            e.to_string(),
            "Operand length mismatch for weights: got 3, expected 16"
        );
        assert_eq!(
            SvmError::BusError { addr: 0x44 }.to_string(),
            "Bus error response at 0x0044"
        );
        assert!(SvmError::check_len("features", 16, 16).is_ok());
    }
}
