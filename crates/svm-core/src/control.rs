//! Control/status state machine.
//!
//! ```text
//!            start edge                output-valid
//!   Idle ───────────────▶ Busy ─────────────────────▶ Done
//!                          ▲                            │
//!                          └────────── start edge ──────┘
//! ```
//!
//! - Only a 0→1 transition of `control.start` starts an inference; holding
//!   the bit high starts exactly one.
//! - A start edge seen while Busy is dropped. The level is still tracked, so
//!   a bit left high across completion does not fire afterwards either.
//! - The latency counter resets on the accepted edge and counts every Busy
//!   cycle, the completion cycle included, so it equals the engine latency.
//! - `control.soft_reset` held high flushes the pipeline every cycle and
//!   aborts an in-flight inference back to Idle. Captured result, prediction
//!   and latency are left alone.

use crate::fixed::Lane;
use crate::scorer::Score;
use svm_chip::regs::{control, status};
use tracing::debug;

/// FSM phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// Nothing started since reset.
    #[default]
    Idle,
    /// Inference in flight.
    Busy,
    /// Result captured and stable.
    Done,
}

/// Registers owned by the FSM.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ControlState {
    /// Current phase.
    pub phase: Phase,
    /// `control.start` as sampled last cycle (edge detector).
    pub start_level: bool,
    /// Decision of the last completed inference.
    pub result: Lane,
    /// Class of the last completed inference.
    pub prediction: bool,
    /// Cycles counted for the current or last inference.
    pub latency: u32,
}

/// What the FSM drives this cycle besides its own next state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ControlOutputs {
    /// One-cycle input-valid pulse to the scorer.
    pub input_valid: bool,
    /// Hold the scorer in reset.
    pub flush: bool,
}

impl ControlState {
    /// True while an inference is in flight.
    #[must_use]
    pub fn busy(&self) -> bool {
        self.phase == Phase::Busy
    }

    /// True once a result has been captured and no new start accepted.
    #[must_use]
    pub fn done(&self) -> bool {
        self.phase == Phase::Done
    }

    /// Status register word.
    #[must_use]
    pub fn status_word(&self) -> u32 {
        let mut word = 0;
        if self.done() {
            word |= status::DONE;
        }
        if self.busy() {
            word |= status::BUSY;
        }
        if self.prediction {
            word |= status::PREDICTION;
        }
        word
    }

    /// Result register word: decision sign-extended to 32 bits.
    #[must_use]
    #[allow(clippy::cast_sign_loss)]
    pub fn result_word(&self) -> u32 {
        i32::from(self.result) as u32
    }

    /// Next state from this cycle's control word and scorer output.
    #[must_use]
    pub fn step(&self, control_word: u32, output: Option<Score>) -> (Self, ControlOutputs) {
        let start = control_word & control::START != 0;
        let soft_reset = control_word & control::SOFT_RESET != 0;
        let edge = start && !self.start_level;

        let mut next = Self {
            start_level: start,
            ..self.clone()
        };
        let mut out = ControlOutputs::default();

        if soft_reset {
            out.flush = true;
            if self.busy() {
                debug!("soft reset aborted in-flight inference after {} cycles", self.latency);
                next.phase = Phase::Idle;
            }
            return (next, out);
        }

        match self.phase {
            Phase::Busy => {
                next.latency = self.latency.saturating_add(1);
                if let Some(score) = output {
                    next.result = score.decision;
                    next.prediction = score.class;
                    next.phase = Phase::Done;
                    debug!(
                        "done: decision={} class={} latency={}",
                        score.decision,
                        u8::from(score.class),
                        next.latency
                    );
                } else if edge {
                    debug!("start edge ignored: inference in flight");
                }
            }
            Phase::Idle | Phase::Done => {
                if edge {
                    next.phase = Phase::Busy;
                    next.latency = 0;
                    out.input_valid = true;
                    debug!("start accepted");
                }
            }
        }
        (next, out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const START: u32 = control::START;

    fn score(decision: Lane) -> Score {
        Score {
            decision,
            class: decision >= 0,
            sum: i64::from(decision) << 8,
        }
    }

    #[test]
    fn edge_starts_once_while_held() {
        let s = ControlState::default();
        let (s, out) = s.step(START, None);
        assert!(out.input_valid);
        assert!(s.busy());
        let (s, out) = s.step(START, Some(score(5)));
        assert!(!out.input_valid);
        assert!(s.done());
        for _ in 0..10 {
            let (n, out) = s.step(START, None);
            assert!(!out.input_valid);
            assert!(n.done());
        }
    }

    #[test]
    fn latency_counts_busy_cycles_including_completion() {
        let mut s = ControlState::default();
        s = s.step(START, None).0;
        for _ in 0..5 {
            s = s.step(0, None).0;
        }
        s = s.step(0, Some(score(-3))).0;
        assert_eq!(s.latency, 6);
        assert_eq!(s.result_word(), 0xFFFF_FFFD);
        assert_eq!(s.status_word(), status::DONE);
    }

    #[test]
    fn edge_while_busy_is_dropped() {
        let s = ControlState::default();
        let (s, _) = s.step(START, None);
        let (s, _) = s.step(0, None);
        let (s, out) = s.step(START, None);
        assert!(!out.input_valid);
        assert_eq!(s.latency, 2);
        let (s, _) = s.step(START, Some(score(1)));
        assert!(s.done());
        // still high, no new edge
        let (_, out) = s.step(START, None);
        assert!(!out.input_valid);
    }

    #[test]
    fn soft_reset_aborts_busy_but_keeps_result() {
        let mut s = ControlState::default();
        s = s.step(START, None).0;
        s = s.step(0, Some(score(7))).0;
        assert!(s.done());
        s = s.step(START, None).0;
        assert!(s.busy());
        let (s, out) = s.step(control::SOFT_RESET, None);
        assert!(out.flush);
        assert_eq!(s.phase, Phase::Idle);
        assert_eq!(s.result, 7);
        // start raised under soft reset does not fire on release
        let (s, out) = s.step(control::SOFT_RESET | START, None);
        assert!(!out.input_valid);
        let (_, out) = s.step(START, None);
        assert!(!out.input_valid);
    }

    #[test]
    fn status_word_bits() {
        let s = ControlState {
            phase: Phase::Busy,
            prediction: true,
            ..ControlState::default()
        };
        assert_eq!(s.status_word(), status::BUSY | status::PREDICTION);
        assert_eq!(ControlState::default().status_word(), 0);
    }
}
