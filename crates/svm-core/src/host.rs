//! Host-side driver: programs the core and runs inferences over the bus only.
//!
//! Every access goes through [`Core::tick`] with the handshake a real master
//! would drive, so cycle counts reported here include bus overhead.
//!
//! # Inference sequence
//!
//! ```text
//! features → control=soft_reset → control=0 → control=start → control=0
//!          → poll status until done → read result, latency
//! ```

use crate::bus::{BusRequest, BusResponse, Response};
use crate::device::Core;
use crate::error::{Result, SvmError};
use crate::fixed::{Lane, QFormat};
use svm_chip::regs::{self, control, status};
use svm_chip::{Engine, Register};
use tracing::{debug, info, warn};

/// Default poll budget per inference, in cycles.
pub const DEFAULT_POLL_BUDGET: u64 = 10_000;

/// Cycles a single request may wait for ready before the driver gives up.
const READY_BUDGET: u64 = 64;

/// Trained linear model in lane encoding.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LinearModel {
    /// N weights.
    pub weights: Vec<Lane>,
    /// Bias.
    pub bias: Lane,
}

impl LinearModel {
    /// Quantize real-valued parameters.
    #[must_use]
    pub fn quantize(format: &QFormat, weights: &[f64], bias: f64) -> Self {
        Self {
            weights: weights.iter().map(|&w| format.quantize(w)).collect(),
            bias: format.quantize(bias),
        }
    }
}

/// Trained kernel model in lane encoding.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct KernelModel {
    /// M support vectors of N lanes.
    pub support_vectors: Vec<Vec<Lane>>,
    /// M dual coefficients.
    pub coefficients: Vec<Lane>,
    /// Bias.
    pub bias: Lane,
}

impl KernelModel {
    /// Quantize real-valued parameters.
    #[must_use]
    pub fn quantize(
        format: &QFormat,
        support_vectors: &[Vec<f64>],
        coefficients: &[f64],
        bias: f64,
    ) -> Self {
        Self {
            support_vectors: support_vectors
                .iter()
                .map(|sv| sv.iter().map(|&v| format.quantize(v)).collect())
                .collect(),
            coefficients: coefficients.iter().map(|&c| format.quantize(c)).collect(),
            bias: format.quantize(bias),
        }
    }
}

/// Outcome of one inference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Inference {
    /// Predicted class.
    pub class: bool,
    /// Decision value (result register, sign-extended).
    pub decision: i32,
    /// Latency register.
    pub latency_cycles: u32,
    /// Cycles the host spent, from the first feature write to the result read.
    pub host_cycles: u64,
}

/// Aggregate of a labelled batch.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Evaluation {
    /// `confusion[label][prediction]`.
    pub confusion: [[u64; 2]; 2],
    /// Sum of latency registers.
    pub latency_cycles: u64,
    /// Sum of host cycles.
    pub host_cycles: u64,
}

impl Evaluation {
    /// Record one labelled inference.
    pub fn record(&mut self, label: bool, inference: &Inference) {
        self.confusion[usize::from(label)][usize::from(inference.class)] += 1;
        self.latency_cycles += u64::from(inference.latency_cycles);
        self.host_cycles += inference.host_cycles;
    }

    /// Samples recorded.
    #[must_use]
    pub fn samples(&self) -> u64 {
        self.confusion.iter().flatten().sum()
    }

    /// Correct predictions.
    #[must_use]
    pub fn correct(&self) -> u64 {
        self.confusion[0][0] + self.confusion[1][1]
    }

    /// Fraction correct; 0 for an empty batch.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn accuracy(&self) -> f64 {
        match self.samples() {
            0 => 0.0,
            n => self.correct() as f64 / n as f64,
        }
    }

    /// Mean latency register value.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn mean_latency(&self) -> f64 {
        match self.samples() {
            0 => 0.0,
            n => self.latency_cycles as f64 / n as f64,
        }
    }

    /// Inferences per second at `clock_hz`, counting host overhead.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn throughput(&self, clock_hz: f64) -> f64 {
        if self.host_cycles == 0 {
            0.0
        } else {
            self.samples() as f64 * clock_hz / self.host_cycles as f64
        }
    }
}

/// Bus-level driver for one core.
#[derive(Debug)]
pub struct Accelerator {
    core: Core,
    poll_budget: u64,
}

impl Accelerator {
    /// Wrap a core.
    pub fn new(core: Core) -> Self {
        info!(
            "accelerator: {} engine, N={} M={}, latency {} cycles",
            core.geometry().engine,
            core.geometry().features,
            core.geometry().support_vectors,
            core.latency()
        );
        Self {
            core,
            poll_budget: DEFAULT_POLL_BUDGET,
        }
    }

    /// Override the per-inference poll budget.
    #[must_use]
    pub fn with_poll_budget(mut self, cycles: u64) -> Self {
        self.poll_budget = cycles;
        self
    }

    /// Underlying core.
    pub fn core(&self) -> &Core {
        &self.core
    }

    /// Underlying core, mutably.
    pub fn core_mut(&mut self) -> &mut Core {
        &mut self.core
    }

    /// Release the core.
    pub fn into_core(self) -> Core {
        self.core
    }

    /// Present `request` until accepted, then return the response cycle's signals.
    fn transact(&mut self, request: &BusRequest, addr: u32) -> Result<BusResponse> {
        let mut waited = 0;
        loop {
            let out = self.core.tick(request);
            let accepted = (request.write.is_none() || out.write_ready)
                && (request.read.is_none() || out.read_ready);
            if accepted {
                break;
            }
            waited += 1;
            if waited >= READY_BUDGET {
                warn!("request to {addr:#06x} never accepted");
                return Err(SvmError::Timeout { cycles: waited });
            }
        }
        Ok(self.core.tick(&BusRequest::idle()))
    }

    /// Single-word register write.
    ///
    /// # Errors
    ///
    /// Returns [`SvmError::BusError`] on a SLVERR response.
    pub fn write_reg(&mut self, addr: u32, value: u32) -> Result<()> {
        let out = self.transact(&BusRequest::write(addr, value), addr)?;
        match out.write_ack {
            Some(Response::Okay) => Ok(()),
            _ => Err(SvmError::BusError { addr }),
        }
    }

    /// Single-word register read.
    ///
    /// # Errors
    ///
    /// Returns [`SvmError::BusError`] on a SLVERR response.
    pub fn read_reg(&mut self, addr: u32) -> Result<u32> {
        let out = self.transact(&BusRequest::read(addr), addr)?;
        match out.read_data {
            Some(d) if d.resp.is_okay() => Ok(d.data),
            _ => Err(SvmError::BusError { addr }),
        }
    }

    #[allow(clippy::cast_sign_loss)]
    fn write_lane(&mut self, reg: Register, value: Lane) -> Result<()> {
        let addr = self.core.map().offset(reg);
        self.write_reg(addr, i32::from(value) as u32)
    }

    fn expect_engine(&self, engine: Engine) -> Result<()> {
        let built = self.core.geometry().engine;
        if built == engine {
            Ok(())
        } else {
            Err(SvmError::invalid_state(format!(
                "{engine} model on a {built} build"
            )))
        }
    }

    /// Program weights and bias of a linear build.
    ///
    /// # Errors
    ///
    /// Returns [`SvmError::InvalidState`] on a kernel build,
    /// [`SvmError::OperandLength`] if the weight count is not N, or a bus error.
    pub fn load_linear(&mut self, model: &LinearModel) -> Result<()> {
        self.expect_engine(Engine::Linear)?;
        SvmError::check_len("weights", model.weights.len(), self.core.geometry().features)?;
        for (i, &w) in model.weights.iter().enumerate() {
            self.write_lane(Register::Weight(i), w)?;
        }
        self.write_lane(Register::Bias, model.bias)?;
        debug!("linear model loaded: {} weights", model.weights.len());
        Ok(())
    }

    /// Program support vectors, coefficients and bias of a kernel build.
    ///
    /// # Errors
    ///
    /// Returns [`SvmError::InvalidState`] on a linear build,
    /// [`SvmError::OperandLength`] on any shape mismatch, or a bus error.
    pub fn load_kernel(&mut self, model: &KernelModel) -> Result<()> {
        self.expect_engine(Engine::Kernel)?;
        let g = self.core.geometry();
        SvmError::check_len("support_vectors", model.support_vectors.len(), g.support_vectors)?;
        SvmError::check_len("coefficients", model.coefficients.len(), g.support_vectors)?;
        for sv in &model.support_vectors {
            SvmError::check_len("support_vector", sv.len(), g.features)?;
        }
        for (vector, sv) in model.support_vectors.iter().enumerate() {
            for (lane, &v) in sv.iter().enumerate() {
                self.write_lane(Register::SupportVector { vector, lane }, v)?;
            }
        }
        for (m, &c) in model.coefficients.iter().enumerate() {
            self.write_lane(Register::Coefficient(m), c)?;
        }
        self.write_lane(Register::Bias, model.bias)?;
        debug!(
            "kernel model loaded: {} support vectors",
            model.support_vectors.len()
        );
        Ok(())
    }

    /// Write the feature block.
    ///
    /// # Errors
    ///
    /// Returns [`SvmError::OperandLength`] if the count is not N, or a bus error.
    pub fn write_features(&mut self, features: &[Lane]) -> Result<()> {
        SvmError::check_len("features", features.len(), self.core.geometry().features)?;
        for (i, &x) in features.iter().enumerate() {
            self.write_lane(Register::Feature(i), x)?;
        }
        Ok(())
    }

    /// Pulse soft reset.
    ///
    /// # Errors
    ///
    /// Propagates bus errors.
    pub fn soft_reset(&mut self) -> Result<()> {
        self.write_reg(regs::CONTROL, control::SOFT_RESET)?;
        self.write_reg(regs::CONTROL, 0)
    }

    /// Pulse start.
    ///
    /// # Errors
    ///
    /// Propagates bus errors.
    pub fn start(&mut self) -> Result<()> {
        self.write_reg(regs::CONTROL, control::START)?;
        self.write_reg(regs::CONTROL, 0)
    }

    /// Poll status until done; returns the final status word.
    ///
    /// # Errors
    ///
    /// Returns [`SvmError::Timeout`] once the poll budget is spent.
    pub fn wait_done(&mut self) -> Result<u32> {
        let begin = self.core.cycle();
        loop {
            let word = self.read_reg(regs::STATUS)?;
            if word & status::DONE != 0 {
                return Ok(word);
            }
            let spent = self.core.cycle() - begin;
            if spent >= self.poll_budget {
                warn!("no done after {spent} cycles (status {word:#x})");
                return Err(SvmError::Timeout { cycles: spent });
            }
        }
    }

    /// Run one inference on `features` with the loaded model.
    ///
    /// # Errors
    ///
    /// Returns [`SvmError::OperandLength`] for a wrong feature count,
    /// [`SvmError::Timeout`] if done never rises, or a bus error.
    #[allow(clippy::cast_possible_wrap)]
    pub fn predict(&mut self, features: &[Lane]) -> Result<Inference> {
        let begin = self.core.cycle();
        self.write_features(features)?;
        self.soft_reset()?;
        self.start()?;
        let word = self.wait_done()?;
        let decision = self.read_reg(regs::RESULT)? as i32;
        let latency_cycles = self.read_reg(regs::LATENCY)?;
        let inference = Inference {
            class: word & status::PREDICTION != 0,
            decision,
            latency_cycles,
            host_cycles: self.core.cycle() - begin,
        };
        debug!("{inference:?}");
        Ok(inference)
    }

    /// Predict every sample and tally against `labels`.
    ///
    /// # Errors
    ///
    /// Returns [`SvmError::OperandLength`] if the label count differs from
    /// the sample count, or the first error [`Self::predict`] raises.
    pub fn evaluate(&mut self, samples: &[Vec<Lane>], labels: &[bool]) -> Result<Evaluation> {
        SvmError::check_len("labels", labels.len(), samples.len())?;
        let mut eval = Evaluation::default();
        for (x, &label) in samples.iter().zip(labels) {
            let inference = self.predict(x)?;
            eval.record(label, &inference);
        }
        info!(
            "evaluated {} samples: accuracy {:.4}, mean latency {:.1} cycles",
            eval.samples(),
            eval.accuracy(),
            eval.mean_latency()
        );
        Ok(eval)
    }
}
