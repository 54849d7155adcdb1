//! The clocked classifier core: register file, control FSM, bus port and one
//! scoring engine behind a single clock.
//!
//! Every call to [`Core::tick`] is one rising edge. All next-state values are
//! computed from the state visible during the cycle, then committed
//! together:
//!
//! 1. bus outputs for this cycle (ready, pending responses)
//! 2. read data for an accepted read, from current register contents
//! 3. FSM step from the current control word and scorer output
//! 4. scorer step against the operand bank as it was before this cycle's write
//! 5. commit the accepted write, the FSM state and the bus responses

use crate::bus::{BusPort, BusRequest, BusResponse, ReadData};
use crate::config::CoreConfig;
use crate::control::ControlState;
use crate::error::Result;
use crate::fixed::QFormat;
use crate::regfile::RegisterFile;
use crate::scorer::{build_scorer, Scorer};
use svm_chip::{Geometry, RegisterMap};
use tracing::{debug, info, trace};

/// One instance of the classifier core.
#[derive(Debug)]
pub struct Core {
    config: CoreConfig,
    regs: RegisterFile,
    control: ControlState,
    scorer: Box<dyn Scorer>,
    port: BusPort,
    cycle: u64,
}

impl Core {
    /// Build a core after validating its configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if `config` fails [`CoreConfig::validate`].
    pub fn new(config: CoreConfig) -> Result<Self> {
        config.validate()?;
        let core = Self {
            regs: RegisterFile::new(&config),
            control: ControlState::default(),
            scorer: build_scorer(&config),
            port: BusPort::default(),
            cycle: 0,
            config,
        };
        info!(
            "core ready: {} window 0x000..{:#05x}",
            core.config.geometry.engine,
            core.regs.map().end()
        );
        Ok(core)
    }

    /// Build configuration.
    #[must_use]
    pub const fn config(&self) -> &CoreConfig {
        &self.config
    }

    /// Lane counts.
    #[must_use]
    pub const fn geometry(&self) -> Geometry {
        self.config.geometry
    }

    /// Numeric format.
    #[must_use]
    pub const fn format(&self) -> QFormat {
        self.config.format
    }

    /// Register layout.
    #[must_use]
    pub const fn map(&self) -> &RegisterMap {
        self.regs.map()
    }

    /// Engine latency in cycles.
    #[must_use]
    pub fn latency(&self) -> u32 {
        self.scorer.latency()
    }

    /// Clock edges since construction or the last [`Core::reset`].
    #[must_use]
    pub const fn cycle(&self) -> u64 {
        self.cycle
    }

    /// FSM-owned registers as visible this cycle.
    #[must_use]
    pub const fn status(&self) -> &ControlState {
        &self.control
    }

    /// Host-owned registers as visible this cycle.
    #[must_use]
    pub const fn registers(&self) -> &RegisterFile {
        &self.regs
    }

    /// Scoring engine.
    #[must_use]
    pub fn scorer(&self) -> &dyn Scorer {
        self.scorer.as_ref()
    }

    /// Bus signals the slave drives during the current cycle.
    #[must_use]
    pub fn bus_outputs(&self) -> BusResponse {
        self.port.outputs()
    }

    /// Synchronous full reset: registers, FSM, pipeline and bus return to power-on state.
    pub fn reset(&mut self) {
        self.regs.clear();
        self.control = ControlState::default();
        self.scorer.flush();
        self.port = BusPort::default();
        self.cycle = 0;
        debug!("core reset");
    }

    /// Apply one clock edge with `request` driven by the bus master.
    ///
    /// Returns the slave signals as they were during the cycle the edge ends.
    pub fn tick(&mut self, request: &BusRequest) -> BusResponse {
        let outputs = self.port.outputs();
        let (write, read) = self.port.accept(request);

        let read_data = read.map(|r| {
            let access = self.regs.decode_read(r.addr);
            let data = self.regs.read(access.register, &self.control);
            trace!("cycle {}: read {:#06x} -> {data:#010x}", self.cycle, r.addr);
            ReadData {
                data,
                resp: access.resp,
            }
        });
        let write_ack = write.map(|w| self.regs.decode_write(w.addr).resp);

        let (control, drive) = self.control.step(self.regs.control(), self.scorer.output());
        if drive.flush {
            self.scorer.flush();
        } else {
            self.scorer.tick(drive.input_valid, self.regs.bank());
        }

        if let Some(w) = write {
            trace!("cycle {}: write {:#06x} <- {:#010x}", self.cycle, w.addr, w.data);
            self.regs.write(w.addr, w.data);
        }
        self.control = control;
        self.port = BusPort::next(write_ack, read_data);
        self.cycle += 1;
        outputs
    }

    /// Run `cycles` edges with the bus idle.
    pub fn idle(&mut self, cycles: u64) {
        for _ in 0..cycles {
            self.tick(&BusRequest::idle());
        }
    }
}
