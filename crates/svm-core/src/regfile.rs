//! Host-visible register file: address decode, access rules and storage of
//! the host-owned registers.

use crate::bus::Response;
use crate::config::CoreConfig;
use crate::control::ControlState;
use crate::operands::OperandBank;
use svm_chip::regs::control;
use svm_chip::{Register, RegisterMap};
use tracing::trace;

/// Outcome of decoding one access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Access {
    /// Register hit, if any.
    pub register: Option<Register>,
    /// Response code to return.
    pub resp: Response,
}

/// Control register plus the operand bank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterFile {
    map: RegisterMap,
    decode_errors: bool,
    control: u32,
    bank: OperandBank,
}

impl RegisterFile {
    /// Zeroed register file for `config`.
    #[must_use]
    pub fn new(config: &CoreConfig) -> Self {
        Self {
            map: config.register_map(),
            decode_errors: config.decode_errors,
            control: 0,
            bank: OperandBank::new(config),
        }
    }

    /// Address layout.
    #[must_use]
    pub const fn map(&self) -> &RegisterMap {
        &self.map
    }

    /// Stored control bits.
    #[must_use]
    pub const fn control(&self) -> u32 {
        self.control
    }

    /// Operand registers.
    #[must_use]
    pub const fn bank(&self) -> &OperandBank {
        &self.bank
    }

    /// Zero every host-owned register.
    pub fn clear(&mut self) {
        self.control = 0;
        self.bank.clear();
    }

    fn error_or_okay(&self, ok: bool) -> Response {
        if ok || !self.decode_errors {
            Response::Okay
        } else {
            Response::SlvErr
        }
    }

    /// Decode a read.
    #[must_use]
    pub fn decode_read(&self, addr: u32) -> Access {
        let register = self.map.decode(addr);
        Access {
            register,
            resp: self.error_or_okay(register.is_some()),
        }
    }

    /// Decode a write. Read-only targets count as misses.
    #[must_use]
    pub fn decode_write(&self, addr: u32) -> Access {
        let register = self.map.decode(addr).filter(Register::is_writable);
        Access {
            register,
            resp: self.error_or_okay(register.is_some()),
        }
    }

    /// Word returned for a read of `register`; unmapped reads return 0.
    #[must_use]
    pub fn read(&self, register: Option<Register>, status: &ControlState) -> u32 {
        match register {
            Some(Register::Control) => self.control,
            Some(Register::Status) => status.status_word(),
            Some(Register::Result) => status.result_word(),
            Some(Register::Latency) => status.latency,
            Some(reg) => self.bank.word(reg).unwrap_or(0),
            None => 0,
        }
    }

    /// Commit a write. Returns false when the write was discarded.
    pub fn write(&mut self, addr: u32, data: u32) -> bool {
        match self.decode_write(addr).register {
            Some(Register::Control) => {
                self.control = data & control::MASK;
                true
            }
            Some(reg) => self.bank.set_word(reg, data),
            None => {
                trace!("write to {addr:#06x} discarded");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use svm_chip::regs;

    #[test]
    fn control_is_masked_on_write() {
        let mut rf = RegisterFile::new(&CoreConfig::linear(4));
        assert!(rf.write(regs::CONTROL, 0xFFFF_FFFF));
        assert_eq!(rf.control(), control::MASK);
        let status = ControlState::default();
        assert_eq!(rf.read(Some(Register::Control), &status), 0b11);
    }

    #[test]
    fn read_only_and_unmapped_writes_are_discarded() {
        let mut rf = RegisterFile::new(&CoreConfig::linear(4));
        assert!(!rf.write(regs::STATUS, 7));
        assert!(!rf.write(0xFFC, 7));
        assert_eq!(rf.decode_read(0xFFC).register, None);
        assert_eq!(rf.decode_read(0xFFC).resp, Response::Okay);
    }

    #[test]
    fn decode_errors_when_enabled() {
        let rf = RegisterFile::new(&CoreConfig::linear(4).with_decode_errors(true));
        assert_eq!(rf.decode_read(0xFFC).resp, Response::SlvErr);
        assert_eq!(rf.decode_write(regs::RESULT).resp, Response::SlvErr);
        assert_eq!(rf.decode_write(regs::BIAS).resp, Response::Okay);
    }

    #[test]
    fn operand_readback_is_exact() {
        let mut rf = RegisterFile::new(&CoreConfig::linear(4));
        let addr = rf.map().offset(Register::Weight(2));
        assert!(rf.write(addr, 0xDEAD_BEEF));
        let access = rf.decode_read(addr | 0b11);
        assert_eq!(
            rf.read(access.register, &ControlState::default()),
            0xDEAD_BEEF
        );
    }
}
