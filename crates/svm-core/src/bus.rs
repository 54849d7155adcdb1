//! AXI4-Lite slave handshake, one outstanding request per direction.
//!
//! A request presented while its channel is ready is accepted in that cycle
//! and its response is driven for exactly one cycle, the next one. Ready is
//! low during that response cycle, so back-to-back accesses on one channel
//! take two cycles each. Read and write channels are independent.
//!
//! Write strobes are carried but not honoured: every accepted write replaces
//! the whole word.

use tracing::trace;

/// Response code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Response {
    /// Access completed.
    #[default]
    Okay,
    /// Decode error (only reported when the build enables it).
    SlvErr,
}

impl Response {
    /// True for [`Response::Okay`].
    #[must_use]
    pub const fn is_okay(self) -> bool {
        matches!(self, Self::Okay)
    }
}

/// Write address + data, presented together.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteRequest {
    /// Byte address.
    pub addr: u32,
    /// Data word.
    pub data: u32,
    /// Byte strobes.
    pub strobe: u8,
}

impl WriteRequest {
    /// Full-word write.
    #[must_use]
    pub const fn word(addr: u32, data: u32) -> Self {
        Self {
            addr,
            data,
            strobe: 0xF,
        }
    }
}

/// Read address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadRequest {
    /// Byte address.
    pub addr: u32,
}

/// Master-driven signals for one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BusRequest {
    /// Write channel valid + payload.
    pub write: Option<WriteRequest>,
    /// Read channel valid + payload.
    pub read: Option<ReadRequest>,
}

impl BusRequest {
    /// No request on either channel.
    #[must_use]
    pub const fn idle() -> Self {
        Self {
            write: None,
            read: None,
        }
    }

    /// Single-word write.
    #[must_use]
    pub const fn write(addr: u32, data: u32) -> Self {
        Self {
            write: Some(WriteRequest::word(addr, data)),
            read: None,
        }
    }

    /// Single-word read.
    #[must_use]
    pub const fn read(addr: u32) -> Self {
        Self {
            write: None,
            read: Some(ReadRequest { addr }),
        }
    }
}

/// Read data beat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadData {
    /// Data word.
    pub data: u32,
    /// Response code.
    pub resp: Response,
}

/// Slave-driven signals for one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BusResponse {
    /// A write presented this cycle is accepted.
    pub write_ready: bool,
    /// A read presented this cycle is accepted.
    pub read_ready: bool,
    /// Write acknowledgment (one-cycle pulse).
    pub write_ack: Option<Response>,
    /// Read data (one-cycle pulse).
    pub read_data: Option<ReadData>,
}

/// Responses in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BusPort {
    write_ack: Option<Response>,
    read_data: Option<ReadData>,
}

impl BusPort {
    /// Signals driven during the current cycle.
    #[must_use]
    pub fn outputs(&self) -> BusResponse {
        BusResponse {
            write_ready: self.write_ack.is_none(),
            read_ready: self.read_data.is_none(),
            write_ack: self.write_ack,
            read_data: self.read_data,
        }
    }

    /// Accepted requests this cycle, filtered by ready.
    #[must_use]
    pub fn accept(&self, request: &BusRequest) -> (Option<WriteRequest>, Option<ReadRequest>) {
        let out = self.outputs();
        let write = request.write.filter(|_| out.write_ready);
        let read = request.read.filter(|_| out.read_ready);
        if request.write.is_some() && write.is_none() {
            trace!("write stalled: response pending");
        }
        if request.read.is_some() && read.is_none() {
            trace!("read stalled: response pending");
        }
        (write, read)
    }

    /// State for the next cycle given what was accepted this cycle.
    #[must_use]
    pub fn next(write_ack: Option<Response>, read_data: Option<ReadData>) -> Self {
        Self {
            write_ack,
            read_data,
        }
    }
}
