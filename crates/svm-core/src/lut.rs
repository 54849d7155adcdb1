//! Distance-to-kernel lookup table.
//!
//! A read-only table, initialised when the core is built, that maps a
//! squared distance to an approximate RBF kernel value. The squared distance
//! (single-width scale, `F` fractional bits) drops its `dist_shift` low bits to
//! form an address; anything past the last entry reads the last entry. That
//! clamp is the approximation of the kernel's tail, not an error.
//!
//! Reference build: 256 entries, shift 4, Q8.8, so entry `i` covers squared
//! distances `[i/16, (i+1)/16)` and the table spans `0..16`.

use crate::error::{Result, SvmError};
use crate::fixed::{Lane, QFormat};

/// Largest supported address width.
pub const MAX_ADDR_BITS: u32 = 16;

/// Read-only kernel table with one cycle of read latency in the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelLut {
    entries: Vec<Lane>,
    format: QFormat,
    addr_bits: u32,
    dist_shift: u32,
}

impl KernelLut {
    /// Wrap an explicit table quantized in `format`.
    ///
    /// # Errors
    ///
    /// Returns [`SvmError::InvalidLut`] if the length is not a power of two in
    /// `2..=2^16`, the shift does not fit a 63-bit distance, an entry lies
    /// outside `format`, or an entry is larger than the one before it.
    pub fn new(entries: Vec<Lane>, format: QFormat, dist_shift: u32) -> Result<Self> {
        let len = entries.len();
        if len < 2 || !len.is_power_of_two() || len > 1 << MAX_ADDR_BITS {
            return Err(SvmError::invalid_lut(format!(
                "{len} entries; need a power of two between 2 and {}",
                1usize << MAX_ADDR_BITS
            )));
        }
        if dist_shift >= 63 {
            return Err(SvmError::invalid_lut(format!(
                "distance shift {dist_shift} discards the whole distance"
            )));
        }
        if let Some(v) = entries
            .iter()
            .map(|&v| i64::from(v))
            .find(|&v| v < format.min() || v > format.max())
        {
            return Err(SvmError::invalid_lut(format!(
                "entry {v} outside {format} range"
            )));
        }
        if let Some(i) = entries.windows(2).position(|w| w[1] > w[0]) {
            return Err(SvmError::invalid_lut(format!(
                "entry {} ({}) rises above entry {i} ({})",
                i + 1,
                entries[i + 1],
                entries[i]
            )));
        }
        Ok(Self {
            addr_bits: len.trailing_zeros(),
            entries,
            format,
            dist_shift,
        })
    }

    /// Fill a table with `exp(-gamma · d)` quantized to `format`.
    ///
    /// Entry `i` takes the value at the lower edge of its bucket,
    /// `d = (i << dist_shift) / 2^F`.
    ///
    /// # Errors
    ///
    /// Returns [`SvmError::InvalidLut`] for a negative or non-finite `gamma`
    /// or an address width outside `1..=16`.
    #[allow(clippy::cast_precision_loss)]
    pub fn rbf(gamma: f64, format: QFormat, addr_bits: u32, dist_shift: u32) -> Result<Self> {
        if !gamma.is_finite() || gamma < 0.0 {
            return Err(SvmError::invalid_lut(format!(
                "gamma {gamma} must be finite and non-negative"
            )));
        }
        if !(1..=MAX_ADDR_BITS).contains(&addr_bits) {
            return Err(SvmError::invalid_lut(format!(
                "address width {addr_bits} outside 1..={MAX_ADDR_BITS}"
            )));
        }
        let entries = (0..1usize << addr_bits)
            .map(|i| {
                let raw = (i as u64) << dist_shift.min(47);
                let dist = format.to_f64(raw as i64);
                format.quantize((-gamma * dist).exp())
            })
            .collect();
        Self::new(entries, format, dist_shift)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always false; a table has at least two entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Fixed-point format the entries were quantized in.
    #[must_use]
    pub const fn format(&self) -> QFormat {
        self.format
    }

    /// Address width in bits.
    #[must_use]
    pub const fn addr_bits(&self) -> u32 {
        self.addr_bits
    }

    /// Low distance bits dropped when forming the address.
    #[must_use]
    pub const fn dist_shift(&self) -> u32 {
        self.dist_shift
    }

    /// Table contents.
    #[must_use]
    pub fn entries(&self) -> &[Lane] {
        &self.entries
    }

    /// Value at distance zero.
    #[must_use]
    pub fn peak(&self) -> Lane {
        self.entries[0]
    }

    /// Address for a squared distance, clamped to the last entry.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn address(&self, dist: i64) -> usize {
        let last = self.entries.len() - 1;
        let bucket = dist.max(0) >> self.dist_shift;
        if bucket as u64 > last as u64 {
            last
        } else {
            bucket as usize
        }
    }

    /// Read one entry. Addresses are always produced by [`Self::address`].
    #[must_use]
    pub fn read(&self, addr: usize) -> Lane {
        self.entries[addr.min(self.entries.len() - 1)]
    }

    /// Address then read, as one combinational step.
    #[must_use]
    pub fn lookup(&self, dist: i64) -> Lane {
        self.read(self.address(dist))
    }
}

impl Default for KernelLut {
    /// `gamma = 1/16` over the reference Q8.8 geometry.
    fn default() -> Self {
        let entries = (0..256usize)
            .map(|i| {
                #[allow(clippy::cast_precision_loss)]
                let dist = (i << 4) as f64 / 256.0;
                QFormat::Q8_8.quantize((-dist / 16.0).exp())
            })
            .collect();
        Self {
            entries,
            format: QFormat::Q8_8,
            addr_bits: 8,
            dist_shift: 4,
        }
    }
}
