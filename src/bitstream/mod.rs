//! Bit-precise streams over byte-oriented I/O channels.
//!
//! [`BitReader`] and [`BitWriter`] move values of 1 to [`MAX_BITS`] bits,
//! most significant bit first, across byte boundaries. They sit on top of any
//! [`std::io::Read`] / [`std::io::Write`] channel and never own its lifetime
//! beyond holding it.
//!
//! ## Faults
//!
//! | Fault | Cause |
//! |-------|-------|
//! | [`IoExhausted`] | Input ran out (reader) or the channel accepts no more bytes (writer) |
//! | [`IoFailure`] | Any other channel error |
//! | [`LimitExceeded`] | The request is larger than the remaining bit budget |
//!
//! Faults are sticky: once one is raised, every later call on the same stream
//! fails with it until [`BitReader::clear_fault`] / [`BitWriter::clear_fault`].
//! Argument errors ([`InvalidBitCount`], [`ValueTooWide`]) are reported but do
//! not fault the stream.
//!
//! [`IoExhausted`]: BitStreamError::IoExhausted
//! [`IoFailure`]: BitStreamError::IoFailure
//! [`LimitExceeded`]: BitStreamError::LimitExceeded
//! [`InvalidBitCount`]: BitStreamError::InvalidBitCount
//! [`ValueTooWide`]: BitStreamError::ValueTooWide
//!
//! ## Example
//!
//! ```rust
//! use arith_stream::bitstream::{BitReader, BitWriter};
//!
//! let mut writer = BitWriter::new(Vec::new());
//! writer.put_bits(0b101, 3).unwrap();
//! writer.put_bits(0x1234, 16).unwrap();
//! let bytes = writer.into_inner().unwrap();
//!
//! let mut reader = BitReader::new(bytes.as_slice());
//! assert_eq!(reader.get_bits(3).unwrap(), 0b101);
//! assert_eq!(reader.get_bits(16).unwrap(), 0x1234);
//! ```

mod reader;
mod writer;

pub use reader::BitReader;
pub use writer::BitWriter;

use std::fmt;
use std::io;

/// Largest bit count accepted by a single `get_bits` / `put_bits` call.
///
/// One less than the 32-bit word used to carry the value.
pub const MAX_BITS: u32 = 31;

/// Bit stream errors.
#[derive(Debug)]
pub enum BitStreamError {
    /// More bits were needed than the channel could supply or accept.
    IoExhausted,
    /// The underlying channel reported a fault.
    IoFailure(io::Error),
    /// The request exceeds the configured bit budget.
    LimitExceeded { requested: u32, remaining: u64 },
    /// Bit count outside `1..=MAX_BITS`.
    InvalidBitCount(u32),
    /// Value does not fit in the requested number of bits.
    ValueTooWide { value: u32, bits: u32 },
}

impl fmt::Display for BitStreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IoExhausted => write!(f, "Bit stream exhausted"),
            Self::IoFailure(e) => write!(f, "Bit stream I/O failure: {}", e),
            Self::LimitExceeded {
                requested,
                remaining,
            } => write!(
                f,
                "Bit limit exceeded: requested {} bits, {} remaining",
                requested, remaining
            ),
            Self::InvalidBitCount(n) => {
                write!(f, "Invalid bit count {} (expected 1..={})", n, MAX_BITS)
            }
            Self::ValueTooWide { value, bits } => {
                write!(f, "Value 0x{:x} does not fit in {} bits", value, bits)
            }
        }
    }
}

impl std::error::Error for BitStreamError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::IoFailure(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for BitStreamError {
    fn from(e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::UnexpectedEof | io::ErrorKind::WriteZero => Self::IoExhausted,
            _ => Self::IoFailure(e),
        }
    }
}

impl From<StreamFault> for BitStreamError {
    fn from(fault: StreamFault) -> Self {
        match fault {
            StreamFault::Exhausted => Self::IoExhausted,
            StreamFault::Failure(kind) => Self::IoFailure(io::Error::from(kind)),
            StreamFault::Limit {
                requested,
                remaining,
            } => Self::LimitExceeded {
                requested,
                remaining,
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, BitStreamError>;

/// Sticky fault recorded on a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamFault {
    Exhausted,
    Failure(io::ErrorKind),
    Limit { requested: u32, remaining: u64 },
}

impl StreamFault {
    /// Fault to record for a failed stream operation, if the error is one.
    fn from_error(e: &BitStreamError) -> Option<Self> {
        match e {
            BitStreamError::IoExhausted => Some(Self::Exhausted),
            BitStreamError::IoFailure(io_err) => Some(Self::Failure(io_err.kind())),
            BitStreamError::LimitExceeded {
                requested,
                remaining,
            } => Some(Self::Limit {
                requested: *requested,
                remaining: *remaining,
            }),
            BitStreamError::InvalidBitCount(_) | BitStreamError::ValueTooWide { .. } => None,
        }
    }
}

/// Check a requested bit count.
#[inline]
fn check_bit_count(n: u32) -> Result<()> {
    if n == 0 || n > MAX_BITS {
        return Err(BitStreamError::InvalidBitCount(n));
    }
    Ok(())
}

/// Check that `n` bits fit in an optional budget.
#[inline]
fn check_limit(limit: Option<u64>, n: u32) -> Result<()> {
    match limit {
        Some(remaining) if u64::from(n) > remaining => Err(BitStreamError::LimitExceeded {
            requested: n,
            remaining,
        }),
        _ => Ok(()),
    }
}

/// Charge `n` transferred bits against an optional budget.
#[inline]
fn charge_limit(limit: &mut Option<u64>, n: u32) {
    if let Some(remaining) = limit {
        *remaining = remaining.saturating_sub(u64::from(n));
    }
}
