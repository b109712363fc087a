//! Crate-level error type.
//!
//! The [`bitstream`](crate::bitstream) and [`coder`](crate::coder) layers
//! each have their own error enum. [`ArithError`] wraps both, plus the
//! failures of the container helpers that sit on top of them.
//!
//! ## Error Categories
//!
//! | Category | Errors | Description |
//! |----------|--------|-------------|
//! | Channel | [`Stream`] | The bit stream ran out, hit its limit, or failed |
//! | Coding | [`Coder`] | Corrupted block, misuse of the block lifecycle |
//! | Layout | [`InvalidLayout`] | Blocks that do not fit the container header |
//! | I/O | [`Io`] | Errors from the underlying reader or writer |
//!
//! ## Example
//!
//! ```rust
//! use arith_stream::container::decode_container;
//! use arith_stream::bitstream::BitReader;
//! use arith_stream::{ArithError, CoderOptions};
//!
//! // Header promises one block of four symbols, but the body is missing
//! let bytes = [0x00, 0x01, 0x00, 0x04];
//! let mut input = BitReader::new(&bytes[..]);
//! match decode_container(&mut input, &CoderOptions::default()) {
//!     Err(ArithError::Coder(e)) => println!("Bad block: {}", e),
//!     Err(e) => println!("Error: {}", e),
//!     Ok(blocks) => println!("{} blocks", blocks.len()),
//! }
//! ```
//!
//! [`Stream`]: ArithError::Stream
//! [`Coder`]: ArithError::Coder
//! [`InvalidLayout`]: ArithError::InvalidLayout
//! [`Io`]: ArithError::Io

use std::fmt;
use std::io;

use crate::bitstream::BitStreamError;
use crate::coder::CoderError;

/// Error type for container-level operations.
#[derive(Debug)]
pub enum ArithError {
    /// Bit stream error outside of any block (header, flush).
    Stream(BitStreamError),

    /// Error while coding a block.
    Coder(CoderError),

    /// The blocks cannot be described by the container header.
    ///
    /// The `String` says which limit was broken.
    InvalidLayout(String),

    /// An I/O error occurred.
    Io(io::Error),
}

impl fmt::Display for ArithError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stream(e) => write!(f, "Stream error: {}", e),
            Self::Coder(e) => write!(f, "Coder error: {}", e),
            Self::InvalidLayout(msg) => write!(f, "Invalid container layout: {}", msg),
            Self::Io(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl std::error::Error for ArithError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Stream(e) => Some(e),
            Self::Coder(e) => Some(e),
            Self::Io(e) => Some(e),
            Self::InvalidLayout(_) => None,
        }
    }
}

impl From<io::Error> for ArithError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<BitStreamError> for ArithError {
    fn from(e: BitStreamError) -> Self {
        Self::Stream(e)
    }
}

impl From<CoderError> for ArithError {
    fn from(e: CoderError) -> Self {
        Self::Coder(e)
    }
}

pub type Result<T> = std::result::Result<T, ArithError>;
