//! Binary arithmetic coding.
//!
//! An [`Encoder`] / [`Decoder`] pair codes one block of binary symbols over a
//! borrowed bit stream. Symbols are either *regular* (coded with the adaptive
//! estimate of a context) or *bypass* (coded as equiprobable, no model
//! involved).
//!
//! ## Engines
//!
//! | [`CoderKind`] | Interval | Contexts | Carry handling |
//! |---------------|----------|----------|----------------|
//! | `Adaptive` | 32-bit range, frequency split | `one_freq / total_freq` counts | cached byte + pending `0xFF` run |
//! | `MCoder` | 9-bit range, table lookup | 64-state automaton | outstanding-bit counter |
//!
//! The engine is picked at construction through [`CoderOptions`].
//!
//! ## Block lifecycle
//!
//! ```text
//! Unstarted ──start()──▶ Started ──terminate()──▶ Terminated
//!                          │  ▲
//!                          └──┘ encode_* / decode_*
//! ```
//!
//! A terminated coder rejects every further call. A stream failure in the
//! middle of a block terminates it as well: the interval is no longer in step
//! with the stream, so the block is abandoned rather than coded further.
//!
//! The next block uses a new coder over the same stream, so blocks follow each
//! other with no padding.
//!
//! ## Example
//!
//! ```rust
//! use arith_stream::bitstream::{BitReader, BitWriter};
//! use arith_stream::{CoderOptions, Decoder, Encoder};
//!
//! let options = CoderOptions::default();
//! let mut out = BitWriter::new(Vec::new());
//! let mut enc = Encoder::new(&mut out, 1, &options).unwrap();
//! enc.start().unwrap();
//! for bit in [true, true, false, true] {
//!     enc.encode_regular(0, bit).unwrap();
//! }
//! enc.encode_bypass(false).unwrap();
//! enc.terminate().unwrap();
//! drop(enc);
//! let bytes = out.into_inner().unwrap();
//!
//! let mut input = BitReader::new(bytes.as_slice());
//! let mut dec = Decoder::new(&mut input, 1, &options).unwrap();
//! dec.start().unwrap();
//! for expected in [true, true, false, true] {
//!     assert_eq!(dec.decode_regular(0).unwrap(), expected);
//! }
//! assert!(!dec.decode_bypass().unwrap());
//! dec.terminate().unwrap();
//! ```

mod carry;
mod decoder;
mod encoder;
mod mcoder;
mod range_coder;


pub use decoder::Decoder;
pub use encoder::Encoder;
pub use mcoder::MContext;

use std::fmt;
use std::str::FromStr;

use crate::bitstream::BitStreamError;
use crate::model::{InvalidContextState, DEFAULT_MAX_FREQ};

/// Coding errors.
#[derive(Debug)]
pub enum CoderError {
    /// The bit stream failed underneath the coder.
    Stream(BitStreamError),
    /// The coded data is inconsistent: corrupted or truncated input.
    DecodeFailure,
    /// A symbol was coded before `start()`.
    NotStarted,
    /// `start()` was called twice.
    AlreadyStarted,
    /// The block has already been terminated.
    Terminated,
    /// Context id out of range.
    UnknownContext { id: usize, contexts: usize },
    /// Context parameters violate `1 <= one_freq < total_freq <= max_freq`.
    InvalidContextState(InvalidContextState),
    /// Operation not offered by the selected engine.
    Unsupported(&'static str),
}

impl fmt::Display for CoderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stream(e) => write!(f, "Stream error: {}", e),
            Self::DecodeFailure => write!(f, "Decode failure: corrupted or truncated block"),
            Self::NotStarted => write!(f, "Block not started"),
            Self::AlreadyStarted => write!(f, "Block already started"),
            Self::Terminated => write!(f, "Block already terminated"),
            Self::UnknownContext { id, contexts } => {
                write!(f, "Unknown context {} (coder has {})", id, contexts)
            }
            Self::InvalidContextState(e) => write!(f, "{}", e),
            Self::Unsupported(what) => write!(f, "Unsupported by this engine: {}", what),
        }
    }
}

impl std::error::Error for CoderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Stream(e) => Some(e),
            Self::InvalidContextState(e) => Some(e),
            _ => None,
        }
    }
}

impl From<BitStreamError> for CoderError {
    fn from(e: BitStreamError) -> Self {
        Self::Stream(e)
    }
}

impl From<InvalidContextState> for CoderError {
    fn from(e: InvalidContextState) -> Self {
        Self::InvalidContextState(e)
    }
}

pub type Result<T> = std::result::Result<T, CoderError>;

/// Coding engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CoderKind {
    /// Frequency-count range coder with adaptive contexts.
    #[default]
    Adaptive,
    /// Table-driven M-coder.
    MCoder,
}

impl fmt::Display for CoderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Adaptive => write!(f, "adaptive"),
            Self::MCoder => write!(f, "mcoder"),
        }
    }
}

impl FromStr for CoderKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "adaptive" | "bin" | "binary" => Ok(Self::Adaptive),
            "mcoder" | "m" => Ok(Self::MCoder),
            other => Err(format!("unknown coder kind: {}", other)),
        }
    }
}

/// Coder configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoderOptions {
    /// Engine to use.
    pub kind: CoderKind,
    /// Rescale ceiling for adaptive contexts.
    pub max_freq: u32,
    /// Whether contexts start out adaptive.
    pub adaptive: bool,
}

impl Default for CoderOptions {
    fn default() -> Self {
        Self {
            kind: CoderKind::Adaptive,
            max_freq: DEFAULT_MAX_FREQ,
            adaptive: true,
        }
    }
}

impl CoderOptions {
    /// Options for the M-coder engine.
    pub fn mcoder() -> Self {
        Self {
            kind: CoderKind::MCoder,
            ..Self::default()
        }
    }

    pub fn with_max_freq(mut self, max_freq: u32) -> Self {
        self.max_freq = max_freq;
        self
    }

    pub fn with_adaptive(mut self, adaptive: bool) -> Self {
        self.adaptive = adaptive;
        self
    }
}

/// Where a coder is in its block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockState {
    Unstarted,
    Started,
    Terminated,
}

impl BlockState {
    /// Check that symbols may be coded.
    fn ensure_started(self) -> Result<()> {
        match self {
            Self::Unstarted => Err(CoderError::NotStarted),
            Self::Started => Ok(()),
            Self::Terminated => Err(CoderError::Terminated),
        }
    }

    /// Check that the block may be started.
    fn ensure_unstarted(self) -> Result<()> {
        match self {
            Self::Unstarted => Ok(()),
            Self::Started => Err(CoderError::AlreadyStarted),
            Self::Terminated => Err(CoderError::Terminated),
        }
    }

    /// Check that the block is still open for configuration.
    fn ensure_open(self) -> Result<()> {
        match self {
            Self::Terminated => Err(CoderError::Terminated),
            _ => Ok(()),
        }
    }
}

#[inline]
fn check_context(id: usize, contexts: usize) -> Result<()> {
    if id >= contexts {
        return Err(CoderError::UnknownContext { id, contexts });
    }
    Ok(())
}
