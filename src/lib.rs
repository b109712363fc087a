//! Adaptive binary arithmetic coding over a bit-precise stream.
//!
//! Codes blocks of binary symbols, each either *regular* (driven by an
//! adaptive probability context) or *bypass* (equiprobable), into a
//! [`BitWriter`] and back out of a [`BitReader`]. Blocks are independently
//! started and terminated and follow each other on one stream without
//! padding.
//!
//! ## Modules
//! - [`bitstream`] - MSB-first bit reader/writer with sticky faults and limits
//! - [`model`] - frequency-count probability contexts
//! - [`coder`] - block encoder/decoder with two engines
//! - [`container`] - header plus back-to-back blocks
//! - [`trace`] - per-coder event sinks, with a `tracing` bridge
//!
//! ## Example
//!
//! ```rust
//! use arith_stream::bitstream::{BitReader, BitWriter};
//! use arith_stream::container::{decode_container, encode_container};
//! use arith_stream::CoderOptions;
//!
//! let blocks = vec![vec![true; 8], vec![false, true, true, false, true, true, true, true]];
//! let options = CoderOptions::default();
//!
//! let mut out = BitWriter::new(Vec::new());
//! encode_container(&mut out, &blocks, &options).unwrap();
//! let bytes = out.into_inner().unwrap();
//!
//! let mut input = BitReader::new(bytes.as_slice());
//! assert_eq!(decode_container(&mut input, &options).unwrap(), blocks);
//! ```

pub mod bitstream;
pub mod coder;
pub mod container;
pub mod error;
pub mod model;
pub mod trace;

pub use bitstream::{BitReader, BitStreamError, BitWriter};
pub use coder::{BlockState, CoderError, CoderKind, CoderOptions, Decoder, Encoder};
pub use error::ArithError;
pub use model::{ContextStats, FrequencyContext, ProbabilityModel};
pub use trace::{TraceEvent, TraceSink, TracingSink};
