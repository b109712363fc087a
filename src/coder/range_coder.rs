//! Frequency-count binary range coder.
//!
//! The encoder keeps `low` (33 bits, bit 32 being the carry) and `range`;
//! the decoder keeps `code = value - low` and the same `range`. Both sides
//! split the range with integer arithmetic only, so they agree bit for bit.
//! Bytes leave the encoder through a [`CarryBuffer`]; the decoder reads them
//! back one at a time.
//!
//! Termination writes out all four bytes of `low`, so after a clean block the
//! decoder's `code` is exactly zero. Any other value means the block was
//! corrupted.

use std::io::{Read, Write};

use super::carry::CarryBuffer;
use super::{CoderError, Result};
use crate::bitstream::{BitReader, BitWriter};

/// Normalization threshold: the range never drops below this between symbols.
const TOP: u32 = 1 << 24;

/// Range encoder state.
#[derive(Debug, Clone)]
pub(crate) struct RangeEncoder {
    low: u64,
    range: u32,
    carry: CarryBuffer,
}

impl RangeEncoder {
    pub(crate) fn new() -> Self {
        Self {
            low: 0,
            range: u32::MAX,
            carry: CarryBuffer::new(),
        }
    }

    /// Encode a binary decision: `false` takes `[low, low + bound)`, `true`
    /// takes the rest of the range.
    #[inline]
    pub(crate) fn encode_split<W: Write>(
        &mut self,
        bound: u32,
        upper: bool,
        out: &mut BitWriter<W>,
    ) -> Result<()> {
        debug_assert!(bound > 0 && bound < self.range);
        if upper {
            self.low += u64::from(bound);
            self.range -= bound;
        } else {
            self.range = bound;
        }
        self.normalize(out)
    }

    /// Encode with `zero_freq / total_freq` as the probability of a zero.
    #[inline]
    pub(crate) fn encode_freq<W: Write>(
        &mut self,
        zero_freq: u32,
        total_freq: u32,
        bit: bool,
        out: &mut BitWriter<W>,
    ) -> Result<()> {
        let bound = split(self.range, zero_freq, total_freq);
        self.encode_split(bound, bit, out)
    }

    /// Encode an equiprobable bit.
    #[inline]
    pub(crate) fn encode_half<W: Write>(&mut self, bit: bool, out: &mut BitWriter<W>) -> Result<()> {
        let bound = self.range >> 1;
        self.encode_split(bound, bit, out)
    }

    #[inline]
    fn normalize<W: Write>(&mut self, out: &mut BitWriter<W>) -> Result<()> {
        while self.range < TOP {
            self.range <<= 8;
            self.shift_low(out)?;
        }
        Ok(())
    }

    /// Move the top byte of `low` into the carry buffer.
    fn shift_low<W: Write>(&mut self, out: &mut BitWriter<W>) -> Result<()> {
        let carry = self.low >> 32 != 0;
        let byte = (self.low >> 24) as u8;
        self.carry
            .push(byte, carry, |b| out.put_bits(u32::from(b), 8))
            .map_err(CoderError::Stream)?;
        self.low = (self.low & 0x00FF_FFFF) << 8;
        Ok(())
    }

    /// Write out `low` in full and release every held byte.
    pub(crate) fn flush<W: Write>(&mut self, out: &mut BitWriter<W>) -> Result<()> {
        for _ in 0..5 {
            self.shift_low(out)?;
        }
        Ok(())
    }

    /// Bytes shifted out but not yet written.
    pub(crate) fn held_bytes(&self) -> u64 {
        self.carry.held()
    }
}

/// Range decoder state.
#[derive(Debug, Clone)]
pub(crate) struct RangeDecoder {
    code: u32,
    range: u32,
}

impl RangeDecoder {
    pub(crate) fn new() -> Self {
        Self {
            code: 0,
            range: u32::MAX,
        }
    }

    /// Prime the decoder with the first four bytes of the block.
    pub(crate) fn start<R: Read>(&mut self, input: &mut BitReader<R>) -> Result<()> {
        let mut code = 0u32;
        for _ in 0..4 {
            code = (code << 8) | input.get_bits(8)?;
        }
        self.range = u32::MAX;
        if code >= self.range {
            return Err(CoderError::DecodeFailure);
        }
        self.code = code;
        Ok(())
    }

    /// Decode a binary decision split at `bound`.
    #[inline]
    pub(crate) fn decode_split<R: Read>(
        &mut self,
        bound: u32,
        input: &mut BitReader<R>,
    ) -> Result<bool> {
        let bit = if self.code < bound {
            self.range = bound;
            false
        } else {
            self.code -= bound;
            self.range -= bound;
            true
        };
        self.normalize(input)?;
        Ok(bit)
    }

    #[inline]
    pub(crate) fn decode_freq<R: Read>(
        &mut self,
        zero_freq: u32,
        total_freq: u32,
        input: &mut BitReader<R>,
    ) -> Result<bool> {
        let bound = split(self.range, zero_freq, total_freq);
        self.decode_split(bound, input)
    }

    #[inline]
    pub(crate) fn decode_half<R: Read>(&mut self, input: &mut BitReader<R>) -> Result<bool> {
        let bound = self.range >> 1;
        self.decode_split(bound, input)
    }

    #[inline]
    fn normalize<R: Read>(&mut self, input: &mut BitReader<R>) -> Result<()> {
        while self.range < TOP {
            self.range <<= 8;
            self.code = (self.code << 8) | input.get_bits(8)?;
        }
        Ok(())
    }

    /// Check that the block ended exactly where the encoder flushed it.
    pub(crate) fn finish(&self) -> Result<()> {
        if self.code != 0 {
            return Err(CoderError::DecodeFailure);
        }
        Ok(())
    }
}

/// Width of the zero sub-interval.
#[inline]
fn split(range: u32, zero_freq: u32, total_freq: u32) -> u32 {
    debug_assert!(zero_freq >= 1 && zero_freq < total_freq);
    (range / total_freq) * zero_freq
}
