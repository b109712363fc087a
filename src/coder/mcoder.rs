//! Table-driven binary arithmetic coder ("M-coder").
//!
//! A multiplication-free engine: the interval is 9 bits wide, each context is
//! a 6-bit probability state plus its most probable symbol, and the width of
//! the least probable sub-interval comes from a lookup on the state and two
//! bits of the current range. Carries are resolved bit by bit with an
//! outstanding-bit counter instead of a byte cache.
//!
//! Termination codes a final "1" in a sub-interval of width 2 and flushes;
//! the decoder checks that this terminating bin decodes as 1.

use std::io::{Read, Write};

use super::{CoderError, Result};
use crate::bitstream::{BitReader, BitWriter};

/// Width of the LPS sub-interval by probability state and quantized range.
const RANGE_TAB_LPS: [[u8; 4]; 64] = [
    [128, 176, 208, 240],
    [128, 167, 197, 227],
    [128, 158, 187, 216],
    [123, 150, 178, 205],
    [116, 142, 169, 195],
    [111, 135, 160, 185],
    [105, 128, 152, 175],
    [100, 122, 144, 166],
    [95, 116, 137, 158],
    [90, 110, 130, 150],
    [85, 104, 123, 142],
    [81, 99, 117, 135],
    [77, 94, 111, 128],
    [73, 89, 105, 122],
    [69, 85, 100, 116],
    [66, 80, 95, 110],
    [62, 76, 90, 104],
    [59, 72, 86, 99],
    [56, 69, 81, 94],
    [53, 65, 77, 89],
    [51, 62, 73, 85],
    [48, 59, 69, 80],
    [46, 56, 66, 76],
    [43, 53, 63, 72],
    [41, 50, 59, 69],
    [39, 48, 56, 65],
    [37, 45, 54, 62],
    [35, 43, 51, 59],
    [33, 41, 48, 56],
    [32, 39, 46, 53],
    [30, 37, 43, 50],
    [29, 35, 41, 48],
    [27, 33, 39, 45],
    [26, 31, 37, 43],
    [24, 30, 35, 41],
    [23, 28, 33, 39],
    [22, 27, 32, 37],
    [21, 26, 30, 35],
    [20, 24, 29, 33],
    [19, 23, 27, 31],
    [18, 22, 26, 30],
    [17, 21, 25, 28],
    [16, 20, 23, 27],
    [15, 19, 22, 25],
    [14, 18, 21, 24],
    [14, 17, 20, 23],
    [13, 16, 19, 22],
    [12, 15, 18, 21],
    [12, 14, 17, 20],
    [11, 14, 16, 19],
    [11, 13, 15, 18],
    [10, 12, 15, 17],
    [10, 12, 14, 16],
    [9, 11, 13, 15],
    [9, 11, 12, 14],
    [8, 10, 12, 14],
    [8, 9, 11, 13],
    [7, 9, 11, 12],
    [7, 9, 10, 12],
    [7, 8, 10, 11],
    [6, 8, 9, 11],
    [6, 7, 9, 10],
    [6, 7, 8, 9],
    [2, 2, 2, 2],
];

/// Next state after coding the least probable symbol.
const TRANS_IDX_LPS: [u8; 64] = [
    0, 0, 1, 2, 2, 4, 4, 5, 6, 7, 8, 9, 9, 11, 11, 12, 13, 13, 15, 15, 16, 16, 18, 18, 19, 19, 21,
    21, 22, 22, 23, 24, 24, 25, 26, 26, 27, 27, 28, 29, 29, 30, 30, 30, 31, 32, 32, 33, 33, 33, 34,
    34, 35, 35, 35, 36, 36, 36, 37, 37, 37, 38, 38, 63,
];

/// Next state after coding the most probable symbol.
const TRANS_IDX_MPS: [u8; 64] = [
    1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 21, 22, 23, 24, 25, 26,
    27, 28, 29, 30, 31, 32, 33, 34, 35, 36, 37, 38, 39, 40, 41, 42, 43, 44, 45, 46, 47, 48, 49, 50,
    51, 52, 53, 54, 55, 56, 57, 58, 59, 60, 61, 62, 62, 63,
];

/// Initial (and post-normalization maximum) range.
const INITIAL_RANGE: u32 = 0x1FE;
/// Normalization threshold.
const QUARTER: u32 = 0x100;
const HALF: u32 = 0x200;
const WHOLE: u32 = 0x400;

/// Probability state of one M-coder context.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MContext {
    /// Index into the probability tables (0-63)
    pub state: u8,
    /// Most probable symbol
    pub mps: bool,
}

impl MContext {
    /// Split the range for this context: returns `(mps_range, lps_range)`.
    #[inline]
    fn split(&self, range: u32) -> (u32, u32) {
        let quantized = ((range >> 6) & 3) as usize;
        let lps = u32::from(RANGE_TAB_LPS[self.state as usize][quantized]);
        (range - lps, lps)
    }

    #[inline]
    fn on_mps(&mut self) {
        self.state = TRANS_IDX_MPS[self.state as usize];
    }

    #[inline]
    fn on_lps(&mut self) {
        if self.state == 0 {
            self.mps = !self.mps;
        }
        self.state = TRANS_IDX_LPS[self.state as usize];
    }
}

/// M-coder encoder state.
#[derive(Debug, Clone)]
pub(crate) struct MEncoder {
    contexts: Vec<MContext>,
    low: u32,
    range: u32,
    /// Bits whose value waits on the next resolved bit
    outstanding: u64,
    /// The first resolved bit is implied by the decoder's prime and not sent
    first_bit: bool,
}

impl MEncoder {
    pub(crate) fn new(num_contexts: usize) -> Self {
        Self {
            contexts: vec![MContext::default(); num_contexts],
            low: 0,
            range: 0,
            outstanding: 0,
            first_bit: true,
        }
    }

    pub(crate) fn contexts(&self) -> &[MContext] {
        &self.contexts
    }

    pub(crate) fn reset_contexts(&mut self) {
        self.contexts.fill(MContext::default());
    }

    pub(crate) fn start(&mut self) {
        self.low = 0;
        self.range = INITIAL_RANGE;
        self.outstanding = 0;
        self.first_bit = true;
    }

    /// Encode `bit` in context `id`. The caller has validated `id`.
    pub(crate) fn encode_regular<W: Write>(
        &mut self,
        id: usize,
        bit: bool,
        out: &mut BitWriter<W>,
    ) -> Result<()> {
        let context = &mut self.contexts[id];
        let (mps_range, lps_range) = context.split(self.range);
        self.range = mps_range;
        if bit == context.mps {
            context.on_mps();
        } else {
            self.low += mps_range;
            self.range = lps_range;
            context.on_lps();
        }
        self.renormalize(out)
    }

    pub(crate) fn encode_bypass<W: Write>(&mut self, bit: bool, out: &mut BitWriter<W>) -> Result<()> {
        self.low <<= 1;
        if bit {
            self.low += self.range;
        }
        if self.low >= WHOLE {
            self.put_bit(true, out)?;
            self.low -= WHOLE;
        } else if self.low < HALF {
            self.put_bit(false, out)?;
        } else {
            self.low -= HALF;
            self.outstanding += 1;
        }
        Ok(())
    }

    /// Code the terminating bin and flush the interval.
    pub(crate) fn terminate<W: Write>(&mut self, out: &mut BitWriter<W>) -> Result<()> {
        self.range -= 2;
        self.low += self.range;
        self.range = 2;
        self.renormalize(out)?;
        self.put_bit((self.low >> 9) & 1 != 0, out)?;
        // Two trailing bits; the last one is the stop bit
        out.put_bits(((self.low >> 7) & 3) | 1, 2)?;
        Ok(())
    }

    fn renormalize<W: Write>(&mut self, out: &mut BitWriter<W>) -> Result<()> {
        while self.range < QUARTER {
            if self.low < QUARTER {
                self.put_bit(false, out)?;
            } else if self.low >= HALF {
                self.low -= HALF;
                self.put_bit(true, out)?;
            } else {
                self.low -= QUARTER;
                self.outstanding += 1;
            }
            self.range <<= 1;
            self.low <<= 1;
        }
        Ok(())
    }

    /// Emit a resolved bit followed by the outstanding bits, inverted.
    fn put_bit<W: Write>(&mut self, bit: bool, out: &mut BitWriter<W>) -> Result<()> {
        if self.first_bit {
            self.first_bit = false;
        } else {
            out.put_bit(bit)?;
        }
        while self.outstanding > 0 {
            out.put_bit(!bit)?;
            self.outstanding -= 1;
        }
        Ok(())
    }
}

/// M-coder decoder state.
#[derive(Debug, Clone)]
pub(crate) struct MDecoder {
    contexts: Vec<MContext>,
    offset: u32,
    range: u32,
}

impl MDecoder {
    pub(crate) fn new(num_contexts: usize) -> Self {
        Self {
            contexts: vec![MContext::default(); num_contexts],
            offset: 0,
            range: 0,
        }
    }

    pub(crate) fn contexts(&self) -> &[MContext] {
        &self.contexts
    }

    pub(crate) fn reset_contexts(&mut self) {
        self.contexts.fill(MContext::default());
    }

    pub(crate) fn start<R: Read>(&mut self, input: &mut BitReader<R>) -> Result<()> {
        self.range = INITIAL_RANGE;
        self.offset = input.get_bits(9)?;
        if self.offset >= self.range {
            return Err(CoderError::DecodeFailure);
        }
        Ok(())
    }

    pub(crate) fn decode_regular<R: Read>(
        &mut self,
        id: usize,
        input: &mut BitReader<R>,
    ) -> Result<bool> {
        let context = &mut self.contexts[id];
        let (mps_range, lps_range) = context.split(self.range);
        let bit = if self.offset >= mps_range {
            let bit = !context.mps;
            self.offset -= mps_range;
            self.range = lps_range;
            context.on_lps();
            bit
        } else {
            self.range = mps_range;
            let bit = context.mps;
            context.on_mps();
            bit
        };
        self.renormalize(input)?;
        Ok(bit)
    }

    pub(crate) fn decode_bypass<R: Read>(&mut self, input: &mut BitReader<R>) -> Result<bool> {
        self.offset = (self.offset << 1) | input.get_bits(1)?;
        if self.offset >= self.range {
            self.offset -= self.range;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Decode the terminating bin; anything but a 1 means a damaged block.
    pub(crate) fn terminate(&mut self) -> Result<()> {
        self.range -= 2;
        if self.offset >= self.range {
            Ok(())
        } else {
            Err(CoderError::DecodeFailure)
        }
    }

    fn renormalize<R: Read>(&mut self, input: &mut BitReader<R>) -> Result<()> {
        while self.range < QUARTER {
            self.range <<= 1;
            self.offset = (self.offset << 1) | input.get_bits(1)?;
        }
        Ok(())
    }
}
