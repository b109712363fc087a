//! Bit writer over a byte channel.
//!
//! Bits are packed MSB first. The partial byte is always flushed, zero-padded,
//! when the writer is closed: explicitly via [`BitWriter::finish`] or
//! [`BitWriter::into_inner`], or implicitly on drop.

use std::io::Write;

use super::{charge_limit, check_bit_count, check_limit, BitStreamError, Result, StreamFault};

/// Bit writer that pushes bytes into an [`io::Write`](std::io::Write) channel.
#[derive(Debug)]
pub struct BitWriter<W: Write> {
    /// Channel; only `into_inner` takes it out
    inner: Option<W>,
    /// Partially filled byte
    buf: u8,
    /// Bits already placed in `buf` (0-8)
    filled: u32,
    fault: Option<StreamFault>,
    limit: Option<u64>,
    bits_written: u64,
}

impl<W: Write> BitWriter<W> {
    /// Create a new bit writer with no write limit.
    pub fn new(inner: W) -> Self {
        Self {
            inner: Some(inner),
            buf: 0,
            filled: 0,
            fault: None,
            limit: None,
            bits_written: 0,
        }
    }

    /// Write the low `n` bits (1..=31) of `value`, most significant first.
    pub fn put_bits(&mut self, value: u32, n: u32) -> Result<()> {
        self.check_fault()?;
        check_bit_count(n)?;
        if value >> n != 0 {
            return Err(BitStreamError::ValueTooWide { value, bits: n });
        }
        self.faulting(|this| {
            check_limit(this.limit, n)?;

            let mut remaining = n;
            while remaining > 0 {
                let free = 8 - this.filled;
                let take = free.min(remaining);
                let chunk = (value >> (remaining - take)) & ((1 << take) - 1);
                this.buf |= (chunk as u8) << (free - take);
                this.filled += take;
                remaining -= take;
                this.bits_written += u64::from(take);
                if this.filled == 8 {
                    this.emit_buffer()?;
                }
            }
            charge_limit(&mut this.limit, n);
            Ok(())
        })
    }

    /// Write a single bit.
    #[inline]
    pub fn put_bit(&mut self, bit: bool) -> Result<()> {
        self.put_bits(u32::from(bit), 1)
    }

    /// Pad the partial byte with zeros and hand it to the channel.
    pub fn align(&mut self) -> Result<()> {
        self.check_fault()?;
        self.faulting(Self::emit_partial)
    }

    /// Align, then flush the channel.
    pub fn flush(&mut self) -> Result<()> {
        self.align()?;
        self.faulting(|this| this.channel_mut().flush().map_err(BitStreamError::from))
    }

    /// Flush and close the stream, keeping the channel in place.
    ///
    /// Equivalent to [`flush`](Self::flush); provided so the closing point is
    /// explicit at call sites.
    pub fn finish(&mut self) -> Result<()> {
        self.flush()
    }

    /// Flush and unwrap the channel.
    pub fn into_inner(mut self) -> Result<W> {
        self.flush()?;
        match self.inner.take() {
            Some(inner) => Ok(inner),
            None => unreachable!("channel present until into_inner"),
        }
    }

    fn emit_partial(&mut self) -> Result<()> {
        if self.filled > 0 {
            self.emit_buffer()?;
        }
        Ok(())
    }

    fn emit_buffer(&mut self) -> Result<()> {
        let byte = self.buf;
        self.buf = 0;
        self.filled = 0;
        self.channel_mut().write_all(&[byte])?;
        Ok(())
    }

    /// Run a stream operation, recording any fault it raises.
    fn faulting<T>(&mut self, op: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let result = op(self);
        if let Err(e) = &result {
            if let Some(fault) = StreamFault::from_error(e) {
                self.fault = Some(fault);
            }
        }
        result
    }

    #[inline]
    fn check_fault(&self) -> Result<()> {
        match self.fault {
            Some(fault) => Err(fault.into()),
            None => Ok(()),
        }
    }

    /// Current sticky fault, if any.
    pub fn fault(&self) -> Option<StreamFault> {
        self.fault
    }

    /// Clear the sticky fault.
    pub fn clear_fault(&mut self) {
        self.fault = None;
    }

    /// Whether the stream is free of faults.
    pub fn is_ok(&self) -> bool {
        self.fault.is_none()
    }

    /// Remaining bit budget, `None` when unlimited.
    pub fn limit(&self) -> Option<u64> {
        self.limit
    }

    /// Set (or remove) the bit budget.
    pub fn set_limit(&mut self, limit: Option<u64>) {
        self.limit = limit;
    }

    /// Bits written so far, including those still in the partial byte.
    pub fn bits_written(&self) -> u64 {
        self.bits_written
    }

    /// Reset the write counter.
    pub fn clear_count(&mut self) {
        self.bits_written = 0;
    }

    /// Bits waiting in the partial byte.
    pub fn pending_bits(&self) -> u32 {
        self.filled
    }

    pub fn get_ref(&self) -> &W {
        match &self.inner {
            Some(inner) => inner,
            None => unreachable!("channel present until into_inner"),
        }
    }

    pub fn get_mut(&mut self) -> &mut W {
        self.channel_mut()
    }

    #[inline]
    fn channel_mut(&mut self) -> &mut W {
        match &mut self.inner {
            Some(inner) => inner,
            None => unreachable!("channel present until into_inner"),
        }
    }
}

impl<W: Write> Drop for BitWriter<W> {
    fn drop(&mut self) {
        if self.fault.is_none() && self.inner.is_some() {
            let _ = self.emit_partial();
            let _ = self.channel_mut().flush();
        }
    }
}
