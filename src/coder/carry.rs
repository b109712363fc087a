//! Delayed byte output for carry propagation.
//!
//! The range encoder shifts the top byte of `low` out as soon as the interval
//! is narrow enough, but a later addition to `low` may still carry into bytes
//! that have already left the interval. Such bytes are held back:
//!
//! - `cache`: the most recent byte that a carry could still increment.
//! - `pending`: the number of `0xFF` bytes that followed `cache`. A carry
//!   turns each of them into `0x00` and increments `cache`.
//!
//! A shifted byte other than `0xFF`, or any carry, settles the question and
//! releases `cache` and the pending run. A shifted `0xFF` without a carry can
//! itself still be carried into, so it only lengthens the run.
//!
//! The first cached byte stands for the integer part of the code value, which
//! is always zero, and is dropped rather than written.

/// Cached byte plus a run of pending `0xFF` bytes.
#[derive(Debug, Clone)]
pub(crate) struct CarryBuffer {
    /// Byte a carry could still increment
    cache: u8,
    /// Number of `0xFF` bytes waiting behind `cache`
    pending: u64,
    /// `cache` is the implicit leading byte and is never emitted
    leading: bool,
}

impl CarryBuffer {
    pub(crate) fn new() -> Self {
        Self {
            cache: 0,
            pending: 0,
            leading: true,
        }
    }

    /// Accept the next shifted-out byte and the carry out of `low`.
    ///
    /// Bytes that are now final are passed to `emit` in stream order.
    pub(crate) fn push<E>(
        &mut self,
        byte: u8,
        carry: bool,
        mut emit: impl FnMut(u8) -> Result<(), E>,
    ) -> Result<(), E> {
        if byte == 0xFF && !carry {
            self.pending += 1;
            return Ok(());
        }

        let carry = u8::from(carry);
        if self.leading {
            debug_assert_eq!(carry, 0, "carry into the leading byte");
            self.leading = false;
        } else {
            emit(self.cache.wrapping_add(carry))?;
        }
        while self.pending > 0 {
            emit(0xFFu8.wrapping_add(carry))?;
            self.pending -= 1;
        }
        self.cache = byte;
        Ok(())
    }

    /// Bytes held back and not yet emitted, counting `cache`.
    pub(crate) fn held(&self) -> u64 {
        self.pending + u64::from(!self.leading)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;

    fn feed(buffer: &mut CarryBuffer, out: &mut Vec<u8>, byte: u8, carry: bool) {
        buffer
            .push(byte, carry, |b| {
                out.push(b);
                Ok::<(), Infallible>(())
            })
            .unwrap();
    }

    #[test]
    fn test_leading_byte_is_dropped() {
        let mut buffer = CarryBuffer::new();
        let mut out = Vec::new();

        feed(&mut buffer, &mut out, 0x12, false);
        assert!(out.is_empty());
        feed(&mut buffer, &mut out, 0x34, false);
        assert_eq!(out, vec![0x12]);
        assert_eq!(buffer.held(), 1);
    }

    #[test]
    fn test_no_carry() {
        let mut buffer = CarryBuffer::new();
        let mut out = Vec::new();

        for byte in [0x10, 0x20, 0x30, 0x40] {
            feed(&mut buffer, &mut out, byte, false);
        }
        assert_eq!(out, vec![0x10, 0x20, 0x30]);
    }

    #[test]
    fn test_carry_into_zero_byte() {
        let mut buffer = CarryBuffer::new();
        let mut out = Vec::new();

        feed(&mut buffer, &mut out, 0x00, false);
        feed(&mut buffer, &mut out, 0x7A, true);
        feed(&mut buffer, &mut out, 0x00, false);
        assert_eq!(out, vec![0x01, 0x7A]);
    }

    #[test]
    fn test_carry_into_ff_run() {
        let mut buffer = CarryBuffer::new();
        let mut out = Vec::new();

        feed(&mut buffer, &mut out, 0x41, false);
        feed(&mut buffer, &mut out, 0xFF, false);
        feed(&mut buffer, &mut out, 0xFF, false);
        feed(&mut buffer, &mut out, 0xFF, false);
        assert!(out.is_empty());
        assert_eq!(buffer.held(), 4);

        // Carry ripples through the run into the cached byte
        feed(&mut buffer, &mut out, 0x05, true);
        assert_eq!(out, vec![0x42, 0x00, 0x00, 0x00]);
        assert_eq!(buffer.held(), 1);
    }

    #[test]
    fn test_ff_run_resolved_without_carry() {
        let mut buffer = CarryBuffer::new();
        let mut out = Vec::new();

        feed(&mut buffer, &mut out, 0x41, false);
        feed(&mut buffer, &mut out, 0xFF, false);
        feed(&mut buffer, &mut out, 0xFF, false);
        feed(&mut buffer, &mut out, 0x80, false);
        assert_eq!(out, vec![0x41, 0xFF, 0xFF]);
    }

    #[test]
    fn test_carry_with_ff_becomes_new_cache() {
        let mut buffer = CarryBuffer::new();
        let mut out = Vec::new();

        feed(&mut buffer, &mut out, 0x10, false);
        feed(&mut buffer, &mut out, 0xFF, true);
        assert_eq!(out, vec![0x11]);
        feed(&mut buffer, &mut out, 0x00, false);
        assert_eq!(out, vec![0x11, 0xFF]);
    }

    #[test]
    fn test_emit_error_is_propagated() {
        let mut buffer = CarryBuffer::new();
        buffer.push(0x01, false, |_| Err::<(), _>("boom")).unwrap();
        assert_eq!(buffer.push(0x02, false, |_| Err::<(), _>("boom")), Err("boom"));
    }
}
