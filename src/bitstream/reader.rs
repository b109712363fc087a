//! Bit reader over a byte channel.
//!
//! Reads bits MSB first, one channel byte at a time.

use std::io::{self, Read};

use super::{charge_limit, check_bit_count, check_limit, BitStreamError, Result, StreamFault};

/// Bit reader that pulls bytes from an [`io::Read`] channel.
#[derive(Debug)]
pub struct BitReader<R: Read> {
    inner: R,
    /// Partially consumed byte
    buf: u8,
    /// Bits still unread in `buf` (0-8)
    count: u32,
    fault: Option<StreamFault>,
    limit: Option<u64>,
    bits_read: u64,
}

impl<R: Read> BitReader<R> {
    /// Create a new bit reader with no read limit.
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            buf: 0,
            count: 0,
            fault: None,
            limit: None,
            bits_read: 0,
        }
    }

    /// Read `n` bits (1..=31), most significant first.
    pub fn get_bits(&mut self, n: u32) -> Result<u32> {
        self.check_fault()?;
        check_bit_count(n)?;
        self.faulting(|this| {
            check_limit(this.limit, n)?;

            let mut value = 0u32;
            let mut remaining = n;
            while remaining > 0 {
                if this.count == 0 {
                    this.fill_buffer()?;
                }
                let take = this.count.min(remaining);
                let chunk = (u32::from(this.buf) >> (this.count - take)) & ((1 << take) - 1);
                value = (value << take) | chunk;
                this.count -= take;
                remaining -= take;
                this.bits_read += u64::from(take);
            }
            charge_limit(&mut this.limit, n);
            Ok(value)
        })
    }

    /// Read a single bit.
    #[inline]
    pub fn get_bit(&mut self) -> Result<bool> {
        Ok(self.get_bits(1)? != 0)
    }

    /// Skip the rest of the current byte.
    #[inline]
    pub fn align(&mut self) {
        self.count = 0;
        self.buf = 0;
    }

    /// Load the next byte from the channel.
    fn fill_buffer(&mut self) -> Result<()> {
        let mut byte = [0u8; 1];
        loop {
            match self.inner.read(&mut byte) {
                Ok(0) => return Err(BitStreamError::IoExhausted),
                Ok(_) => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }
        self.buf = byte[0];
        self.count = 8;
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

    /// Bits read so far.
    pub fn bits_read(&self) -> u64 {
        self.bits_read
    }

    /// Reset the read counter.
    pub fn clear_count(&mut self) {
        self.bits_read = 0;
    }

    /// Bits still buffered from the last channel byte.
    pub fn buffered_bits(&self) -> u32 {
        self.count
    }

    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    pub fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    /// Unwrap the channel, dropping any buffered bits.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingReader;

    impl Read for FailingReader {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::Other, "device fault"))
        }
    }

    #[test]
    fn test_read_bits() {
        let data = [0b10110100, 0b11001010];
        let mut reader = BitReader::new(&data[..]);

        assert_eq!(reader.get_bits(4).unwrap(), 0b1011);
        assert_eq!(reader.get_bits(4).unwrap(), 0b0100);
        assert_eq!(reader.get_bits(8).unwrap(), 0b11001010);
        assert_eq!(reader.bits_read(), 16);
    }

    #[test]
    fn test_read_across_bytes() {
        let data = [0x12, 0x34, 0x56, 0x78];
        let mut reader = BitReader::new(&data[..]);

        assert_eq!(reader.get_bits(4).unwrap(), 0x1);
        assert_eq!(reader.get_bits(24).unwrap(), 0x234567);
        assert_eq!(reader.get_bits(4).unwrap(), 0x8);
    }

    #[test]
    fn test_align_skips_partial_byte() {
        let data = [0xF0, 0xAB];
        let mut reader = BitReader::new(&data[..]);

        assert_eq!(reader.get_bits(3).unwrap(), 0b111);
        reader.align();
        assert_eq!(reader.get_bits(8).unwrap(), 0xAB);
    }

    #[test]
    fn test_exhausted_is_sticky() {
        let data = [0xFF];
        let mut reader = BitReader::new(&data[..]);

        assert_eq!(reader.get_bits(8).unwrap(), 0xFF);
        assert!(matches!(reader.get_bit(), Err(BitStreamError::IoExhausted)));
        assert_eq!(reader.fault(), Some(StreamFault::Exhausted));
        assert!(matches!(reader.get_bit(), Err(BitStreamError::IoExhausted)));

        reader.clear_fault();
        assert!(reader.is_ok());
    }

    #[test]
    fn test_limit_is_distinct_from_eof() {
        let data = [0xAA, 0xBB, 0xCC];
        let mut reader = BitReader::new(&data[..]);
        reader.set_limit(Some(12));

        assert_eq!(reader.get_bits(8).unwrap(), 0xAA);
        assert_eq!(reader.limit(), Some(4));
        assert!(matches!(
            reader.get_bits(5),
            Err(BitStreamError::LimitExceeded {
                requested: 5,
                remaining: 4
            })
        ));
        // Sticky until cleared, even for requests that would fit
        assert!(matches!(
            reader.get_bits(1),
            Err(BitStreamError::LimitExceeded { .. })
        ));

        reader.clear_fault();
        reader.set_limit(None);
        assert_eq!(reader.get_bits(4).unwrap(), 0xB);
    }

    #[test]
    fn test_short_read_keeps_budget() {
        let data = [0xAB];
        let mut reader = BitReader::new(&data[..]);
        reader.set_limit(Some(16));

        assert!(matches!(reader.get_bits(12), Err(BitStreamError::IoExhausted)));
        // Only completed reads are charged
        assert_eq!(reader.limit(), Some(16));

        reader.clear_fault();
        reader.set_limit(Some(4));
        assert!(matches!(
            reader.get_bits(5),
            Err(BitStreamError::LimitExceeded {
                requested: 5,
                remaining: 4
            })
        ));
        assert_eq!(reader.limit(), Some(4));
    }

    #[test]
    fn test_device_failure() {
        let mut reader = BitReader::new(FailingReader);

        assert!(matches!(reader.get_bit(), Err(BitStreamError::IoFailure(_))));
        assert_eq!(
            reader.fault(),
            Some(StreamFault::Failure(io::ErrorKind::Other))
        );
        assert!(matches!(reader.get_bit(), Err(BitStreamError::IoFailure(_))));
    }

    #[test]
    fn test_invalid_bit_count_does_not_fault() {
        let data = [0x80];
        let mut reader = BitReader::new(&data[..]);

        assert!(matches!(
            reader.get_bits(32),
            Err(BitStreamError::InvalidBitCount(32))
        ));
        assert!(reader.is_ok());
        assert!(reader.get_bit().unwrap());
    }
}
