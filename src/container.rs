//! Multi-block container.
//!
//! ```text
//! ┌────────────────┬────────────────┬─────────┬─────────┬─────┐
//! │ num_blocks: 16 │ block_size: 16 │ block 0 │ block 1 │ ... │
//! └────────────────┴────────────────┴─────────┴─────────┴─────┘
//! ```
//!
//! Both header fields are written MSB first. Each block is started and
//! terminated on its own, with fresh contexts, and holds `block_size` symbols
//! coded twice: once as a regular symbol in context 0 and once as a bypass
//! symbol. Blocks are not aligned; each starts at the bit where the previous
//! one ended.

use std::io::{Read, Write};

use crate::bitstream::{BitReader, BitWriter};
use crate::coder::{CoderError, CoderOptions, Decoder, Encoder};
use crate::error::{ArithError, Result};

/// Width of each header field.
const FIELD_BITS: u32 = 16;
/// Largest count a header field can hold.
pub const MAX_FIELD: usize = (1 << FIELD_BITS) - 1;

/// Contexts used by each block.
const BLOCK_CONTEXTS: usize = 1;

/// Container header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerHeader {
    pub num_blocks: u16,
    pub block_size: u16,
}

impl ContainerHeader {
    /// Header for `blocks`, which must all be the same length.
    pub fn for_blocks(blocks: &[Vec<bool>]) -> Result<Self> {
        let num_blocks = u16::try_from(blocks.len()).map_err(|_| {
            ArithError::InvalidLayout(format!(
                "{} blocks, at most {} fit the header",
                blocks.len(),
                MAX_FIELD
            ))
        })?;
        let size = blocks.first().map_or(0, Vec::len);
        if let Some((index, block)) = blocks.iter().enumerate().find(|(_, b)| b.len() != size) {
            return Err(ArithError::InvalidLayout(format!(
                "block {} has {} symbols, expected {}",
                index,
                block.len(),
                size
            )));
        }
        let block_size = u16::try_from(size).map_err(|_| {
            ArithError::InvalidLayout(format!(
                "block size {} exceeds {}",
                size, MAX_FIELD
            ))
        })?;
        Ok(Self {
            num_blocks,
            block_size,
        })
    }

    pub fn write_to<W: Write>(&self, out: &mut BitWriter<W>) -> Result<()> {
        out.put_bits(u32::from(self.num_blocks), FIELD_BITS)?;
        out.put_bits(u32::from(self.block_size), FIELD_BITS)?;
        Ok(())
    }

    pub fn read_from<R: Read>(input: &mut BitReader<R>) -> Result<Self> {
        let num_blocks = input.get_bits(FIELD_BITS)? as u16;
        let block_size = input.get_bits(FIELD_BITS)? as u16;
        Ok(Self {
            num_blocks,
            block_size,
        })
    }
}

/// Encode one block at the current position of `out`.
pub fn encode_block<W: Write>(
    out: &mut BitWriter<W>,
    bits: &[bool],
    options: &CoderOptions,
) -> std::result::Result<(), CoderError> {
    let mut enc = Encoder::new(out, BLOCK_CONTEXTS, options)?;
    enc.start()?;
    for &bit in bits {
        enc.encode_regular(0, bit)?;
        enc.encode_bypass(bit)?;
    }
    enc.terminate()
}

/// Decode one block of `len` symbols at the current position of `input`.
///
/// A bypass symbol that disagrees with its regular twin means the block is
/// damaged and fails with [`CoderError::DecodeFailure`].
pub fn decode_block<R: Read>(
    input: &mut BitReader<R>,
    len: usize,
    options: &CoderOptions,
) -> std::result::Result<Vec<bool>, CoderError> {
    let mut dec = Decoder::new(input, BLOCK_CONTEXTS, options)?;
    dec.start()?;
    let mut bits = Vec::with_capacity(len);
    for _ in 0..len {
        let regular = dec.decode_regular(0)?;
        let bypass = dec.decode_bypass()?;
        if regular != bypass {
            return Err(CoderError::DecodeFailure);
        }
        bits.push(regular);
    }
    dec.terminate()?;
    Ok(bits)
}

/// Write a header followed by every block, then flush the writer.
pub fn encode_container<W: Write>(
    out: &mut BitWriter<W>,
    blocks: &[Vec<bool>],
    options: &CoderOptions,
) -> Result<()> {
    let header = ContainerHeader::for_blocks(blocks)?;
    header.write_to(out)?;
    for block in blocks {
        encode_block(out, block, options)?;
    }
    out.flush()?;
    Ok(())
}

/// Read a header and every block it announces.
pub fn decode_container<R: Read>(
    input: &mut BitReader<R>,
    options: &CoderOptions,
) -> Result<Vec<Vec<bool>>> {
    let header = ContainerHeader::read_from(input)?;
    let len = usize::from(header.block_size);
    let mut blocks = Vec::with_capacity(usize::from(header.num_blocks).min(1024));
    for _ in 0..header.num_blocks {
        blocks.push(decode_block(input, len, options)?);
    }
    Ok(blocks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitstream::BitStreamError;

    fn encode(blocks: &[Vec<bool>], options: &CoderOptions) -> Vec<u8> {
        let mut out = BitWriter::new(Vec::new());
        encode_container(&mut out, blocks, options).unwrap();
        out.into_inner().unwrap()
    }

    fn pattern(len: usize, seed: usize) -> Vec<bool> {
        (0..len).map(|i| (i * 13 + seed) % 7 < 2).collect()
    }

    #[test]
    fn test_header_layout() {
        let mut out = BitWriter::new(Vec::new());
        ContainerHeader {
            num_blocks: 0x0102,
            block_size: 0xA0B0,
        }
        .write_to(&mut out)
        .unwrap();
        assert_eq!(out.into_inner().unwrap(), vec![0x01, 0x02, 0xA0, 0xB0]);
    }

    #[test]
    fn test_round_trip_both_engines() {
        let blocks: Vec<Vec<bool>> = (0..5).map(|seed| pattern(40, seed)).collect();
        for options in [CoderOptions::default(), CoderOptions::mcoder()] {
            let bytes = encode(&blocks, &options);
            let mut input = BitReader::new(bytes.as_slice());
            assert_eq!(decode_container(&mut input, &options).unwrap(), blocks);
        }
    }

    #[test]
    fn test_zero_size_blocks() {
        let blocks = vec![Vec::new(); 3];
        let bytes = encode(&blocks, &CoderOptions::default());
        // Header plus three empty four-byte blocks
        assert_eq!(bytes.len(), 4 + 3 * 4);

        let mut input = BitReader::new(bytes.as_slice());
        let decoded = decode_container(&mut input, &CoderOptions::default()).unwrap();
        assert_eq!(decoded, blocks);
    }

    #[test]
    fn test_empty_container() {
        let bytes = encode(&[], &CoderOptions::default());
        assert_eq!(bytes, vec![0, 0, 0, 0]);
        let mut input = BitReader::new(bytes.as_slice());
        assert!(decode_container(&mut input, &CoderOptions::default())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_ragged_blocks_rejected() {
        let blocks = vec![vec![true; 4], vec![true; 5]];
        let mut out = BitWriter::new(Vec::new());
        let err = encode_container(&mut out, &blocks, &CoderOptions::default()).unwrap_err();
        assert!(matches!(err, ArithError::InvalidLayout(_)), "{}", err);
        // Nothing was written before the layout check
        assert_eq!(out.bits_written(), 0);
    }

    #[test]
    fn test_oversized_block_rejected() {
        let blocks = vec![vec![false; MAX_FIELD + 1]];
        assert!(matches!(
            ContainerHeader::for_blocks(&blocks),
            Err(ArithError::InvalidLayout(_))
        ));
    }

    #[test]
    fn test_truncated_body() {
        let blocks = vec![pattern(64, 1)];
        let bytes = encode(&blocks, &CoderOptions::default());
        let truncated = &bytes[..bytes.len() - 3];
        let mut input = BitReader::new(truncated);
        let err = decode_container(&mut input, &CoderOptions::default()).unwrap_err();
        assert!(
            matches!(
                err,
                ArithError::Coder(CoderError::Stream(BitStreamError::IoExhausted))
                    | ArithError::Coder(CoderError::DecodeFailure)
            ),
            "{}",
            err
        );
    }

    #[test]
    fn test_missing_header() {
        let bytes = [0x00, 0x01];
        let mut input = BitReader::new(&bytes[..]);
        assert!(matches!(
            decode_container(&mut input, &CoderOptions::default()),
            Err(ArithError::Stream(BitStreamError::IoExhausted))
        ));
    }
}
