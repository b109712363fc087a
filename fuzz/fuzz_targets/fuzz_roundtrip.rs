#![no_main]
use arith_stream::bitstream::{BitReader, BitWriter};
use arith_stream::{CoderOptions, Decoder, Encoder};
use libfuzzer_sys::fuzz_target;

const CONTEXTS: usize = 8;

fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }

    // Byte 0: engine (bit 0) and rescale ceiling (bits 1-7)
    let mut options = if data[0] & 1 == 0 {
        CoderOptions::default()
    } else {
        CoderOptions::mcoder()
    };
    options.max_freq = 3 + u32::from(data[0] >> 1) * 4;

    // Each remaining byte is one symbol: bit 0 value, bit 1 bypass, bits 2-4 context
    let symbols = &data[1..];

    let mut out = BitWriter::new(Vec::new());
    let mut enc = Encoder::new(&mut out, CONTEXTS, &options).unwrap();
    enc.start().unwrap();
    for &s in symbols {
        let bit = s & 1 == 1;
        if s & 2 == 0 {
            enc.encode_regular(usize::from(s >> 2) % CONTEXTS, bit).unwrap();
        } else {
            enc.encode_bypass(bit).unwrap();
        }
    }
    enc.terminate().unwrap();
    drop(enc);
    let bytes = out.into_inner().unwrap();

    let mut input = BitReader::new(bytes.as_slice());
    let mut dec = Decoder::new(&mut input, CONTEXTS, &options).unwrap();
    dec.start().unwrap();
    for &s in symbols {
        let decoded = if s & 2 == 0 {
            dec.decode_regular(usize::from(s >> 2) % CONTEXTS).unwrap()
        } else {
            dec.decode_bypass().unwrap()
        };
        assert_eq!(decoded, s & 1 == 1);
    }
    dec.terminate().unwrap();
});
