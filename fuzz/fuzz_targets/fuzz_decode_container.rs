#![no_main]
use arith_stream::bitstream::BitReader;
use arith_stream::container::decode_container;
use arith_stream::CoderOptions;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }

    // Byte 0: engine (bit 0) and rescale ceiling (bits 1-7)
    let mut options = if data[0] & 1 == 0 {
        CoderOptions::default()
    } else {
        CoderOptions::mcoder()
    };
    options.max_freq = 3 + u32::from(data[0] >> 1) * 4;

    let mut input = BitReader::new(&data[1..]);
    let _ = decode_container(&mut input, &options);
});
