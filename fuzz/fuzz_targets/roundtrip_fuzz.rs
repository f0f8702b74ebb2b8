#![no_main]
use chunkflate::codec::{Deflater, Format, Inflater};
use chunkflate::pipeline::{Pipeline, PipelineOptions};
use chunkflate::sink::DiscardSink;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }

    // First byte selects chunk size and level.
    let flags = data[0];
    let payload = &data[1..];
    let chunk_size = (flags as usize & 0x3f) + 1;
    let level = u32::from(flags >> 6) * 3;

    let packed = Pipeline::new(
        payload,
        Deflater::new(level, Format::Zlib),
        DiscardSink,
        "fuzz.deflate",
        PipelineOptions { chunk_size },
    )
    .run_to_end(|_| {})
    .unwrap()
    .output;

    let unpacked = Pipeline::new(
        packed.as_slice(),
        Inflater::new(Format::Zlib),
        DiscardSink,
        "fuzz",
        PipelineOptions { chunk_size },
    )
    .run_to_end(|_| {})
    .unwrap()
    .output;

    assert_eq!(unpacked, payload);
});
