#![no_main]
use chunkflate::codec::{Format, Inflater, StreamCodec};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // The inflater must never panic, only return errors, whatever the
    // chunking of the input.
    if data.is_empty() {
        return;
    }
    let split = (data[0] as usize).max(1);
    let payload = &data[1..];
    for format in [Format::Zlib, Format::Raw] {
        let mut codec = Inflater::new(format);
        let mut chunks = payload.chunks(split).peekable();
        let mut ok = true;
        while let Some(chunk) = chunks.next() {
            if codec.push(chunk, chunks.peek().is_none()).is_err() {
                ok = false;
                break;
            }
        }
        if ok {
            let _ = codec.finish();
        }
    }
});
