#![no_main]

use libfuzzer_sys::fuzz_target;
use wirecheck_proto::{Delimiter, Envelope, FrameBuffer};

fuzz_target!(|data: &[u8]| {
    // First byte picks the chunk size, the rest is the stream.
    let Some((&chunk, stream)) = data.split_first() else {
        return;
    };
    let chunk = usize::from(chunk).max(1);

    for delimiter in [Delimiter::newline(), Delimiter::new(b"\r\n".to_vec()).unwrap()] {
        let mut buffer = FrameBuffer::new(delimiter.clone()).with_max_frame_len(Some(1024));
        for piece in stream.chunks(chunk) {
            buffer.extend(piece);
            loop {
                match buffer.next_frame() {
                    Ok(Some(frame)) => {
                        assert!(delimiter.find_in(frame.as_bytes()).is_none());
                        let _ = Envelope::decode(frame.as_bytes());
                    }
                    Ok(None) => break,
                    // Oversized frames are reported, never panicked on.
                    Err(_) => break,
                }
            }
        }
    }
});
