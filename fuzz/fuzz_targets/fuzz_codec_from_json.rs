#![no_main]

use libfuzzer_sys::fuzz_target;
use storewire_core::Codec;

const MAX_INPUT: usize = 64 * 1024;

fuzz_target!(|data: &[u8]| {
    if data.len() > MAX_INPUT {
        return;
    }
    let Ok(raw) = std::str::from_utf8(data) else {
        return;
    };

    let codec = Codec::new().with_max_depth(32);
    let Ok(Some(value)) = codec.from_json_str(raw) else {
        return;
    };

    // Whatever decodes must re-encode, and re-encoding is stable.
    let first = codec.to_json_string(&value).expect("decoded value re-encodes");
    let again = codec
        .from_json_str(&first)
        .expect("encoded value decodes")
        .expect("encoded value is not absent");
    let second = codec.to_json_string(&again).expect("second encode");
    assert_eq!(first, second);
});
