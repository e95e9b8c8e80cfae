#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use pixcat::image::{expected_len, tiff};

#[derive(Arbitrary, Debug)]
struct TiffFuzzInput {
    width: u16,
    height: u16,
    bits_idx: u8,
    data: Vec<u8>,
    // Arbitrary bytes handed to the parser
    file: Vec<u8>,
}

fuzz_target!(|input: TiffFuzzInput| {
    // The parser must reject garbage without panicking
    let _ = tiff::parse(&input.file);

    let width = u32::from(input.width);
    let height = u32::from(input.height);
    let bits = 8 * (u32::from(input.bits_idx % 4) + 1);

    match tiff::encode(width, height, bits, &input.data) {
        Ok(raster) => {
            assert_eq!(expected_len(width, height, bits), Some(input.data.len() as u64));
            let info = tiff::parse(raster.as_bytes()).expect("encoded file must parse");
            assert_eq!(info.width, width);
            assert_eq!(info.height, height);
            assert_eq!(info.data, input.data);
        }
        Err(_) => assert_ne!(expected_len(width, height, bits), Some(input.data.len() as u64)),
    }
});
