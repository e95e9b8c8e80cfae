use pixcat::image::tiff::{self, DATA_OFFSET};
use pixcat::ViewerError;
use test_case::test_case;

#[test_case(8 ; "gray8")]
#[test_case(16 ; "gray16")]
#[test_case(24 ; "rgb24")]
#[test_case(32 ; "rgba32")]
fn test_supported_depths_encode(bits: u32) {
    let data = vec![0x5A; (7 * 5 * bits / 8) as usize];
    let raster = tiff::encode(7, 5, bits, &data).unwrap();
    assert_eq!(raster.len(), DATA_OFFSET + data.len());
    assert_eq!(raster.bits_per_pixel(), bits);
}

#[test_case(7 ; "below byte")]
#[test_case(33 ; "above word")]
fn test_unsupported_depths_fail(bits: u32) {
    let result = tiff::encode(1, 1, bits, &[0; 4]);
    assert!(matches!(result, Err(ViewerError::InvalidBitDepth(b)) if b == u64::from(bits)));
}

#[test]
fn test_size_precondition() {
    let result = tiff::encode(4, 4, 8, &[0; 15]);
    assert!(matches!(result, Err(ViewerError::SizeMismatch { expected: 16, actual: 15 })));

    let result = tiff::encode(4, 4, 16, &[0; 16]);
    assert!(matches!(result, Err(ViewerError::SizeMismatch { expected: 32, actual: 16 })));
}

#[test]
fn test_empty_image() {
    let raster = tiff::encode(0, 10, 8, &[]).unwrap();
    let info = tiff::parse(raster.as_bytes()).unwrap();
    assert_eq!(info.width, 0);
    assert_eq!(info.height, 10);
    assert!(info.data.is_empty());
}

// Property-based tests for the encoder
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    fn image() -> impl Strategy<Value = (u32, u32, u32, Vec<u8>)> {
        (1u32..48, 1u32..48, prop::sample::select(vec![8u32, 16, 24, 32])).prop_flat_map(
            |(w, h, bits)| {
                let len = (w * h * bits / 8) as usize;
                (Just(w), Just(h), Just(bits), prop::collection::vec(any::<u8>(), len))
            },
        )
    }

    proptest! {
        #[test]
        fn encoded_file_reads_back((w, h, bits, data) in image()) {
            let raster = tiff::encode(w, h, bits, &data).unwrap();
            let info = tiff::parse(raster.as_bytes()).unwrap();

            prop_assert_eq!(info.width, w);
            prop_assert_eq!(info.height, h);
            prop_assert_eq!(info.bits_per_sample, bits);
            prop_assert_eq!(info.samples_per_pixel, 1);
            prop_assert_eq!(info.compression, 1);
            prop_assert_eq!(info.data, data);
        }

        #[test]
        fn encoding_is_deterministic((w, h, bits, data) in image()) {
            let first = tiff::encode(w, h, bits, &data).unwrap();
            let second = tiff::encode(w, h, bits, &data).unwrap();
            prop_assert_eq!(first.as_bytes(), second.as_bytes());
        }

        #[test]
        fn wrong_length_is_rejected(w in 1u32..32, h in 1u32..32, extra in 1usize..8, shorter in any::<bool>()) {
            let expected = (w * h) as usize;
            let len = if shorter { expected.saturating_sub(extra) } else { expected + extra };
            prop_assume!(len != expected);
            let result = tiff::encode(w, h, 8, &vec![0; len]);
            let is_mismatch = matches!(result, Err(ViewerError::SizeMismatch { .. }));
            prop_assert!(is_mismatch);
        }

        #[test]
        fn parser_never_panics(bytes in prop::collection::vec(any::<u8>(), 0..256)) {
            let _ = tiff::parse(&bytes);
        }
    }
}
