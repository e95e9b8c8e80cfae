pub mod tiff;

use crate::error::{Result, ViewerError};

pub use tiff::{RasterFile, RasterInfo};

/// Check that a bit depth is a positive multiple of 8 no larger than 32
pub fn check_bit_depth(bits_per_pixel: u64) -> Result<u32> {
    if bits_per_pixel == 0 || bits_per_pixel % 8 != 0 || bits_per_pixel > 32 {
        return Err(ViewerError::InvalidBitDepth(bits_per_pixel));
    }
    Ok(bits_per_pixel as u32)
}

/// Number of pixel bytes an image of the given shape occupies
///
/// `None` when the size does not fit in a `u64`.
pub fn expected_len(width: u32, height: u32, bits_per_pixel: u32) -> Option<u64> {
    u64::from(width)
        .checked_mul(u64::from(height))?
        .checked_mul(u64::from(bits_per_pixel))
        .map(|bits| bits / 8)
}
