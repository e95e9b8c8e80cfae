//! Minimal little-endian TIFF writer and reader
//!
//! The writer produces a single-strip, uncompressed, single-sample raster:
//! a fixed 32-byte header, one image file directory (IFD) with eight
//! entries, then the pixel bytes verbatim. The reader understands the same
//! subset, which is enough to inspect files produced here.

use byteorder::{ByteOrder, LittleEndian};

use crate::error::{Result, ViewerError};
use crate::image::{check_bit_depth, expected_len};

/// Size of the fixed header, which is also the IFD offset
pub const HEADER_SIZE: usize = 32;
/// Number of directory entries written by [`encode`]
pub const IFD_ENTRY_COUNT: u16 = 8;
/// Size of one directory entry
pub const IFD_ENTRY_SIZE: usize = 12;
/// Entry count + entries + next-IFD terminator
pub const IFD_SIZE: usize = 2 + IFD_ENTRY_COUNT as usize * IFD_ENTRY_SIZE + 4;
/// Offset of the first pixel byte
pub const DATA_OFFSET: usize = HEADER_SIZE + IFD_SIZE;

/// Little-endian byte-order marker
pub const BYTE_ORDER_LE: &[u8; 2] = b"II";
/// TIFF version constant
pub const TIFF_MAGIC: u16 = 42;
/// ASCII signature stored in the header padding
pub const SIGNATURE: &str = "pixcat raw capture";
const SIGNATURE_OFFSET: usize = 8;
const SIGNATURE_LEN: usize = HEADER_SIZE - SIGNATURE_OFFSET;

/// Field types
const TYPE_SHORT: u16 = 3;
const TYPE_LONG: u16 = 4;

/// Tag ids
pub const TAG_IMAGE_WIDTH: u16 = 256;
pub const TAG_IMAGE_LENGTH: u16 = 257;
pub const TAG_BITS_PER_SAMPLE: u16 = 258;
pub const TAG_COMPRESSION: u16 = 259;
pub const TAG_PHOTOMETRIC: u16 = 262;
pub const TAG_STRIP_OFFSETS: u16 = 273;
pub const TAG_SAMPLES_PER_PIXEL: u16 = 277;
pub const TAG_STRIP_BYTE_COUNTS: u16 = 279;

const COMPRESSION_NONE: u32 = 1;
const PHOTOMETRIC_BLACK_IS_ZERO: u32 = 1;

/// An encoded raster file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterFile {
    width: u32,
    height: u32,
    bits_per_pixel: u32,
    bytes: Vec<u8>,
}

impl RasterFile {
    /// Image width in pixels
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Image height in pixels
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Bits per pixel
    pub fn bits_per_pixel(&self) -> u32 {
        self.bits_per_pixel
    }

    /// The complete file contents
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Consume the raster and return the file contents
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Total file size
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the file is empty (never true for an encoded raster)
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// The pixel bytes following the directory
    pub fn pixels(&self) -> &[u8] {
        &self.bytes[DATA_OFFSET..]
    }
}

/// Metadata and pixels recovered by [`parse`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterInfo {
    pub width: u32,
    pub height: u32,
    pub bits_per_sample: u32,
    pub samples_per_pixel: u32,
    pub compression: u32,
    pub photometric: u32,
    pub strip_offset: u32,
    pub data: Vec<u8>,
}

/// Encode a raw single-sample pixel buffer as a TIFF file
pub fn encode(width: u32, height: u32, bits_per_pixel: u32, data: &[u8]) -> Result<RasterFile> {
    let bits_per_pixel = check_bit_depth(u64::from(bits_per_pixel))?;

    // Strip offsets and byte counts are 32-bit
    let max = u64::from(u32::MAX) - DATA_OFFSET as u64;
    let too_large = ViewerError::ImageTooLarge {
        width,
        height,
        bits_per_pixel,
        max,
    };
    let expected = match expected_len(width, height, bits_per_pixel) {
        Some(expected) => expected,
        None => return Err(too_large),
    };
    if data.len() as u64 != expected {
        return Err(ViewerError::SizeMismatch {
            expected,
            actual: data.len() as u64,
        });
    }
    if expected > max {
        return Err(too_large);
    }
    let byte_count = expected as u32;

    let mut bytes = vec![0u8; DATA_OFFSET + data.len()];

    // Header
    bytes[0..2].copy_from_slice(BYTE_ORDER_LE);
    LittleEndian::write_u16(&mut bytes[2..4], TIFF_MAGIC);
    LittleEndian::write_u32(&mut bytes[4..8], HEADER_SIZE as u32);
    let signature = SIGNATURE.as_bytes();
    let sig_len = signature.len().min(SIGNATURE_LEN);
    bytes[SIGNATURE_OFFSET..SIGNATURE_OFFSET + sig_len].copy_from_slice(&signature[..sig_len]);

    // Directory
    let ifd = &mut bytes[HEADER_SIZE..DATA_OFFSET];
    LittleEndian::write_u16(&mut ifd[0..2], IFD_ENTRY_COUNT);
    let entries: [(u16, u16, u32); IFD_ENTRY_COUNT as usize] = [
        (TAG_IMAGE_WIDTH, TYPE_LONG, width),
        (TAG_IMAGE_LENGTH, TYPE_LONG, height),
        (TAG_BITS_PER_SAMPLE, TYPE_SHORT, bits_per_pixel),
        (TAG_COMPRESSION, TYPE_SHORT, COMPRESSION_NONE),
        (TAG_PHOTOMETRIC, TYPE_SHORT, PHOTOMETRIC_BLACK_IS_ZERO),
        (TAG_STRIP_OFFSETS, TYPE_LONG, DATA_OFFSET as u32),
        (TAG_SAMPLES_PER_PIXEL, TYPE_SHORT, 1),
        (TAG_STRIP_BYTE_COUNTS, TYPE_LONG, byte_count),
    ];
    for (i, (tag, field_type, value)) in entries.iter().enumerate() {
        let entry = &mut ifd[2 + i * IFD_ENTRY_SIZE..2 + (i + 1) * IFD_ENTRY_SIZE];
        LittleEndian::write_u16(&mut entry[0..2], *tag);
        LittleEndian::write_u16(&mut entry[2..4], *field_type);
        LittleEndian::write_u32(&mut entry[4..8], 1);
        LittleEndian::write_u32(&mut entry[8..12], *value);
    }
    // Next IFD offset stays zero

    bytes[DATA_OFFSET..].copy_from_slice(data);

    Ok(RasterFile {
        width,
        height,
        bits_per_pixel,
        bytes,
    })
}

fn slice_at(bytes: &[u8], pos: usize, len: usize) -> Result<&[u8]> {
    pos.checked_add(len)
        .and_then(|end| bytes.get(pos..end))
        .ok_or_else(|| ViewerError::InvalidRaster(format!("truncated at offset {}", pos)))
}

fn read_u16(bytes: &[u8], pos: usize) -> Result<u16> {
    slice_at(bytes, pos, 2).map(LittleEndian::read_u16)
}

fn read_u32(bytes: &[u8], pos: usize) -> Result<u32> {
    slice_at(bytes, pos, 4).map(LittleEndian::read_u32)
}

/// Parse a little-endian, single-strip TIFF file
pub fn parse(bytes: &[u8]) -> Result<RasterInfo> {
    if slice_at(bytes, 0, 2)? != BYTE_ORDER_LE {
        return Err(ViewerError::InvalidRaster("not a little-endian TIFF".to_string()));
    }
    let magic = read_u16(bytes, 2)?;
    if magic != TIFF_MAGIC {
        return Err(ViewerError::InvalidRaster(format!("bad version {}", magic)));
    }

    let ifd_offset = read_u32(bytes, 4)? as usize;
    let count = read_u16(bytes, ifd_offset)? as usize;

    let mut width = None;
    let mut height = None;
    let mut strip_offset = None;
    let mut strip_len = None;
    let mut info = RasterInfo {
        width: 0,
        height: 0,
        bits_per_sample: 1,
        samples_per_pixel: 1,
        compression: COMPRESSION_NONE,
        photometric: PHOTOMETRIC_BLACK_IS_ZERO,
        strip_offset: 0,
        data: Vec::new(),
    };

    for i in 0..count {
        let pos = ifd_offset + 2 + i * IFD_ENTRY_SIZE;
        let tag = read_u16(bytes, pos)?;
        let field_type = read_u16(bytes, pos + 2)?;
        let value_count = read_u32(bytes, pos + 4)?;
        let value = match field_type {
            TYPE_SHORT => u32::from(read_u16(bytes, pos + 8)?),
            TYPE_LONG => read_u32(bytes, pos + 8)?,
            // Tags we do not need may use other types
            _ => continue,
        };
        if value_count != 1 {
            return Err(ViewerError::InvalidRaster(format!(
                "tag {} has {} values, only single values are supported",
                tag, value_count
            )));
        }

        match tag {
            TAG_IMAGE_WIDTH => width = Some(value),
            TAG_IMAGE_LENGTH => height = Some(value),
            TAG_BITS_PER_SAMPLE => info.bits_per_sample = value,
            TAG_COMPRESSION => info.compression = value,
            TAG_PHOTOMETRIC => info.photometric = value,
            TAG_STRIP_OFFSETS => strip_offset = Some(value),
            TAG_SAMPLES_PER_PIXEL => info.samples_per_pixel = value,
            TAG_STRIP_BYTE_COUNTS => strip_len = Some(value),
            _ => {}
        }
    }

    let missing = |name: &str| ViewerError::InvalidRaster(format!("missing {}", name));
    info.width = width.ok_or_else(|| missing("ImageWidth"))?;
    info.height = height.ok_or_else(|| missing("ImageLength"))?;
    info.strip_offset = strip_offset.ok_or_else(|| missing("StripOffsets"))?;
    let strip_len = strip_len.ok_or_else(|| missing("StripByteCounts"))?;

    info.data = slice_at(bytes, info.strip_offset as usize, strip_len as usize)?.to_vec();
    Ok(info)
}
