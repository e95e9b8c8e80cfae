use std::fmt;

use base64::Engine;
use log::debug;

use crate::debugger::protocol::ReadMemoryResponse;
use crate::debugger::variables::parse_unsigned;
use crate::error::{Result, ViewerError};

/// Largest pixel buffer a capture will request (512 MiB)
///
/// Width, height and depth come from the inspected process, so a corrupt
/// header must not turn into an unbounded read.
pub const MAX_IMAGE_BYTES: u64 = 512 * 1024 * 1024;

/// A well-formed memory reference returned by `evaluate`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryReference {
    /// Token exactly as the adapter sent it
    token: String,
    /// Numeric address the token denotes
    address: u64,
}

impl MemoryReference {
    /// Parse an adapter memory reference, which must be a numeric address
    pub fn parse(token: &str) -> Result<Self> {
        let address = parse_unsigned(token.trim())
            .ok_or_else(|| ViewerError::InvalidMemoryReference(token.to_string()))?;
        Ok(Self {
            token: token.to_string(),
            address,
        })
    }

    /// Token to pass back to `readMemory`
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Address of the referenced memory
    pub fn address(&self) -> u64 {
        self.address
    }
}

impl fmt::Display for MemoryReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", self.address)
    }
}

/// Decode a `readMemory` payload, requiring exactly `expected` bytes
pub fn decode_payload(response: &ReadMemoryResponse, expected: u64) -> Result<Vec<u8>> {
    let data = match response.data.as_deref() {
        Some(data) => data,
        None if expected == 0 => return Ok(Vec::new()),
        None => {
            return Err(ViewerError::MemoryReadFailed(format!(
                "no data returned at {} ({} bytes unreadable)",
                response.address,
                response
                    .unreadable_bytes
                    .map_or_else(|| expected.to_string(), |n| n.to_string())
            )))
        }
    };

    let bytes = base64::engine::general_purpose::STANDARD
        .decode(data)
        .map_err(|e| ViewerError::MemoryReadFailed(format!("invalid base64 payload: {}", e)))?;

    debug!("Decoded {} bytes read at {}", bytes.len(), response.address);

    if bytes.len() as u64 != expected {
        return Err(ViewerError::MemoryReadFailed(format!(
            "read {} of {} bytes at {}",
            bytes.len(),
            expected,
            response.address
        )));
    }
    Ok(bytes)
}
