//! Program image loader.
//!
//! Parses the count-prefixed raw image format and copies the payload
//! into memory at address 0:
//!
//! ```text
//! +------------------+
//! | Byte count       |  u32 little-endian
//! +------------------+
//! | Program bytes    |  exactly that many, verbatim
//! +------------------+
//! ```

use crate::bus::Bus;
use crate::MEM_SIZE;
use thiserror::Error;

/// Length of the byte-count header.
const HEADER_LEN: usize = 4;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ImageError {
    #[error("image shorter than its {HEADER_LEN}-byte count header")]
    MissingHeader,
    #[error("image declares {declared} bytes but carries {actual}")]
    LengthMismatch { declared: usize, actual: usize },
    #[error("image of {size} bytes exceeds the {MEM_SIZE}-byte address space")]
    TooLarge { size: usize },
}

/// Parse a count-prefixed image and copy its payload to address 0.
/// Returns the number of program bytes loaded.
pub fn parse_image(data: &[u8], bus: &mut Bus) -> Result<usize, ImageError> {
    if data.len() < HEADER_LEN {
        return Err(ImageError::MissingHeader);
    }
    let declared = u32::from_le_bytes([data[0], data[1], data[2], data[3]]) as usize;
    if declared > MEM_SIZE {
        return Err(ImageError::TooLarge { size: declared });
    }
    let payload = &data[HEADER_LEN..];
    if payload.len() != declared {
        return Err(ImageError::LengthMismatch {
            declared,
            actual: payload.len(),
        });
    }
    bus.load(0, payload);
    Ok(declared)
}

/// Prepend the count header to raw program bytes (tooling and tests).
pub fn wrap_image(program: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_LEN + program.len());
    out.extend_from_slice(&(program.len() as u32).to_le_bytes());
    out.extend_from_slice(program);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_roundtrip() {
        let program = [0x3E, 0x01, 0x76];
        let mut bus = Bus::new();
        let size = parse_image(&wrap_image(&program), &mut bus).unwrap();
        assert_eq!(size, 3);
        assert_eq!(bus.read(0), 0x3E);
        assert_eq!(bus.read(1), 0x01);
        assert_eq!(bus.read(2), 0x76);
        assert_eq!(bus.read(3), 0x00);
    }

    #[test]
    fn test_empty_program() {
        let mut bus = Bus::new();
        assert_eq!(parse_image(&wrap_image(&[]), &mut bus).unwrap(), 0);
    }

    #[test]
    fn test_missing_header() {
        let mut bus = Bus::new();
        assert_eq!(
            parse_image(&[1, 2, 3], &mut bus),
            Err(ImageError::MissingHeader)
        );
    }

    #[test]
    fn test_length_mismatch() {
        let mut bus = Bus::new();
        let mut data = wrap_image(&[0x00, 0x00]);
        data.pop(); // truncate the payload
        assert_eq!(
            parse_image(&data, &mut bus),
            Err(ImageError::LengthMismatch { declared: 2, actual: 1 })
        );
    }

    #[test]
    fn test_too_large() {
        let mut bus = Bus::new();
        let mut data = (0x10001u32).to_le_bytes().to_vec();
        data.resize(4 + 0x10001, 0);
        assert_eq!(
            parse_image(&data, &mut bus),
            Err(ImageError::TooLarge { size: 0x10001 })
        );
    }

    #[test]
    fn test_full_memory_image() {
        let mut bus = Bus::new();
        let program = vec![0xAAu8; MEM_SIZE];
        let size = parse_image(&wrap_image(&program), &mut bus).unwrap();
        assert_eq!(size, MEM_SIZE);
        assert_eq!(bus.read(0xFFFF), 0xAA);
    }
}
