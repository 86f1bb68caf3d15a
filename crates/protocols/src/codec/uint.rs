//! Big-endian unsigned integer slices.

use crate::error::DecodeError;

/// Reads a big-endian unsigned integer of `width` bytes (at most 8) at `offset`.
///
/// # Errors
/// Returns [`DecodeError::Truncated`] when the slice is too short.
pub fn decode_uint(
    bytes: &[u8],
    offset: usize,
    width: usize,
    what: &'static str,
) -> Result<u64, DecodeError> {
    debug_assert!(width <= 8);
    let end = offset.checked_add(width).ok_or(DecodeError::Offset { what, offset })?;
    let slice = bytes.get(offset..end).ok_or(DecodeError::Truncated {
        what,
        offset,
        needed: width,
        available: bytes.len().saturating_sub(offset),
    })?;
    Ok(slice.iter().fold(0u64, |acc, b| (acc << 8) | u64::from(*b)))
}

/// Reads an 8-byte big-endian integer at `offset`.
///
/// # Errors
/// Returns [`DecodeError::Truncated`] when fewer than 8 bytes remain.
pub fn decode_u64(bytes: &[u8], offset: usize, what: &'static str) -> Result<u64, DecodeError> {
    decode_uint(bytes, offset, 8, what)
}

/// Decodes a value that must be exactly 8 bytes.
///
/// # Errors
/// Returns [`DecodeError::Length`] for any other length.
pub fn decode_u64_exact(bytes: &[u8], what: &'static str) -> Result<u64, DecodeError> {
    if bytes.len() != 8 {
        return Err(DecodeError::Length {
            what,
            expected: 8,
            found: bytes.len(),
        });
    }
    decode_u64(bytes, 0, what)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_big_endian() {
        let bytes = [0, 0, 0, 0, 0, 0, 0x01, 0x02];
        assert_eq!(decode_u64(&bytes, 0, "test").unwrap(), 0x0102);
        assert_eq!(decode_uint(&[0xff, 0xff, 0xff, 0xfe], 0, 4, "test").unwrap(), 0xffff_fffe);
    }

    #[test]
    fn test_offset_slices() {
        let mut bytes = vec![0xaa];
        bytes.extend_from_slice(&42u64.to_be_bytes());
        assert_eq!(decode_u64(&bytes, 1, "test").unwrap(), 42);
    }

    #[test]
    fn test_truncated_input() {
        let err = decode_u64(&[1, 2, 3], 0, "test").unwrap_err();
        assert!(matches!(err, DecodeError::Truncated { needed: 8, available: 3, .. }));
    }

    #[test]
    fn test_exact_length() {
        assert!(decode_u64_exact(&[0u8; 9], "test").is_err());
        assert_eq!(decode_u64_exact(&7u64.to_be_bytes(), "test").unwrap(), 7);
    }
}
