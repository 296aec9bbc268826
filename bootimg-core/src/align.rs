//! Padding arithmetic for power-of-two boundaries

use crate::error::CodecError;
use std::io::{self, Seek, SeekFrom, Write};

/// Bytes needed to move `pos` up to the next multiple of `align`.
///
/// `align` must be a power of two; see [`check_alignment`].
pub const fn pad_len(pos: u64, align: u32) -> u32 {
    (pos.wrapping_neg() & (align as u64).wrapping_sub(1)) as u32
}

/// `pos` rounded up to a multiple of `align`
pub const fn align_up(pos: u64, align: u32) -> u64 {
    pos + pad_len(pos, align) as u64
}

/// Reject zero and non-power-of-two alignment units
pub fn check_alignment(align: u32) -> Result<u32, CodecError> {
    if align.is_power_of_two() {
        Ok(align)
    } else {
        Err(CodecError::Configuration(format!(
            "alignment {:#x} is not a power of two",
            align
        )))
    }
}

/// Write zero bytes until `pos` reaches the next `align` boundary.
///
/// Returns the number of bytes written.
pub fn write_padding<W: Write>(writer: &mut W, pos: u64, align: u32) -> io::Result<u32> {
    const ZEROS: [u8; 4096] = [0u8; 4096];

    let len = pad_len(pos, align);
    let mut remaining = len as usize;
    while remaining > 0 {
        let n = remaining.min(ZEROS.len());
        writer.write_all(&ZEROS[..n])?;
        remaining -= n;
    }
    Ok(len)
}

/// Seek past the padding that follows `len` bytes of content.
pub fn skip_padding<S: Seek>(stream: &mut S, len: u64, align: u32) -> io::Result<u32> {
    let pad = pad_len(len, align);
    if pad > 0 {
        stream.seek(SeekFrom::Current(pad as i64))?;
    }
    Ok(pad)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_pad_len() {
        assert_eq!(pad_len(0, 0x800), 0);
        assert_eq!(pad_len(1, 0x800), 0x7FF);
        assert_eq!(pad_len(608, 0x800), 0x800 - 608);
        assert_eq!(pad_len(0x800, 0x800), 0);
        assert_eq!(pad_len(5, 4), 3);
        assert_eq!(pad_len(7, 1), 0);
    }

    #[test]
    fn test_align_up() {
        assert_eq!(align_up(100, 0x800), 0x800);
        assert_eq!(align_up(0x1001, 0x1000), 0x2000);
    }

    #[test]
    fn test_check_alignment() {
        assert_eq!(check_alignment(0x800), Ok(0x800));
        assert!(matches!(check_alignment(0), Err(CodecError::Configuration(_))));
        assert!(matches!(check_alignment(0x600), Err(CodecError::Configuration(_))));
    }

    #[test]
    fn test_write_padding() {
        let mut out = Vec::new();
        let written = write_padding(&mut out, 10, 0x2000).unwrap();
        assert_eq!(written as usize, 0x2000 - 10);
        assert_eq!(out.len(), 0x2000 - 10);
        assert!(out.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_skip_padding() {
        let mut cursor = Cursor::new(vec![0u8; 64]);
        cursor.set_position(6);
        assert_eq!(skip_padding(&mut cursor, 6, 4).unwrap(), 2);
        assert_eq!(cursor.position(), 8);
    }
}
