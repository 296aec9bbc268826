//! Fixed 98-byte UPDATA record header

use crate::align::pad_len;
use crate::checksum::crc_ccitt_bytes;
use crate::constants::{
    UPDATA_BLOCK_SIZE, UPDATA_BOARD_SIZE, UPDATA_CRC_OFFSET, UPDATA_HEADER_SIZE,
    UPDATA_INPUT_TAG, UPDATA_MAGIC, UPDATA_RECORD_ALIGN, UPDATA_TAG1, UPDATA_TAG2,
    UPDATA_TEXT_SIZE,
};
use crate::error::CodecError;
use bytes::{Buf, BufMut, BytesMut};

/// Copy `data` into a fixed field, truncating or zero padding
pub fn fixed_field<const N: usize>(data: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    let n = data.len().min(N);
    out[..n].copy_from_slice(&data[..n]);
    out
}

/// Number of 4096-byte blocks (the last may be short) in a payload
pub const fn block_count(content_length: u32) -> u32 {
    content_length.div_ceil(UPDATA_BLOCK_SIZE as u32)
}

/// Header length (fixed header plus checksum table) for a payload size
pub const fn header_length_for(content_length: u32) -> u32 {
    UPDATA_HEADER_SIZE as u32 + 2 * block_count(content_length)
}

/// Header CRC over a serialized header, with the CRC and tag2 fields zeroed.
///
/// Tools that zero only the two CRC bytes fold tag2 (normally `0x1000`) into
/// their value, so their containers fail [`verify_header_crc`] with
/// `ChecksumMismatch`. The two conventions are not interchangeable.
pub fn compute_header_crc(raw: &[u8; UPDATA_HEADER_SIZE]) -> [u8; 2] {
    let mut scratch = *raw;
    // crc at 92..94, tag2 at 94..98
    scratch[UPDATA_CRC_OFFSET..].fill(0);
    crc_ccitt_bytes(&scratch)
}

/// Check the stored header CRC of a serialized header
pub fn verify_header_crc(raw: &[u8; UPDATA_HEADER_SIZE]) -> Result<(), CodecError> {
    let stored = [raw[UPDATA_CRC_OFFSET], raw[UPDATA_CRC_OFFSET + 1]];
    let actual = compute_header_crc(raw);
    if stored == actual {
        Ok(())
    } else {
        Err(CodecError::ChecksumMismatch {
            location: "record header".to_string(),
            expected: u16::from_le_bytes(stored),
            actual: u16::from_le_bytes(actual),
        })
    }
}

/// UPDATA record header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionHeader {
    /// Fixed header plus checksum table length
    pub header_length: u32,
    /// Board identifier
    pub board_name: [u8; UPDATA_BOARD_SIZE],
    /// Partition address; selects the output name
    pub position: u32,
    /// Payload length
    pub content_length: u32,
    /// Build date text, `YYYY.MM.DD`
    pub date: [u8; UPDATA_TEXT_SIZE],
    /// Build time text, `HH.MM.SS`
    pub time: [u8; UPDATA_TEXT_SIZE],
    /// Input tag text
    pub input_tag: [u8; UPDATA_TEXT_SIZE],
    /// Reserved, zero when written by this crate
    pub reserved: [u8; UPDATA_TEXT_SIZE],
    /// Stored header CRC, little-endian
    pub header_crc: [u8; 2],
}

impl PartitionHeader {
    /// Header for a payload of `content_length` bytes, CRC already computed
    pub fn new(
        board_name: [u8; UPDATA_BOARD_SIZE],
        position: u32,
        content_length: u32,
        date: [u8; UPDATA_TEXT_SIZE],
        time: [u8; UPDATA_TEXT_SIZE],
    ) -> Self {
        let mut header = Self {
            header_length: header_length_for(content_length),
            board_name,
            position,
            content_length,
            date,
            time,
            input_tag: fixed_field(UPDATA_INPUT_TAG),
            reserved: [0u8; UPDATA_TEXT_SIZE],
            header_crc: [0u8; 2],
        };
        header.seal();
        header
    }

    /// Recompute and store the header CRC
    pub fn seal(&mut self) {
        self.header_crc = compute_header_crc(&self.to_array());
    }

    /// Parse a serialized header, validating the magic
    pub fn parse(raw: &[u8; UPDATA_HEADER_SIZE]) -> Result<Self, CodecError> {
        let mut cur = &raw[..];
        let magic = cur.get_u32();
        if magic != u32::from_be_bytes(UPDATA_MAGIC) {
            return Err(CodecError::InvalidFormat(format!(
                "bad record magic {:#010x}",
                magic
            )));
        }

        let header_length = cur.get_u32_le();
        cur.advance(UPDATA_TAG1.len());
        let mut board_name = [0u8; UPDATA_BOARD_SIZE];
        cur.copy_to_slice(&mut board_name);
        let position = cur.get_u32_le();
        let content_length = cur.get_u32_le();
        let mut date = [0u8; UPDATA_TEXT_SIZE];
        cur.copy_to_slice(&mut date);
        let mut time = [0u8; UPDATA_TEXT_SIZE];
        cur.copy_to_slice(&mut time);
        let mut input_tag = [0u8; UPDATA_TEXT_SIZE];
        cur.copy_to_slice(&mut input_tag);
        let mut reserved = [0u8; UPDATA_TEXT_SIZE];
        cur.copy_to_slice(&mut reserved);
        let mut header_crc = [0u8; 2];
        cur.copy_to_slice(&mut header_crc);

        if (header_length as usize) < UPDATA_HEADER_SIZE {
            return Err(CodecError::InvalidFormat(format!(
                "header length {} shorter than the fixed header",
                header_length
            )));
        }

        Ok(Self {
            header_length,
            board_name,
            position,
            content_length,
            date,
            time,
            input_tag,
            reserved,
            header_crc,
        })
    }

    /// Serialize, writing the stored CRC as is
    pub fn to_bytes(&self) -> BytesMut {
        let mut buf = BytesMut::with_capacity(UPDATA_HEADER_SIZE);
        buf.put_slice(&UPDATA_MAGIC);
        buf.put_u32_le(self.header_length);
        buf.put_slice(&UPDATA_TAG1);
        buf.put_slice(&self.board_name);
        buf.put_u32_le(self.position);
        buf.put_u32_le(self.content_length);
        buf.put_slice(&self.date);
        buf.put_slice(&self.time);
        buf.put_slice(&self.input_tag);
        buf.put_slice(&self.reserved);
        buf.put_slice(&self.header_crc);
        buf.put_slice(&UPDATA_TAG2);
        buf
    }

    fn to_array(&self) -> [u8; UPDATA_HEADER_SIZE] {
        let mut raw = [0u8; UPDATA_HEADER_SIZE];
        raw.copy_from_slice(&self.to_bytes());
        raw
    }

    /// Length of the checksum table following the fixed header
    pub const fn table_len(&self) -> usize {
        (self.header_length as usize).saturating_sub(UPDATA_HEADER_SIZE)
    }

    /// Whether the checksum table has one entry per payload block
    pub const fn table_len_consistent(&self) -> bool {
        self.header_length == header_length_for(self.content_length)
    }

    /// Zero bytes following the payload
    pub const fn padding(&self) -> u32 {
        pad_len(
            self.header_length as u64 + self.content_length as u64,
            UPDATA_RECORD_ALIGN,
        )
    }

    /// Stored CRC as a number
    pub const fn crc(&self) -> u16 {
        u16::from_le_bytes(self.header_crc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::UPDATA_TAG2_OFFSET;

    fn sample(content_length: u32) -> PartitionHeader {
        PartitionHeader::new(
            fixed_field(b"C8600"),
            0x3000_0000,
            content_length,
            fixed_field(b"2010.10.17"),
            fixed_field(b"11.19.58"),
        )
    }

    #[test]
    fn test_layout_offsets() {
        let bytes = sample(5000).to_bytes();
        assert_eq!(bytes.len(), UPDATA_HEADER_SIZE);
        assert_eq!(&bytes[0..4], &[0x55, 0xAA, 0x5A, 0xA5]);
        assert_eq!(&bytes[4..8], &102u32.to_le_bytes());
        assert_eq!(&bytes[8..12], &[1, 0, 0, 0]);
        assert_eq!(&bytes[12..17], b"C8600");
        assert_eq!(&bytes[20..24], &0x3000_0000u32.to_le_bytes());
        assert_eq!(&bytes[24..28], &5000u32.to_le_bytes());
        assert_eq!(&bytes[60..65], b"INPUT");
        assert_eq!(&bytes[94..98], &[0x00, 0x10, 0x00, 0x00]);
    }

    #[test]
    fn test_crc_over_tag2_does_not_verify() {
        let mut raw: [u8; UPDATA_HEADER_SIZE] = sample(10).to_bytes()[..].try_into().unwrap();
        let mut crc_only = raw;
        crc_only[UPDATA_CRC_OFFSET..UPDATA_TAG2_OFFSET].fill(0);
        raw[UPDATA_CRC_OFFSET..UPDATA_TAG2_OFFSET]
            .copy_from_slice(&crc_ccitt_bytes(&crc_only));

        assert!(matches!(
            verify_header_crc(&raw),
            Err(CodecError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn test_header_length_for() {
        assert_eq!(header_length_for(0), 98);
        assert_eq!(header_length_for(1), 100);
        assert_eq!(header_length_for(4096), 100);
        assert_eq!(header_length_for(4097), 102);
    }

    #[test]
    fn test_parse_round_trip() {
        let header = sample(4096);
        let raw: [u8; UPDATA_HEADER_SIZE] = header.to_bytes()[..].try_into().unwrap();
        verify_header_crc(&raw).unwrap();
        let parsed = PartitionHeader::parse(&raw).unwrap();
        assert_eq!(parsed, header);
        assert!(parsed.table_len_consistent());
        assert_eq!(parsed.table_len(), 2);
    }

    #[test]
    fn test_parse_bad_magic() {
        let mut raw: [u8; UPDATA_HEADER_SIZE] = sample(1).to_bytes()[..].try_into().unwrap();
        raw[0] = 0x00;
        assert!(matches!(
            PartitionHeader::parse(&raw),
            Err(CodecError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_parse_short_header_length() {
        let mut header = sample(1);
        header.header_length = 10;
        let raw: [u8; UPDATA_HEADER_SIZE] = header.to_bytes()[..].try_into().unwrap();
        assert!(matches!(
            PartitionHeader::parse(&raw),
            Err(CodecError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_crc_ignores_crc_and_tag2() {
        let mut raw: [u8; UPDATA_HEADER_SIZE] = sample(10).to_bytes()[..].try_into().unwrap();
        let crc = compute_header_crc(&raw);
        raw[UPDATA_TAG2_OFFSET] ^= 0xFF;
        assert_eq!(compute_header_crc(&raw), crc);
    }

    #[test]
    fn test_single_byte_flip_fails_verification() {
        let raw: [u8; UPDATA_HEADER_SIZE] = sample(10).to_bytes()[..].try_into().unwrap();
        for i in 0..UPDATA_CRC_OFFSET {
            let mut flipped = raw;
            flipped[i] ^= 0x01;
            assert!(
                matches!(
                    verify_header_crc(&flipped),
                    Err(CodecError::ChecksumMismatch { .. })
                ),
                "flip at {} went unnoticed",
                i
            );
        }
    }

    #[test]
    fn test_padding() {
        assert_eq!(sample(4096).padding(), 0);
        assert_eq!(sample(4097).padding(), 1);
        assert_eq!(sample(1).padding(), 3);
    }
}
