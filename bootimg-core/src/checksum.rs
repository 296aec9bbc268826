//! CRC-CCITT checksums and the boot image id hash

use crate::constants::{BOOT_ID_SIZE, SHA1_DIGEST_SIZE, UPDATA_BLOCK_SIZE};
use sha1::{Digest, Sha1};

/// Reflected CCITT polynomial
pub const CRC_CCITT_POLY: u16 = 0x8408;

/// Initial register value
pub const CRC_CCITT_INIT: u16 = 0xFFFF;

/// Value XORed into the register to produce the stored checksum
pub const CRC_CCITT_XOROUT: u16 = 0xFFFF;

/// Register value left after running the CRC over data followed by its own
/// little-endian finalized checksum
pub const CRC_CCITT_RESIDUE: u16 = 0xF0B8;

/// Build the byte-indexed lookup table for [`CRC_CCITT_POLY`]
pub const fn build_table() -> [u16; 256] {
    let mut table = [0u16; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = i as u16;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 1 != 0 {
                (crc >> 1) ^ CRC_CCITT_POLY
            } else {
                crc >> 1
            };
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

/// Lookup table, computed at compile time
pub static CRC_CCITT_TABLE: [u16; 256] = build_table();

/// Run the CRC over `data` starting from `seed`.
///
/// Returns the raw register; use [`finalize`] to get the stored form.
pub fn crc_ccitt_update(seed: u16, data: &[u8]) -> u16 {
    data.iter().fold(seed, |crc, &byte| {
        (crc >> 8) ^ CRC_CCITT_TABLE[((crc as u8) ^ byte) as usize]
    })
}

/// Raw CRC of `data` from the standard initial value
pub fn crc_ccitt(data: &[u8]) -> u16 {
    crc_ccitt_update(CRC_CCITT_INIT, data)
}

/// Invert a raw register into the checksum value
pub const fn finalize(crc: u16) -> u16 {
    crc ^ CRC_CCITT_XOROUT
}

/// Finalized checksum of `data` in its little-endian on-disk form
pub fn crc_ccitt_bytes(data: &[u8]) -> [u8; 2] {
    finalize(crc_ccitt(data)).to_le_bytes()
}

/// Incremental CRC-CCITT state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrcCcitt(u16);

impl CrcCcitt {
    /// Start from [`CRC_CCITT_INIT`]
    pub const fn new() -> Self {
        Self(CRC_CCITT_INIT)
    }

    /// Feed more bytes
    pub fn update(&mut self, data: &[u8]) {
        self.0 = crc_ccitt_update(self.0, data);
    }

    /// Current raw register
    pub const fn raw(&self) -> u16 {
        self.0
    }

    /// Finalized checksum
    pub const fn value(&self) -> u16 {
        finalize(self.0)
    }
}

impl Default for CrcCcitt {
    fn default() -> Self {
        Self::new()
    }
}

/// Check one payload block against its two stored checksum bytes.
///
/// Appending the stored checksum to the block and running the CRC must land
/// on [`CRC_CCITT_RESIDUE`]. Returns the register actually reached.
pub fn verify_block(block: &[u8], stored: [u8; 2]) -> Result<(), u16> {
    let crc = crc_ccitt_update(crc_ccitt(block), &stored);
    if crc == CRC_CCITT_RESIDUE {
        Ok(())
    } else {
        Err(crc)
    }
}

/// Checksum table for a payload: one little-endian entry per 4096-byte block
pub fn block_checksums(payload: &[u8]) -> Vec<u8> {
    payload
        .chunks(UPDATA_BLOCK_SIZE)
        .flat_map(crc_ccitt_bytes)
        .collect()
}

/// Running SHA-1 over boot image segments.
///
/// Each segment contributes its raw bytes followed by its little-endian
/// 32-bit length; an absent segment contributes only the zero length.
/// `finalize` consumes the hasher so one instance serves one image.
#[derive(Clone, Default)]
pub struct IdHasher {
    inner: Sha1,
}

impl IdHasher {
    /// Fresh accumulator
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed segment content
    pub fn update(&mut self, data: &[u8]) {
        self.inner.update(data);
    }

    /// Close a segment by hashing its length
    pub fn finish_segment(&mut self, len: u32) {
        self.inner.update(len.to_le_bytes());
    }

    /// Hash an entire segment at once
    pub fn segment(&mut self, data: Option<&[u8]>) {
        match data {
            Some(bytes) => {
                self.update(bytes);
                self.finish_segment(bytes.len() as u32);
            }
            None => self.finish_segment(0),
        }
    }

    /// 20-byte digest
    pub fn finalize(self) -> [u8; SHA1_DIGEST_SIZE] {
        self.inner.finalize().into()
    }

    /// Digest zero-extended to the header's 32-byte id field
    pub fn finalize_id(self) -> [u8; BOOT_ID_SIZE] {
        let mut id = [0u8; BOOT_ID_SIZE];
        id[..SHA1_DIGEST_SIZE].copy_from_slice(&self.finalize());
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_entries() {
        assert_eq!(CRC_CCITT_TABLE[0], 0x0000);
        assert_eq!(CRC_CCITT_TABLE[1], 0x1189);
        assert_eq!(CRC_CCITT_TABLE[128], 0x8408);
        assert_eq!(CRC_CCITT_TABLE[255], 0x0F78);
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(crc_ccitt(&[]), 0xFFFF);
        assert_eq!(finalize(crc_ccitt(&[])), 0x0000);
    }

    #[test]
    fn test_check_value() {
        assert_eq!(finalize(crc_ccitt(b"123456789")), 0x906E);
        assert_eq!(crc_ccitt_bytes(b"123456789"), [0x6E, 0x90]);
    }

    #[test]
    fn test_incremental_matches_one_shot() {
        let data: Vec<u8> = (0..10_000u32).map(|i| (i * 7) as u8).collect();
        let mut crc = CrcCcitt::new();
        for chunk in data.chunks(333) {
            crc.update(chunk);
        }
        assert_eq!(crc.raw(), crc_ccitt(&data));
    }

    #[test]
    fn test_block_residue() {
        let block = vec![0xA5u8; 1234];
        assert!(verify_block(&block, crc_ccitt_bytes(&block)).is_ok());
        assert!(verify_block(&block, [0, 0]).is_err());
    }

    #[test]
    fn test_block_checksums_length() {
        assert!(block_checksums(&[]).is_empty());
        assert_eq!(block_checksums(&[0u8; 4096]).len(), 2);
        assert_eq!(block_checksums(&[0u8; 4097]).len(), 4);
    }

    #[test]
    fn test_id_hash_absent_equals_empty() {
        let mut absent = IdHasher::new();
        absent.segment(None);
        let mut empty = IdHasher::new();
        empty.segment(Some(&[]));
        assert_eq!(absent.finalize(), empty.finalize());
    }

    #[test]
    fn test_id_field_is_zero_extended() {
        let id = IdHasher::new().finalize_id();
        // SHA-1 of the empty string
        assert_eq!(id[..4], [0xDA, 0x39, 0xA3, 0xEE]);
        assert_eq!(id[SHA1_DIGEST_SIZE..], [0u8; 12]);
    }
}
