//! Fixed 608-byte boot image header

use crate::constants::{
    SegmentKind, BOOT_ARGS_SIZE, BOOT_HEADER_SIZE, BOOT_ID_SIZE, BOOT_MAGIC, BOOT_NAME_SIZE,
    KERNEL_OFFSET, SHA1_DIGEST_SIZE,
};
use crate::error::CodecError;
use bytes::{Buf, BufMut, BytesMut};
use core::fmt;
use serde::{Deserialize, Serialize};

/// Offset of the id field inside the header
pub const ID_OFFSET: usize = BOOT_HEADER_SIZE - BOOT_ID_SIZE;

/// Operating system version and security patch level.
///
/// Packed as `major[31:25] minor[24:18] patch[17:11] (year-2000)[10:4] month[3:0]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OsVersion {
    /// Major release
    pub major: u8,
    /// Minor release
    pub minor: u8,
    /// Patch release
    pub patch: u8,
    /// Patch level year (2000..=2127)
    pub year: u16,
    /// Patch level month (0..=15)
    pub month: u8,
}

impl OsVersion {
    /// Validate and build a version from its components
    pub fn new(major: u8, minor: u8, patch: u8, year: u16, month: u8) -> Result<Self, CodecError> {
        if major > 0x7F || minor > 0x7F || patch > 0x7F {
            return Err(CodecError::Configuration(format!(
                "os version {}.{}.{} has a component above 127",
                major, minor, patch
            )));
        }
        if !(2000..=2127).contains(&year) || month > 0xF {
            return Err(CodecError::Configuration(format!(
                "os patch level {}-{} out of range",
                year, month
            )));
        }
        Ok(Self {
            major,
            minor,
            patch,
            year,
            month,
        })
    }

    /// Unpack the header field
    pub const fn from_raw(v: u32) -> Self {
        Self {
            major: ((v >> 25) & 0x7F) as u8,
            minor: ((v >> 18) & 0x7F) as u8,
            patch: ((v >> 11) & 0x7F) as u8,
            year: ((v >> 4) & 0x7F) as u16 + 2000,
            month: (v & 0xF) as u8,
        }
    }

    /// Pack into the header field
    pub const fn to_raw(&self) -> u32 {
        ((self.major as u32 & 0x7F) << 25)
            | ((self.minor as u32 & 0x7F) << 18)
            | ((self.patch as u32 & 0x7F) << 11)
            | (((self.year as u32).wrapping_sub(2000) & 0x7F) << 4)
            | (self.month as u32 & 0xF)
    }
}

impl fmt::Display for OsVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{} {}-{}",
            self.major, self.minor, self.patch, self.year, self.month
        )
    }
}

/// Decoded boot image header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootImageHeader {
    /// Kernel size in bytes
    pub kernel_size: u32,
    /// Kernel load address
    pub kernel_addr: u32,
    /// Ramdisk size in bytes
    pub ramdisk_size: u32,
    /// Ramdisk load address
    pub ramdisk_addr: u32,
    /// Second stage size in bytes
    pub second_size: u32,
    /// Second stage load address
    pub second_addr: u32,
    /// Kernel tags address
    pub tags_addr: u32,
    /// Page size recorded in the header
    pub page_size: u32,
    /// Device tree image size in bytes
    pub dt_size: u32,
    /// Packed os version
    pub os_version: u32,
    /// Null-padded product name
    pub name: [u8; BOOT_NAME_SIZE],
    /// Null-padded kernel command line
    pub cmdline: [u8; BOOT_ARGS_SIZE],
    /// Integrity hash (SHA-1, zero extended)
    pub id: [u8; BOOT_ID_SIZE],
}

impl BootImageHeader {
    /// Parse a header, validating the magic
    pub fn parse(buf: &[u8]) -> Result<Self, CodecError> {
        if buf.len() < BOOT_HEADER_SIZE {
            return Err(CodecError::InvalidFormat(format!(
                "boot image header needs {} bytes, got {}",
                BOOT_HEADER_SIZE,
                buf.len()
            )));
        }
        if &buf[..BOOT_MAGIC.len()] != BOOT_MAGIC {
            return Err(CodecError::InvalidFormat(format!(
                "bad boot image magic {:?}",
                String::from_utf8_lossy(&buf[..BOOT_MAGIC.len()])
            )));
        }

        let mut cur = &buf[BOOT_MAGIC.len()..BOOT_HEADER_SIZE];
        let kernel_size = cur.get_u32_le();
        let kernel_addr = cur.get_u32_le();
        let ramdisk_size = cur.get_u32_le();
        let ramdisk_addr = cur.get_u32_le();
        let second_size = cur.get_u32_le();
        let second_addr = cur.get_u32_le();
        let tags_addr = cur.get_u32_le();
        let page_size = cur.get_u32_le();
        let dt_size = cur.get_u32_le();
        let os_version = cur.get_u32_le();

        let mut name = [0u8; BOOT_NAME_SIZE];
        cur.copy_to_slice(&mut name);
        let mut cmdline = [0u8; BOOT_ARGS_SIZE];
        cur.copy_to_slice(&mut cmdline);
        let mut id = [0u8; BOOT_ID_SIZE];
        cur.copy_to_slice(&mut id);

        Ok(Self {
            kernel_size,
            kernel_addr,
            ramdisk_size,
            ramdisk_addr,
            second_size,
            second_addr,
            tags_addr,
            page_size,
            dt_size,
            os_version,
            name,
            cmdline,
            id,
        })
    }

    /// Serialize to the 608-byte on-wire form
    pub fn to_bytes(&self) -> BytesMut {
        let mut buf = BytesMut::with_capacity(BOOT_HEADER_SIZE);
        buf.put_slice(BOOT_MAGIC);
        buf.put_u32_le(self.kernel_size);
        buf.put_u32_le(self.kernel_addr);
        buf.put_u32_le(self.ramdisk_size);
        buf.put_u32_le(self.ramdisk_addr);
        buf.put_u32_le(self.second_size);
        buf.put_u32_le(self.second_addr);
        buf.put_u32_le(self.tags_addr);
        buf.put_u32_le(self.page_size);
        buf.put_u32_le(self.dt_size);
        buf.put_u32_le(self.os_version);
        buf.put_slice(&self.name);
        buf.put_slice(&self.cmdline);
        buf.put_slice(&self.id);
        buf
    }

    /// Size field for a segment
    pub const fn segment_size(&self, kind: SegmentKind) -> u32 {
        match kind {
            SegmentKind::Kernel => self.kernel_size,
            SegmentKind::Ramdisk => self.ramdisk_size,
            SegmentKind::Second => self.second_size,
            SegmentKind::DeviceTree => self.dt_size,
        }
    }

    /// Load base implied by the kernel address
    pub const fn base(&self) -> u32 {
        self.kernel_addr.wrapping_sub(KERNEL_OFFSET)
    }

    /// Unpacked os version
    pub const fn os_version(&self) -> OsVersion {
        OsVersion::from_raw(self.os_version)
    }

    /// Product name without null padding
    pub fn name_str(&self) -> String {
        latin1_string(&self.name)
    }

    /// Command line without null padding
    pub fn cmdline_str(&self) -> String {
        latin1_string(&self.cmdline)
    }

    /// SHA-1 digest part of the id field
    pub fn digest(&self) -> &[u8] {
        &self.id[..SHA1_DIGEST_SIZE]
    }
}

/// Decode a null-padded Latin-1 field, trimming NULs at both ends
pub fn latin1_string(field: &[u8]) -> String {
    field.iter().map(|&b| b as char).collect::<String>().trim_matches('\0').to_string()
}

/// Encode `text` as Latin-1 into a fixed, zero-padded field, truncating
/// anything longer than `N` bytes.
pub fn latin1_field<const N: usize>(text: &str, field: &str) -> Result<[u8; N], CodecError> {
    let mut out = [0u8; N];
    for (slot, ch) in out.iter_mut().zip(text.chars()) {
        *slot = u8::try_from(u32::from(ch)).map_err(|_| {
            CodecError::Configuration(format!("{} contains non Latin-1 character {:?}", field, ch))
        })?;
    }
    Ok(out)
}
