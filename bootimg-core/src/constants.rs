//! Constants and fixed layouts for the boot image and UPDATA formats

/// Boot image magic, present verbatim at offset 0
pub const BOOT_MAGIC: &[u8; 8] = b"ANDROID!";

/// Size of the fixed boot image header in bytes
/// 8 (magic) + 10 * 4 (sizes, addresses, page size, os version) + 16 (name)
/// + 512 (cmdline) + 32 (id) = 608 bytes
pub const BOOT_HEADER_SIZE: usize = 608;

/// Size of the null-padded product name field
pub const BOOT_NAME_SIZE: usize = 16;

/// Size of the null-padded kernel command line field
pub const BOOT_ARGS_SIZE: usize = 512;

/// Size of the id field holding the integrity hash
pub const BOOT_ID_SIZE: usize = 32;

/// Size of the SHA-1 digest stored at the start of the id field
pub const SHA1_DIGEST_SIZE: usize = 20;

/// Page size used when the caller does not provide one
pub const DEFAULT_PAGE_SIZE: u32 = 0x800;

/// Conventional load base
pub const DEFAULT_BASE: u32 = 0x1000_0000;

/// Kernel load address offset from the base
pub const KERNEL_OFFSET: u32 = 0x0000_8000;

/// Ramdisk load address offset from the base
pub const RAMDISK_OFFSET: u32 = 0x0100_0000;

/// Second stage load address offset from the base
pub const SECOND_OFFSET: u32 = 0x00F0_0000;

/// Kernel tags address offset from the base
pub const TAGS_OFFSET: u32 = 0x0000_0100;

/// Flattened device tree magic, stored big-endian
pub const FDT_MAGIC: [u8; 4] = 0xD00D_FEEDu32.to_be_bytes();

/// First three bytes of a deflate-compressed gzip stream
pub const GZIP_MAGIC: [u8; 3] = [0x1F, 0x8B, 0x08];

/// UPDATA record magic (0x55AA5AA5 read big-endian)
pub const UPDATA_MAGIC: [u8; 4] = [0x55, 0xAA, 0x5A, 0xA5];

/// Fixed marker following the header length
pub const UPDATA_TAG1: [u8; 4] = [0x01, 0x00, 0x00, 0x00];

/// Fixed marker closing the fixed header
pub const UPDATA_TAG2: [u8; 4] = [0x00, 0x10, 0x00, 0x00];

/// Text stored in the input tag field
pub const UPDATA_INPUT_TAG: &[u8] = b"INPUT";

/// Size of the fixed UPDATA record header
/// 4 (magic) + 4 (header length) + 4 (tag1) + 8 (board) + 4 (position)
/// + 4 (content length) + 4 * 16 (date, time, input, reserved) + 2 (crc)
/// + 4 (tag2) = 98 bytes
pub const UPDATA_HEADER_SIZE: usize = 98;

/// Offset of the header CRC inside the fixed header
pub const UPDATA_CRC_OFFSET: usize = 92;

/// Offset of tag2 inside the fixed header
pub const UPDATA_TAG2_OFFSET: usize = 94;

/// Payload block size covered by one checksum table entry
pub const UPDATA_BLOCK_SIZE: usize = 4096;

/// Records are padded to this boundary
pub const UPDATA_RECORD_ALIGN: u32 = 4;

/// Zero bytes written ahead of the first record
pub const UPDATA_PREAMBLE_LEN: usize = 92;

/// Width of the board name field
pub const UPDATA_BOARD_SIZE: usize = 8;

/// Width of the date, time, input and reserved text fields
pub const UPDATA_TEXT_SIZE: usize = 16;

/// Fixed boot image segment kinds in on-disk order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SegmentKind {
    /// Kernel image
    Kernel,
    /// Initial ramdisk
    Ramdisk,
    /// Second stage loader
    Second,
    /// Device tree image
    DeviceTree,
}

impl SegmentKind {
    /// All segments in the order they are stored and hashed
    pub const ALL: [SegmentKind; 4] = [
        SegmentKind::Kernel,
        SegmentKind::Ramdisk,
        SegmentKind::Second,
        SegmentKind::DeviceTree,
    ];

    /// Base file name used when the segment is extracted
    pub const fn file_stem(&self) -> &'static str {
        match self {
            SegmentKind::Kernel => "kernel",
            SegmentKind::Ramdisk => "ramdisk",
            SegmentKind::Second => "second",
            SegmentKind::DeviceTree => "dt.img",
        }
    }

    /// Whether gzip detection applies to this segment's file name
    pub const fn gzip_named(&self) -> bool {
        !matches!(self, SegmentKind::DeviceTree)
    }
}
