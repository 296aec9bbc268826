//! # Bootimg Core
//!
//! Codecs for two firmware container formats:
//!
//! - the Android boot image (header, kernel, ramdisk, second stage, device tree)
//! - the Huawei UPDATA container (a sequence of checksummed partition records)
//!
//! ## Modules
//!
//! - `constants`: Magic numbers, field sizes and default addresses
//! - `error`: The shared `CodecError`
//! - `checksum`: CRC-CCITT and the boot image id hash
//! - `align`: Padding arithmetic
//! - `bootimg`: Boot image encoding and decoding
//! - `updata`: UPDATA encoding and decoding

#![warn(missing_docs)]

pub mod align;
pub mod bootimg;
pub mod checksum;
pub mod constants;
pub mod error;
pub mod updata;

// Re-export commonly used types
pub use bootimg::{
    decode_bootimg, decode_bootimg_from_bytes, encode_bootimg, BootImageBuilder,
    BootImageConfig, BootImageHeader, BootImageSources, BootMetadata, DecodedBootImage,
    OsVersion, PaddingStrategy,
};
pub use constants::SegmentKind;
pub use error::CodecError;
pub use updata::{
    decode_updata, decode_updata_from_bytes, encode_updata, Manifest, ManifestEntry,
    PartitionSink, UpdataBuilder, UpdataDecodeOptions, UpdataEncodeOptions, UpdataSummary,
};

/// Result type alias for codec operations
pub type Result<T> = core::result::Result<T, CodecError>;
