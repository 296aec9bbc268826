//! Android boot image container
//!
//! ```text
//! +-----------------+
//! | header (608)    | padded to max(page_size, padding_size)
//! +-----------------+
//! | kernel          | padded to padding_size
//! | ramdisk         | padded to padding_size
//! | second          | padded to padding_size
//! | device tree     | padded to padding_size
//! +-----------------+
//! | trailer         | anything else, kept verbatim
//! +-----------------+
//! ```
//!
//! The header's id field holds the SHA-1 of every segment followed by its
//! little-endian length, zero extended to 32 bytes.

pub mod decoder;
pub mod encoder;
pub mod header;

pub use decoder::{
    decode_bootimg, decode_bootimg_from_bytes, BootMetadata, DecodedBootImage, PaddingStrategy,
};
pub use encoder::{encode_bootimg, BootImageBuilder, BootImageConfig, BootImageSources};
pub use header::{BootImageHeader, OsVersion};
