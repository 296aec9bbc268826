//! Huawei UPDATA firmware container
//!
//! ```text
//! +-----------------------+
//! | zero preamble (92)    |
//! +-----------------------+
//! | record header (98)    | magic, lengths, board, position, date, time, crc
//! | checksum table        | 2 bytes per 4096-byte payload block
//! | payload               |
//! | padding               | to a multiple of 4
//! +-----------------------+
//! | next record ...       |
//! +-----------------------+
//! ```
//!
//! Every checksum is CRC-CCITT, stored little-endian.

pub mod decoder;
pub mod encoder;
pub mod header;
pub mod manifest;

pub use decoder::{
    decode_updata, decode_updata_from_bytes, MemorySink, NullSink, PartitionRecord,
    PartitionSink, UpdataDecodeOptions, UpdataSummary,
};
pub use encoder::{encode_record, encode_updata, UpdataBuilder, UpdataEncodeOptions};
pub use header::PartitionHeader;
pub use manifest::{position_name, Manifest, ManifestEntry};
