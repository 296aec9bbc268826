//! UPDATA container decoding

use crate::align::skip_padding;
use crate::checksum::{crc_ccitt, finalize, verify_block};
use crate::constants::{
    UPDATA_BOARD_SIZE, UPDATA_BLOCK_SIZE, UPDATA_HEADER_SIZE, UPDATA_RECORD_ALIGN,
    UPDATA_TEXT_SIZE,
};
use crate::error::CodecError;
use crate::updata::header::{verify_header_crc, PartitionHeader};
use crate::updata::manifest::{position_name, Manifest, ManifestEntry};
use bytes::Bytes;
use std::io::{self, Cursor, Read, Seek, SeekFrom};

#[cfg(feature = "logging")]
use tracing::{debug, info, warn};

/// Decoder switches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdataDecodeOptions {
    /// Check every payload block against its checksum table entry
    pub verify_blocks: bool,
}

impl UpdataDecodeOptions {
    /// Options with block verification enabled
    pub fn verifying() -> Self {
        Self {
            verify_blocks: true,
        }
    }
}

/// One record as found in the container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionRecord {
    /// Parsed fixed header
    pub header: PartitionHeader,
    /// Output name derived from the position
    pub name: String,
    /// Raw checksum table, two little-endian bytes per block
    pub checksums: Bytes,
    /// Offset of the record header from the start of the container
    pub offset: u64,
}

impl PartitionRecord {
    /// Checksum table entries
    pub fn checksum_entries(&self) -> Vec<u16> {
        self.checksums
            .chunks_exact(2)
            .map(|c| u16::from_le_bytes([c[0], c[1]]))
            .collect()
    }

    /// Manifest line for this record
    pub fn manifest_entry(&self) -> ManifestEntry {
        ManifestEntry {
            name: self.name.clone(),
            position: self.header.position,
        }
    }

    fn stored_checksum(&self, block: usize) -> Option<[u8; 2]> {
        let at = block * 2;
        self.checksums.get(at..at + 2).map(|c| [c[0], c[1]])
    }
}

/// Destination for extracted payloads
pub trait PartitionSink {
    /// A record's payload is about to be streamed
    fn begin(&mut self, record: &PartitionRecord) -> io::Result<()>;

    /// Next payload chunk, at most 4096 bytes
    fn write_chunk(&mut self, chunk: &[u8]) -> io::Result<()>;

    /// The current record's payload is complete
    fn finish(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Sink that keeps every payload in memory, in container order
#[derive(Debug, Default)]
pub struct MemorySink {
    /// Completed payloads
    pub payloads: Vec<Bytes>,
    current: Vec<u8>,
}

impl PartitionSink for MemorySink {
    fn begin(&mut self, record: &PartitionRecord) -> io::Result<()> {
        self.current = Vec::with_capacity(record.header.content_length as usize);
        Ok(())
    }

    fn write_chunk(&mut self, chunk: &[u8]) -> io::Result<()> {
        self.current.extend_from_slice(chunk);
        Ok(())
    }

    fn finish(&mut self) -> io::Result<()> {
        self.payloads.push(Bytes::from(std::mem::take(&mut self.current)));
        Ok(())
    }
}

/// Sink that discards payloads, for verification only
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl PartitionSink for NullSink {
    fn begin(&mut self, _record: &PartitionRecord) -> io::Result<()> {
        Ok(())
    }

    fn write_chunk(&mut self, _chunk: &[u8]) -> io::Result<()> {
        Ok(())
    }
}

/// Result of decoding a container
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdataSummary {
    /// Records in container order
    pub records: Vec<PartitionRecord>,
    /// Name and position of each record, in container order
    pub manifest: Manifest,
}

impl UpdataSummary {
    fn last_header(&self) -> Option<&PartitionHeader> {
        self.records.last().map(|r| &r.header)
    }

    /// Board name of the last record
    pub fn board_name(&self) -> Option<[u8; UPDATA_BOARD_SIZE]> {
        self.last_header().map(|h| h.board_name)
    }

    /// Date text of the last record
    pub fn date(&self) -> Option<[u8; UPDATA_TEXT_SIZE]> {
        self.last_header().map(|h| h.date)
    }

    /// Time text of the last record
    pub fn time(&self) -> Option<[u8; UPDATA_TEXT_SIZE]> {
        self.last_header().map(|h| h.time)
    }
}

/// Read up to `buf.len()` bytes, stopping early only at end of input
fn read_up_to<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Decode every record from the reader's position to end of input.
///
/// All-zero 4-byte words between records are skipped. Each header's CRC is
/// always checked; payload blocks are checked only when
/// `options.verify_blocks` is set.
pub fn decode_updata<R, S>(
    reader: &mut R,
    options: UpdataDecodeOptions,
    sink: &mut S,
) -> Result<UpdataSummary, CodecError>
where
    R: Read + Seek,
    S: PartitionSink + ?Sized,
{
    let origin = reader.stream_position()?;
    let end = reader.seek(SeekFrom::End(0))?;
    reader.seek(SeekFrom::Start(origin))?;

    let mut summary = UpdataSummary::default();
    let mut raw = [0u8; UPDATA_HEADER_SIZE];
    let mut block = vec![0u8; UPDATA_BLOCK_SIZE];

    loop {
        let offset = reader.stream_position()? - origin;
        let n = read_up_to(reader, &mut raw[..4])?;
        if n == 0 {
            break;
        }
        if n < 4 {
            return Err(CodecError::InvalidFormat(format!(
                "{} stray bytes at end of container",
                n
            )));
        }
        if raw[..4] == [0u8; 4] {
            continue;
        }

        reader
            .read_exact(&mut raw[4..])
            .map_err(|e| CodecError::truncated("record header", e))?;
        let header = PartitionHeader::parse(&raw)?;
        verify_header_crc(&raw)?;

        let table_len = header.table_len();
        let pos = reader.stream_position()?;
        if pos + table_len as u64 + header.content_length as u64 > end {
            return Err(CodecError::InvalidFormat(format!(
                "record at {:#x} runs past end of container",
                offset
            )));
        }

        if !header.table_len_consistent() {
            if options.verify_blocks {
                return Err(CodecError::InvalidFormat(format!(
                    "record at {:#x}: {} checksum bytes for {} payload bytes",
                    offset, table_len, header.content_length
                )));
            }
            #[cfg(feature = "logging")]
            warn!(
                "Record at {:#x}: checksum table of {} bytes does not match payload of {} bytes",
                offset, table_len, header.content_length
            );
        }

        let mut checksums = vec![0u8; table_len];
        reader
            .read_exact(&mut checksums)
            .map_err(|e| CodecError::truncated("checksum table", e))?;

        let record = PartitionRecord {
            name: position_name(header.position),
            header,
            checksums: Bytes::from(checksums),
            offset,
        };

        #[cfg(feature = "logging")]
        info!("{}\t{:#x}", record.name, record.header.position);

        sink.begin(&record)?;
        let mut remaining = record.header.content_length as usize;
        let mut index = 0;
        while remaining > 0 {
            let size = remaining.min(UPDATA_BLOCK_SIZE);
            let chunk = &mut block[..size];
            reader
                .read_exact(chunk)
                .map_err(|e| CodecError::truncated("payload", e))?;

            if options.verify_blocks {
                let stored = record.stored_checksum(index).ok_or_else(|| {
                    CodecError::InvalidFormat(format!("{}: no checksum for block {}", record.name, index))
                })?;
                if verify_block(chunk, stored).is_err() {
                    return Err(CodecError::ChecksumMismatch {
                        location: format!("{} block {}", record.name, index),
                        expected: u16::from_le_bytes(stored),
                        actual: finalize(crc_ccitt(chunk)),
                    });
                }
            }

            sink.write_chunk(chunk)?;
            remaining -= size;
            index += 1;
        }
        sink.finish()?;

        skip_padding(
            reader,
            record.header.header_length as u64 + record.header.content_length as u64,
            UPDATA_RECORD_ALIGN,
        )?;

        #[cfg(feature = "logging")]
        debug!(
            "Decoded {} ({} bytes, {} blocks)",
            record.name,
            record.header.content_length,
            index
        );

        summary.manifest.push(record.manifest_entry());
        summary.records.push(record);
    }

    Ok(summary)
}

/// Decode a container held in memory, returning the payloads alongside
pub fn decode_updata_from_bytes(
    data: &[u8],
    options: UpdataDecodeOptions,
) -> Result<(UpdataSummary, Vec<Bytes>), CodecError> {
    let mut sink = MemorySink::default();
    let summary = decode_updata(&mut Cursor::new(data), options, &mut sink)?;
    Ok((summary, sink.payloads))
}
