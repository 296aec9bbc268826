//! UPDATA container encoding

use crate::align::write_padding;
use crate::checksum::crc_ccitt_bytes;
use crate::constants::{
    UPDATA_BLOCK_SIZE, UPDATA_BOARD_SIZE, UPDATA_PREAMBLE_LEN, UPDATA_RECORD_ALIGN,
    UPDATA_TEXT_SIZE,
};
use crate::error::CodecError;
use crate::updata::header::{fixed_field, PartitionHeader};
use crate::updata::manifest::{Manifest, ManifestEntry};
use bytes::Bytes;
use std::io::{self, Cursor, Read, Seek, SeekFrom, Write};

#[cfg(feature = "logging")]
use tracing::{debug, info};

/// Values shared by every record of a container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdataEncodeOptions {
    /// Board identifier
    pub board_name: [u8; UPDATA_BOARD_SIZE],
    /// Date text; the current local date when unset
    pub date: Option<[u8; UPDATA_TEXT_SIZE]>,
    /// Time text; the current local time when unset
    pub time: Option<[u8; UPDATA_TEXT_SIZE]>,
    /// Zero bytes written before the first record (a multiple of 4)
    pub preamble_len: usize,
}

impl UpdataEncodeOptions {
    /// Options for a board, stamped at encode time
    pub fn new(board_name: &[u8]) -> Self {
        Self {
            board_name: fixed_field(board_name),
            date: None,
            time: None,
            preamble_len: UPDATA_PREAMBLE_LEN,
        }
    }

    /// Use fixed date and time text
    pub fn with_timestamp(mut self, date: &[u8], time: &[u8]) -> Self {
        self.date = Some(fixed_field(date));
        self.time = Some(fixed_field(time));
        self
    }

    /// Set the preamble length
    pub fn with_preamble(mut self, len: usize) -> Self {
        self.preamble_len = len;
        self
    }

    /// Date and time fields, filling unset ones from the local clock
    pub fn timestamp(&self) -> ([u8; UPDATA_TEXT_SIZE], [u8; UPDATA_TEXT_SIZE]) {
        let now = chrono::Local::now();
        let date = self
            .date
            .unwrap_or_else(|| fixed_field(now.format("%Y.%m.%d").to_string().as_bytes()));
        let time = self
            .time
            .unwrap_or_else(|| fixed_field(now.format("%H.%M.%S").to_string().as_bytes()));
        (date, time)
    }
}

impl Default for UpdataEncodeOptions {
    fn default() -> Self {
        Self::new(&[])
    }
}

/// Read a source in 4096-byte blocks, building the checksum table.
///
/// Returns the table and the payload length.
fn checksum_table<R: Read>(source: &mut R) -> Result<(Vec<u8>, u64), CodecError> {
    let mut table = Vec::new();
    let mut block = vec![0u8; UPDATA_BLOCK_SIZE];
    let mut total = 0u64;
    loop {
        let mut filled = 0;
        while filled < block.len() {
            match source.read(&mut block[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        if filled == 0 {
            break;
        }
        table.extend_from_slice(&crc_ccitt_bytes(&block[..filled]));
        total += filled as u64;
        if filled < block.len() {
            break;
        }
    }
    Ok((table, total))
}

/// Write one record: header, checksum table, payload, padding.
///
/// Returns the bytes written.
pub fn encode_record<W: Write, R: Read + Seek>(
    out: &mut W,
    entry: &ManifestEntry,
    source: &mut R,
    board_name: [u8; UPDATA_BOARD_SIZE],
    date: [u8; UPDATA_TEXT_SIZE],
    time: [u8; UPDATA_TEXT_SIZE],
) -> Result<u64, CodecError> {
    source.seek(SeekFrom::Start(0))?;
    let (table, len) = checksum_table(source)?;
    let content_length = u32::try_from(len).map_err(|_| {
        CodecError::Configuration(format!("{} is too large ({} bytes)", entry.name, len))
    })?;

    let header = PartitionHeader::new(board_name, entry.position, content_length, date, time);
    debug_assert_eq!(header.table_len(), table.len());

    out.write_all(&header.to_bytes())?;
    out.write_all(&table)?;

    source.seek(SeekFrom::Start(0))?;
    let copied = io::copy(&mut source.take(len), out)?;
    if copied != len {
        return Err(CodecError::Configuration(format!(
            "{} changed size while encoding: measured {}, read {}",
            entry.name, len, copied
        )));
    }

    let record_len = header.header_length as u64 + len;
    let pad = write_padding(out, record_len, UPDATA_RECORD_ALIGN)?;

    #[cfg(feature = "logging")]
    debug!(
        "Encoded {} at {:#x}: {} bytes, {} blocks, crc {:#06x}",
        entry.name,
        entry.position,
        len,
        table.len() / 2,
        header.crc()
    );

    Ok(record_len + pad as u64)
}

/// Encode every manifest entry, in order, into `out`.
///
/// `open` supplies the payload for each entry; it is read twice (once for
/// the checksum table, once for the copy), so it must be seekable.
/// Returns the total bytes written.
pub fn encode_updata<W, F, R>(
    out: &mut W,
    manifest: &Manifest,
    options: &UpdataEncodeOptions,
    mut open: F,
) -> Result<u64, CodecError>
where
    W: Write,
    F: FnMut(&ManifestEntry) -> io::Result<R>,
    R: Read + Seek,
{
    if options.preamble_len % UPDATA_RECORD_ALIGN as usize != 0 {
        return Err(CodecError::Configuration(format!(
            "preamble of {} bytes breaks record alignment",
            options.preamble_len
        )));
    }

    let (date, time) = options.timestamp();

    out.write_all(&vec![0u8; options.preamble_len])?;
    let mut total = options.preamble_len as u64;

    for entry in manifest.iter() {
        let mut source = open(entry)?;
        total += encode_record(out, entry, &mut source, options.board_name, date, time)?;

        #[cfg(feature = "logging")]
        info!("{}", entry);
    }

    Ok(total)
}

/// Builder for in-memory UPDATA containers
#[derive(Debug, Clone, Default)]
pub struct UpdataBuilder {
    options: UpdataEncodeOptions,
    partitions: Vec<(ManifestEntry, Bytes)>,
}

impl UpdataBuilder {
    /// Start with default options
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from explicit options
    pub fn with_options(options: UpdataEncodeOptions) -> Self {
        Self {
            options,
            partitions: Vec::new(),
        }
    }

    /// Append a partition named after its position
    pub fn partition(self, position: u32, payload: Bytes) -> Self {
        self.named_partition(ManifestEntry::for_position(position), payload)
    }

    /// Append a partition with an explicit manifest entry
    pub fn named_partition(mut self, entry: ManifestEntry, payload: Bytes) -> Self {
        self.partitions.push((entry, payload));
        self
    }

    /// Manifest of the partitions added so far
    pub fn manifest(&self) -> Manifest {
        self.partitions.iter().map(|(e, _)| e.clone()).collect()
    }

    /// Encode into a fresh buffer
    pub fn build(self) -> Result<Bytes, CodecError> {
        let manifest = self.manifest();
        let mut payloads = self.partitions.into_iter().map(|(_, p)| p);
        let mut out = Vec::<u8>::new();
        encode_updata(&mut out, &manifest, &self.options, |entry| {
            payloads
                .next()
                .map(Cursor::new)
                .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, entry.name.clone()))
        })?;
        Ok(Bytes::from(out))
    }
}
