//! Boot image decoding

use crate::align::{align_up, check_alignment, skip_padding};
use crate::bootimg::encoder::BootImageConfig;
use crate::bootimg::header::BootImageHeader;
use crate::checksum::IdHasher;
use crate::constants::{SegmentKind, BOOT_HEADER_SIZE, BOOT_ID_SIZE, FDT_MAGIC, GZIP_MAGIC};
use crate::error::CodecError;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::io::{Cursor, Read, Seek, SeekFrom};

#[cfg(feature = "logging")]
use tracing::{debug, info, warn};

/// Largest page size accepted from a header
pub const MAX_PAGE_SIZE: u32 = 1 << 20;

/// How the decoder decides where segments start and how they are padded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PaddingStrategy {
    /// Try power-of-two units from the first non-zero page after the header
    /// down to one byte, keeping the first whose layout fits the input,
    /// reproduces the stored id and ends on a padding boundary. Some
    /// producers pad with a unit other than the page size they record, and
    /// this recovers it. Without a confirmed unit the best partial match is
    /// used and a warning is logged.
    #[default]
    Detect,
    /// Use the offset of the first non-zero page after the header as the
    /// unit, and fail unless it is a power of two whose layout fits the
    /// input and reproduces the stored id
    Strict,
    /// Trust the header's page size
    PageSize,
    /// Use a known padding unit
    Fixed(u32),
}

/// Header values worth persisting next to the extracted segments.
///
/// Serializes to the `bootimg.json` sidecar and converts back into a
/// [`BootImageConfig`] for repacking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BootMetadata {
    /// Kernel load address
    pub kernel_addr: u32,
    /// Ramdisk load address
    pub ramdisk_addr: u32,
    /// Second stage load address
    pub second_addr: u32,
    /// Kernel tags address
    pub tags_addr: u32,
    /// Page size recorded in the header
    pub page_size: u32,
    /// Product name
    pub name: String,
    /// Kernel command line
    pub cmdline: String,
    /// Padding unit used between segments
    pub padding_size: u32,
    /// Packed os version
    pub os_version: u32,
    /// Human readable os version, informational only
    #[serde(default)]
    pub os_version_text: String,
}

impl BootMetadata {
    /// Collect metadata from a parsed header
    pub fn from_header(header: &BootImageHeader, padding_size: u32) -> Self {
        Self {
            kernel_addr: header.kernel_addr,
            ramdisk_addr: header.ramdisk_addr,
            second_addr: header.second_addr,
            tags_addr: header.tags_addr,
            page_size: header.page_size,
            name: header.name_str(),
            cmdline: header.cmdline_str(),
            padding_size,
            os_version: header.os_version,
            os_version_text: header.os_version().to_string(),
        }
    }
}

impl From<&BootMetadata> for BootImageConfig {
    fn from(meta: &BootMetadata) -> Self {
        BootImageConfig {
            name: meta.name.clone(),
            cmdline: meta.cmdline.clone(),
            kernel_addr: meta.kernel_addr,
            ramdisk_addr: meta.ramdisk_addr,
            second_addr: meta.second_addr,
            tags_addr: meta.tags_addr,
            page_size: meta.page_size,
            padding_size: meta.padding_size,
            os_version: meta.os_version,
        }
    }
}

/// Everything extracted from a boot image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedBootImage {
    /// Raw header
    pub header: BootImageHeader,
    /// Persistable header values
    pub metadata: BootMetadata,
    /// Kernel, without any appended device tree
    pub kernel: Option<Bytes>,
    /// Device tree blob found appended to the kernel
    pub kernel_dt: Option<Bytes>,
    /// Ramdisk
    pub ramdisk: Option<Bytes>,
    /// Second stage loader
    pub second: Option<Bytes>,
    /// Device tree image
    pub dt: Option<Bytes>,
    /// Bytes after the last declared segment
    pub trailer: Option<Bytes>,
}

impl DecodedBootImage {
    /// Kernel segment as stored, with any appended device tree rejoined
    pub fn kernel_image(&self) -> Option<Bytes> {
        match (&self.kernel, &self.kernel_dt) {
            (Some(kernel), Some(dt)) => {
                let mut joined = Vec::with_capacity(kernel.len() + dt.len());
                joined.extend_from_slice(kernel);
                joined.extend_from_slice(dt);
                Some(Bytes::from(joined))
            }
            (kernel, _) => kernel.clone(),
        }
    }

    /// Segment contents as stored in the image
    pub fn segment(&self, kind: SegmentKind) -> Option<Bytes> {
        match kind {
            SegmentKind::Kernel => self.kernel_image(),
            SegmentKind::Ramdisk => self.ramdisk.clone(),
            SegmentKind::Second => self.second.clone(),
            SegmentKind::DeviceTree => self.dt.clone(),
        }
    }

    /// Recompute the id field from the extracted segments
    pub fn compute_id(&self) -> [u8; BOOT_ID_SIZE] {
        let mut hasher = IdHasher::new();
        for kind in SegmentKind::ALL {
            hasher.segment(self.segment(kind).as_deref());
        }
        hasher.finalize_id()
    }

    /// Whether the stored id matches the segments
    pub fn id_matches(&self) -> bool {
        self.compute_id() == self.header.id
    }

    /// File name and contents for every extracted output
    pub fn outputs(&self) -> Vec<(String, Bytes)> {
        let mut outputs = Vec::new();
        if let Some(kernel) = &self.kernel {
            let name = output_name(SegmentKind::Kernel, kernel);
            if let Some(dt) = &self.kernel_dt {
                outputs.push((format!("{}.dt", name), dt.clone()));
            }
            outputs.push((name, kernel.clone()));
        }
        for (kind, data) in [
            (SegmentKind::Ramdisk, &self.ramdisk),
            (SegmentKind::Second, &self.second),
            (SegmentKind::DeviceTree, &self.dt),
        ] {
            if let Some(data) = data {
                outputs.push((output_name(kind, data), data.clone()));
            }
        }
        if let Some(trailer) = &self.trailer {
            outputs.push((TRAILER_NAME.to_string(), trailer.clone()));
        }
        outputs
    }
}

/// File name used for bytes past the last segment
pub const TRAILER_NAME: &str = "unknown";

/// Whether a payload starts with a gzip header
pub fn is_gzip(data: &[u8]) -> bool {
    data.starts_with(&GZIP_MAGIC)
}

/// Output file name for a segment, with `.gz` when the payload is gzip
pub fn output_name(kind: SegmentKind, data: &[u8]) -> String {
    if kind.gzip_named() && is_gzip(data) {
        format!("{}.gz", kind.file_stem())
    } else {
        kind.file_stem().to_string()
    }
}

/// Split a device tree blob appended to a kernel.
///
/// The blob starts at the first FDT magic found past offset 0; a kernel
/// without one (or one that starts with it) is returned whole.
pub fn split_appended_dtb(kernel: Bytes) -> (Bytes, Option<Bytes>) {
    match memchr::memmem::find(&kernel, &FDT_MAGIC) {
        Some(pos) if pos > 0 => {
            let dt = kernel.slice(pos..);
            (kernel.slice(..pos), Some(dt))
        }
        _ => (kernel, None),
    }
}

/// Fill `buf` as far as the stream allows, returning the bytes read
fn read_up_to<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<usize, CodecError> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(filled)
}

/// Offset (from `origin`) of the first page at or after the reader's
/// position that is not entirely zero. A short page at end of input counts
/// as not zero. The reader is left at that offset.
pub fn detect_padding<R: Read + Seek>(
    reader: &mut R,
    origin: u64,
    page_size: u32,
) -> Result<u64, CodecError> {
    let mut page = vec![0u8; page_size as usize];
    loop {
        let start = reader.stream_position()?;
        let n = read_up_to(reader, &mut page)?;
        if n == page.len() && page.iter().all(|&b| b == 0) {
            continue;
        }
        reader.seek(SeekFrom::Start(start))?;
        return Ok(start - origin);
    }
}

/// Read one declared segment, checking it fits in the input.
fn read_segment<R: Read + Seek>(
    reader: &mut R,
    kind: SegmentKind,
    size: u32,
    end: u64,
) -> Result<Option<Bytes>, CodecError> {
    if size == 0 {
        return Ok(None);
    }
    let pos = reader.stream_position()?;
    if pos.saturating_add(size as u64) > end {
        return Err(CodecError::InvalidFormat(format!(
            "{} of {} bytes at offset {} runs past end of image ({} bytes)",
            kind.file_stem(),
            size,
            pos,
            end
        )));
    }
    let mut data = vec![0u8; size as usize];
    reader
        .read_exact(&mut data)
        .map_err(|e| CodecError::truncated(kind.file_stem(), e))?;
    Ok(Some(Bytes::from(data)))
}

/// Segments as stored, before any appended device tree is split off
struct RawSegments {
    kernel: Option<Bytes>,
    ramdisk: Option<Bytes>,
    second: Option<Bytes>,
    dt: Option<Bytes>,
    trailer: Option<Bytes>,
}

impl RawSegments {
    fn id(&self) -> [u8; BOOT_ID_SIZE] {
        let mut hasher = IdHasher::new();
        for segment in [&self.kernel, &self.ramdisk, &self.second, &self.dt] {
            hasher.segment(segment.as_deref());
        }
        hasher.finalize_id()
    }
}

/// Segment sizes in image order
fn segment_sizes(header: &BootImageHeader) -> [u32; 4] {
    [
        header.kernel_size,
        header.ramdisk_size,
        header.second_size,
        header.dt_size,
    ]
}

/// Where the kernel starts for a padding unit. The header region covers
/// both the page and the unit.
fn kernel_offset(page_size: u32, unit: u32) -> u64 {
    align_up(page_size as u64, unit)
}

/// End of the last segment's data and end of its padding, relative to the
/// image start, for segments laid out from `kernel_at` with `unit` padding.
fn layout_span(header: &BootImageHeader, kernel_at: u64, unit: u32) -> (u64, u64) {
    let mut pos = kernel_at;
    let mut data_end = kernel_at;
    for size in segment_sizes(header) {
        if size > 0 {
            pos += size as u64;
            data_end = pos;
            pos = align_up(pos, unit);
        }
    }
    (data_end, pos)
}

/// Read every declared segment and the trailer
fn read_layout<R: Read + Seek>(
    reader: &mut R,
    origin: u64,
    end: u64,
    header: &BootImageHeader,
    kernel_at: u64,
    unit: u32,
) -> Result<RawSegments, CodecError> {
    reader.seek(SeekFrom::Start(origin + kernel_at))?;

    let mut segments = [None, None, None, None];
    for (slot, (kind, size)) in segments
        .iter_mut()
        .zip(SegmentKind::ALL.into_iter().zip(segment_sizes(header)))
    {
        *slot = read_segment(reader, kind, size, end)?;
        skip_padding(reader, size as u64, unit)?;
    }
    let [kernel, ramdisk, second, dt] = segments;

    let mut rest = Vec::new();
    reader.read_to_end(&mut rest)?;
    let trailer = (!rest.is_empty()).then(|| Bytes::from(rest));

    Ok(RawSegments {
        kernel,
        ramdisk,
        second,
        dt,
        trailer,
    })
}

/// Power-of-two units to try, largest first: from the biggest one not past
/// the first data page down to a single byte.
pub fn candidate_units(first_data: u64, page_size: u32) -> Vec<u32> {
    let top = u32::try_from(first_data).unwrap_or(u32::MAX).max(page_size);
    let top = 1u32 << (u32::BITS - 1 - top.leading_zeros());
    (0..=top.trailing_zeros()).rev().map(|shift| 1u32 << shift).collect()
}

/// Pick the padding unit by scanning and confirming each candidate layout
fn detect_layout<R: Read + Seek>(
    reader: &mut R,
    origin: u64,
    end: u64,
    header: &BootImageHeader,
    page_size: u32,
) -> Result<(u32, RawSegments), CodecError> {
    reader.seek(SeekFrom::Start(origin + page_size as u64))?;
    let first_data = detect_padding(reader, origin, page_size)?;
    let len = end - origin;

    let mut best: Option<(u8, u32, RawSegments)> = None;
    for unit in candidate_units(first_data, page_size) {
        let kernel_at = kernel_offset(page_size, unit);
        let (data_end, padded_end) = layout_span(header, kernel_at, unit);
        if data_end > len {
            continue;
        }
        let segments = read_layout(reader, origin, end, header, kernel_at, unit)?;
        let score = 2 * u8::from(segments.id() == header.id) + u8::from(padded_end <= len);
        if score == 3 {
            #[cfg(feature = "logging")]
            debug!("Padding unit {:#x} reproduces the stored id", unit);
            return Ok((unit, segments));
        }
        if best.as_ref().map_or(true, |(s, ..)| score > *s) {
            best = Some((score, unit, segments));
        }
    }

    match best {
        Some((_, unit, segments)) => {
            #[cfg(feature = "logging")]
            warn!(
                "No padding unit confirmed by the stored id (first data page at {:#x}), using {:#x}",
                first_data, unit
            );
            Ok((unit, segments))
        }
        // nothing fits; report the header layout's error
        None => {
            let segments = read_layout(reader, origin, end, header, page_size as u64, page_size)?;
            Ok((page_size, segments))
        }
    }
}

/// Decode a boot image starting at the reader's current position.
pub fn decode_bootimg<R: Read + Seek>(
    reader: &mut R,
    strategy: PaddingStrategy,
) -> Result<DecodedBootImage, CodecError> {
    let origin = reader.stream_position()?;
    let end = reader.seek(SeekFrom::End(0))?;
    reader.seek(SeekFrom::Start(origin))?;

    let mut raw = [0u8; BOOT_HEADER_SIZE];
    reader
        .read_exact(&mut raw)
        .map_err(|e| CodecError::truncated("boot image header", e))?;
    let header = BootImageHeader::parse(&raw)?;

    let page_size = check_alignment(header.page_size)?;
    if (page_size as usize) < BOOT_HEADER_SIZE || page_size > MAX_PAGE_SIZE {
        return Err(CodecError::InvalidFormat(format!(
            "page size {:#x} out of range",
            page_size
        )));
    }

    #[cfg(feature = "logging")]
    {
        info!(
            "kernel_addr={:#x} ramdisk_addr={:#x} second_addr={:#x} tags_addr={:#x}",
            header.kernel_addr, header.ramdisk_addr, header.second_addr, header.tags_addr
        );
        info!(
            "page_size={} os_version={:#010x}({}) base={:#x}",
            page_size,
            header.os_version,
            header.os_version(),
            header.base()
        );
        info!("name={:?} cmdline={:?}", header.name_str(), header.cmdline_str());
    }

    let (padding, segments) = match strategy {
        PaddingStrategy::PageSize => {
            let segments = read_layout(reader, origin, end, &header, page_size as u64, page_size)?;
            (page_size, segments)
        }
        PaddingStrategy::Fixed(unit) => {
            let unit = check_alignment(unit)?;
            let kernel_at = kernel_offset(page_size, unit);
            (unit, read_layout(reader, origin, end, &header, kernel_at, unit)?)
        }
        PaddingStrategy::Detect => detect_layout(reader, origin, end, &header, page_size)?,
        PaddingStrategy::Strict => {
            reader.seek(SeekFrom::Start(origin + page_size as u64))?;
            let detected = detect_padding(reader, origin, page_size)?;
            let unit = u32::try_from(detected)
                .ok()
                .filter(|d| d.is_power_of_two())
                .ok_or_else(|| {
                    CodecError::InvalidFormat(format!(
                        "ambiguous padding: first data page at {:#x}",
                        detected
                    ))
                })?;
            let segments = read_layout(reader, origin, end, &header, unit as u64, unit)?;
            if segments.id() != header.id {
                return Err(CodecError::InvalidFormat(format!(
                    "padding unit {:#x} does not reproduce the stored id",
                    unit
                )));
            }
            (unit, segments)
        }
    };

    #[cfg(feature = "logging")]
    info!("padding_size={}", padding);

    let RawSegments {
        kernel,
        ramdisk,
        second,
        dt,
        trailer,
    } = segments;

    let (kernel, kernel_dt) = match kernel {
        Some(kernel) => {
            let (kernel, dt) = split_appended_dtb(kernel);
            (Some(kernel), dt)
        }
        None => (None, None),
    };

    let decoded = DecodedBootImage {
        metadata: BootMetadata::from_header(&header, padding),
        header,
        kernel,
        kernel_dt,
        ramdisk,
        second,
        dt,
        trailer,
    };

    #[cfg(feature = "logging")]
    {
        if decoded.kernel_dt.is_some() {
            debug!("Kernel carries an appended device tree");
        }
        if !decoded.id_matches() {
            debug!("Stored id does not match segment contents");
        }
    }

    Ok(decoded)
}

/// Decode a boot image held in memory
pub fn decode_bootimg_from_bytes(
    data: &[u8],
    strategy: PaddingStrategy,
) -> Result<DecodedBootImage, CodecError> {
    decode_bootimg(&mut Cursor::new(data), strategy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bootimg::encoder::BootImageBuilder;

    #[test]
    fn test_decode_kernel_only() {
        let image = BootImageBuilder::new()
            .kernel(Bytes::from(vec![0x42u8; 100]))
            .build()
            .unwrap();

        let decoded = decode_bootimg_from_bytes(&image, PaddingStrategy::Detect).unwrap();
        assert_eq!(decoded.kernel.as_deref(), Some(&[0x42u8; 100][..]));
        assert!(decoded.ramdisk.is_none());
        assert!(decoded.second.is_none());
        assert!(decoded.dt.is_none());
        assert!(decoded.trailer.is_none());
        assert_eq!(decoded.metadata.padding_size, 0x800);
        assert!(decoded.id_matches());
    }

    #[test]
    fn test_decode_bad_magic() {
        let mut image = BootImageBuilder::new().build().unwrap().to_vec();
        image[..8].copy_from_slice(b"NOTBOOT!");
        let result = decode_bootimg_from_bytes(&image, PaddingStrategy::Detect);
        assert!(matches!(result, Err(CodecError::InvalidFormat(_))));
    }

    #[test]
    fn test_decode_truncated_header() {
        let result = decode_bootimg_from_bytes(b"ANDROID!\x00\x00", PaddingStrategy::Detect);
        assert!(matches!(result, Err(CodecError::InvalidFormat(_))));
    }

    #[test]
    fn test_decode_segment_past_end() {
        let image = BootImageBuilder::new()
            .kernel(Bytes::from(vec![1u8; 100]))
            .build()
            .unwrap();
        let result = decode_bootimg_from_bytes(&image[..0x800 + 50], PaddingStrategy::PageSize);
        assert!(matches!(result, Err(CodecError::InvalidFormat(_))));
    }

    #[test]
    fn test_detects_larger_padding() {
        let image = BootImageBuilder::new()
            .kernel(Bytes::from(vec![1u8; 10]))
            .ramdisk(Bytes::from(vec![2u8; 10]))
            .padding_size(0x2000)
            .build()
            .unwrap();

        let decoded = decode_bootimg_from_bytes(&image, PaddingStrategy::Detect).unwrap();
        assert_eq!(decoded.metadata.page_size, 0x800);
        assert_eq!(decoded.metadata.padding_size, 0x2000);
        assert_eq!(decoded.ramdisk.as_deref(), Some(&[2u8; 10][..]));
    }

    #[test]
    fn test_fixed_smaller_padding() {
        let image = BootImageBuilder::new()
            .kernel(Bytes::from(vec![1u8; 10]))
            .ramdisk(Bytes::from(vec![2u8; 10]))
            .padding_size(0x200)
            .build()
            .unwrap();

        let decoded = decode_bootimg_from_bytes(&image, PaddingStrategy::Fixed(0x200)).unwrap();
        assert_eq!(decoded.ramdisk.as_deref(), Some(&[2u8; 10][..]));
        assert!(decoded.trailer.is_none());
    }

    #[test]
    fn test_detect_small_padding() {
        let image = BootImageBuilder::new()
            .kernel(Bytes::from(vec![1u8; 10]))
            .ramdisk(Bytes::from(vec![2u8; 10]))
            .padding_size(0x200)
            .build()
            .unwrap();

        let decoded = decode_bootimg_from_bytes(&image, PaddingStrategy::Detect).unwrap();
        assert_eq!(decoded.metadata.padding_size, 0x200);
        assert_eq!(decoded.kernel.as_deref(), Some(&[1u8; 10][..]));
        assert_eq!(decoded.ramdisk.as_deref(), Some(&[2u8; 10][..]));
        assert!(decoded.trailer.is_none());
    }

    #[test]
    fn test_detect_zero_prefixed_kernel() {
        let mut kernel = vec![0u8; 0x800];
        kernel.extend_from_slice(&[7u8; 100]);
        let image = BootImageBuilder::new()
            .kernel(Bytes::from(kernel.clone()))
            .build()
            .unwrap();

        let decoded = decode_bootimg_from_bytes(&image, PaddingStrategy::Detect).unwrap();
        assert_eq!(decoded.metadata.padding_size, 0x800);
        assert_eq!(decoded.kernel.as_deref(), Some(&kernel[..]));
        assert!(decoded.id_matches());
    }

    #[test]
    fn test_detect_zero_prefixed_kernel_with_ramdisk() {
        // first data page at 0x1800, which is not a power of two
        let mut kernel = vec![0u8; 0x1000];
        kernel.extend_from_slice(&[3u8; 10]);
        let ramdisk = vec![4u8; 0x2000];
        let image = BootImageBuilder::new()
            .kernel(Bytes::from(kernel.clone()))
            .ramdisk(Bytes::from(ramdisk.clone()))
            .build()
            .unwrap();

        let decoded = decode_bootimg_from_bytes(&image, PaddingStrategy::Detect).unwrap();
        assert_eq!(decoded.metadata.padding_size, 0x800);
        assert_eq!(decoded.kernel.as_deref(), Some(&kernel[..]));
        assert_eq!(decoded.ramdisk.as_deref(), Some(&ramdisk[..]));
        assert!(decoded.trailer.is_none());
    }

    #[test]
    fn test_detect_zero_prefixed_kernel_large_padding() {
        let mut kernel = vec![0u8; 0x1800];
        kernel.push(5);
        let image = BootImageBuilder::new()
            .kernel(Bytes::from(kernel.clone()))
            .ramdisk(Bytes::from_static(b"initrd"))
            .padding_size(0x2000)
            .build()
            .unwrap();

        let decoded = decode_bootimg_from_bytes(&image, PaddingStrategy::Detect).unwrap();
        assert_eq!(decoded.metadata.padding_size, 0x2000);
        assert_eq!(decoded.kernel.as_deref(), Some(&kernel[..]));
        assert_eq!(decoded.ramdisk.as_deref(), Some(&b"initrd"[..]));
    }

    #[test]
    fn test_candidate_units() {
        assert_eq!(candidate_units(0x800, 0x800)[..3], [0x800, 0x400, 0x200]);
        assert_eq!(candidate_units(0x1800, 0x800)[0], 0x1000);
        assert_eq!(candidate_units(0x1800, 0x800).last(), Some(&1));
        assert_eq!(candidate_units(0x4000, 0x800).len(), 15);
    }

    #[test]
    fn test_strict_rejects_unconfirmed_unit() {
        // first data page at 0x1000 is a power of two but starts inside the kernel
        let mut kernel = vec![0u8; 0x800];
        kernel.extend_from_slice(&[7u8; 0x1000]);
        let image = BootImageBuilder::new()
            .kernel(Bytes::from(kernel))
            .build()
            .unwrap();

        let result = decode_bootimg_from_bytes(&image, PaddingStrategy::Strict);
        assert!(matches!(result, Err(CodecError::InvalidFormat(_))));
    }

    #[test]
    fn test_strict_rejects_ambiguous_padding() {
        // kernel whose first two pages are zero puts the first data page at 3 * 0x800
        let mut kernel = vec![0u8; 0x1000];
        kernel.push(9);
        let image = BootImageBuilder::new()
            .kernel(Bytes::from(kernel))
            .build()
            .unwrap();

        let result = decode_bootimg_from_bytes(&image, PaddingStrategy::Strict);
        assert!(matches!(result, Err(CodecError::InvalidFormat(_))));

        let decoded = decode_bootimg_from_bytes(&image, PaddingStrategy::PageSize).unwrap();
        assert_eq!(decoded.kernel.as_ref().map(|k| k.len()), Some(0x1001));
    }

    #[test]
    fn test_split_appended_dtb() {
        let mut kernel = b"zImage-body".to_vec();
        kernel.extend_from_slice(&FDT_MAGIC);
        kernel.extend_from_slice(b"dtb-body");
        let (image, dt) = split_appended_dtb(Bytes::from(kernel.clone()));

        assert_eq!(image.as_ref(), b"zImage-body");
        let dt = dt.unwrap();
        assert_eq!(&dt[..4], &FDT_MAGIC);
        assert_eq!([image.as_ref(), dt.as_ref()].concat(), kernel);
    }

    #[test]
    fn test_no_split_at_offset_zero() {
        let mut kernel = FDT_MAGIC.to_vec();
        kernel.extend_from_slice(b"rest");
        let (image, dt) = split_appended_dtb(Bytes::from(kernel));
        assert_eq!(image.len(), 8);
        assert!(dt.is_none());
    }

    #[test]
    fn test_output_names() {
        let gz = [0x1F, 0x8B, 0x08, 0x00];
        assert_eq!(output_name(SegmentKind::Kernel, &gz), "kernel.gz");
        assert_eq!(output_name(SegmentKind::Ramdisk, b"070701"), "ramdisk");
        assert_eq!(output_name(SegmentKind::DeviceTree, &gz), "dt.img");
    }

    #[test]
    fn test_trailer_is_captured() {
        let mut image = BootImageBuilder::new()
            .kernel(Bytes::from_static(b"kernel"))
            .build()
            .unwrap()
            .to_vec();
        image.extend_from_slice(b"SEANDROIDENFORCE");

        let decoded = decode_bootimg_from_bytes(&image, PaddingStrategy::Detect).unwrap();
        assert_eq!(decoded.trailer.as_deref(), Some(&b"SEANDROIDENFORCE"[..]));
        let names: Vec<_> = decoded.outputs().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["kernel".to_string(), TRAILER_NAME.to_string()]);
    }

    #[test]
    fn test_metadata_to_config() {
        let image = BootImageBuilder::new()
            .kernel(Bytes::from_static(b"k"))
            .name("board")
            .cmdline("quiet")
            .os_version(0x1234_5678)
            .build()
            .unwrap();
        let decoded = decode_bootimg_from_bytes(&image, PaddingStrategy::Detect).unwrap();
        let config = BootImageConfig::from(&decoded.metadata);

        assert_eq!(config.name, "board");
        assert_eq!(config.cmdline, "quiet");
        assert_eq!(config.os_version, 0x1234_5678);
        assert_eq!(config, BootImageConfig {
            name: "board".into(),
            cmdline: "quiet".into(),
            os_version: 0x1234_5678,
            ..BootImageConfig::default()
        });
    }
}
