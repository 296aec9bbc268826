//! Boot image encoding

use crate::align::{check_alignment, write_padding};
use crate::bootimg::header::{latin1_field, BootImageHeader, ID_OFFSET};
use crate::checksum::IdHasher;
use crate::constants::{
    SegmentKind, BOOT_ID_SIZE, DEFAULT_BASE, DEFAULT_PAGE_SIZE, KERNEL_OFFSET, RAMDISK_OFFSET,
    SECOND_OFFSET, SHA1_DIGEST_SIZE, TAGS_OFFSET,
};
use crate::error::CodecError;
use bytes::Bytes;
use std::io::{Cursor, Read, Seek, SeekFrom, Write};

#[cfg(feature = "logging")]
use tracing::debug;

/// Anything a segment can be streamed from
pub trait SegmentSource: Read + Seek {}

impl<T: Read + Seek + ?Sized> SegmentSource for T {}

/// Header values for a new boot image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootImageConfig {
    /// Product name, at most 16 Latin-1 bytes (longer input is truncated)
    pub name: String,
    /// Kernel command line, at most 512 Latin-1 bytes
    pub cmdline: String,
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
    /// Alignment actually used between segments on disk
    pub padding_size: u32,
    /// Packed os version
    pub os_version: u32,
}

impl BootImageConfig {
    /// Conventional addresses relative to `base`
    pub fn with_base(base: u32) -> Self {
        Self {
            name: String::new(),
            cmdline: String::new(),
            kernel_addr: base.wrapping_add(KERNEL_OFFSET),
            ramdisk_addr: base.wrapping_add(RAMDISK_OFFSET),
            second_addr: base.wrapping_add(SECOND_OFFSET),
            tags_addr: base.wrapping_add(TAGS_OFFSET),
            page_size: DEFAULT_PAGE_SIZE,
            padding_size: DEFAULT_PAGE_SIZE,
            os_version: 0,
        }
    }

    /// Size of the header region: the larger of the two alignment units, so
    /// the kernel lands on a boundary of both
    pub fn header_region(&self) -> u32 {
        self.page_size.max(self.padding_size)
    }
}

impl Default for BootImageConfig {
    fn default() -> Self {
        Self::with_base(DEFAULT_BASE)
    }
}

/// The four optional segment sources, in on-disk order
#[derive(Default)]
pub struct BootImageSources<'a> {
    /// Kernel image
    pub kernel: Option<&'a mut dyn SegmentSource>,
    /// Ramdisk
    pub ramdisk: Option<&'a mut dyn SegmentSource>,
    /// Second stage loader
    pub second: Option<&'a mut dyn SegmentSource>,
    /// Device tree image
    pub dt: Option<&'a mut dyn SegmentSource>,
}

impl<'a> BootImageSources<'a> {
    fn get_mut(&mut self, kind: SegmentKind) -> Option<&mut (dyn SegmentSource + 'a)> {
        match kind {
            SegmentKind::Kernel => self.kernel.as_deref_mut(),
            SegmentKind::Ramdisk => self.ramdisk.as_deref_mut(),
            SegmentKind::Second => self.second.as_deref_mut(),
            SegmentKind::DeviceTree => self.dt.as_deref_mut(),
        }
    }
}

fn measure<S: SegmentSource + ?Sized>(source: &mut S, kind: SegmentKind) -> Result<u32, CodecError> {
    let len = source.seek(SeekFrom::End(0))?;
    u32::try_from(len).map_err(|_| {
        CodecError::Configuration(format!("{} is too large ({} bytes)", kind.file_stem(), len))
    })
}

/// Stream one source into the output, feeding the id hasher.
fn copy_segment<S: SegmentSource + ?Sized, W: Write>(
    source: &mut S,
    out: &mut W,
    hasher: &mut IdHasher,
) -> Result<u64, CodecError> {
    let mut buf = vec![0u8; 64 * 1024];
    let mut total = 0u64;
    source.seek(SeekFrom::Start(0))?;
    loop {
        let n = source.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
        out.write_all(&buf[..n])?;
        total += n as u64;
    }
    Ok(total)
}

/// Encode a boot image into `out`.
///
/// The output is laid out as header, zero padding to the header region,
/// then each present segment followed by padding to `padding_size`. The id
/// field is written as zeros first and patched once every segment has been
/// hashed, so `out` must be seekable. Positions are relative to where `out`
/// stands on entry; on return it is left at the end of the image.
///
/// Returns the SHA-1 digest stored in the id field.
pub fn encode_bootimg<W: Write + Seek>(
    out: &mut W,
    config: &BootImageConfig,
    sources: &mut BootImageSources<'_>,
) -> Result<[u8; SHA1_DIGEST_SIZE], CodecError> {
    check_alignment(config.page_size)?;
    check_alignment(config.padding_size)?;

    let mut sizes = [0u32; 4];
    for (size, kind) in sizes.iter_mut().zip(SegmentKind::ALL) {
        *size = match sources.get_mut(kind) {
            Some(source) => measure(source, kind)?,
            None => 0,
        };
    }

    let header = BootImageHeader {
        kernel_size: sizes[0],
        kernel_addr: config.kernel_addr,
        ramdisk_size: sizes[1],
        ramdisk_addr: config.ramdisk_addr,
        second_size: sizes[2],
        second_addr: config.second_addr,
        tags_addr: config.tags_addr,
        page_size: config.page_size,
        dt_size: sizes[3],
        os_version: config.os_version,
        name: latin1_field(&config.name, "name")?,
        cmdline: latin1_field(&config.cmdline, "cmdline")?,
        id: [0u8; BOOT_ID_SIZE],
    };

    let start = out.stream_position()?;
    let header_bytes = header.to_bytes();
    out.write_all(&header_bytes)?;
    let mut pos = header_bytes.len() as u64;
    pos += write_padding(out, pos, config.header_region())? as u64;

    let mut hasher = IdHasher::new();
    for (kind, expected) in SegmentKind::ALL.into_iter().zip(sizes) {
        let Some(source) = sources.get_mut(kind) else {
            hasher.finish_segment(0);
            continue;
        };

        let len = copy_segment(source, out, &mut hasher)?;
        if len != expected as u64 {
            return Err(CodecError::Configuration(format!(
                "{} changed size while encoding: measured {}, read {}",
                kind.file_stem(),
                expected,
                len
            )));
        }
        hasher.finish_segment(expected);
        pos += len;
        pos += write_padding(out, pos, config.padding_size)? as u64;

        #[cfg(feature = "logging")]
        debug!("Wrote {} ({} bytes), image now {} bytes", kind.file_stem(), len, pos);
    }

    let digest = hasher.finalize();
    out.seek(SeekFrom::Start(start + ID_OFFSET as u64))?;
    out.write_all(&digest)?;
    out.seek(SeekFrom::Start(start + pos))?;

    Ok(digest)
}

/// Builder for in-memory boot images
#[derive(Debug, Clone, Default)]
pub struct BootImageBuilder {
    config: BootImageConfig,
    kernel: Option<Bytes>,
    ramdisk: Option<Bytes>,
    second: Option<Bytes>,
    dt: Option<Bytes>,
}

impl BootImageBuilder {
    /// Start from the default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an explicit configuration
    pub fn with_config(config: BootImageConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Set the kernel
    pub fn kernel(mut self, data: Bytes) -> Self {
        self.kernel = Some(data);
        self
    }

    /// Set the ramdisk
    pub fn ramdisk(mut self, data: Bytes) -> Self {
        self.ramdisk = Some(data);
        self
    }

    /// Set the second stage loader
    pub fn second(mut self, data: Bytes) -> Self {
        self.second = Some(data);
        self
    }

    /// Set the device tree image
    pub fn dt(mut self, data: Bytes) -> Self {
        self.dt = Some(data);
        self
    }

    /// Set the product name
    pub fn name(mut self, name: &str) -> Self {
        self.config.name = name.to_string();
        self
    }

    /// Set the kernel command line
    pub fn cmdline(mut self, cmdline: &str) -> Self {
        self.config.cmdline = cmdline.to_string();
        self
    }

    /// Set the header page size
    pub fn page_size(mut self, page_size: u32) -> Self {
        self.config.page_size = page_size;
        self
    }

    /// Set the on-disk segment alignment
    pub fn padding_size(mut self, padding_size: u32) -> Self {
        self.config.padding_size = padding_size;
        self
    }

    /// Set the packed os version
    pub fn os_version(mut self, os_version: u32) -> Self {
        self.config.os_version = os_version;
        self
    }

    /// Encode into a fresh buffer
    pub fn build(self) -> Result<Bytes, CodecError> {
        let mut kernel = self.kernel.map(Cursor::new);
        let mut ramdisk = self.ramdisk.map(Cursor::new);
        let mut second = self.second.map(Cursor::new);
        let mut dt = self.dt.map(Cursor::new);

        let mut sources = BootImageSources {
            kernel: kernel.as_mut().map(|c| c as &mut dyn SegmentSource),
            ramdisk: ramdisk.as_mut().map(|c| c as &mut dyn SegmentSource),
            second: second.as_mut().map(|c| c as &mut dyn SegmentSource),
            dt: dt.as_mut().map(|c| c as &mut dyn SegmentSource),
        };

        let mut out = Cursor::new(Vec::<u8>::new());
        encode_bootimg(&mut out, &self.config, &mut sources)?;
        Ok(Bytes::from(out.into_inner()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::BOOT_HEADER_SIZE;

    #[test]
    fn test_kernel_only_layout() {
        let image = BootImageBuilder::new()
            .kernel(Bytes::from(vec![0x11u8; 100]))
            .build()
            .unwrap();

        // header page + one padded kernel page
        assert_eq!(image.len(), 0x1000);
        assert_eq!(&image[0..8], b"ANDROID!");
        assert_eq!(&image[8..12], &100u32.to_le_bytes());
        assert_eq!(&image[0x800..0x800 + 100], &[0x11u8; 100][..]);
        assert!(image[BOOT_HEADER_SIZE..0x800].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_id_is_patched() {
        let image = BootImageBuilder::new()
            .kernel(Bytes::from_static(b"kernel"))
            .build()
            .unwrap();

        let mut hasher = IdHasher::new();
        hasher.segment(Some(b"kernel"));
        hasher.segment(None);
        hasher.segment(None);
        hasher.segment(None);
        let expected = hasher.finalize_id();

        assert_eq!(&image[ID_OFFSET..BOOT_HEADER_SIZE], &expected[..]);
    }

    #[test]
    fn test_deterministic() {
        let build = || {
            BootImageBuilder::new()
                .kernel(Bytes::from_static(b"k"))
                .ramdisk(Bytes::from_static(b"r"))
                .name("same")
                .build()
                .unwrap()
        };
        assert_eq!(build(), build());
    }

    #[test]
    fn test_padding_larger_than_page() {
        let image = BootImageBuilder::new()
            .kernel(Bytes::from(vec![1u8; 10]))
            .ramdisk(Bytes::from(vec![2u8; 10]))
            .padding_size(0x1000)
            .build()
            .unwrap();

        assert_eq!(image[0x1000], 1);
        assert_eq!(image[0x2000], 2);
        assert_eq!(image.len(), 0x3000);
    }

    #[test]
    fn test_rejects_bad_alignment() {
        let result = BootImageBuilder::new().page_size(0x900).build();
        assert!(matches!(result, Err(CodecError::Configuration(_))));

        let result = BootImageBuilder::new().padding_size(0).build();
        assert!(matches!(result, Err(CodecError::Configuration(_))));
    }

    #[test]
    fn test_encode_at_nonzero_offset() {
        let mut out = Cursor::new(vec![0xEEu8; 16]);
        out.set_position(16);
        let mut kernel = Cursor::new(vec![3u8; 5]);
        let mut sources = BootImageSources {
            kernel: Some(&mut kernel),
            ..Default::default()
        };
        encode_bootimg(&mut out, &BootImageConfig::default(), &mut sources).unwrap();

        let data = out.into_inner();
        assert_eq!(&data[16..24], b"ANDROID!");
        assert_eq!(data[16 + 0x800], 3);
        assert_eq!(data.len(), 16 + 0x1000);
    }
}
