use anyhow::{bail, Context, Result};
use bootimg_core::constants::{BOOT_MAGIC, UPDATA_MAGIC};
use bootimg_core::updata::NullSink;
use bootimg_core::{
    decode_bootimg, decode_updata, PaddingStrategy, SegmentKind, UpdataDecodeOptions,
};
use colored::*;
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use tracing::info;

/// Container formats recognised by their leading magic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    /// Android boot image
    BootImage,
    /// UPDATA container, possibly after a zero preamble
    Updata,
}

/// Identify a container from its first non-zero bytes, rewinding afterwards
pub fn detect_container<R: Read + Seek>(reader: &mut R) -> Result<Option<ContainerKind>> {
    let origin = reader.stream_position()?;
    let mut head = [0u8; 8];
    let kind = if reader.read_exact(&mut head).is_ok() && &head == BOOT_MAGIC {
        Some(ContainerKind::BootImage)
    } else {
        reader.seek(SeekFrom::Start(origin))?;
        let mut word = [0u8; 4];
        loop {
            if reader.read_exact(&mut word).is_err() {
                break None;
            }
            if word == [0u8; 4] {
                continue;
            }
            break (word == UPDATA_MAGIC).then_some(ContainerKind::Updata);
        }
    };
    reader.seek(SeekFrom::Start(origin))?;
    Ok(kind)
}

fn show_boot_image<R: Read + Seek>(reader: &mut R) -> Result<()> {
    let decoded = decode_bootimg(reader, PaddingStrategy::Detect)?;
    let header = &decoded.header;

    println!("\n=== Boot Image ===");
    println!("Name:              {}", decoded.metadata.name);
    println!("Cmdline:           {}", decoded.metadata.cmdline);
    println!("Base:              {:#010x}", header.base());
    println!("Page size:         {:#x}", header.page_size);
    println!("Padding size:      {:#x}", decoded.metadata.padding_size);
    println!("Tags address:      {:#010x}", header.tags_addr);
    println!("OS version:        {}", decoded.metadata.os_version_text);

    println!("\n=== Segments ===");
    for kind in SegmentKind::ALL {
        let size = header.segment_size(kind);
        if size == 0 {
            println!("{:<18} {}", kind.file_stem(), "absent".dimmed());
        } else {
            println!("{:<18} {} bytes", kind.file_stem(), size);
        }
    }
    if let Some(dt) = &decoded.kernel_dt {
        println!("{:<18} {} bytes appended to kernel", "device tree", dt.len());
    }
    if let Some(trailer) = &decoded.trailer {
        println!("{:<18} {} bytes", "trailer", trailer.len());
    }

    println!("\n=== Id ===");
    println!("{}", hex::encode(header.digest()));
    if decoded.id_matches() {
        println!("{} Id matches segments", "✓".green());
    } else {
        println!("{} Id does not match segments", "✗".red());
    }
    Ok(())
}

fn show_updata<R: Read + Seek>(reader: &mut R, verify: bool) -> Result<()> {
    let options = UpdataDecodeOptions {
        verify_blocks: verify,
    };
    let summary = decode_updata(reader, options, &mut NullSink)?;

    println!("\n=== UPDATA Container ===");
    if let Some(board) = summary.board_name() {
        println!("Board:             {}", String::from_utf8_lossy(&board).trim_end_matches('\0'));
    }
    if let (Some(date), Some(time)) = (summary.date(), summary.time()) {
        println!(
            "Built:             {} {}",
            String::from_utf8_lossy(&date).trim_end_matches('\0'),
            String::from_utf8_lossy(&time).trim_end_matches('\0')
        );
    }
    println!("Records:           {}", summary.records.len());

    println!("\n=== Records ===");
    for record in &summary.records {
        let blocks = record.checksum_entries().len();
        let status = if record.header.table_len_consistent() {
            "ok".green()
        } else {
            "table size mismatch".yellow()
        };
        println!(
            "{:<16} {:#010x} {:>12} bytes {:>6} blocks  crc {:#06x}  {}",
            record.name,
            record.header.position,
            record.header.content_length,
            blocks,
            record.header.crc(),
            status
        );
    }

    println!("\n=== Summary ===");
    println!("{} All header checksums valid", "✓".green());
    if verify {
        println!("{} All payload blocks verified", "✓".green());
    }
    Ok(())
}

pub fn execute(input: &str, verify: bool) -> Result<()> {
    info!("Inspecting {}", input);

    let file = File::open(input).with_context(|| format!("Failed to open input file: {}", input))?;
    let mut reader = BufReader::new(file);

    match detect_container(&mut reader)? {
        Some(ContainerKind::BootImage) => show_boot_image(&mut reader)
            .with_context(|| format!("Failed to decode boot image: {}", input)),
        Some(ContainerKind::Updata) => show_updata(&mut reader, verify)
            .with_context(|| format!("Failed to decode UPDATA container: {}", input)),
        None => {
            println!("{} Unrecognised container", "✗".red());
            bail!("{} is neither a boot image nor an UPDATA container", input)
        }
    }
}
