use crate::BOOTIMG_JSON;
use anyhow::{Context, Result};
use bootimg_core::bootimg::decoder::TRAILER_NAME;
use bootimg_core::{decode_bootimg, PaddingStrategy, SegmentKind};
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::Path;
use tracing::{debug, info, warn};

/// Every file name an unpack can produce
pub fn output_names() -> Vec<String> {
    let mut names = Vec::new();
    for kind in SegmentKind::ALL {
        let stem = kind.file_stem();
        names.push(stem.to_string());
        if kind.gzip_named() {
            names.push(format!("{}.gz", stem));
        }
    }
    names.push("kernel.dt".to_string());
    names.push("kernel.gz.dt".to_string());
    names.push(TRAILER_NAME.to_string());
    names
}

pub fn execute(input: &str, dir: &str, padding: PaddingStrategy) -> Result<()> {
    info!("Unpacking boot image {} into {}", input, dir);

    let file = File::open(input).with_context(|| format!("Failed to open input file: {}", input))?;
    let mut reader = BufReader::new(file);
    let decoded = decode_bootimg(&mut reader, padding)
        .with_context(|| format!("Failed to decode boot image: {}", input))?;

    let dir = Path::new(dir);
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create directory: {}", dir.display()))?;

    let json = serde_json::to_string_pretty(&decoded.metadata)
        .with_context(|| "Failed to serialize boot image metadata")?;
    let json_path = dir.join(BOOTIMG_JSON);
    fs::write(&json_path, json)
        .with_context(|| format!("Failed to write {}", json_path.display()))?;

    let outputs = decoded.outputs();
    for (name, data) in &outputs {
        let path = dir.join(name);
        fs::write(&path, data).with_context(|| format!("Failed to write {}", path.display()))?;
        info!("{} ({} bytes)", name, data.len());
    }

    // leftovers from an earlier unpack would be picked up by repack
    let written: HashSet<&str> = outputs.iter().map(|(n, _)| n.as_str()).collect();
    for name in output_names() {
        let path = dir.join(&name);
        if !written.contains(name.as_str()) && path.is_file() {
            fs::remove_file(&path)
                .with_context(|| format!("Failed to remove stale {}", path.display()))?;
            debug!("Removed stale {}", name);
        }
    }

    if !decoded.id_matches() {
        warn!("Stored id does not match the extracted segments");
    }

    info!(
        "Unpacked {} files (base {:#x}, padding {:#x})",
        outputs.len(),
        decoded.header.base(),
        decoded.metadata.padding_size
    );

    Ok(())
}
