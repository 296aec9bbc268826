use crate::BOOTIMG_JSON;
use anyhow::{Context, Result};
use bootimg_core::bootimg::encoder::SegmentSource;
use bootimg_core::{encode_bootimg, BootImageConfig, BootImageSources, BootMetadata, SegmentKind};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Cursor, Write};
use std::path::{Path, PathBuf};
use tracing::info;

type Source = Box<dyn SegmentSource>;

/// First existing file among `stem` and `stem.gz`
fn find_segment(dir: &Path, kind: SegmentKind) -> Option<PathBuf> {
    let stem = kind.file_stem();
    let mut candidates = vec![dir.join(stem)];
    if kind.gzip_named() {
        candidates.push(dir.join(format!("{}.gz", stem)));
    }
    candidates.into_iter().find(|p| p.is_file())
}

fn open_file(path: &Path) -> Result<Source> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    Ok(Box::new(BufReader::new(file)))
}

/// Kernel source, with a split-off `.dt` file appended again
fn open_kernel(dir: &Path) -> Result<Option<Source>> {
    let Some(path) = find_segment(dir, SegmentKind::Kernel) else {
        return Ok(None);
    };
    let mut dt_path = path.clone().into_os_string();
    dt_path.push(".dt");
    let dt_path = PathBuf::from(dt_path);
    if !dt_path.is_file() {
        return open_file(&path).map(Some);
    }

    let mut joined =
        fs::read(&path).with_context(|| format!("Failed to read {}", path.display()))?;
    let dt = fs::read(&dt_path).with_context(|| format!("Failed to read {}", dt_path.display()))?;
    info!("Appending {} to {}", dt_path.display(), path.display());
    joined.extend_from_slice(&dt);
    Ok(Some(Box::new(Cursor::new(joined))))
}

fn open_segment(dir: &Path, kind: SegmentKind) -> Result<Option<Source>> {
    match kind {
        SegmentKind::Kernel => open_kernel(dir),
        _ => find_segment(dir, kind).map(|p| open_file(&p)).transpose(),
    }
}

fn borrow(source: &mut Option<Source>) -> Option<&mut dyn SegmentSource> {
    match source {
        Some(s) => Some(&mut **s as &mut dyn SegmentSource),
        None => None,
    }
}

pub fn execute(dir: &str, output: &str) -> Result<()> {
    info!("Repacking boot image from {} into {}", dir, output);

    let dir = Path::new(dir);
    let json_path = dir.join(BOOTIMG_JSON);
    let json = fs::read_to_string(&json_path)
        .with_context(|| format!("Failed to read {}", json_path.display()))?;
    let metadata: BootMetadata = serde_json::from_str(&json)
        .with_context(|| format!("Failed to parse {}", json_path.display()))?;
    let config = BootImageConfig::from(&metadata);

    let mut kernel = open_segment(dir, SegmentKind::Kernel)?;
    let mut ramdisk = open_segment(dir, SegmentKind::Ramdisk)?;
    let mut second = open_segment(dir, SegmentKind::Second)?;
    let mut dt = open_segment(dir, SegmentKind::DeviceTree)?;

    let mut sources = BootImageSources {
        kernel: borrow(&mut kernel),
        ramdisk: borrow(&mut ramdisk),
        second: borrow(&mut second),
        dt: borrow(&mut dt),
    };

    let file =
        File::create(output).with_context(|| format!("Failed to create output file: {}", output))?;
    let mut writer = BufWriter::new(file);
    let digest = encode_bootimg(&mut writer, &config, &mut sources)
        .with_context(|| format!("Failed to encode boot image: {}", output))?;
    writer
        .flush()
        .with_context(|| format!("Failed to write output file: {}", output))?;

    info!("Successfully repacked {} (id {})", output, hex::encode(digest));

    Ok(())
}
