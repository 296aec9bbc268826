use crate::{BOARD_NAME_FILE, DATE_FILE, TIME_FILE, UPDATA_LIST};
use anyhow::{Context, Result};
use bootimg_core::updata::header::fixed_field;
use bootimg_core::{encode_updata, Manifest, UpdataEncodeOptions};
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::Path;
use tracing::{info, warn};

/// Contents of an optional sidecar file
fn read_optional(path: &Path) -> Result<Option<Vec<u8>>> {
    match fs::read(path) {
        Ok(data) => Ok(Some(data)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e).with_context(|| format!("Failed to read {}", path.display())),
    }
}

pub fn execute(dir: &str, output: &str) -> Result<()> {
    info!("Repacking UPDATA container from {} into {}", dir, output);

    let dir = Path::new(dir);
    let list_path = dir.join(UPDATA_LIST);
    let text = fs::read_to_string(&list_path)
        .with_context(|| format!("Failed to read {}", list_path.display()))?;
    let manifest: Manifest = text
        .parse()
        .with_context(|| format!("Failed to parse {}", list_path.display()))?;

    let board = read_optional(&dir.join(BOARD_NAME_FILE))?.unwrap_or_else(|| {
        warn!("No {}, using an empty board name", BOARD_NAME_FILE);
        Vec::new()
    });
    let mut options = UpdataEncodeOptions::new(&board);
    options.date = read_optional(&dir.join(DATE_FILE))?.map(|d| fixed_field(&d));
    options.time = read_optional(&dir.join(TIME_FILE))?.map(|t| fixed_field(&t));

    info!("Found {} records to pack", manifest.len());

    let file =
        File::create(output).with_context(|| format!("Failed to create output file: {}", output))?;
    let mut writer = BufWriter::new(file);
    let total = encode_updata(&mut writer, &manifest, &options, |entry| {
        let path = dir.join(&entry.name);
        File::open(&path)
            .map(BufReader::new)
            .map_err(|e| io::Error::new(e.kind(), format!("{}: {}", path.display(), e)))
    })
    .with_context(|| format!("Failed to encode UPDATA container: {}", output))?;
    writer
        .flush()
        .with_context(|| format!("Failed to write output file: {}", output))?;

    info!(
        "Successfully packed {} records ({} bytes total)",
        manifest.len(),
        total
    );

    Ok(())
}
