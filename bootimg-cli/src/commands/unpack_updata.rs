use crate::{BOARD_NAME_FILE, DATE_FILE, TIME_FILE, UPDATA_LIST};
use anyhow::{Context, Result};
use bootimg_core::updata::{PartitionRecord, PartitionSink};
use bootimg_core::{decode_updata, UpdataDecodeOptions};
use colored::*;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

/// Writes each record's payload to a file named after it
pub struct DirectorySink {
    dir: PathBuf,
    current: Option<BufWriter<File>>,
}

impl DirectorySink {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
            current: None,
        }
    }
}

impl PartitionSink for DirectorySink {
    fn begin(&mut self, record: &PartitionRecord) -> io::Result<()> {
        let path = self.dir.join(&record.name);
        let file = File::create(&path).map_err(|e| {
            io::Error::new(e.kind(), format!("{}: {}", path.display(), e))
        })?;
        self.current = Some(BufWriter::new(file));
        Ok(())
    }

    fn write_chunk(&mut self, chunk: &[u8]) -> io::Result<()> {
        match self.current.as_mut() {
            Some(out) => out.write_all(chunk),
            None => Err(io::Error::new(
                io::ErrorKind::Other,
                "payload data outside a record",
            )),
        }
    }

    fn finish(&mut self) -> io::Result<()> {
        match self.current.take() {
            Some(mut out) => out.flush(),
            None => Ok(()),
        }
    }
}

pub fn execute(input: &str, dir: &str, verify: bool) -> Result<()> {
    info!("Unpacking UPDATA container {} into {}", input, dir);

    let file = File::open(input).with_context(|| format!("Failed to open input file: {}", input))?;
    let mut reader = BufReader::new(file);

    let dir = Path::new(dir);
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create directory: {}", dir.display()))?;

    let options = UpdataDecodeOptions {
        verify_blocks: verify,
    };
    let mut sink = DirectorySink::new(dir);
    let summary = decode_updata(&mut reader, options, &mut sink)
        .with_context(|| format!("Failed to decode UPDATA container: {}", input))?;

    let list_path = dir.join(UPDATA_LIST);
    fs::write(&list_path, summary.manifest.to_text())
        .with_context(|| format!("Failed to write {}", list_path.display()))?;

    let sidecars = [
        (BOARD_NAME_FILE, summary.board_name().map(|b| b.to_vec())),
        (DATE_FILE, summary.date().map(|d| d.to_vec())),
        (TIME_FILE, summary.time().map(|t| t.to_vec())),
    ];
    for (name, value) in sidecars {
        if let Some(value) = value {
            let path = dir.join(name);
            fs::write(&path, value).with_context(|| format!("Failed to write {}", path.display()))?;
        }
    }

    println!("\n=== Unpacked Records ===");
    for record in &summary.records {
        println!(
            "{:<16} {:#010x} {:>12} bytes",
            record.name, record.header.position, record.header.content_length
        );
    }
    if verify {
        println!("{} All payload blocks verified", "✓".green());
    }

    info!(
        "Successfully unpacked {} records from {}",
        summary.records.len(),
        input
    );

    Ok(())
}
