//! Library entry for bootimg-cli used by integration tests and embedding.

pub mod commands;

// Re-export commands for convenience
pub use commands::*;

use bootimg_core::PaddingStrategy;

/// Boot image header values, as JSON
pub const BOOTIMG_JSON: &str = "bootimg.json";
/// UPDATA record list, one `name\tposition` line per record
pub const UPDATA_LIST: &str = "updatalist.txt";
/// UPDATA board name, raw bytes
pub const BOARD_NAME_FILE: &str = "boardname.bin";
/// UPDATA date field, raw bytes
pub const DATE_FILE: &str = "date.txt";
/// UPDATA time field, raw bytes
pub const TIME_FILE: &str = "time.txt";

/// Parse `--padding`: `detect`, `strict`, `page`, or a size in decimal or `0x` hex
pub fn parse_padding(text: &str) -> Result<PaddingStrategy, String> {
    match text {
        "detect" => Ok(PaddingStrategy::Detect),
        "strict" => Ok(PaddingStrategy::Strict),
        "page" => Ok(PaddingStrategy::PageSize),
        _ => {
            let size = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
                Some(hex) => u32::from_str_radix(hex, 16),
                None => text.parse(),
            }
            .map_err(|e| format!("invalid padding {:?}: {}", text, e))?;
            if !size.is_power_of_two() {
                return Err(format!("padding {:#x} is not a power of two", size));
            }
            Ok(PaddingStrategy::Fixed(size))
        }
    }
}
