//! Partition names and the ordered manifest

use crate::error::CodecError;
use core::fmt;
use core::str::FromStr;
use serde::{Deserialize, Serialize};

/// Positions with a well-known output name
pub const KNOWN_POSITIONS: &[(u32, &str)] = &[
    (0x3000_0000, "boot.img"),
    (0x4000_0000, "system.img"),
    (0x5000_0000, "userdata.img"),
    (0x6000_0000, "recovery.img"),
    (0xF200_0000, "splash.565"),
];

/// Output name for a partition position
pub fn position_name(position: u32) -> String {
    KNOWN_POSITIONS
        .iter()
        .find(|(p, _)| *p == position)
        .map(|(_, name)| name.to_string())
        .unwrap_or_else(|| format!("{:#x}.raw", position))
}

fn hex_u32(text: &str) -> Result<u32, String> {
    let digits = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .unwrap_or(text);
    u32::from_str_radix(digits, 16).map_err(|e| format!("bad position {:?}: {}", text, e))
}

/// Parse a hexadecimal position, with or without a `0x` prefix
pub fn parse_position(text: &str) -> Result<u32, CodecError> {
    hex_u32(text).map_err(CodecError::Configuration)
}

/// One partition in a container
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Payload name (file name when extracted)
    pub name: String,
    /// Partition position
    pub position: u32,
}

impl ManifestEntry {
    /// Entry named after its position
    pub fn for_position(position: u32) -> Self {
        Self {
            name: position_name(position),
            position,
        }
    }
}

impl fmt::Display for ManifestEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\t{:#x}", self.name, self.position)
    }
}

/// Ordered list of partitions; record order in the container follows it
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// Entries in container order
    pub entries: Vec<ManifestEntry>,
}

impl Manifest {
    /// Empty manifest
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry
    pub fn push(&mut self, entry: ManifestEntry) {
        self.entries.push(entry);
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in order
    pub fn iter(&self) -> impl Iterator<Item = &ManifestEntry> {
        self.entries.iter()
    }

    /// Parse the text form: one `name position` pair per line.
    ///
    /// Extra columns are ignored, as are blank lines.
    pub fn parse(text: &str) -> Result<Self, CodecError> {
        let mut manifest = Manifest::new();
        for (lineno, line) in text.lines().enumerate() {
            let mut fields = line.split_whitespace();
            let Some(name) = fields.next() else {
                continue;
            };
            let position = fields.next().ok_or_else(|| {
                CodecError::Configuration(format!(
                    "manifest line {}: missing position after {:?}",
                    lineno + 1,
                    name
                ))
            })?;
            let position = hex_u32(position).map_err(|e| {
                CodecError::Configuration(format!("manifest line {}: {}", lineno + 1, e))
            })?;
            manifest.push(ManifestEntry {
                name: name.to_string(),
                position,
            });
        }
        Ok(manifest)
    }

    /// Text form, one tab-separated line per entry
    pub fn to_text(&self) -> String {
        self.entries.iter().map(|e| format!("{}\n", e)).collect()
    }
}

impl FromStr for Manifest {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Manifest::parse(s)
    }
}

impl FromIterator<ManifestEntry> for Manifest {
    fn from_iter<I: IntoIterator<Item = ManifestEntry>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_positions() {
        assert_eq!(position_name(0x3000_0000), "boot.img");
        assert_eq!(position_name(0x4000_0000), "system.img");
        assert_eq!(position_name(0x5000_0000), "userdata.img");
        assert_eq!(position_name(0x6000_0000), "recovery.img");
        assert_eq!(position_name(0xF200_0000), "splash.565");
    }

    #[test]
    fn test_unknown_position() {
        assert_eq!(position_name(0x1234_0000), "0x12340000.raw");
    }

    #[test]
    fn test_text_round_trip() {
        let manifest: Manifest = [
            ManifestEntry::for_position(0x3000_0000),
            ManifestEntry::for_position(0xABCD),
        ]
        .into_iter()
        .collect();

        let text = manifest.to_text();
        assert_eq!(text, "boot.img\t0x30000000\n0xabcd.raw\t0xabcd\n");
        assert_eq!(Manifest::parse(&text).unwrap(), manifest);
    }

    #[test]
    fn test_parse_lenient_forms() {
        let manifest = Manifest::parse("a.img 30000000 extra\n\n  b.img\t0X40000000\n").unwrap();
        assert_eq!(manifest.len(), 2);
        assert_eq!(manifest.entries[0].position, 0x3000_0000);
        assert_eq!(manifest.entries[1].name, "b.img");
    }

    #[test]
    fn test_parse_malformed_lines() {
        assert!(matches!(
            Manifest::parse("boot.img\n"),
            Err(CodecError::Configuration(_))
        ));
        assert!(matches!(
            Manifest::parse("boot.img 0xZZ\n"),
            Err(CodecError::Configuration(_))
        ));
    }
}
