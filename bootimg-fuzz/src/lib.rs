//! Fuzzing entry points for the bootimg-core decoders
//!
//! To use with cargo-fuzz:
//! 1. Install cargo-fuzz: cargo install cargo-fuzz
//! 2. Run fuzzer: cargo fuzz run fuzz_bootimg

use bootimg_core::{
    decode_bootimg_from_bytes, decode_updata_from_bytes, Manifest, PaddingStrategy,
    UpdataDecodeOptions,
};

pub fn fuzz_decode_bootimg(data: &[u8]) {
    // Every strategy walks the input differently - none may panic
    for strategy in [
        PaddingStrategy::Detect,
        PaddingStrategy::Strict,
        PaddingStrategy::PageSize,
        PaddingStrategy::Fixed(0x200),
    ] {
        if let Ok(decoded) = decode_bootimg_from_bytes(data, strategy) {
            let _ = decoded.outputs();
            let _ = decoded.id_matches();
        }
    }
}

pub fn fuzz_decode_updata(data: &[u8]) {
    let _ = decode_updata_from_bytes(data, UpdataDecodeOptions::default());
    let _ = decode_updata_from_bytes(data, UpdataDecodeOptions::verifying());
}

pub fn fuzz_manifest(data: &[u8]) {
    if let Ok(text) = std::str::from_utf8(data) {
        if let Ok(manifest) = Manifest::parse(text) {
            let _ = manifest.to_text();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fuzz_bootimg_empty() {
        fuzz_decode_bootimg(&[]);
    }

    #[test]
    fn test_fuzz_bootimg_magic_only() {
        let mut data = b"ANDROID!".to_vec();
        data.extend_from_slice(&[0xFF; 1024]);
        fuzz_decode_bootimg(&data);
    }

    #[test]
    fn test_fuzz_updata_empty() {
        fuzz_decode_updata(&[]);
    }

    #[test]
    fn test_fuzz_updata_random() {
        let mut data = vec![0u8; 92];
        data.extend_from_slice(&[0x55, 0xAA, 0x5A, 0xA5]);
        data.extend_from_slice(&[0xFF; 1024]);
        fuzz_decode_updata(&data);
    }

    #[test]
    fn test_fuzz_manifest() {
        fuzz_manifest(b"boot.img 0xZZZ\n\tonly-name\n");
        fuzz_manifest(&[0xFF, 0xFE]);
    }
}
