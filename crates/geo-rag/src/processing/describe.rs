//! Textual fingerprint of an uploaded payload
//!
//! The embedder works on text, so each payload is reduced to a short,
//! stable description before embedding.

use sha2::{Digest, Sha256};

/// Container format guessed from the magic header
fn detect_format(data: &[u8]) -> &'static str {
    match data.get(..4) {
        Some(b"II*\0") => "GeoTIFF/TIFF (little-endian)",
        Some(b"MM\0*") => "TIFF (big-endian)",
        Some(b"II+\0") | Some(b"MM\0+") => "BigTIFF",
        _ => "unknown binary",
    }
}

/// Describe `data` as uploaded under `filename`
pub fn describe(filename: &str, data: &[u8]) -> String {
    let digest = hex::encode(Sha256::digest(data));
    format!(
        "File: {}\nFormat: {}\nSize: {} bytes\nSHA-256: {}",
        filename,
        detect_format(data),
        data.len(),
        digest
    )
}
