//! Image encoding helpers — PNG bytes, data URLs, digests.
//!
//! Everything here is in-memory; no disk I/O.

use base64::Engine;
use image::{ImageFormat, RgbaImage};
use sha2::{Digest, Sha256};
use std::io::Cursor;

#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("PNG encoding failed: {0}")]
    EncodingFailed(String),

    #[error("Not a base64 data URL")]
    NotBase64DataUrl,

    #[error("Base64 decode failed: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Image decode failed: {0}")]
    DecodeFailed(String),
}

/// Encode an RGBA bitmap as PNG bytes.
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, EncodeError> {
    let mut png_bytes: Vec<u8> = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut png_bytes), ImageFormat::Png)
        .map_err(|e| EncodeError::EncodingFailed(e.to_string()))?;
    Ok(png_bytes)
}

/// Wrap PNG bytes in a `data:image/png;base64,` URL.
pub fn png_data_url(png_bytes: &[u8]) -> String {
    format!(
        "data:image/png;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(png_bytes)
    )
}

/// Extract the payload of a base64 data URL (any image MIME type).
pub fn decode_data_url(url: &str) -> Result<Vec<u8>, EncodeError> {
    let rest = url
        .trim()
        .strip_prefix("data:")
        .ok_or(EncodeError::NotBase64DataUrl)?;
    let (header, payload) = rest.split_once(',').ok_or(EncodeError::NotBase64DataUrl)?;
    if !header.ends_with(";base64") {
        return Err(EncodeError::NotBase64DataUrl);
    }
    Ok(base64::engine::general_purpose::STANDARD.decode(payload.trim())?)
}

/// Decode any supported image format into RGBA.
pub fn decode_image(bytes: &[u8]) -> Result<RgbaImage, EncodeError> {
    image::load_from_memory(bytes)
        .map(|img| img.to_rgba8())
        .map_err(|e| EncodeError::DecodeFailed(e.to_string()))
}

/// `sha256:<hex>` digest of a byte buffer.
pub fn sha256_digest(bytes: &[u8]) -> String {
    let hash = Sha256::digest(bytes);
    format!("sha256:{:x}", hash)
}
