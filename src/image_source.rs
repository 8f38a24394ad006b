//! # Embedded image references
//!
//! Photos live inside the model as `data:image/...;base64,...` URIs so a
//! report is self-contained. This module turns uploaded bytes into such a
//! URI (validating that they really are an image) and turns a URI back into
//! pixels for rasterization.

use base64::Engine as _;
use futures::future::{BoxFuture, FutureExt};
use image::{ImageFormat, RgbaImage};
use std::sync::Arc;

use crate::{Error, Result, ValidationRejection};

/// MIME type for the formats the decoder is built with.
pub fn sniff_mime(bytes: &[u8]) -> Option<&'static str> {
    match image::guess_format(bytes).ok()? {
        ImageFormat::Png => Some("image/png"),
        ImageFormat::Jpeg => Some("image/jpeg"),
        ImageFormat::WebP => Some("image/webp"),
        _ => None,
    }
}

/// Validate `bytes` as a decodable image and wrap them in a data URI.
///
/// The original bytes are embedded unchanged; decoding only proves they are
/// readable so a broken upload is rejected up front.
pub fn to_data_uri(bytes: &[u8]) -> Result<String> {
    let mime = sniff_mime(bytes).ok_or_else(|| {
        ValidationRejection::Unreadable("unsupported format (expected PNG, JPEG or WebP)".into())
    })?;
    image::load_from_memory(bytes).map_err(|e| ValidationRejection::Unreadable(e.to_string()))?;
    Ok(format!(
        "data:{};base64,{}",
        mime,
        base64::engine::general_purpose::STANDARD.encode(bytes)
    ))
}

/// Extract the raw bytes from a base64 `data:` URI.
pub fn decode_data_uri(src: &str) -> Result<Vec<u8>> {
    let rest = src
        .strip_prefix("data:")
        .ok_or_else(|| Error::ImageDecode("not an embedded image reference".into()))?;
    let comma = rest
        .find(',')
        .ok_or_else(|| Error::ImageDecode("invalid data URI: missing comma".into()))?;
    let (header, payload) = (&rest[..comma], &rest[comma + 1..]);
    if !header.starts_with("image/") || !header.ends_with(";base64") {
        return Err(Error::ImageDecode(format!("unsupported data URI header '{}'", header)));
    }
    base64::engine::general_purpose::STANDARD
        .decode(payload.trim())
        .map_err(|e| Error::ImageDecode(format!("base64 decode error: {}", e)))
}

/// Decode a data URI to RGBA pixels.
pub fn decode_image(src: &str) -> Result<RgbaImage> {
    let bytes = decode_data_uri(src)?;
    let img = image::load_from_memory(&bytes).map_err(|e| Error::ImageDecode(e.to_string()))?;
    Ok(img.to_rgba8())
}

/// Asynchronous image decoding used while an export waits for its photos.
///
/// The pipeline races every decode against a timeout, so an implementation
/// may take as long as it likes (or never finish) without stalling export.
pub trait ImageDecoder: Send + Sync {
    fn decode<'a>(&'a self, src: &'a str) -> BoxFuture<'a, Result<Arc<RgbaImage>>>;
}

/// Decodes on tokio's blocking pool.
#[derive(Debug, Default, Clone, Copy)]
pub struct BlockingDecoder;

impl ImageDecoder for BlockingDecoder {
    fn decode<'a>(&'a self, src: &'a str) -> BoxFuture<'a, Result<Arc<RgbaImage>>> {
        let src = src.to_string();
        async move {
            tokio::task::spawn_blocking(move || decode_image(&src))
                .await
                .map_err(|e| Error::ImageDecode(format!("decode task aborted: {}", e)))?
                .map(Arc::new)
        }
        .boxed()
    }
}
