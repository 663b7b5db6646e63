//! Share links: the whole trace text gzipped into the URL fragment.
//!
//! Format: `z=<base64url(gzip(text))>`, no padding.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use flate2::{read::GzDecoder, write::GzEncoder, Compression};
use serde::Serialize;
use std::io::{Read, Write};
use tracing::{debug, warn};

use crate::error::ShareError;

/// Fragments longer than this are refused; browsers and chat apps truncate.
pub const MAX_HASH_SIZE: usize = 8192;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShareLink {
    pub url: String,
    /// Length of the fragment in bytes
    pub size: usize,
    pub compressed: bool,
}

pub fn compress_to_hash(text: &str) -> Result<String, ShareError> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(text.as_bytes())?;
    let gz = encoder.finish()?;
    Ok(format!("z={}", URL_SAFE_NO_PAD.encode(gz)))
}

/// Recover the text from a fragment (with or without the leading `#`).
pub fn decompress_from_hash(hash: &str) -> Option<String> {
    let query = hash.strip_prefix('#').unwrap_or(hash);
    let raw = query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == "z")
        .map(|(_, value)| value)?;

    match decode_payload(raw) {
        Ok(text) => Some(text),
        Err(e) => {
            warn!("Failed to decompress from hash: {}", e);
            None
        }
    }
}

fn decode_payload(raw: &str) -> Result<String, String> {
    let value = urlencoding::decode(raw).map_err(|e| e.to_string())?;
    let bytes = URL_SAFE_NO_PAD
        .decode(value.trim_end_matches('='))
        .map_err(|e| e.to_string())?;
    let mut text = String::new();
    GzDecoder::new(bytes.as_slice())
        .read_to_string(&mut text)
        .map_err(|e| e.to_string())?;
    Ok(text)
}

/// Build `<base_url>#z=...`, dropping any query or fragment on the base.
pub fn create_share_link(base_url: &str, text: &str) -> Result<ShareLink, ShareError> {
    let hash = compress_to_hash(text)?;
    debug!(
        "Compressed trace: {} bytes -> {} bytes",
        text.len(),
        hash.len()
    );

    if hash.len() > MAX_HASH_SIZE {
        return Err(ShareError::TooLarge {
            size: hash.len(),
            limit: MAX_HASH_SIZE,
        });
    }

    let end = base_url.find(['?', '#']).unwrap_or(base_url.len());
    Ok(ShareLink {
        url: format!("{}#{}", &base_url[..end], hash),
        size: hash.len(),
        compressed: true,
    })
}
