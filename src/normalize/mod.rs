//! Image URL normalization.
//!
//! Editors often paste an image-search result link instead of the image itself.
//! Those links carry the real image address percent-encoded in a query parameter.

use crate::errors::AppError;

/// Substring that identifies an image-search redirect link.
const IMAGE_SEARCH_MARKER: &str = "google.com/imgres";

/// Query parameter holding the encoded target URL.
const TARGET_PARAM: &str = "imgurl=";

/// Return the direct image URL for an image-search redirect link, or `url` unchanged.
///
/// Never fails: undecodable targets are logged and the input is passed through.
pub fn normalize_image_url(url: &str) -> String {
    match extract_target(url) {
        Ok(Some(target)) => target,
        Ok(None) => url.to_string(),
        Err(err) => {
            tracing::warn!("Error extracting image URL from {:?}: {}", url, err);
            url.to_string()
        }
    }
}

/// Normalize an optional image URL, dropping blank values.
pub fn normalize_optional(url: Option<&str>) -> Option<String> {
    url.map(str::trim)
        .filter(|u| !u.is_empty())
        .map(normalize_image_url)
}

fn extract_target(url: &str) -> Result<Option<String>, AppError> {
    if !url.contains(IMAGE_SEARCH_MARKER) {
        return Ok(None);
    }

    let Some(start) = url.find(TARGET_PARAM) else {
        return Ok(None);
    };
    let encoded = url[start + TARGET_PARAM.len()..]
        .split('&')
        .next()
        .unwrap_or_default();
    if encoded.is_empty() {
        return Ok(None);
    }

    check_escapes(encoded)?;
    urlencoding::decode(encoded)
        .map(|decoded| Some(decoded.into_owned()))
        .map_err(|e| AppError::Normalization(format!("target is not valid UTF-8: {}", e)))
}

/// Every `%` must start a two-digit hex escape.
fn check_escapes(encoded: &str) -> Result<(), AppError> {
    let bytes = encoded.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let escape = bytes.get(i + 1..i + 3);
            let valid = escape.is_some_and(|pair| pair.iter().all(u8::is_ascii_hexdigit));
            if !valid {
                return Err(AppError::Normalization(format!(
                    "malformed escape at byte {}",
                    i
                )));
            }
            i += 3;
        } else {
            i += 1;
        }
    }
    Ok(())
}
