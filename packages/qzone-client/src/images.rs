//! Turns post image references into raw bytes ready for upload.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use tracing::{debug, error, warn};

use crate::client::QzoneHttpClient;

const BASE64_PREFIX: &str = "base64://";

/// Resolve each image reference to bytes.
///
/// `base64://` payloads are decoded in place and `http(s)` URLs are fetched
/// without session cookies. References that fail to resolve are logged and
/// skipped, so the result may be shorter than the input.
pub async fn normalize_images(client: &QzoneHttpClient, images: &[String]) -> Vec<Vec<u8>> {
    let mut resolved = Vec::with_capacity(images.len());

    for image in images {
        if let Some(payload) = image.strip_prefix(BASE64_PREFIX) {
            match STANDARD.decode(payload.trim()) {
                Ok(bytes) => resolved.push(bytes),
                Err(e) => error!(error = %e, "Invalid base64 image payload, skipping"),
            }
        } else if image.starts_with("http://") || image.starts_with("https://") {
            match client.download(image).await {
                Ok(bytes) => {
                    debug!(url = %image, bytes = bytes.len(), "Downloaded image");
                    resolved.push(bytes);
                }
                Err(e) => error!(url = %image, error = %e, "Image download failed, skipping"),
            }
        } else {
            warn!(reference = %truncate(image), "Unsupported image reference, skipping");
        }
    }

    resolved
}

pub(crate) fn encode(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

fn truncate(text: &str) -> String {
    text.chars().take(48).collect()
}
