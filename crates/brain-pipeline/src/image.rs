//! Moving chat images from the messaging platform into object storage.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::{info, warn};

use brain_core::{Error, ImageUploadResult, Result};

use crate::line::MessagingClient;
use crate::storage::ObjectStorage;

/// Assumed when the platform does not declare a content type.
pub const DEFAULT_IMAGE_CONTENT_TYPE: &str = "image/jpeg";

/// File extension for an image MIME type, `jpg` when unknown.
pub fn extension_for(content_type: &str) -> &'static str {
    match content_type {
        "image/png" => "png",
        "image/gif" => "gif",
        "image/webp" => "webp",
        _ => "jpg",
    }
}

/// Storage key for an image: `<owner>/<message_id>-<unix_millis>.<ext>`.
pub fn object_path(owner_id: &str, message_id: &str, content_type: &str, millis: i64) -> String {
    format!(
        "{}/{}-{}.{}",
        owner_id,
        message_id,
        millis,
        extension_for(content_type)
    )
}

/// Downloads images from chat and stores them.
#[derive(Clone)]
pub struct ImageHandler {
    messaging: Arc<dyn MessagingClient>,
    storage: Arc<dyn ObjectStorage>,
}

impl ImageHandler {
    pub fn new(messaging: Arc<dyn MessagingClient>, storage: Arc<dyn ObjectStorage>) -> Self {
        Self { messaging, storage }
    }

    /// Copy a chat image into storage and return its public URL.
    pub async fn process_line_image(
        &self,
        owner_id: &str,
        message_id: &str,
    ) -> Result<ImageUploadResult> {
        let start = Instant::now();

        let content_type = self
            .messaging
            .content_type(message_id)
            .await?
            .unwrap_or_else(|| DEFAULT_IMAGE_CONTENT_TYPE.to_string());

        let data = self.messaging.download_content(message_id).await?;
        let size = data.len();

        let path = object_path(
            owner_id,
            message_id,
            &content_type,
            Utc::now().timestamp_millis(),
        );
        self.storage.upload(&path, data, &content_type).await?;

        info!(
            subsystem = "pipeline",
            component = "image",
            op = "process_line_image",
            message_id = %message_id,
            content_type = %content_type,
            size,
            duration_ms = start.elapsed().as_millis() as u64,
            "Image stored"
        );

        Ok(ImageUploadResult {
            image_url: self.storage.public_url(&path),
            size,
        })
    }

    /// Remove the stored object behind a public image URL.
    pub async fn delete_image(&self, image_url: &str) -> Result<()> {
        let path = self
            .storage
            .path_from_public_url(image_url)
            .ok_or_else(|| Error::InvalidInput("Invalid image URL".to_string()))?;
        self.storage.remove(&[path]).await
    }

    /// Delete an image, logging instead of failing.
    pub async fn delete_image_best_effort(&self, image_url: &str) {
        if let Err(e) = self.delete_image(image_url).await {
            warn!(
                subsystem = "pipeline",
                component = "image",
                op = "delete_image",
                error = %e,
                "Failed to delete image"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_mapping() {
        assert_eq!(extension_for("image/jpeg"), "jpg");
        assert_eq!(extension_for("image/png"), "png");
        assert_eq!(extension_for("image/gif"), "gif");
        assert_eq!(extension_for("image/webp"), "webp");
        assert_eq!(extension_for("image/heic"), "jpg");
        assert_eq!(extension_for(""), "jpg");
    }

    #[test]
    fn test_object_path() {
        assert_eq!(
            object_path("U123", "m9", "image/png", 1_700_000_000_000),
            "U123/m9-1700000000000.png"
        );
    }
}
