//! Background service.

use std::sync::Arc;

use serde_json::Value;

use super::{error::Result, http::HttpClient, models::PATH_BACKGROUND_REMOVE};

/// Background service.
pub struct BackgroundService {
    http: Arc<HttpClient>,
    api_key: String,
}

impl BackgroundService {
    pub(crate) fn new(http: Arc<HttpClient>, api_key: String) -> Self {
        Self { http, api_key }
    }

    /// Removes the background of an image.
    ///
    /// The image is uploaded as multipart form data; the response carries a
    /// `result_url` pointing at a transparent PNG.
    pub async fn remove(&self, image: Vec<u8>, content_moderation: bool) -> Result<Value> {
        self.http
            .post_multipart(
                &self.api_key,
                PATH_BACKGROUND_REMOVE,
                image,
                "image.png",
                vec![("content_moderation", content_moderation.to_string())],
            )
            .await
    }
}
