//! Image editing service.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use super::{
    error::Result,
    http::HttpClient,
    models::PATH_GEN_FILL,
    types::{ImageData, MaskType},
};

/// Image editing service.
pub struct EditService {
    http: Arc<HttpClient>,
    api_key: String,
}

impl EditService {
    pub(crate) fn new(http: Arc<HttpClient>, api_key: String) -> Self {
        Self { http, api_key }
    }

    /// Regenerates the masked region of an image from a prompt.
    ///
    /// White pixels in the mask are replaced, black pixels are kept.
    pub async fn gen_fill(&self, request: &GenFillRequest) -> Result<Value> {
        self.http
            .post_json(&self.api_key, PATH_GEN_FILL, request)
            .await
    }
}

/// Request for generative fill.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GenFillRequest {
    /// Source image.
    pub file: ImageData,

    /// Region to regenerate.
    pub mask_file: ImageData,

    pub mask_type: MaskType,

    /// What to paint into the masked region.
    pub prompt: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub negative_prompt: Option<String>,

    pub num_results: u32,

    pub sync: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,

    pub content_moderation: bool,
}
