//! Text-to-image and prompt enhancement service.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use super::{
    error::Result,
    http::HttpClient,
    models::{MODEL_VERSION_HD_2_2, PATH_PROMPT_ENHANCER, PATH_TEXT_TO_IMAGE_HD},
    types::Medium,
};

/// Text-to-image and prompt enhancement service.
pub struct ImageService {
    http: Arc<HttpClient>,
    api_key: String,
}

impl ImageService {
    pub(crate) fn new(http: Arc<HttpClient>, api_key: String) -> Self {
        Self { http, api_key }
    }

    /// Generates HD images from a text prompt.
    ///
    /// With `sync = false` the provider answers immediately with URLs whose
    /// content appears later.
    pub async fn generate(&self, request: &TextToImageRequest) -> Result<Value> {
        let version = if request.model_version.is_empty() {
            MODEL_VERSION_HD_2_2
        } else {
            request.model_version.as_str()
        };
        let path = format!("{}/{}", PATH_TEXT_TO_IMAGE_HD, version);

        self.http.post_json(&self.api_key, &path, request).await
    }

    /// Rewrites a short prompt into a richer one.
    pub async fn enhance_prompt(&self, request: &PromptEnhanceRequest) -> Result<Value> {
        self.http
            .post_json(&self.api_key, PATH_PROMPT_ENHANCER, request)
            .await
    }
}

// ==================== Request Types ====================

/// Request for text-to-image HD generation.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TextToImageRequest {
    /// Model version, part of the path. Empty means the default.
    #[serde(skip)]
    pub model_version: String,

    /// Image description.
    pub prompt: String,

    /// Number of images to generate (1-4).
    pub num_results: u32,

    /// Aspect ratio, one of [`crate::ASPECT_RATIOS`].
    #[serde(skip_serializing_if = "String::is_empty")]
    pub aspect_ratio: String,

    /// Wait for the images instead of returning placeholder URLs.
    pub sync: bool,

    /// Things to keep out of the image.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub negative_prompt: Option<String>,

    /// Seed for reproducible output.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,

    /// Rendering medium.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub medium: Option<Medium>,

    /// Let the provider rewrite the prompt.
    pub prompt_enhancement: bool,

    /// Apply the provider's detail enhancement pass.
    pub enhance_image: bool,

    /// Reject unsafe prompts and outputs.
    pub content_moderation: bool,
}

/// Request for prompt enhancement.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PromptEnhanceRequest {
    /// Prompt to enhance.
    pub prompt: String,
}
