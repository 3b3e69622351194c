//! Product photography service: packshots, shadows and lifestyle scenes.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use super::{
    error::Result,
    http::HttpClient,
    models::{PATH_LIFESTYLE_IMAGE, PATH_LIFESTYLE_TEXT, PATH_PACKSHOT, PATH_SHADOW},
    types::{ImageData, PlacementType, ShadowType},
};

/// Product photography service.
pub struct ProductService {
    http: Arc<HttpClient>,
    api_key: String,
}

impl ProductService {
    pub(crate) fn new(http: Arc<HttpClient>, api_key: String) -> Self {
        Self { http, api_key }
    }

    /// Places the product on a clean background.
    pub async fn packshot(&self, request: &PackshotRequest) -> Result<Value> {
        self.http
            .post_json(&self.api_key, PATH_PACKSHOT, request)
            .await
    }

    /// Composites a shadow under the product.
    pub async fn shadow(&self, request: &ShadowRequest) -> Result<Value> {
        self.http.post_json(&self.api_key, PATH_SHADOW, request).await
    }

    /// Generates a scene around the product from a text description.
    pub async fn lifestyle_by_text(&self, request: &LifestyleTextRequest) -> Result<Value> {
        self.http
            .post_json(&self.api_key, PATH_LIFESTYLE_TEXT, request)
            .await
    }

    /// Generates a scene around the product in the style of a reference image.
    pub async fn lifestyle_by_image(&self, request: &LifestyleImageRequest) -> Result<Value> {
        self.http
            .post_json(&self.api_key, PATH_LIFESTYLE_IMAGE, request)
            .await
    }
}

// ==================== Request Types ====================

/// Request for a packshot.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PackshotRequest {
    /// Product image.
    pub file: ImageData,

    /// Background color as `#RRGGBB`.
    pub background_color: String,

    /// Stock keeping unit echoed in the result metadata.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,

    /// Remove the background even if the image already looks isolated.
    pub force_rmbg: bool,

    pub sync: bool,

    pub content_moderation: bool,
}

/// Request for a product shadow.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ShadowRequest {
    /// Product image.
    pub file: ImageData,

    /// Shadow style.
    #[serde(rename = "type")]
    pub shadow_type: ShadowType,

    /// Background color, transparent when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,

    pub shadow_color: String,

    /// `[x, y]` offset in pixels.
    pub shadow_offset: [f64; 2],

    /// Opacity, 0-100.
    pub shadow_intensity: f64,

    /// Blur radius, 0-100.
    pub shadow_blur: f64,

    /// Width scale, float shadows only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shadow_width: Option<f64>,

    /// Height scale, float shadows only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shadow_height: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,

    pub force_rmbg: bool,

    pub sync: bool,

    pub content_moderation: bool,
}

/// Request for a lifestyle shot described by text.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LifestyleTextRequest {
    /// Product image.
    pub file: ImageData,

    /// Scene to generate around the product.
    pub scene_description: String,

    pub placement_type: PlacementType,

    pub num_results: u32,

    pub sync: bool,

    /// Positions used with [`PlacementType::ManualPlacement`].
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub manual_placement_selection: Vec<String>,

    /// Output size in pixels.
    pub shot_size: [u32; 2],

    /// Let the provider rewrite the scene description.
    pub optimize_description: bool,

    pub force_rmbg: bool,

    pub content_moderation: bool,
}

/// Request for a lifestyle shot guided by a reference image.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LifestyleImageRequest {
    /// Product image.
    pub file: ImageData,

    /// Reference scene.
    pub ref_image_file: ImageData,

    /// Clean up the reference before using it.
    pub enhance_ref_image: bool,

    /// How strongly the reference steers the result, 0-1.
    pub ref_image_influence: f64,

    pub placement_type: PlacementType,

    pub num_results: u32,

    pub sync: bool,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub manual_placement_selection: Vec<String>,

    pub shot_size: [u32; 2],

    pub force_rmbg: bool,

    pub content_moderation: bool,
}
