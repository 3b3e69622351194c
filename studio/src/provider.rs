//! Provider client: one outbound call per request.

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;
use visionary_bria::{
    Client, GenFillRequest, ImageData, LifestyleImageRequest, LifestyleTextRequest, MaskType,
    PackshotRequest, PromptEnhanceRequest, ShadowRequest, ShadowType, TextToImageRequest,
    DEFAULT_SHOT_SIZE,
};

use super::error::{Error, Result};
use super::request::{Credential, GenerationRequest, OperationKind, OperationParams};

/// Prompt sent for erase, which runs on the generative-fill endpoint.
pub const ERASE_PROMPT: &str = "remove the object and fill with background texture";

/// Remote image service.
///
/// Each method makes exactly one call and returns the raw response body.
/// Nothing is retried.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Sends a validated request to the endpoint for its operation.
    async fn submit(&self, request: &GenerationRequest) -> Result<Value>;

    /// Removes the background of an image.
    async fn remove_background(
        &self,
        image: &[u8],
        credential: &Credential,
        content_moderation: bool,
    ) -> Result<Value>;

    /// Fetches a result asset.
    async fn download(&self, url: &str) -> Result<Vec<u8>>;
}

/// [`Provider`] backed by the Bria API.
#[derive(Clone)]
pub struct BriaProvider {
    client: Client,
}

impl BriaProvider {
    /// Wraps a client. Its own key, if any, is replaced per request.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }
}

#[async_trait]
impl Provider for BriaProvider {
    async fn submit(&self, request: &GenerationRequest) -> Result<Value> {
        let client = self.client.with_api_key(request.credential().expose());
        let kind = request.kind();
        debug!(operation = %kind, sync = request.is_sync(), "calling provider");

        let response = match (kind, request.params()) {
            (OperationKind::Generate, OperationParams::Generate(p)) => {
                let body = TextToImageRequest {
                    model_version: String::new(),
                    prompt: request.require_prompt()?.to_string(),
                    num_results: p.num_results,
                    aspect_ratio: p.aspect_ratio.clone(),
                    sync: request.is_sync(),
                    negative_prompt: request.text().negative_prompt.clone(),
                    seed: p.seed,
                    medium: Some(p.medium),
                    prompt_enhancement: p.prompt_enhancement,
                    enhance_image: p.enhance_image,
                    content_moderation: p.content_moderation,
                };
                client.image().generate(&body).await?
            }
            (OperationKind::Enhance, OperationParams::Enhance) => {
                let body = PromptEnhanceRequest {
                    prompt: request.require_prompt()?.to_string(),
                };
                client.image().enhance_prompt(&body).await?
            }
            (OperationKind::Packshot, OperationParams::Packshot(p)) => {
                let body = PackshotRequest {
                    file: image(request.require_primary()?),
                    background_color: p.background_color.clone(),
                    sku: p.sku.clone(),
                    force_rmbg: p.force_rmbg,
                    sync: request.is_sync(),
                    content_moderation: p.content_moderation,
                };
                client.product().packshot(&body).await?
            }
            (OperationKind::Shadow, OperationParams::Shadow(p)) => {
                let float = p.shadow_type == ShadowType::Float;
                let body = ShadowRequest {
                    file: image(request.require_primary()?),
                    shadow_type: p.shadow_type,
                    background_color: p.background_color.clone(),
                    shadow_color: p.shadow_color.clone(),
                    shadow_offset: p.offset,
                    shadow_intensity: p.intensity,
                    shadow_blur: p.blur,
                    shadow_width: p.width.filter(|_| float),
                    shadow_height: p.height.filter(|_| float),
                    sku: None,
                    force_rmbg: p.force_rmbg,
                    sync: request.is_sync(),
                    content_moderation: p.content_moderation,
                };
                client.product().shadow(&body).await?
            }
            (OperationKind::LifestyleByText, OperationParams::Lifestyle(p)) => {
                let body = LifestyleTextRequest {
                    file: image(request.require_primary()?),
                    scene_description: request.require_scene()?.to_string(),
                    placement_type: p.placement,
                    num_results: p.num_results,
                    sync: request.is_sync(),
                    manual_placement_selection: p.positions.clone(),
                    shot_size: DEFAULT_SHOT_SIZE,
                    optimize_description: true,
                    force_rmbg: p.force_rmbg,
                    content_moderation: p.content_moderation,
                };
                client.product().lifestyle_by_text(&body).await?
            }
            (OperationKind::LifestyleByImage, OperationParams::Lifestyle(p)) => {
                let body = LifestyleImageRequest {
                    file: image(request.require_primary()?),
                    ref_image_file: image(request.require_reference()?),
                    enhance_ref_image: p.enhance_ref_image,
                    ref_image_influence: p.ref_image_influence,
                    placement_type: p.placement,
                    num_results: p.num_results,
                    sync: request.is_sync(),
                    manual_placement_selection: p.positions.clone(),
                    shot_size: DEFAULT_SHOT_SIZE,
                    force_rmbg: p.force_rmbg,
                    content_moderation: p.content_moderation,
                };
                client.product().lifestyle_by_image(&body).await?
            }
            (OperationKind::Fill | OperationKind::Erase, OperationParams::Fill(p)) => {
                let (prompt, negative_prompt) = if kind == OperationKind::Erase {
                    (ERASE_PROMPT.to_string(), None)
                } else {
                    (
                        request.require_prompt()?.to_string(),
                        request.text().negative_prompt.clone(),
                    )
                };
                let body = GenFillRequest {
                    file: image(request.require_primary()?),
                    mask_file: image(request.require_mask()?),
                    mask_type: MaskType::Manual,
                    prompt,
                    negative_prompt,
                    num_results: p.num_results,
                    sync: request.is_sync(),
                    seed: p.seed,
                    content_moderation: p.content_moderation,
                };
                client.edit().gen_fill(&body).await?
            }
            (kind, _) => {
                return Err(Error::invalid(format!(
                    "parameters do not match operation {kind}"
                )));
            }
        };

        Ok(response)
    }

    async fn remove_background(
        &self,
        image: &[u8],
        credential: &Credential,
        content_moderation: bool,
    ) -> Result<Value> {
        let response = self
            .client
            .with_api_key(credential.expose())
            .background()
            .remove(image.to_vec(), content_moderation)
            .await?;
        Ok(response)
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>> {
        let bytes = self.client.download(url).await?;
        Ok(bytes.to_vec())
    }
}

fn image(bytes: &[u8]) -> ImageData {
    ImageData::new(bytes.to_vec())
}
