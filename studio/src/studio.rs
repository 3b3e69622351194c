//! Request orchestration.

use std::sync::Arc;

use tracing::{info, warn};

use super::error::{Error, Result};
use super::input::{
    EnhanceInput, EraseInput, FillInput, GenerateInput, LifestyleImageInput, LifestyleTextInput,
    PackshotInput, ShadowInput,
};
use super::mapping::{apply_style, parse_placement, parse_positions, parse_shadow_type};
use super::normalize::{extract_enhanced_prompt, normalize, ResultSet};
use super::pending::{BatchKey, PendingBatch, PendingStore, PollOutcome};
use super::poll::Poller;
use super::provider::Provider;
use super::request::{
    Credential, FillParams, GenerateParams, GenerationRequest, LifestyleParams, OperationKind,
    OperationParams, PackshotParams, ShadowParams,
};

/// Default float shadow width scale.
const DEFAULT_FLOAT_WIDTH: f64 = 0.0;

/// Default float shadow height scale.
const DEFAULT_FLOAT_HEIGHT: f64 = 70.0;

/// What a feature call produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Synchronous results, ready to show.
    Ready(ResultSet),
    /// Async submission; the URLs are stored as a pending batch.
    Accepted { urls: Vec<String> },
    /// Rewritten prompt.
    Enhanced(String),
}

/// Validates feature input, calls the provider, and routes the response
/// through normalization and, for async calls, the pending store.
pub struct Studio {
    provider: Arc<dyn Provider>,
    default_credential: Option<Credential>,
    pending: PendingStore,
    poller: Poller,
}

impl Studio {
    pub fn new(provider: Arc<dyn Provider>, poller: Poller) -> Self {
        Self {
            provider,
            default_credential: None,
            pending: PendingStore::new(),
            poller,
        }
    }

    /// Sets the credential used when a request carries none.
    pub fn with_default_credential(mut self, credential: Option<Credential>) -> Self {
        self.default_credential = credential;
        self
    }

    pub fn has_default_credential(&self) -> bool {
        self.default_credential.is_some()
    }

    pub fn pending(&self) -> &PendingStore {
        &self.pending
    }

    pub fn poller(&self) -> &Poller {
        &self.poller
    }

    fn credential(&self, api_key: Option<&str>) -> Result<Credential> {
        api_key
            .and_then(Credential::new)
            .or_else(|| self.default_credential.clone())
            .ok_or(Error::Unauthenticated)
    }

    // ==================== Features ====================

    /// Generates images from a prompt.
    pub async fn generate(&self, session: &str, input: GenerateInput) -> Result<Outcome> {
        let credential = self.credential(input.api_key.as_deref())?;
        let prompt = input
            .prompt
            .filter(|p| !p.trim().is_empty())
            .ok_or_else(|| Error::invalid("prompt is required"))?;
        let styled = apply_style(input.style.as_deref(), &prompt);

        let defaults = GenerateParams::default();
        let params = GenerateParams {
            num_results: input.num_results.unwrap_or(defaults.num_results),
            aspect_ratio: input.aspect_ratio.unwrap_or(defaults.aspect_ratio),
            medium: styled.medium,
            enhance_image: styled.enhance_image && input.enhance_image.unwrap_or(true),
            seed: input.seed,
            ..defaults
        };

        let request = GenerationRequest::builder(OperationKind::Generate, credential)
            .prompt(styled.prompt)
            .negative_prompt(input.negative_prompt)
            .params(OperationParams::Generate(params))
            .sync(input.sync.unwrap_or(true))
            .build()?;
        self.dispatch(session, request).await
    }

    /// Rewrites a prompt into a richer one.
    pub async fn enhance(&self, session: &str, input: EnhanceInput) -> Result<Outcome> {
        let credential = self.credential(input.api_key.as_deref())?;
        let request = GenerationRequest::builder(OperationKind::Enhance, credential)
            .prompt(input.prompt.unwrap_or_default())
            .build()?;

        info!(feature = %OperationKind::Enhance, session, "enhancing prompt");
        let response = self.provider.submit(&request).await.inspect_err(|e| {
            warn!(feature = %OperationKind::Enhance, session, error = %e, "provider call failed");
        })?;
        Ok(Outcome::Enhanced(extract_enhanced_prompt(&response)?))
    }

    /// Places a product on a clean background.
    pub async fn packshot(&self, session: &str, input: PackshotInput) -> Result<Outcome> {
        let credential = self.credential(input.api_key.as_deref())?;
        let defaults = PackshotParams::default();
        let params = PackshotParams {
            background_color: input.background_color.unwrap_or(defaults.background_color),
            sku: input.sku.filter(|s| !s.trim().is_empty()),
            force_rmbg: input.force_rmbg.unwrap_or(defaults.force_rmbg),
            content_moderation: input
                .content_moderation
                .unwrap_or(defaults.content_moderation),
        };

        let request = GenerationRequest::builder(OperationKind::Packshot, credential)
            .primary_image(input.image)
            .params(OperationParams::Packshot(params.clone()))
            .sync(input.sync.unwrap_or(true))
            .build()?;
        let request = if params.force_rmbg {
            self.with_background_removed(request, params.content_moderation)
                .await?
        } else {
            request
        };
        self.dispatch(session, request).await
    }

    /// Composites a shadow under a product.
    pub async fn shadow(&self, session: &str, input: ShadowInput) -> Result<Outcome> {
        let credential = self.credential(input.api_key.as_deref())?;
        let defaults = ShadowParams::default();
        let shadow_type = match input.shadow_type.as_deref() {
            Some(name) => parse_shadow_type(name)?,
            None => defaults.shadow_type,
        };
        let float = shadow_type == visionary_bria::ShadowType::Float;
        let params = ShadowParams {
            shadow_type,
            background_color: input.background_color.filter(|c| !c.trim().is_empty()),
            shadow_color: input.shadow_color.unwrap_or(defaults.shadow_color),
            offset: [
                input.offset_x.unwrap_or(defaults.offset[0]),
                input.offset_y.unwrap_or(defaults.offset[1]),
            ],
            intensity: input.intensity.unwrap_or(defaults.intensity),
            blur: input.blur.unwrap_or(defaults.blur),
            width: float.then(|| input.width.unwrap_or(DEFAULT_FLOAT_WIDTH)),
            height: float.then(|| input.height.unwrap_or(DEFAULT_FLOAT_HEIGHT)),
            force_rmbg: input.force_rmbg.unwrap_or(defaults.force_rmbg),
            content_moderation: input
                .content_moderation
                .unwrap_or(defaults.content_moderation),
        };

        let request = GenerationRequest::builder(OperationKind::Shadow, credential)
            .primary_image(input.image)
            .params(OperationParams::Shadow(params.clone()))
            .sync(input.sync.unwrap_or(true))
            .build()?;
        let request = if params.force_rmbg {
            self.with_background_removed(request, params.content_moderation)
                .await?
        } else {
            request
        };
        self.dispatch(session, request).await
    }

    /// Generates a scene around a product from a text description.
    pub async fn lifestyle_by_text(
        &self,
        session: &str,
        input: LifestyleTextInput,
    ) -> Result<Outcome> {
        let credential = self.credential(input.api_key.as_deref())?;
        let params = lifestyle_params(
            input.placement_type.as_deref(),
            input.positions.as_deref(),
            input.num_results,
            None,
            input.content_moderation,
        )?;

        let request = GenerationRequest::builder(OperationKind::LifestyleByText, credential)
            .primary_image(input.image)
            .scene_description(input.scene_description)
            .params(OperationParams::Lifestyle(params))
            .sync(input.sync.unwrap_or(true))
            .build()?;
        self.dispatch(session, request).await
    }

    /// Generates a scene around a product in the style of a reference image.
    pub async fn lifestyle_by_image(
        &self,
        session: &str,
        input: LifestyleImageInput,
    ) -> Result<Outcome> {
        let credential = self.credential(input.api_key.as_deref())?;
        let params = lifestyle_params(
            input.placement_type.as_deref(),
            input.positions.as_deref(),
            input.num_results,
            input.ref_image_influence,
            input.content_moderation,
        )?;

        let request = GenerationRequest::builder(OperationKind::LifestyleByImage, credential)
            .primary_image(input.image)
            .reference_image(input.reference_image)
            .params(OperationParams::Lifestyle(params))
            .sync(input.sync.unwrap_or(true))
            .build()?;
        self.dispatch(session, request).await
    }

    /// Regenerates the masked region of an image from a prompt.
    pub async fn fill(&self, session: &str, input: FillInput) -> Result<Outcome> {
        let credential = self.credential(input.api_key.as_deref())?;
        let defaults = FillParams::default();
        let params = FillParams {
            num_results: input.num_results.unwrap_or(defaults.num_results),
            seed: input.seed,
            content_moderation: input
                .content_moderation
                .unwrap_or(defaults.content_moderation),
        };

        let request = GenerationRequest::builder(OperationKind::Fill, credential)
            .primary_image(input.image)
            .mask(input.mask)
            .prompt(input.prompt.unwrap_or_default())
            .negative_prompt(input.negative_prompt)
            .params(OperationParams::Fill(params))
            .sync(input.sync.unwrap_or(true))
            .build()?;
        self.dispatch(session, request).await
    }

    /// Removes the masked object and fills the hole with background.
    pub async fn erase(&self, session: &str, input: EraseInput) -> Result<Outcome> {
        let credential = self.credential(input.api_key.as_deref())?;
        let params = FillParams {
            content_moderation: input.content_moderation.unwrap_or(false),
            ..FillParams::default()
        };

        let request = GenerationRequest::builder(OperationKind::Erase, credential)
            .primary_image(input.image)
            .mask(input.mask)
            .params(OperationParams::Fill(params))
            .sync(input.sync.unwrap_or(true))
            .build()?;
        self.dispatch(session, request).await
    }

    // ==================== Pending Results ====================

    /// Polls the pending batch of a feature.
    ///
    /// With `wait`, runs the bounded wrapper instead of a single pass.
    pub async fn poll(
        &self,
        session: &str,
        feature: OperationKind,
        wait: bool,
    ) -> Result<PollOutcome> {
        let key = BatchKey::new(session, feature);
        let outcome = if wait {
            self.pending.poll_bounded(&key, &self.poller).await?
        } else {
            self.pending.poll(&key, &self.poller).await?
        };
        info!(
            batch = %key,
            passes = outcome.report.passes,
            newly_ready = outcome.report.newly_ready.len(),
            state = outcome.batch.state().as_str(),
            "polled pending batch"
        );
        Ok(outcome)
    }

    /// Drops the pending batch of a feature.
    pub async fn abandon(&self, session: &str, feature: OperationKind) -> Result<PendingBatch> {
        let key = BatchKey::new(session, feature);
        let batch = self
            .pending
            .remove(&key)
            .await
            .ok_or_else(|| Error::NoPendingBatch(key.to_string()))?;
        info!(batch = %key, pending = batch.pending().len(), "abandoned pending batch");
        Ok(batch)
    }

    // ==================== Dispatch ====================

    async fn dispatch(&self, session: &str, request: GenerationRequest) -> Result<Outcome> {
        let feature = request.kind();
        let sync = request.is_sync();
        info!(%feature, session, sync, "submitting request");

        let response = self.provider.submit(&request).await.inspect_err(|e| {
            warn!(%feature, session, error = %e, "provider call failed");
        })?;

        let set = normalize(&response, sync).into_result().inspect_err(|_| {
            warn!(%feature, session, "unrecognized provider response");
        })?;

        if sync {
            return Ok(Outcome::Ready(set));
        }

        let batch = PendingBatch::new(set.urls);
        let urls = batch.submitted().to_vec();
        self.pending
            .insert(BatchKey::new(session, feature), batch)
            .await;
        info!(%feature, session, urls = urls.len(), "accepted async request");
        Ok(Outcome::Accepted { urls })
    }

    /// Runs background removal and swaps its output in as the primary image.
    ///
    /// Any failure aborts with [`Error::UpstreamDependencyFailed`].
    async fn with_background_removed(
        &self,
        request: GenerationRequest,
        content_moderation: bool,
    ) -> Result<GenerationRequest> {
        let feature = request.kind();
        if !feature.supports_background_prestep() {
            return Err(Error::invalid(format!(
                "{feature} does not take background removal"
            )));
        }
        let image = request.require_primary()?;

        let response = self
            .provider
            .remove_background(image, request.credential(), content_moderation)
            .await
            .map_err(|e| prestep_failed(feature, e.to_string()))?;
        let url = normalize(&response, true)
            .first()
            .map(str::to_string)
            .ok_or_else(|| prestep_failed(feature, "no image returned".to_string()))?;
        let bytes = self
            .provider
            .download(&url)
            .await
            .map_err(|e| prestep_failed(feature, e.to_string()))?;

        GenerationRequest::builder(feature, request.credential().clone())
            .primary_image(Some(bytes))
            .params(request.params().clone())
            .sync(request.is_sync())
            .build()
            .map_err(|e| prestep_failed(feature, e.to_string()))
    }
}

fn prestep_failed(feature: OperationKind, reason: String) -> Error {
    warn!(%feature, reason = %reason, "background removal failed");
    Error::UpstreamDependencyFailed(format!("background removal: {reason}"))
}

fn lifestyle_params(
    placement: Option<&str>,
    positions: Option<&str>,
    num_results: Option<u32>,
    ref_image_influence: Option<f64>,
    content_moderation: Option<bool>,
) -> Result<LifestyleParams> {
    let defaults = LifestyleParams::default();
    Ok(LifestyleParams {
        placement: match placement {
            Some(name) => parse_placement(name)?,
            None => defaults.placement,
        },
        positions: positions.map(parse_positions).unwrap_or_default(),
        num_results: num_results.unwrap_or(defaults.num_results),
        ref_image_influence: ref_image_influence.unwrap_or(defaults.ref_image_influence),
        content_moderation: content_moderation.unwrap_or(defaults.content_moderation),
        ..defaults
    })
}
