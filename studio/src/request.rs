//! Generation request data model.

use std::fmt;

use visionary_bria::{
    Medium, PlacementType, ShadowType, ASPECT_RATIOS, DEFAULT_BACKGROUND_COLOR,
    DEFAULT_REF_IMAGE_INFLUENCE, DEFAULT_SHADOW_COLOR, MAX_NUM_RESULTS,
};

use super::error::{Error, Result};

// ==================== Operation Kind ====================

/// The features this service exposes, one provider operation each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Generate,
    Enhance,
    Packshot,
    Shadow,
    LifestyleByText,
    LifestyleByImage,
    Fill,
    Erase,
}

impl OperationKind {
    /// All operation kinds.
    pub const ALL: [OperationKind; 8] = [
        OperationKind::Generate,
        OperationKind::Enhance,
        OperationKind::Packshot,
        OperationKind::Shadow,
        OperationKind::LifestyleByText,
        OperationKind::LifestyleByImage,
        OperationKind::Fill,
        OperationKind::Erase,
    ];

    /// Returns the stable feature name used in keys, routes and logs.
    pub fn name(&self) -> &'static str {
        match self {
            OperationKind::Generate => "generate",
            OperationKind::Enhance => "enhance",
            OperationKind::Packshot => "packshot",
            OperationKind::Shadow => "shadow",
            OperationKind::LifestyleByText => "lifestyle_text",
            OperationKind::LifestyleByImage => "lifestyle_image",
            OperationKind::Fill => "fill",
            OperationKind::Erase => "erase",
        }
    }

    /// Parses a feature name. Dashes are accepted in place of underscores.
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim().replace('-', "_");
        Self::ALL.into_iter().find(|k| k.name() == name)
    }

    /// Returns true if the operation produces image URLs.
    pub fn produces_images(&self) -> bool {
        !matches!(self, OperationKind::Enhance)
    }

    /// Returns true if background removal may run before this operation.
    pub fn supports_background_prestep(&self) -> bool {
        matches!(self, OperationKind::Packshot | OperationKind::Shadow)
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ==================== Credential ====================

/// Provider credential. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Wraps a key, returning None for blank input.
    pub fn new(key: impl Into<String>) -> Option<Self> {
        let key = key.into();
        let trimmed = key.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(Self(trimmed.to_string()))
    }

    /// Returns the raw key for the outbound request header.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

// ==================== Payloads ====================

/// Binary image inputs.
#[derive(Debug, Clone, Default)]
pub struct ImagePayloads {
    pub primary: Option<Vec<u8>>,
    pub mask: Option<Vec<u8>>,
    pub reference: Option<Vec<u8>>,
}

/// Free-text inputs.
#[derive(Debug, Clone, Default)]
pub struct TextParams {
    pub prompt: Option<String>,
    pub negative_prompt: Option<String>,
    pub scene_description: Option<String>,
}

/// Text-to-image parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateParams {
    pub num_results: u32,
    pub aspect_ratio: String,
    pub medium: Medium,
    pub enhance_image: bool,
    pub prompt_enhancement: bool,
    pub content_moderation: bool,
    pub seed: Option<u64>,
}

impl Default for GenerateParams {
    fn default() -> Self {
        Self {
            num_results: 1,
            aspect_ratio: "1:1".to_string(),
            medium: Medium::Photography,
            enhance_image: true,
            prompt_enhancement: false,
            content_moderation: true,
            seed: None,
        }
    }
}

/// Packshot parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct PackshotParams {
    pub background_color: String,
    pub sku: Option<String>,
    pub force_rmbg: bool,
    pub content_moderation: bool,
}

impl Default for PackshotParams {
    fn default() -> Self {
        Self {
            background_color: DEFAULT_BACKGROUND_COLOR.to_string(),
            sku: None,
            force_rmbg: false,
            content_moderation: false,
        }
    }
}

/// Shadow parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ShadowParams {
    pub shadow_type: ShadowType,
    pub background_color: Option<String>,
    pub shadow_color: String,
    pub offset: [f64; 2],
    pub intensity: f64,
    pub blur: f64,
    /// Width scale, float shadows only.
    pub width: Option<f64>,
    /// Height scale, float shadows only.
    pub height: Option<f64>,
    pub force_rmbg: bool,
    pub content_moderation: bool,
}

impl Default for ShadowParams {
    fn default() -> Self {
        Self {
            shadow_type: ShadowType::Regular,
            background_color: None,
            shadow_color: DEFAULT_SHADOW_COLOR.to_string(),
            offset: [0.0, 15.0],
            intensity: 60.0,
            blur: 20.0,
            width: None,
            height: None,
            force_rmbg: true,
            content_moderation: false,
        }
    }
}

/// Lifestyle scene parameters, shared by the text and image variants.
#[derive(Debug, Clone, PartialEq)]
pub struct LifestyleParams {
    pub placement: PlacementType,
    pub positions: Vec<String>,
    pub num_results: u32,
    pub enhance_ref_image: bool,
    pub ref_image_influence: f64,
    pub force_rmbg: bool,
    pub content_moderation: bool,
}

impl Default for LifestyleParams {
    fn default() -> Self {
        Self {
            placement: PlacementType::Original,
            positions: Vec::new(),
            num_results: 1,
            enhance_ref_image: true,
            ref_image_influence: DEFAULT_REF_IMAGE_INFLUENCE,
            force_rmbg: true,
            content_moderation: false,
        }
    }
}

/// Generative fill and erase parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct FillParams {
    pub num_results: u32,
    pub seed: Option<u64>,
    pub content_moderation: bool,
}

impl Default for FillParams {
    fn default() -> Self {
        Self {
            num_results: 1,
            seed: None,
            content_moderation: false,
        }
    }
}

/// Numeric and enumerated parameters, one variant per parameter family.
#[derive(Debug, Clone, PartialEq)]
pub enum OperationParams {
    Generate(GenerateParams),
    Enhance,
    Packshot(PackshotParams),
    Shadow(ShadowParams),
    Lifestyle(LifestyleParams),
    Fill(FillParams),
}

impl OperationParams {
    /// Returns the defaults for an operation kind.
    pub fn default_for(kind: OperationKind) -> Self {
        match kind {
            OperationKind::Generate => OperationParams::Generate(GenerateParams::default()),
            OperationKind::Enhance => OperationParams::Enhance,
            OperationKind::Packshot => OperationParams::Packshot(PackshotParams::default()),
            OperationKind::Shadow => OperationParams::Shadow(ShadowParams::default()),
            OperationKind::LifestyleByText | OperationKind::LifestyleByImage => {
                OperationParams::Lifestyle(LifestyleParams::default())
            }
            OperationKind::Fill | OperationKind::Erase => {
                OperationParams::Fill(FillParams::default())
            }
        }
    }

    fn fits(&self, kind: OperationKind) -> bool {
        matches!(
            (kind, self),
            (OperationKind::Generate, OperationParams::Generate(_))
                | (OperationKind::Enhance, OperationParams::Enhance)
                | (OperationKind::Packshot, OperationParams::Packshot(_))
                | (OperationKind::Shadow, OperationParams::Shadow(_))
                | (OperationKind::LifestyleByText, OperationParams::Lifestyle(_))
                | (OperationKind::LifestyleByImage, OperationParams::Lifestyle(_))
                | (OperationKind::Fill, OperationParams::Fill(_))
                | (OperationKind::Erase, OperationParams::Fill(_))
        )
    }
}

// ==================== Generation Request ====================

/// One validated call to the provider.
///
/// Built through [`GenerationRequest::builder`], which checks every field
/// the operation requires; a constructed request is immutable.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    kind: OperationKind,
    images: ImagePayloads,
    text: TextParams,
    params: OperationParams,
    sync: bool,
    credential: Credential,
}

impl GenerationRequest {
    /// Starts a request for `kind` authenticated with `credential`.
    pub fn builder(kind: OperationKind, credential: Credential) -> GenerationRequestBuilder {
        GenerationRequestBuilder {
            kind,
            credential,
            images: ImagePayloads::default(),
            text: TextParams::default(),
            params: None,
            sync: true,
        }
    }

    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    pub fn images(&self) -> &ImagePayloads {
        &self.images
    }

    pub fn text(&self) -> &TextParams {
        &self.text
    }

    pub fn params(&self) -> &OperationParams {
        &self.params
    }

    pub fn is_sync(&self) -> bool {
        self.sync
    }

    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    /// Returns the primary image, which validation guarantees for image operations.
    pub(crate) fn require_primary(&self) -> Result<&[u8]> {
        non_empty_bytes(&self.images.primary).ok_or_else(|| Error::invalid("image is required"))
    }

    pub(crate) fn require_mask(&self) -> Result<&[u8]> {
        non_empty_bytes(&self.images.mask).ok_or_else(|| Error::invalid("mask is required"))
    }

    pub(crate) fn require_reference(&self) -> Result<&[u8]> {
        non_empty_bytes(&self.images.reference)
            .ok_or_else(|| Error::invalid("reference image is required"))
    }

    pub(crate) fn require_prompt(&self) -> Result<&str> {
        non_blank(&self.text.prompt).ok_or_else(|| Error::invalid("prompt is required"))
    }

    pub(crate) fn require_scene(&self) -> Result<&str> {
        non_blank(&self.text.scene_description)
            .ok_or_else(|| Error::invalid("scene_description is required"))
    }
}

/// Builder for [`GenerationRequest`].
pub struct GenerationRequestBuilder {
    kind: OperationKind,
    credential: Credential,
    images: ImagePayloads,
    text: TextParams,
    params: Option<OperationParams>,
    sync: bool,
}

impl GenerationRequestBuilder {
    pub fn primary_image(mut self, image: Option<Vec<u8>>) -> Self {
        self.images.primary = image;
        self
    }

    pub fn mask(mut self, mask: Option<Vec<u8>>) -> Self {
        self.images.mask = mask;
        self
    }

    pub fn reference_image(mut self, image: Option<Vec<u8>>) -> Self {
        self.images.reference = image;
        self
    }

    pub fn prompt(mut self, prompt: impl Into<String>) -> Self {
        self.text.prompt = Some(prompt.into());
        self
    }

    pub fn negative_prompt(mut self, prompt: Option<String>) -> Self {
        self.text.negative_prompt = prompt;
        self
    }

    pub fn scene_description(mut self, scene: Option<String>) -> Self {
        self.text.scene_description = scene;
        self
    }

    pub fn params(mut self, params: OperationParams) -> Self {
        self.params = Some(params);
        self
    }

    pub fn sync(mut self, sync: bool) -> Self {
        self.sync = sync;
        self
    }

    /// Validates the fields required by the operation and builds the request.
    pub fn build(self) -> Result<GenerationRequest> {
        let params = self
            .params
            .unwrap_or_else(|| OperationParams::default_for(self.kind));
        if !params.fits(self.kind) {
            return Err(Error::invalid(format!(
                "parameters do not match operation {}",
                self.kind
            )));
        }

        let request = GenerationRequest {
            kind: self.kind,
            images: self.images,
            text: self.text,
            params,
            sync: self.sync,
            credential: self.credential,
        };
        validate(&request)?;
        Ok(request)
    }
}

fn validate(request: &GenerationRequest) -> Result<()> {
    match request.kind {
        OperationKind::Generate => {
            request.require_prompt()?;
        }
        OperationKind::Enhance => {
            request.require_prompt()?;
        }
        OperationKind::Packshot | OperationKind::Shadow => {
            request.require_primary()?;
        }
        OperationKind::LifestyleByText => {
            request.require_primary()?;
            request.require_scene()?;
        }
        OperationKind::LifestyleByImage => {
            request.require_primary()?;
            request.require_reference()?;
        }
        OperationKind::Fill => {
            request.require_primary()?;
            request.require_mask()?;
            request.require_prompt()?;
        }
        OperationKind::Erase => {
            request.require_primary()?;
            request.require_mask()?;
        }
    }

    match &request.params {
        OperationParams::Generate(p) => {
            check_num_results(p.num_results)?;
            if !ASPECT_RATIOS.contains(&p.aspect_ratio.as_str()) {
                return Err(Error::invalid(format!(
                    "aspect_ratio must be one of {}",
                    ASPECT_RATIOS.join(", ")
                )));
            }
        }
        OperationParams::Shadow(p) => {
            check_percent("shadow_intensity", p.intensity)?;
            check_percent("shadow_blur", p.blur)?;
        }
        OperationParams::Lifestyle(p) => {
            check_num_results(p.num_results)?;
            if p.placement == PlacementType::ManualPlacement && p.positions.is_empty() {
                return Err(Error::invalid(
                    "manual_placement requires at least one position",
                ));
            }
            if !(0.0..=1.0).contains(&p.ref_image_influence) {
                return Err(Error::invalid("ref_image_influence must be between 0 and 1"));
            }
        }
        OperationParams::Fill(p) => check_num_results(p.num_results)?,
        OperationParams::Enhance | OperationParams::Packshot(_) => {}
    }

    Ok(())
}

fn check_num_results(n: u32) -> Result<()> {
    if n == 0 || n > MAX_NUM_RESULTS {
        return Err(Error::invalid(format!(
            "num_results must be between 1 and {MAX_NUM_RESULTS}"
        )));
    }
    Ok(())
}

fn check_percent(name: &str, value: f64) -> Result<()> {
    if !(0.0..=100.0).contains(&value) {
        return Err(Error::invalid(format!("{name} must be between 0 and 100")));
    }
    Ok(())
}

fn non_empty_bytes(data: &Option<Vec<u8>>) -> Option<&[u8]> {
    data.as_deref().filter(|b| !b.is_empty())
}

fn non_blank(text: &Option<String>) -> Option<&str> {
    text.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> Credential {
        Credential::new("k").unwrap()
    }

    #[test]
    fn credential_is_redacted_and_rejects_blank() {
        assert!(Credential::new("   ").is_none());
        let c = Credential::new(" secret ").unwrap();
        assert_eq!(c.expose(), "secret");
        assert_eq!(format!("{c:?}"), "Credential(***)");
    }

    #[test]
    fn operation_names_round_trip() {
        for kind in OperationKind::ALL {
            assert_eq!(OperationKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(
            OperationKind::from_name("lifestyle-text"),
            Some(OperationKind::LifestyleByText)
        );
        assert_eq!(OperationKind::from_name("upscale"), None);
    }

    #[test]
    fn only_product_shots_take_background_removal() {
        let with: Vec<_> = OperationKind::ALL
            .into_iter()
            .filter(OperationKind::supports_background_prestep)
            .collect();
        assert_eq!(with, vec![OperationKind::Packshot, OperationKind::Shadow]);
    }

    #[test]
    fn enhance_requires_prompt() {
        let err = GenerationRequest::builder(OperationKind::Enhance, key())
            .prompt("  ")
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)));
    }

    #[test]
    fn fill_and_erase_require_mask() {
        for kind in [OperationKind::Fill, OperationKind::Erase] {
            let err = GenerationRequest::builder(kind, key())
                .primary_image(Some(vec![1]))
                .prompt("sky")
                .build()
                .unwrap_err();
            assert!(err.to_string().contains("mask"), "{kind}: {err}");
        }
    }

    #[test]
    fn lifestyle_text_requires_scene_description() {
        let err = GenerationRequest::builder(OperationKind::LifestyleByText, key())
            .primary_image(Some(vec![1]))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("scene_description"));
    }

    #[test]
    fn empty_image_counts_as_missing() {
        let err = GenerationRequest::builder(OperationKind::Packshot, key())
            .primary_image(Some(Vec::new()))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("image is required"));
    }

    #[test]
    fn manual_placement_needs_positions() {
        let params = LifestyleParams {
            placement: PlacementType::ManualPlacement,
            ..Default::default()
        };
        let err = GenerationRequest::builder(OperationKind::LifestyleByImage, key())
            .primary_image(Some(vec![1]))
            .reference_image(Some(vec![2]))
            .params(OperationParams::Lifestyle(params))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("position"));
    }

    #[test]
    fn generate_checks_ranges() {
        let params = GenerateParams {
            num_results: 5,
            ..Default::default()
        };
        assert!(GenerationRequest::builder(OperationKind::Generate, key())
            .prompt("cat")
            .params(OperationParams::Generate(params))
            .build()
            .is_err());

        let params = GenerateParams {
            aspect_ratio: "7:3".to_string(),
            ..Default::default()
        };
        assert!(GenerationRequest::builder(OperationKind::Generate, key())
            .prompt("cat")
            .params(OperationParams::Generate(params))
            .build()
            .is_err());
    }

    #[test]
    fn mismatched_params_are_rejected() {
        let err = GenerationRequest::builder(OperationKind::Shadow, key())
            .primary_image(Some(vec![1]))
            .params(OperationParams::Fill(FillParams::default()))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("do not match"));
    }

    #[test]
    fn defaults_apply_when_params_absent() {
        let request = GenerationRequest::builder(OperationKind::Shadow, key())
            .primary_image(Some(vec![1]))
            .build()
            .unwrap();
        match request.params() {
            OperationParams::Shadow(p) => {
                assert!(p.force_rmbg);
                assert_eq!(p.offset, [0.0, 15.0]);
            }
            other => panic!("unexpected params: {other:?}"),
        }
        assert!(request.is_sync());
    }
}
