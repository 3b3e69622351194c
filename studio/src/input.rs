//! Per-feature caller input, as received from the HTTP layer.
//!
//! Every field is optional here; the orchestrator fills defaults and the
//! request builder rejects what is still missing.

/// Text-to-image input.
#[derive(Debug, Clone, Default)]
pub struct GenerateInput {
    pub api_key: Option<String>,
    pub prompt: Option<String>,
    pub negative_prompt: Option<String>,
    pub num_results: Option<u32>,
    pub aspect_ratio: Option<String>,
    /// Art style; `Realistic` or absent renders a photograph.
    pub style: Option<String>,
    /// Provider-side image enhancement. Always off for art styles.
    pub enhance_image: Option<bool>,
    pub seed: Option<u64>,
    pub sync: Option<bool>,
}

/// Prompt enhancement input.
#[derive(Debug, Clone, Default)]
pub struct EnhanceInput {
    pub api_key: Option<String>,
    pub prompt: Option<String>,
}

/// Packshot input.
#[derive(Debug, Clone, Default)]
pub struct PackshotInput {
    pub api_key: Option<String>,
    pub image: Option<Vec<u8>>,
    pub background_color: Option<String>,
    pub sku: Option<String>,
    pub force_rmbg: Option<bool>,
    pub content_moderation: Option<bool>,
    pub sync: Option<bool>,
}

/// Shadow input.
#[derive(Debug, Clone, Default)]
pub struct ShadowInput {
    pub api_key: Option<String>,
    pub image: Option<Vec<u8>>,
    /// `Natural`, `Drop`, `regular` or `Float`.
    pub shadow_type: Option<String>,
    pub background_color: Option<String>,
    pub shadow_color: Option<String>,
    pub offset_x: Option<f64>,
    pub offset_y: Option<f64>,
    pub intensity: Option<f64>,
    pub blur: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub force_rmbg: Option<bool>,
    pub content_moderation: Option<bool>,
    pub sync: Option<bool>,
}

/// Lifestyle-by-text input.
#[derive(Debug, Clone, Default)]
pub struct LifestyleTextInput {
    pub api_key: Option<String>,
    pub image: Option<Vec<u8>>,
    pub scene_description: Option<String>,
    pub placement_type: Option<String>,
    /// Comma-separated manual positions.
    pub positions: Option<String>,
    pub num_results: Option<u32>,
    pub content_moderation: Option<bool>,
    pub sync: Option<bool>,
}

/// Lifestyle-by-image input.
#[derive(Debug, Clone, Default)]
pub struct LifestyleImageInput {
    pub api_key: Option<String>,
    pub image: Option<Vec<u8>>,
    pub reference_image: Option<Vec<u8>>,
    pub placement_type: Option<String>,
    pub positions: Option<String>,
    pub num_results: Option<u32>,
    pub ref_image_influence: Option<f64>,
    pub content_moderation: Option<bool>,
    pub sync: Option<bool>,
}

/// Generative fill input.
#[derive(Debug, Clone, Default)]
pub struct FillInput {
    pub api_key: Option<String>,
    pub image: Option<Vec<u8>>,
    pub mask: Option<Vec<u8>>,
    pub prompt: Option<String>,
    pub negative_prompt: Option<String>,
    pub num_results: Option<u32>,
    pub seed: Option<u64>,
    pub content_moderation: Option<bool>,
    pub sync: Option<bool>,
}

/// Erase input.
#[derive(Debug, Clone, Default)]
pub struct EraseInput {
    pub api_key: Option<String>,
    pub image: Option<Vec<u8>>,
    pub mask: Option<Vec<u8>>,
    pub content_moderation: Option<bool>,
    pub sync: Option<bool>,
}
