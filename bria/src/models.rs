//! Model constants and predefined values for the Bria API.

// ==================== Text-to-Image ====================

/// Default text-to-image HD model version.
pub const MODEL_VERSION_HD_2_2: &str = "2.2";

/// Aspect ratios accepted by the text-to-image HD endpoint.
pub const ASPECT_RATIOS: &[&str] = &["1:1", "2:3", "3:2", "3:4", "4:3", "4:5", "5:4", "9:16", "16:9"];

/// Maximum number of results per generation request.
pub const MAX_NUM_RESULTS: u32 = 4;

// ==================== Product ====================

/// Default packshot background color.
pub const DEFAULT_BACKGROUND_COLOR: &str = "#FFFFFF";

/// Default shadow color.
pub const DEFAULT_SHADOW_COLOR: &str = "#000000";

/// Default lifestyle shot size in pixels.
pub const DEFAULT_SHOT_SIZE: [u32; 2] = [1000, 1000];

/// Default reference image influence for lifestyle-by-image.
pub const DEFAULT_REF_IMAGE_INFLUENCE: f64 = 0.6;

// ==================== Paths ====================

pub(crate) const PATH_TEXT_TO_IMAGE_HD: &str = "/v1/text-to-image/hd";
pub(crate) const PATH_PROMPT_ENHANCER: &str = "/v1/prompt_enhancer";
pub(crate) const PATH_PACKSHOT: &str = "/v1/product/packshot";
pub(crate) const PATH_SHADOW: &str = "/v1/product/shadow";
pub(crate) const PATH_LIFESTYLE_TEXT: &str = "/v1/product/lifestyle_shot_by_text";
pub(crate) const PATH_LIFESTYLE_IMAGE: &str = "/v1/product/lifestyle_shot_by_image";
pub(crate) const PATH_GEN_FILL: &str = "/v1/gen_fill";
pub(crate) const PATH_BACKGROUND_REMOVE: &str = "/v1/background/remove";
