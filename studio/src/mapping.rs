//! Maps user-facing parameter names to provider tokens.

use visionary_bria::{Medium, PlacementType, ShadowType};

use super::error::{Error, Result};

/// Style that leaves the prompt untouched.
pub const STYLE_REALISTIC: &str = "Realistic";

/// Lower-cases and joins words with underscores: `Manual Placement` becomes
/// `manual_placement`.
pub fn provider_token(name: &str) -> String {
    name.split(|c: char| c.is_whitespace() || c == '-' || c == '_')
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("_")
}

pub fn parse_placement(name: &str) -> Result<PlacementType> {
    match provider_token(name).as_str() {
        "original" => Ok(PlacementType::Original),
        "automatic" => Ok(PlacementType::Automatic),
        "manual_placement" | "manual" => Ok(PlacementType::ManualPlacement),
        _ => Err(Error::invalid(format!(
            "placement_type must be one of original, automatic, manual_placement; got {name:?}"
        ))),
    }
}

/// Splits a comma-separated position list into provider tokens.
pub fn parse_positions(list: &str) -> Vec<String> {
    list.split(',')
        .map(provider_token)
        .filter(|p| !p.is_empty())
        .collect()
}

pub fn parse_shadow_type(name: &str) -> Result<ShadowType> {
    match provider_token(name).as_str() {
        "regular" | "natural" | "drop" => Ok(ShadowType::Regular),
        "float" => Ok(ShadowType::Float),
        _ => Err(Error::invalid(format!(
            "shadow_type must be regular or float; got {name:?}"
        ))),
    }
}

/// Prompt and rendering settings for a style.
#[derive(Debug, Clone, PartialEq)]
pub struct StyledPrompt {
    pub prompt: String,
    pub medium: Medium,
    pub enhance_image: bool,
}

/// Applies an art style to a prompt. No style, or realistic, keeps a
/// photographic render.
pub fn apply_style(style: Option<&str>, prompt: &str) -> StyledPrompt {
    match style.map(str::trim).filter(|s| !s.is_empty()) {
        Some(style) if !style.eq_ignore_ascii_case(STYLE_REALISTIC) => StyledPrompt {
            prompt: format!("{style} style artwork: {prompt}"),
            medium: Medium::Art,
            enhance_image: false,
        },
        _ => StyledPrompt {
            prompt: prompt.to_string(),
            medium: Medium::Photography,
            enhance_image: true,
        },
    }
}
