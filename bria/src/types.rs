//! Common types for the Bria API.

use std::fmt;

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize, Serializer};

// ==================== Image Data ====================

/// Raw image bytes that serialize to standard Base64 in JSON.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct ImageData(Vec<u8>);

impl ImageData {
    /// Creates a new ImageData from bytes.
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self(data.into())
    }

    /// Returns the underlying bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns true if there are no bytes.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the length in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Encodes the data to a Base64 string.
    pub fn encode(&self) -> String {
        STANDARD.encode(&self.0)
    }
}

impl From<Vec<u8>> for ImageData {
    fn from(data: Vec<u8>) -> Self {
        Self(data)
    }
}

impl fmt::Debug for ImageData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ImageData({} bytes)", self.0.len())
    }
}

impl Serialize for ImageData {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.encode())
    }
}

// ==================== Medium ====================

/// Rendering medium for text-to-image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Medium {
    #[default]
    Photography,
    Art,
}

// ==================== Shadow Type ====================

/// Shadow style accepted by the shadow endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShadowType {
    /// Shadow cast on the ground below the product.
    #[default]
    Regular,
    /// Detached shadow, the product appears to hover.
    Float,
}

// ==================== Placement Type ====================

/// How the product is placed inside a generated lifestyle scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlacementType {
    /// Keep the product where it is in the source image.
    #[default]
    Original,
    /// Let the provider choose.
    Automatic,
    /// Use the positions listed in `manual_placement_selection`.
    ManualPlacement,
}

impl PlacementType {
    /// Returns the wire token.
    pub fn as_str(&self) -> &'static str {
        match self {
            PlacementType::Original => "original",
            PlacementType::Automatic => "automatic",
            PlacementType::ManualPlacement => "manual_placement",
        }
    }
}

// ==================== Mask Type ====================

/// Origin of a generative-fill mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaskType {
    /// Drawn by a user.
    #[default]
    Manual,
    /// Produced by an automatic segmenter.
    Automatic,
}
