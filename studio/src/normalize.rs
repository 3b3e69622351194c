//! Response normalization.
//!
//! The provider does not use one response shape across endpoints. Result
//! URLs show up under `result_url`, `result_urls`, `urls`, or nested inside
//! `result` as strings, rows or objects. [`classify`] decides which shape a
//! body has using a fixed priority order, and [`normalize`] turns it into a
//! [`ResultSet`] with the provider's URL order preserved.

use serde_json::Value;

use super::error::{Error, Result};

const FIELD_SINGLE: &str = "result_url";
const FIELD_LIST: &str = "result_urls";
const FIELD_GENERIC: &str = "urls";
const FIELD_NESTED: &str = "result";

/// Which response variant a provider body matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseShape {
    /// `{"result_url": "..."}`
    SingleUrl,
    /// `{"result_urls": [...]}` or `{"urls": [...]}`
    UrlList,
    /// `{"result": [...]}` holding strings, rows of strings, or objects.
    NestedResult,
    Unrecognized,
}

/// Readiness classification of a [`ResultSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultStatus {
    /// Content exists behind every URL.
    Ready,
    /// URLs were returned before their content; poll before use.
    Pending,
    /// No URL could be extracted.
    Unrecognized,
}

/// Ordered result URLs extracted from one provider response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultSet {
    pub urls: Vec<String>,
    pub status: ResultStatus,
    pub shape: ResponseShape,
}

impl ResultSet {
    fn unrecognized() -> Self {
        Self {
            urls: Vec::new(),
            status: ResultStatus::Unrecognized,
            shape: ResponseShape::Unrecognized,
        }
    }

    /// Returns the first URL, the one shown in a single result slot.
    pub fn first(&self) -> Option<&str> {
        self.urls.first().map(String::as_str)
    }

    pub fn is_unrecognized(&self) -> bool {
        self.status == ResultStatus::Unrecognized
    }

    /// Converts an unrecognized set into [`Error::UnrecognizedResponse`].
    pub fn into_result(self) -> Result<Self> {
        if self.is_unrecognized() {
            return Err(Error::UnrecognizedResponse);
        }
        Ok(self)
    }
}

/// Returns the shape of a provider response.
///
/// A field only matches when it yields at least one URL; an empty or
/// malformed field falls through to the next one.
pub fn classify(response: &Value) -> ResponseShape {
    extract(response)
        .map(|(shape, _)| shape)
        .unwrap_or(ResponseShape::Unrecognized)
}

/// Extracts result URLs from a provider response.
///
/// `sync` decides whether a recognized set is reported as ready or pending.
pub fn normalize(response: &Value, sync: bool) -> ResultSet {
    match extract(response) {
        Some((shape, urls)) => ResultSet {
            urls,
            status: if sync {
                ResultStatus::Ready
            } else {
                ResultStatus::Pending
            },
            shape,
        },
        None => ResultSet::unrecognized(),
    }
}

fn extract(response: &Value) -> Option<(ResponseShape, Vec<String>)> {
    let obj = response.as_object()?;

    if let Some(url) = obj.get(FIELD_SINGLE).and_then(non_empty_str) {
        return Some((ResponseShape::SingleUrl, vec![url.to_string()]));
    }

    for field in [FIELD_LIST, FIELD_GENERIC] {
        let urls = obj.get(field).map(string_list).unwrap_or_default();
        if !urls.is_empty() {
            return Some((ResponseShape::UrlList, urls));
        }
    }

    let urls = obj.get(FIELD_NESTED).map(nested_urls).unwrap_or_default();
    if !urls.is_empty() {
        return Some((ResponseShape::NestedResult, urls));
    }

    None
}

fn nested_urls(value: &Value) -> Vec<String> {
    let Some(items) = value.as_array() else {
        return Vec::new();
    };

    let mut urls = Vec::new();
    for item in items {
        match item {
            Value::String(s) if !s.trim().is_empty() => urls.push(s.clone()),
            // Rows mix seeds and ids in with the URL.
            Value::Array(row) => urls.extend(
                row.iter()
                    .filter_map(Value::as_str)
                    .filter(|s| looks_like_url(s))
                    .map(str::to_string),
            ),
            Value::Object(entry) => {
                let listed = entry.get(FIELD_GENERIC).map(string_list).unwrap_or_default();
                if !listed.is_empty() {
                    urls.extend(listed);
                } else if let Some(url) = entry.get("url").and_then(non_empty_str) {
                    urls.push(url.to_string());
                }
            }
            _ => {}
        }
    }
    urls
}

fn string_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(non_empty_str)
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

fn non_empty_str(value: &Value) -> Option<&str> {
    value.as_str().filter(|s| !s.trim().is_empty())
}

fn looks_like_url(s: &str) -> bool {
    s.starts_with("https://") || s.starts_with("http://")
}

/// Extracts the rewritten prompt from a prompt-enhancer response.
pub fn extract_enhanced_prompt(response: &Value) -> Result<String> {
    for field in ["prompt variations", "enhanced_prompt", "prompt"] {
        let text = match response.get(field) {
            Some(Value::String(s)) => Some(s.as_str()),
            Some(Value::Array(items)) => items.iter().find_map(non_empty_str),
            _ => None,
        };
        if let Some(text) = text.map(str::trim).filter(|s| !s.is_empty()) {
            return Ok(text.to_string());
        }
    }
    Err(Error::UnrecognizedResponse)
}
