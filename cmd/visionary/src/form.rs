//! Multipart form decoding.

use std::collections::HashMap;
use std::str::FromStr;

use axum::extract::multipart::{Multipart, MultipartRejection};

use crate::server::ApiError;

/// A decoded multipart form: text fields and uploaded files.
#[derive(Debug, Default)]
pub struct Form {
    texts: HashMap<String, String>,
    files: HashMap<String, Vec<u8>>,
}

impl Form {
    /// Reads every field of a multipart body.
    pub async fn read(multipart: Result<Multipart, MultipartRejection>) -> Result<Self, ApiError> {
        let mut multipart =
            multipart.map_err(|e| ApiError::bad_request(format!("expected multipart form: {e}")))?;
        let mut form = Form::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::bad_request(format!("malformed multipart body: {e}")))?
        {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            let is_file = field.file_name().is_some();
            let data = field
                .bytes()
                .await
                .map_err(|e| ApiError::bad_request(format!("failed to read field {name}: {e}")))?;

            if is_file {
                form.files.insert(name, data.to_vec());
            } else {
                form.texts
                    .insert(name, String::from_utf8_lossy(&data).into_owned());
            }
        }

        Ok(form)
    }

    /// Returns a trimmed, non-empty text field.
    pub fn text(&self, name: &str) -> Option<String> {
        self.texts
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }

    /// Takes an uploaded file. Empty uploads count as missing.
    pub fn take_file(&mut self, name: &str) -> Option<Vec<u8>> {
        self.files.remove(name).filter(|data| !data.is_empty())
    }

    /// Parses a text field.
    pub fn parse<T: FromStr>(&self, name: &str) -> Result<Option<T>, ApiError> {
        match self.text(name) {
            Some(raw) => raw
                .parse()
                .map(Some)
                .map_err(|_| ApiError::bad_request(format!("invalid value for {name}: {raw:?}"))),
            None => Ok(None),
        }
    }

    /// Parses a boolean field. Accepts `true/false`, `1/0`, `yes/no`, `on/off`.
    pub fn flag(&self, name: &str) -> Result<Option<bool>, ApiError> {
        match self.text(name) {
            Some(raw) => match raw.to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => Ok(Some(true)),
                "false" | "0" | "no" | "off" => Ok(Some(false)),
                _ => Err(ApiError::bad_request(format!(
                    "invalid value for {name}: {raw:?}"
                ))),
            },
            None => Ok(None),
        }
    }
}
