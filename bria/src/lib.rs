//! Bria API SDK for Rust.
//!
//! This crate provides an async client for the Bria image generation and
//! editing API. Every service call maps to exactly one HTTP request and
//! returns the provider's JSON body untouched; interpreting the result is
//! left to the caller.

mod background;
mod client;
mod edit;
mod error;
pub mod http;
mod image;
mod models;
mod product;
mod types;


pub use background::BackgroundService;
pub use client::{Client, ClientBuilder, DEFAULT_BASE_URL, DEFAULT_TIMEOUT};
pub use edit::{EditService, GenFillRequest};
pub use error::{Error, Result};
pub use image::{ImageService, PromptEnhanceRequest, TextToImageRequest};
pub use models::*;
pub use product::{
    LifestyleImageRequest, LifestyleTextRequest, PackshotRequest, ProductService, ShadowRequest,
};
pub use types::{ImageData, MaskType, Medium, PlacementType, ShadowType};
