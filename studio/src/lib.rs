//! Orchestration layer over the Bria API.
//!
//! Each feature validates caller input into a [`GenerationRequest`], sends it
//! through a [`Provider`], and normalizes the heterogeneous response into a
//! [`ResultSet`]. Asynchronous submissions are kept as [`PendingBatch`]es per
//! session and feature until a [`Poller`] confirms their URLs.

mod error;
mod input;
mod mapping;
mod normalize;
mod pending;
mod poll;
mod provider;
mod request;
mod studio;

#[cfg(test)]
mod tests;

pub use error::{Error, Result};
pub use input::{
    EnhanceInput, EraseInput, FillInput, GenerateInput, LifestyleImageInput, LifestyleTextInput,
    PackshotInput, ShadowInput,
};
pub use mapping::{
    apply_style, parse_placement, parse_positions, parse_shadow_type, provider_token,
    StyledPrompt, STYLE_REALISTIC,
};
pub use normalize::{
    classify, extract_enhanced_prompt, normalize, ResponseShape, ResultSet, ResultStatus,
};
pub use pending::{BatchKey, BatchState, PendingBatch, PendingStore, PollOutcome};
pub use poll::{
    HttpProber, PollReport, PollTarget, Poller, Prober, Readiness, RetryPolicy, DEFAULT_MAX_ATTEMPTS,
    DEFAULT_POLL_INTERVAL, DEFAULT_PROBE_TIMEOUT,
};
pub use provider::{BriaProvider, Provider, ERASE_PROMPT};
pub use request::{
    Credential, FillParams, GenerateParams, GenerationRequest, GenerationRequestBuilder,
    ImagePayloads, LifestyleParams, OperationKind, OperationParams, PackshotParams, ShadowParams,
    TextParams,
};
pub use studio::{Outcome, Studio};
