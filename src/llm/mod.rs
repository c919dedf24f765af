//! Completion service interface
//!
//! The pipeline only needs "system + user + temperature in, text out". The
//! Gemini client is the production implementation; tests substitute their own.

mod gemini;

pub use gemini::GeminiClient;

use crate::error::Result;
use serde::Serialize;
use std::future::Future;

/// One completion call
#[derive(Debug, Clone, Serialize)]
pub struct CompletionRequest {
    pub system: String,
    pub user: String,
    pub temperature: f32,
}

/// Text completion service
///
/// Implementations report quota exhaustion as
/// [`FoodcheckError::CompletionQuotaExceeded`](crate::FoodcheckError::CompletionQuotaExceeded)
/// and every other failure as
/// [`FoodcheckError::CompletionService`](crate::FoodcheckError::CompletionService).
/// They must not retry internally.
pub trait CompletionProvider: Send + Sync {
    /// Model identifier for logs
    fn model_name(&self) -> &str;

    /// Raw text of the model's reply
    fn complete(&self, request: &CompletionRequest) -> impl Future<Output = Result<String>> + Send;
}
