//! foodcheck - Grounded weekly food log assessment
//!
//! Scores a free-text food log against a fixed corpus of nutrition guidelines.
//! Relevant guideline documents are selected, embedded in the prompt as the
//! only permitted evidence, and the model's JSON reply is validated so every
//! citation traces back to a document that was actually supplied.

pub mod analysis;
pub mod cli;
pub mod config;
pub mod corpus;
pub mod embedding;
pub mod error;
pub mod llm;
pub mod pipeline;
pub mod prompt;
pub mod retrieval;

pub use error::{FoodcheckError, Result};
