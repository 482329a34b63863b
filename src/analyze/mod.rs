// src/analyze/mod.rs
//! Candidate classification: prompt, AI call, response validation, cache and usage.

pub mod ai_adapter;
pub mod cache;
pub mod classifier;
pub mod prompt;
pub mod response;
pub mod usage;

pub use crate::analyze::ai_adapter::{AiError, AiProvider, AiReply, DynAiProvider};
pub use crate::analyze::cache::{AnalysisCache, CacheKey};
pub use crate::analyze::classifier::{ClassifyError, ResilientClassifier};
pub use crate::analyze::prompt::PromptTemplate;
pub use crate::analyze::response::{Analysis, Questions, ResponseError};
pub use crate::analyze::usage::{UsageMetrics, UsageTracker};
