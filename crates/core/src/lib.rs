//! # studyplan core
//!
//! Domain types, collaborator traits, and error definitions for the study
//! timetable engine. This crate has **no framework dependencies**: it defines
//! the model that the planner, context, provider and workflow crates
//! implement against.
//!
//! ## Layout
//!
//! - [`subject`]: raw subject intake and the scored/enriched subject
//! - [`timetable`]: blocks, days and the allocation result
//! - [`context`]: the Context Store contract (note retrieval)
//! - [`advice`]: the Advice Generator contract and its tagged result
//! - [`provider`] / [`message`]: the LLM backend abstraction
//!
//! Every external collaborator is a trait here so that tests can swap in
//! scripted implementations.

pub mod advice;
pub mod context;
pub mod error;
pub mod message;
pub mod provider;
pub mod subject;
pub mod timetable;

// Re-export key types at crate root for ergonomics
pub use advice::{
    Advice, AdviceGenerator, AdviceOutcome, AdviceRequest, BreakPlan, MalformedAdvice,
    OverbookStrategy, OverbookedPlan,
};
pub use context::{ContextHit, ContextSnippet, ContextStore, Contexts, IndexStats};
pub use error::{ContextError, ProviderError};
pub use message::{Message, Role};
pub use provider::{EmbeddingRequest, EmbeddingResponse, Provider, ProviderRequest, ProviderResponse};
pub use subject::{Subject, SubjectInput};
pub use timetable::{AllocationResult, Block, Day, Timetable};
