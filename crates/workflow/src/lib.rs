//! Study plan workflow: a fixed four-stage pipeline over an immutable state.
//!
//! ```text
//!  PlanInputs
//!      │
//!      ▼
//!  ┌────────┐   ┌──────────┐   ┌──────────────────┐   ┌─────────────────┐
//!  │ Score  │──▶│ Allocate │──▶│ RetrieveContext  │──▶│ GenerateAdvice  │──▶ Done
//!  └────────┘   └──────────┘   └──────────────────┘   └─────────────────┘
//!   scorer       allocator       ContextStore           AdviceGenerator
//! ```
//!
//! Each stage reads the [`PipelineState`], returns a [`StatePatch`], and the
//! patch is merged into a new state. [`LlmAdvisor`] is the production
//! [`AdviceGenerator`](studyplan_core::advice::AdviceGenerator).

pub mod advice;
pub mod pipeline;
pub mod report;
pub mod stage;
pub mod state;

pub use advice::LlmAdvisor;
pub use pipeline::{DEFAULT_QUERY_SUFFIX, DEFAULT_TOP_K, Pipeline, PipelineError};
pub use report::PlanReport;
pub use stage::Stage;
pub use state::{PipelineState, PlanInputs, StatePatch};
