//! The planning engine: priority scoring and time allocation.
//!
//! Both halves are pure functions over well-typed numeric inputs and cannot
//! fail. Malformed subject fields were already normalized at intake; callers
//! validate `days_left` and `hours_per_day` before calling in.
//!
//! ```text
//! SubjectInput[] ──PriorityScorer──▶ Subject[] (+required_hours, score, weight)
//!                                      │
//!                                      ▼
//!                               TimeAllocator ──▶ AllocationResult
//! ```

pub mod allocation;
pub mod rounding;
pub mod scoring;

pub use allocation::{DEFAULT_EPSILON, TimeAllocator};
pub use rounding::{floor_hours, round_hours, round_to};
pub use scoring::{Priorities, PriorityScorer, urgency};
