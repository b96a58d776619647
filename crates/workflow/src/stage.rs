//! The pipeline's fixed stage sequence.

use serde::{Deserialize, Serialize};

/// One step of the pipeline. The order is fixed and has no branches:
/// `Score → Allocate → RetrieveContext → GenerateAdvice → Done`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    #[default]
    Score,
    Allocate,
    RetrieveContext,
    GenerateAdvice,
    Done,
}

impl Stage {
    /// Every stage in execution order.
    pub const ALL: [Stage; 5] = [
        Stage::Score,
        Stage::Allocate,
        Stage::RetrieveContext,
        Stage::GenerateAdvice,
        Stage::Done,
    ];

    /// The stage that follows this one. `Done` is terminal.
    pub fn next(self) -> Stage {
        match self {
            Stage::Score => Stage::Allocate,
            Stage::Allocate => Stage::RetrieveContext,
            Stage::RetrieveContext => Stage::GenerateAdvice,
            Stage::GenerateAdvice => Stage::Done,
            Stage::Done => Stage::Done,
        }
    }

    pub fn is_done(self) -> bool {
        self == Stage::Done
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Stage::Score => "score",
            Stage::Allocate => "allocate",
            Stage::RetrieveContext => "retrieve_context",
            Stage::GenerateAdvice => "generate_advice",
            Stage::Done => "done",
        };
        f.write_str(s)
    }
}
