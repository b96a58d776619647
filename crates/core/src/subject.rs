//! Subject domain types.
//!
//! A [`SubjectInput`] is what the user typed: a name, a difficulty rating and
//! an optional explicit hour target. Intake is lenient: nothing
//! about a subject is ever rejected, only normalized. The scorer turns inputs
//! into [`Subject`]s carrying `required_hours`, `score` and `weight`.

use serde::{Deserialize, Deserializer, Serialize};

/// Name given to subjects whose name is missing or blank.
pub const UNTITLED: &str = "Untitled";

/// Difficulty assumed when none (or garbage) is supplied.
pub const DEFAULT_DIFFICULTY: i64 = 3;

/// Lowest and highest difficulty ratings.
pub const MIN_DIFFICULTY: u8 = 1;
pub const MAX_DIFFICULTY: u8 = 5;

/// A raw subject description as supplied by the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectInput {
    /// Display name; trimmed, blank means "Untitled"
    #[serde(default, deserialize_with = "lenient_name")]
    pub name: String,

    /// Difficulty rating; clamped to 1..=5 by the scorer
    #[serde(default = "default_difficulty", deserialize_with = "lenient_difficulty")]
    pub difficulty: i64,

    /// Explicit hour target; only positive values count
    #[serde(
        default,
        deserialize_with = "lenient_hours",
        skip_serializing_if = "Option::is_none"
    )]
    pub target_hours: Option<f64>,
}

fn default_difficulty() -> i64 {
    DEFAULT_DIFFICULTY
}

impl Default for SubjectInput {
    fn default() -> Self {
        Self {
            name: String::new(),
            difficulty: DEFAULT_DIFFICULTY,
            target_hours: None,
        }
    }
}

impl SubjectInput {
    pub fn new(name: impl Into<String>, difficulty: i64) -> Self {
        Self {
            name: name.into(),
            difficulty,
            target_hours: None,
        }
    }

    /// Set an explicit hour target.
    pub fn with_target_hours(mut self, hours: f64) -> Self {
        self.target_hours = Some(hours);
        self
    }

    /// Trimmed name, or [`UNTITLED`] when blank.
    pub fn display_name(&self) -> String {
        let trimmed = self.name.trim();
        if trimmed.is_empty() {
            UNTITLED.to_string()
        } else {
            trimmed.to_string()
        }
    }

    /// Difficulty clamped to `MIN_DIFFICULTY..=MAX_DIFFICULTY`.
    pub fn clamped_difficulty(&self) -> u8 {
        self.difficulty
            .clamp(MIN_DIFFICULTY as i64, MAX_DIFFICULTY as i64) as u8
    }

    /// The target, if it was explicitly given as a positive, finite number.
    pub fn explicit_target(&self) -> Option<f64> {
        self.target_hours.filter(|h| h.is_finite() && *h > 0.0)
    }
}

/// A subject after priority scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subject {
    pub name: String,
    pub difficulty: u8,
    /// Hours needed to cover the subject (1 decimal)
    pub required_hours: f64,
    /// difficulty × urgency (3 decimals)
    pub score: f64,
    /// Normalized share of the total score (4 decimals)
    pub weight: f64,
}

// ── Lenient field decoding ──────────────────────────────────────────────────

fn lenient_name<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Number(n) => n.to_string(),
        _ => String::new(),
    })
}

fn lenient_difficulty<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(parse_difficulty(&value).unwrap_or(DEFAULT_DIFFICULTY))
}

fn parse_difficulty(value: &serde_json::Value) -> Option<i64> {
    match value {
        serde_json::Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        serde_json::Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>().ok().or_else(|| {
                s.parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite())
                    .map(|f| f.trunc() as i64)
            })
        }
        _ => None,
    }
}

fn lenient_hours<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    })
}
