//! Validated analysis result

use super::ScoreBand;
use serde::{Deserialize, Serialize};

/// Structured assessment of one food log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// 0 to 100 inclusive
    pub overall_score: u8,
    pub summary: String,
    pub positives: Vec<String>,
    pub concerns: Vec<String>,
    pub missing_nutrients: Vec<String>,
    pub recommendation: Recommendation,
    /// Citations that survived filtering; always empty under the legacy contract
    pub sources: Vec<CitedSource>,
}

impl AnalysisResult {
    pub fn band(&self) -> ScoreBand {
        ScoreBand::from_score(self.overall_score)
    }

    pub fn source_ids(&self) -> impl Iterator<Item = &str> {
        self.sources.iter().map(|s| s.source_id.as_str())
    }
}

/// Advice in whichever shape the output contract asked for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Recommendation {
    /// Grounded contract: one focus for next week
    Single(String),
    /// Legacy contract: a list of recommendations
    List(Vec<String>),
}

impl Recommendation {
    /// Recommendations as a list, whatever the shape
    pub fn items(&self) -> Vec<&str> {
        match self {
            Self::Single(text) => vec![text.as_str()],
            Self::List(items) => items.iter().map(String::as_str).collect(),
        }
    }
}

/// One citation traced back to a chunk that was in the prompt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitedSource {
    pub source_id: String,
    pub reason: String,
    /// Authority label, or the id itself when unlabelled
    pub authority: String,
}
