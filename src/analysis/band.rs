//! Score band classification

use serde::{Deserialize, Serialize};
use std::fmt;

/// Qualitative band for an overall score
///
/// Each band includes its lower bound: 41 is fair, 61 good, 81 excellent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreBand {
    NeedsImprovement,
    Fair,
    Good,
    Excellent,
}

impl ScoreBand {
    pub fn from_score(score: u8) -> Self {
        match score {
            0..=40 => Self::NeedsImprovement,
            41..=60 => Self::Fair,
            61..=80 => Self::Good,
            _ => Self::Excellent,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::NeedsImprovement => "needs improvement",
            Self::Fair => "fair",
            Self::Good => "good",
            Self::Excellent => "excellent",
        }
    }

    /// One-line caption for display next to the score
    pub fn caption(&self) -> &'static str {
        match self {
            Self::NeedsImprovement => "Overall pattern needs improvement",
            Self::Fair => "Fair overall balance, but room to improve",
            Self::Good => "Good overall balance",
            Self::Excellent => "Excellent overall balance",
        }
    }
}

impl fmt::Display for ScoreBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_band_boundaries() {
        let cases = [
            (0, "needs improvement"),
            (40, "needs improvement"),
            (41, "fair"),
            (60, "fair"),
            (61, "good"),
            (80, "good"),
            (81, "excellent"),
            (100, "excellent"),
        ];
        for (score, label) in cases {
            assert_eq!(ScoreBand::from_score(score).label(), label, "score {}", score);
        }
    }

    #[test]
    fn test_band_total_and_ordered() {
        let bands: Vec<ScoreBand> = (0..=u8::MAX).map(ScoreBand::from_score).collect();
        assert!(bands.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(ScoreBand::Fair.caption(), "Fair overall balance, but room to improve");
    }
}
