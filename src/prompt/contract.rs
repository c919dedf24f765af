//! Output contract versions

use crate::error::{FoodcheckError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Shape of the JSON object the completion service must return
///
/// `Grounded` carries a single recommendation plus cited sources and is the
/// retrieval-backed contract. `Legacy` is the earlier shape with a list of
/// recommendations and no sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputContract {
    #[default]
    Grounded,
    Legacy,
}

impl OutputContract {
    /// Keys the response object must contain
    pub fn required_keys(&self) -> &'static [&'static str] {
        match self {
            Self::Grounded => &[
                "overall_score",
                "summary",
                "positives",
                "concerns",
                "missing_nutrients",
                "recommendation",
                "sources",
            ],
            Self::Legacy => &[
                "overall_score",
                "summary",
                "positives",
                "concerns",
                "missing_nutrients",
                "recommendations",
            ],
        }
    }

    pub fn cites_sources(&self) -> bool {
        matches!(self, Self::Grounded)
    }

    /// Key list with types and ranges, as shown to the model
    pub fn format_spec(&self) -> String {
        let mut spec = String::from(
            "- \"overall_score\": integer between 0 and 100\n\
             - \"summary\": string\n\
             - \"positives\": array of strings\n\
             - \"concerns\": array of strings\n\
             - \"missing_nutrients\": array of strings\n",
        );
        match self {
            Self::Grounded => spec.push_str(
                "- \"recommendation\": string (the single most useful focus for next week)\n\
                 - \"sources\": array of objects {\"source_id\": string, \"reason\": string}; \
                 \"source_id\" must be one of the allowed source ids\n",
            ),
            Self::Legacy => spec.push_str("- \"recommendations\": array of strings\n"),
        }
        spec
    }
}

impl fmt::Display for OutputContract {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Grounded => f.write_str("grounded"),
            Self::Legacy => f.write_str("legacy"),
        }
    }
}

impl FromStr for OutputContract {
    type Err = FoodcheckError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "grounded" => Ok(Self::Grounded),
            "legacy" => Ok(Self::Legacy),
            other => Err(FoodcheckError::InvalidArgument(format!(
                "Unknown output contract '{}', expected 'grounded' or 'legacy'",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contract_keys() {
        assert!(OutputContract::Grounded.required_keys().contains(&"sources"));
        assert!(!OutputContract::Legacy.required_keys().contains(&"sources"));
        assert!(OutputContract::Legacy
            .format_spec()
            .contains("\"recommendations\": array of strings"));
        assert!(OutputContract::Grounded.cites_sources());
    }

    #[test]
    fn test_contract_parse() {
        assert_eq!(
            "legacy".parse::<OutputContract>().unwrap(),
            OutputContract::Legacy
        );
        assert!("v3".parse::<OutputContract>().is_err());
    }
}
