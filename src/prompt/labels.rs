//! Source id to authority label mapping

use ahash::AHashMap;
use std::collections::BTreeMap;

/// Authorities for the guideline documents shipped with the default corpus
pub const BUILTIN_LABELS: [(&str, &str); 6] = [
    ("who_fruits_vegetables.txt", "World Health Organization (WHO)"),
    ("who_free_sugars.txt", "World Health Organization (WHO)"),
    ("who_ultra_processed_foods.txt", "World Health Organization (WHO)"),
    ("who_beverages_alcohol.txt", "World Health Organization (WHO)"),
    ("efsa_fiber.txt", "European Food Safety Authority (EFSA)"),
    ("mediterranean_diet.txt", "BMJ (British Medical Journal)"),
];

/// Read-only map from chunk id to the human-readable authority behind it
///
/// Built once at startup and shared behind an `Arc`. Ids without an entry
/// display as themselves, so new corpus files work before they are labelled.
#[derive(Debug, Clone, Default)]
pub struct SourceLabelMap {
    labels: AHashMap<String, String>,
}

impl SourceLabelMap {
    /// Map containing only [`BUILTIN_LABELS`]
    pub fn builtin() -> Self {
        Self::from_entries(
            BUILTIN_LABELS
                .iter()
                .map(|(id, label)| (id.to_string(), label.to_string())),
        )
    }

    pub fn from_entries(entries: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            labels: entries.into_iter().collect(),
        }
    }

    /// Built-in labels with `overrides` layered on top
    pub fn with_overrides(mut self, overrides: &BTreeMap<String, String>) -> Self {
        for (id, label) in overrides {
            self.labels.insert(id.clone(), label.clone());
        }
        self
    }

    pub fn get(&self, source_id: &str) -> Option<&str> {
        self.labels.get(source_id).map(String::as_str)
    }

    /// Label for display, falling back to the id itself
    pub fn label<'a>(&'a self, source_id: &'a str) -> &'a str {
        self.get(source_id).unwrap_or(source_id)
    }

    /// Entries sorted by id, for stable prompt text
    pub fn entries(&self) -> Vec<(&str, &str)> {
        let mut entries: Vec<(&str, &str)> = self
            .labels
            .iter()
            .map(|(id, label)| (id.as_str(), label.as_str()))
            .collect();
        entries.sort_unstable();
        entries
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}
