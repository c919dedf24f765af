//! Model output parsing and schema validation

use super::{AnalysisResult, CitedSource, Recommendation};
use crate::error::{FoodcheckError, Result};
use crate::prompt::{OutputContract, SourceLabelMap};
use ahash::AHashSet;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, warn};

/// Turns raw completion text into an [`AnalysisResult`]
///
/// Structural problems are errors: unparsable text is `MalformedOutput`, a
/// missing key, wrong type or out-of-range score is `SchemaViolation`. Both
/// keep the raw text. Citations are the one exception: entries whose
/// `source_id` was not in the prompt are dropped with a warning, as are
/// repeated citations of the same id, and the rest of the result is kept.
pub struct ResponseValidator {
    labels: Arc<SourceLabelMap>,
    contract: OutputContract,
}

impl ResponseValidator {
    pub fn new(labels: Arc<SourceLabelMap>, contract: OutputContract) -> Self {
        Self { labels, contract }
    }

    pub fn labels(&self) -> &Arc<SourceLabelMap> {
        &self.labels
    }

    pub fn contract(&self) -> OutputContract {
        self.contract
    }

    /// Validate `raw_text` against the contract and the ids that were in the prompt
    pub fn validate(&self, raw_text: &str, allowed_source_ids: &[String]) -> Result<AnalysisResult> {
        let value: Value =
            serde_json::from_str(raw_text.trim()).map_err(|e| FoodcheckError::MalformedOutput {
                raw: raw_text.to_string(),
                reason: e.to_string(),
            })?;

        let object = match value {
            Value::Object(object) => object,
            other => {
                return Err(FoodcheckError::MalformedOutput {
                    raw: raw_text.to_string(),
                    reason: format!("expected a JSON object, got {}", json_type(&other)),
                })
            }
        };

        let fields = Fields {
            object: &object,
            raw: raw_text,
        };

        let overall_score = fields.score("overall_score")?;
        let summary = fields.string("summary")?;
        let positives = fields.string_list("positives")?;
        let concerns = fields.string_list("concerns")?;
        let missing_nutrients = fields.string_list("missing_nutrients")?;

        let (recommendation, sources) = match self.contract {
            OutputContract::Grounded => {
                let recommendation = Recommendation::Single(fields.string("recommendation")?);
                let cited = fields.sources("sources")?;
                (recommendation, self.filter_sources(cited, allowed_source_ids))
            }
            OutputContract::Legacy => (
                Recommendation::List(fields.string_list("recommendations")?),
                Vec::new(),
            ),
        };

        Ok(AnalysisResult {
            overall_score,
            summary,
            positives,
            concerns,
            missing_nutrients,
            recommendation,
            sources,
        })
    }

    fn filter_sources(&self, cited: Vec<(String, String)>, allowed: &[String]) -> Vec<CitedSource> {
        let allowed: AHashSet<&str> = allowed.iter().map(String::as_str).collect();
        let mut seen: AHashSet<String> = AHashSet::new();

        cited
            .into_iter()
            .filter_map(|(source_id, reason)| {
                if !allowed.contains(source_id.as_str()) {
                    warn!("Dropping citation of '{}': not among the prompt sources", source_id);
                    return None;
                }
                if !seen.insert(source_id.clone()) {
                    debug!("Dropping repeated citation of '{}'", source_id);
                    return None;
                }
                let authority = self.labels.label(&source_id).to_string();
                Some(CitedSource {
                    source_id,
                    reason,
                    authority,
                })
            })
            .collect()
    }
}

/// Typed field access that reports failures as schema violations
struct Fields<'a> {
    object: &'a Map<String, Value>,
    raw: &'a str,
}

impl Fields<'_> {
    fn violation(&self, field: impl Into<String>, message: impl Into<String>) -> FoodcheckError {
        FoodcheckError::SchemaViolation {
            field: field.into(),
            message: message.into(),
            raw: self.raw.to_string(),
        }
    }

    fn required(&self, key: &str) -> Result<&Value> {
        self.object
            .get(key)
            .ok_or_else(|| self.violation(key, "missing required key"))
    }

    fn score(&self, key: &str) -> Result<u8> {
        let value = self.required(key)?;
        let Value::Number(number) = value else {
            return Err(self.violation(key, format!("expected integer, got {}", json_type(value))));
        };

        let score = if let Some(n) = number.as_i64() {
            n
        } else {
            match number.as_f64() {
                Some(f) if f.fract() == 0.0 && f.abs() <= i64::MAX as f64 => f as i64,
                _ => return Err(self.violation(key, format!("expected integer, got {}", number))),
            }
        };

        if !(0..=100).contains(&score) {
            return Err(self.violation(key, format!("{} is outside 0..=100", score)));
        }
        Ok(score as u8)
    }

    fn string(&self, key: &str) -> Result<String> {
        match self.required(key)? {
            Value::String(s) => Ok(s.clone()),
            other => Err(self.violation(key, format!("expected string, got {}", json_type(other)))),
        }
    }

    fn string_list(&self, key: &str) -> Result<Vec<String>> {
        let Value::Array(items) = self.required(key)? else {
            let got = json_type(self.required(key)?);
            return Err(self.violation(key, format!("expected array of strings, got {}", got)));
        };

        items
            .iter()
            .enumerate()
            .map(|(i, item)| match item {
                Value::String(s) => Ok(s.clone()),
                other => Err(self.violation(
                    format!("{}[{}]", key, i),
                    format!("expected string, got {}", json_type(other)),
                )),
            })
            .collect()
    }

    /// (source_id, reason) pairs in the order cited
    fn sources(&self, key: &str) -> Result<Vec<(String, String)>> {
        let Value::Array(items) = self.required(key)? else {
            let got = json_type(self.required(key)?);
            return Err(self.violation(key, format!("expected array of objects, got {}", got)));
        };

        let mut cited = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            let Value::Object(entry) = item else {
                return Err(self.violation(
                    format!("{}[{}]", key, i),
                    format!("expected object, got {}", json_type(item)),
                ));
            };

            let text = |name: &str| -> Result<String> {
                let path = format!("{}[{}].{}", key, i, name);
                match entry.get(name) {
                    Some(Value::String(s)) => Ok(s.clone()),
                    Some(other) => Err(self.violation(
                        path,
                        format!("expected string, got {}", json_type(other)),
                    )),
                    None => Err(self.violation(path, "missing required key")),
                }
            };

            cited.push((text("source_id")?, text("reason")?));
        }
        Ok(cited)
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
