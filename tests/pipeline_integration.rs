//! End-to-end analysis against an on-disk corpus with a scripted model

use foodcheck::analysis::{Recommendation, ScoreBand};
use foodcheck::config::Config;
use foodcheck::llm::{CompletionProvider, CompletionRequest};
use foodcheck::pipeline::{AnalysisRequest, Analyzer, Retriever};
use foodcheck::prompt::OutputContract;
use foodcheck::{FoodcheckError, Result};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

/// Answers every request with the same text
struct CannedModel(String);

impl CannedModel {
    fn new(reply: &str) -> Self {
        Self(reply.to_string())
    }
}

impl CompletionProvider for CannedModel {
    fn model_name(&self) -> &str {
        "canned"
    }

    async fn complete(&self, _request: &CompletionRequest) -> Result<String> {
        Ok(self.0.clone())
    }
}

/// Cites exactly the sources it was shown, plus one it invents
struct EchoSourcesModel;

impl CompletionProvider for EchoSourcesModel {
    fn model_name(&self) -> &str {
        "echo"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let mut sources: Vec<serde_json::Value> = request
            .user
            .lines()
            .filter_map(|line| line.strip_prefix("[SOURCE "))
            .filter_map(|rest| rest.split(" |").next())
            .map(|id| serde_json::json!({"source_id": id, "reason": "shown in prompt"}))
            .collect();
        sources.push(serde_json::json!({"source_id": "invented.txt", "reason": "made up"}));

        Ok(serde_json::json!({
            "overall_score": 72,
            "summary": "Mostly balanced.",
            "positives": ["vegetables most days"],
            "concerns": [],
            "missing_nutrients": [],
            "recommendation": "Keep it up.",
            "sources": sources,
        })
        .to_string())
    }
}

fn write_corpus(dir: &Path) {
    std::fs::create_dir_all(dir.join("who")).unwrap();
    std::fs::write(
        dir.join("who/who_fruits_vegetables.txt"),
        "Eating at least 400 g of fruits and vegetables a day lowers the risk of disease.",
    )
    .unwrap();
    std::fs::write(
        dir.join("who/who_free_sugars.txt"),
        "Limit free sugars to less than 10% of energy. Sugary soda is a major source.",
    )
    .unwrap();
    std::fs::write(
        dir.join("efsa_fiber.txt"),
        "Adults should eat 25 g of dietary fiber a day from whole grains and legumes.",
    )
    .unwrap();
}

fn config_for(dir: &Path) -> Config {
    let mut config = Config::default();
    config.corpus.dir = dir.to_path_buf();
    config
}

#[tokio::test]
async fn test_sugar_log_is_grounded_in_sugar_guidance() {
    let temp = TempDir::new().unwrap();
    write_corpus(temp.path());
    let mut config = config_for(temp.path());
    config.retrieval.max_chunks = 1;

    let analyzer = Analyzer::from_config(&config, EchoSourcesModel).unwrap();
    let report = analyzer
        .analyze(&AnalysisRequest::new("I ate a lot of sugar and soda"))
        .await
        .unwrap();

    assert_eq!(report.selected_sources, vec!["who_free_sugars.txt"]);
    let cited: Vec<&str> = report.result.source_ids().collect();
    assert_eq!(cited, vec!["who_free_sugars.txt"]);
    assert_eq!(
        report.result.sources[0].authority,
        "World Health Organization (WHO)"
    );
    assert_eq!(report.band, ScoreBand::Good);
    assert_eq!(report.contract, OutputContract::Grounded);
}

#[tokio::test]
async fn test_every_citation_was_in_the_prompt() {
    let temp = TempDir::new().unwrap();
    write_corpus(temp.path());
    let config = config_for(temp.path());

    let analyzer = Analyzer::from_config(&config, EchoSourcesModel).unwrap();
    let report = analyzer
        .analyze(&AnalysisRequest::new(
            "Oats, lentils, apples, vegetables and one soda with extra sugar",
        ))
        .await
        .unwrap();

    assert!(!report.selected_sources.is_empty());
    assert!(report.selected_sources.len() <= 3);
    for id in report.result.source_ids() {
        assert!(report.selected_sources.iter().any(|s| s == id), "{id} not supplied");
    }
    assert_eq!(
        report.result.sources.len(),
        report.selected_sources.len(),
        "only the invented citation should be dropped"
    );
}

#[tokio::test]
async fn test_unmatched_log_still_gets_an_answer() {
    let temp = TempDir::new().unwrap();
    write_corpus(temp.path());
    let config = config_for(temp.path());

    let model = CannedModel::new(
        r#"{"overall_score": 0, "summary": "No guidance available.", "positives": [],
            "concerns": [], "missing_nutrients": [], "recommendation": "", "sources": []}"#,
    );
    let analyzer = Analyzer::from_config(&config, model).unwrap();

    let report = analyzer
        .analyze(&AnalysisRequest::new("xyzzy"))
        .await
        .unwrap();
    assert!(report.selected_sources.is_empty());
    assert!(report.result.sources.is_empty());
    assert_eq!(report.band, ScoreBand::NeedsImprovement);
}

#[tokio::test]
async fn test_legacy_contract_end_to_end() {
    let temp = TempDir::new().unwrap();
    write_corpus(temp.path());
    let mut config = config_for(temp.path());
    config.output.contract = OutputContract::Legacy;

    let model = CannedModel::new(
        r#"{"overall_score": 55, "summary": "Fair.", "positives": ["fruit"],
            "concerns": ["soda"], "missing_nutrients": ["fiber"],
            "recommendations": ["Drink water", "Add legumes"]}"#,
    );
    let analyzer = Analyzer::from_config(&config, model).unwrap();

    let report = analyzer
        .analyze(&AnalysisRequest::new("fruit and soda"))
        .await
        .unwrap();
    assert_eq!(report.band, ScoreBand::Fair);
    assert!(report.result.sources.is_empty());
    assert_eq!(
        report.result.recommendation,
        Recommendation::List(vec!["Drink water".to_string(), "Add legumes".to_string()])
    );
}

#[tokio::test]
async fn test_malformed_reply_keeps_raw_text() {
    let temp = TempDir::new().unwrap();
    write_corpus(temp.path());
    let config = config_for(temp.path());

    let analyzer = Analyzer::from_config(&config, CannedModel::new("{not json")).unwrap();
    let err = analyzer
        .analyze(&AnalysisRequest::new("sugar"))
        .await
        .unwrap_err();

    assert!(matches!(err, FoodcheckError::MalformedOutput { .. }));
    assert_eq!(err.raw_output(), Some("{not json"));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_concurrent_requests_share_one_pipeline() {
    let temp = TempDir::new().unwrap();
    write_corpus(temp.path());
    let config = config_for(temp.path());

    let analyzer = Arc::new(Analyzer::from_config(&config, EchoSourcesModel).unwrap());

    let mut handles = Vec::new();
    for log in ["sugar and soda", "fruits and vegetables", "whole grains and legumes"] {
        let analyzer = Arc::clone(&analyzer);
        handles.push(tokio::spawn(async move {
            analyzer.analyze(&AnalysisRequest::new(log)).await
        }));
    }

    let mut request_ids = Vec::new();
    for handle in handles {
        let report = handle.await.unwrap().unwrap();
        assert!(!report.selected_sources.is_empty());
        request_ids.push(report.request_id);
    }
    request_ids.sort();
    request_ids.dedup();
    assert_eq!(request_ids.len(), 3);
}

#[test]
fn test_retriever_reports_relevance() {
    let temp = TempDir::new().unwrap();
    write_corpus(temp.path());
    let retriever = Retriever::from_config(&config_for(temp.path())).unwrap();

    let ranked = retriever.retrieve("sugar soda fiber", 3).unwrap();
    let ids: Vec<&str> = ranked.iter().map(|s| s.chunk.id.as_str()).collect();
    assert_eq!(ids, vec!["who_free_sugars.txt", "efsa_fiber.txt"]);
}

#[test]
fn test_shipped_corpus_is_fully_labelled() {
    let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("knowledge");
    let config = config_for(&dir);
    let retriever = Retriever::from_config(&config).unwrap();

    let corpus = retriever.store().load().unwrap();
    assert_eq!(corpus.len(), 6);
    for chunk in corpus.chunks() {
        assert_ne!(
            retriever.labels().label(&chunk.id),
            chunk.id,
            "{} has no authority label",
            chunk.id
        );
    }
}
