use anyhow::Context;
use foodcheck::analysis::{AnalysisResult, ResponseValidator};
use foodcheck::cli::{Cli, Commands, ConfigAction, LogInput, SelectionArgs};
use foodcheck::config::{Config, ConfigValidator};
use foodcheck::corpus::DocumentStore;
use foodcheck::llm::GeminiClient;
use foodcheck::pipeline::{AnalysisReport, AnalysisRequest, Analyzer, Retriever};
use foodcheck::prompt::OutputContract;
use foodcheck::FoodcheckError;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncReadExt;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse_args();

    // Initialize logging
    init_logging(cli.verbose);

    let result = run(cli).await;

    if let Err(err) = &result {
        if let Some(details) = err
            .downcast_ref::<FoodcheckError>()
            .and_then(FoodcheckError::diagnostics)
        {
            eprintln!("{}", details);
        }
    }

    result
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = if verbose { "foodcheck=debug" } else { "foodcheck=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config_path = cli.config;
    let profile = cli.profile;

    match cli.command {
        Commands::Analyze {
            input,
            selection,
            contract,
            json,
        } => {
            let mut config = load_config(config_path, profile)?;
            apply_overrides(&mut config, &selection, contract);
            cmd_analyze(&config, &input, json).await?;
        }
        Commands::Retrieve {
            input,
            selection,
            json,
        } => {
            let mut config = load_config(config_path, profile)?;
            apply_overrides(&mut config, &selection, None);
            cmd_retrieve(&config, &input, json).await?;
        }
        Commands::Prompt {
            input,
            selection,
            contract,
            json,
        } => {
            let mut config = load_config(config_path, profile)?;
            apply_overrides(&mut config, &selection, contract);
            cmd_prompt(&config, &input, json).await?;
        }
        Commands::Check {
            response,
            allowed,
            contract,
            json,
        } => {
            let mut config = load_config(config_path, profile)?;
            if let Some(contract) = contract {
                config.output.contract = contract;
            }
            cmd_check(&config, &response, &allowed, json)?;
        }
        Commands::Corpus { json } => {
            let config = load_config(config_path, profile)?;
            cmd_corpus(&config, json)?;
        }
        Commands::Config { action } => {
            cmd_config(config_path, profile, action)?;
        }
    }

    Ok(())
}

async fn cmd_analyze(config: &Config, input: &LogInput, json: bool) -> anyhow::Result<()> {
    let food_log = read_food_log(input).await?;
    let request = AnalysisRequest::new(food_log);
    request.validate()?;

    let client = GeminiClient::from_config(&config.llm)?;
    let analyzer = Analyzer::from_config(config, client)?;

    tracing::info!(
        "Analyzing with {} selection, {} contract",
        config.retrieval.strategy,
        config.output.contract
    );

    let report = analyzer.analyze(&request).await?;

    if json {
        print_json(&report)?;
    } else {
        print_report(&report);
    }
    Ok(())
}

async fn cmd_retrieve(config: &Config, input: &LogInput, json: bool) -> anyhow::Result<()> {
    let food_log = read_food_log(input).await?;
    AnalysisRequest::new(food_log.as_str()).validate()?;

    let retriever = Retriever::from_config(config)?;
    let ranked = retriever.retrieve(&food_log, retriever.max_chunks())?;

    if json {
        return print_json(&ranked);
    }

    if ranked.is_empty() {
        println!("No guideline chunks matched this food log.");
        return Ok(());
    }

    println!(
        "Top {} chunks ({} selection):\n",
        ranked.len(),
        retriever.strategy()
    );
    for (i, scored) in ranked.iter().enumerate() {
        println!(
            "{}. {} [{}] ({})",
            i + 1,
            scored.chunk.id,
            retriever.labels().label(&scored.chunk.id),
            scored.relevance
        );
        println!("   {}\n", scored.preview(120));
    }
    Ok(())
}

async fn cmd_prompt(config: &Config, input: &LogInput, json: bool) -> anyhow::Result<()> {
    let food_log = read_food_log(input).await?;
    let retriever = Retriever::from_config(config)?;
    let prepared = retriever.prepare(&AnalysisRequest::new(food_log))?;

    if json {
        return print_json(&prepared);
    }

    println!("=== SYSTEM ===\n{}\n", prepared.prompt.system);
    println!("=== USER ===\n{}", prepared.prompt.user);
    Ok(())
}

fn cmd_check(config: &Config, response: &Path, allowed: &[String], json: bool) -> anyhow::Result<()> {
    let raw = std::fs::read_to_string(response)
        .with_context(|| format!("Failed to read response file: {}", response.display()))?;

    let validator = ResponseValidator::new(Arc::new(config.source_labels()), config.output.contract);
    let result = validator.validate(&raw, allowed)?;

    if json {
        print_json(&result)?;
    } else {
        println!("✓ Response is valid");
        print_result(&result);
    }
    Ok(())
}

fn cmd_corpus(config: &Config, json: bool) -> anyhow::Result<()> {
    let store = DocumentStore::new(config.corpus.dir.clone());
    let corpus = store.load()?;
    let labels = config.source_labels();

    if json {
        let entries: Vec<_> = corpus
            .chunks()
            .iter()
            .map(|c| {
                serde_json::json!({
                    "id": c.id,
                    "authority": labels.label(&c.id),
                    "bytes": c.content.len(),
                })
            })
            .collect();
        return print_json(&serde_json::json!({
            "dir": store.root(),
            "content_hash": corpus.content_hash(),
            "chunks": entries,
        }));
    }

    println!("Corpus: {}", store.root().display());
    println!("Hash:   {}", corpus.content_hash());
    println!("Chunks: {}\n", corpus.len());
    for chunk in corpus.chunks() {
        println!(
            "  {:<32} {:<40} {:>7} bytes",
            chunk.id,
            labels.label(&chunk.id),
            chunk.content.len()
        );
    }
    Ok(())
}

fn cmd_config(
    config_path: Option<PathBuf>,
    profile: Option<String>,
    action: ConfigAction,
) -> anyhow::Result<()> {
    match action {
        ConfigAction::Show { section } => {
            let config = load_config(config_path, profile)?;
            let value = serde_json::to_value(&config).map_err(|e| FoodcheckError::Json {
                source: e,
                context: "Failed to serialize config".to_string(),
            })?;

            match section {
                Some(section) => {
                    let part = value
                        .get(&section)
                        .with_context(|| format!("Unknown config section: {}", section))?;
                    print_json(part)?;
                }
                None => print_json(&value)?,
            }
        }
        ConfigAction::Validate { file } => {
            let path = match file.or(config_path) {
                Some(path) => path,
                None => Config::default_path()?,
            };
            let config = Config::load(&path)?;
            println!("✓ Configuration is valid");
            println!("  Schema version: {}", config.meta.schema_version);
            println!("  Corpus:         {}", config.corpus.dir.display());
            println!(
                "  Selection:      {} (max {} chunks)",
                config.retrieval.strategy, config.retrieval.max_chunks
            );
            if std::env::var(&config.llm.api_key_env).is_err() {
                println!("  ⚠ {} is not set; analyze will fail", config.llm.api_key_env);
            }
        }
        ConfigAction::Init { force } => {
            let path = match config_path {
                Some(path) => path,
                None => Config::default_path()?,
            };

            if path.exists() && !force {
                println!("Configuration file already exists at: {}", path.display());
                println!("Use --force to overwrite");
                return Ok(());
            }

            // Create parent directory
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| FoodcheckError::Io {
                    source: e,
                    context: format!("Failed to create config directory: {:?}", parent),
                })?;
            }

            let config = Config::default();
            config.save(&path)?;

            println!("✓ Configuration initialized at: {}", path.display());
        }
        ConfigAction::Path => {
            println!("{}", Config::default_path()?.display());
        }
    }

    Ok(())
}

fn load_config(config_path: Option<PathBuf>, profile: Option<String>) -> anyhow::Result<Config> {
    let path = match config_path {
        Some(path) => path,
        None => Config::default_path()?,
    };

    if !path.exists() {
        tracing::warn!(
            "Config file not found, using defaults. Run 'foodcheck config init' to create one."
        );
        let mut config = Config::default();
        config.apply_env_overrides();
        if let Some(profile) = profile {
            config.apply_profile(&profile)?;
        }
        ConfigValidator::validate(&config)?;
        return Ok(config);
    }

    let config = match profile {
        Some(profile) => Config::load_with_profile(&path, &profile),
        None => Config::load(&path),
    }
    .with_context(|| format!("Failed to load config from {}", path.display()))?;

    Ok(config)
}

fn apply_overrides(
    config: &mut Config,
    selection: &SelectionArgs,
    contract: Option<OutputContract>,
) {
    if let Some(strategy) = selection.strategy {
        config.retrieval.strategy = strategy;
    }
    if let Some(max_chunks) = selection.max_chunks {
        config.retrieval.max_chunks = max_chunks;
    }
    if let Some(contract) = contract {
        config.output.contract = contract;
    }
}

async fn read_food_log(input: &LogInput) -> anyhow::Result<String> {
    if let Some(text) = &input.food_log {
        return Ok(text.clone());
    }

    if let Some(path) = &input.file {
        return tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read food log: {}", path.display()));
    }

    let mut text = String::new();
    tokio::io::stdin()
        .read_to_string(&mut text)
        .await
        .context("Failed to read food log from stdin")?;
    Ok(text)
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value).map_err(|e| FoodcheckError::Json {
        source: e,
        context: "Failed to serialize output".to_string(),
    })?;
    println!("{}", json);
    Ok(())
}

fn print_report(report: &AnalysisReport) {
    print_result(&report.result);
    println!(
        "\nSelection: {} | Model: {} | Request: {}",
        report.strategy, report.model, report.request_id
    );
}

fn print_result(result: &AnalysisResult) {
    let band = result.band();
    println!("Score: {}/100 ({})", result.overall_score, band);
    println!("{}\n", band.caption());
    println!("{}", result.summary);

    print_list("What you're doing well", &result.positives);
    print_list("What to watch", &result.concerns);
    print_list("Nutrients to add", &result.missing_nutrients);

    let recommendations = result.recommendation.items();
    if !recommendations.is_empty() {
        println!("\nNext week:");
        for item in recommendations {
            println!("  • {}", item);
        }
    }

    if !result.sources.is_empty() {
        println!("\nWhere this advice comes from:");
        for source in &result.sources {
            println!(
                "  • {} ({}): {}",
                source.authority, source.source_id, source.reason
            );
        }
    }
}

fn print_list(title: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    println!("\n{}:", title);
    for item in items {
        println!("  • {}", item);
    }
}
