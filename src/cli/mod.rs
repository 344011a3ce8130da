//! propval CLI module
//!
//! Command-line interface for generating data, training bundles, and
//! serving predictions from a local registry directory.

use anyhow::Context;
use clap::{Parser, Subcommand};
use colored::*;
use serde::Serialize;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use crate::config::AppConfig;
use crate::explainability::format_currency;
use crate::export::{FsModelRegistry, ModelRegistry, VersionSpec};
use crate::inference::{summarize, PerformanceSummary, Predictor, ValuationService};
use crate::property::{Dataset, PropertyRecord};
use crate::scenario::ScenarioAnalyzer;
use crate::synthetic::SyntheticHousingGenerator;
use crate::training::TrainEngine;
use crate::utils::DataLoader;

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString {
    s.truecolor(100, 100, 100)
}
fn accent(s: &str) -> ColoredString {
    s.truecolor(120, 170, 255)
}
fn muted(s: &str) -> ColoredString {
    s.truecolor(140, 140, 140)
}
fn ok(s: &str) -> ColoredString {
    s.truecolor(100, 210, 120)
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

fn step_run(msg: &str) {
    eprint!("  {} {}... ", accent("›"), msg);
}

fn step_done(detail: &str) {
    eprintln!("{} {}", ok("done"), dim(detail));
}

fn kv(key: &str, val: impl std::fmt::Display) {
    println!("  {:<18} {}", muted(key), val.to_string().white());
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "propval")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Explainable property price prediction")]
pub struct Cli {
    /// JSON config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Registry directory (overrides the config)
    #[arg(short, long, global = true)]
    pub registry: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a synthetic housing dataset to CSV
    Generate {
        #[arg(short, long, default_value = "1000")]
        samples: usize,

        #[arg(long, default_value = "42")]
        seed: u64,

        #[arg(short, long)]
        output: PathBuf,
    },

    /// Train a bundle and store it in the registry
    Train {
        /// CSV dataset; synthetic data is used when omitted
        #[arg(short, long)]
        data: Option<PathBuf>,

        /// Price column name
        #[arg(short, long, default_value = "price")]
        target: String,
    },

    /// Price one property given as a JSON object
    Predict {
        #[arg(short, long)]
        input: PathBuf,

        /// `latest` or MAJOR.MINOR.PATCH
        #[arg(long, default_value = "latest")]
        version: String,
    },

    /// Compare a base property against JSON override scenarios
    WhatIf {
        #[arg(short, long)]
        base: PathBuf,

        /// JSON array of override objects
        #[arg(short, long)]
        scenarios: PathBuf,

        #[arg(long, default_value = "latest")]
        version: String,
    },

    /// List stored bundle versions
    Versions,

    /// Show training metrics of a stored bundle
    Performance {
        #[arg(long, default_value = "latest")]
        version: String,
    },
}

pub fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = match &cli.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };
    if let Some(dir) = cli.registry {
        config = config.with_registry_dir(dir);
    }

    match cli.command {
        Commands::Generate { samples, seed, output } => cmd_generate(samples, seed, &output),
        Commands::Train { data, target } => cmd_train(&config, data.as_deref(), &target),
        Commands::Predict { input, version } => cmd_predict(&config, &input, &version),
        Commands::WhatIf { base, scenarios, version } => cmd_what_if(&config, &base, &scenarios, &version),
        Commands::Versions => cmd_versions(&config),
        Commands::Performance { version } => cmd_performance(&config, &version),
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file)).with_context(|| format!("parsing {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn open_registry(config: &AppConfig) -> anyhow::Result<FsModelRegistry> {
    FsModelRegistry::open(&config.registry_dir)
        .with_context(|| format!("opening registry {}", config.registry_dir.display()))
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub fn cmd_generate(samples: usize, seed: u64, output: &Path) -> anyhow::Result<()> {
    section("Generate");
    step_run("Sampling");
    let start = Instant::now();
    let dataset = SyntheticHousingGenerator::new(samples).with_seed(seed).generate()?;
    DataLoader::default().save_csv(&dataset, output)?;
    step_done(&format!("{} rows in {:?}", dataset.len(), start.elapsed()));
    kv("Output", output.display());
    println!();
    Ok(())
}

pub fn cmd_train(config: &AppConfig, data: Option<&Path>, target: &str) -> anyhow::Result<()> {
    section("Train");

    step_run("Loading data");
    let start = Instant::now();
    let dataset: Dataset = match data {
        Some(path) => DataLoader::default().with_target(target).load_csv(path)?,
        None => SyntheticHousingGenerator::new(config.synthetic_samples)
            .with_seed(config.training.random_state)
            .generate()?,
    };
    step_done(&format!("{} rows in {:?}", dataset.len(), start.elapsed()));

    let registry: Arc<dyn ModelRegistry> = Arc::new(open_registry(config)?);

    step_run("Training candidates");
    let start = Instant::now();
    if registry.latest()?.is_none() {
        let version = registry.next_version()?;
        let report = TrainEngine::new(config.training.clone())
            .with_explanation(config.explanation.clone())
            .train(&dataset, version)?;
        registry.save(&report.bundle)?;
        step_done(&format!("{:?}", start.elapsed()));
        print_summary(&summarize(&report.bundle));
    } else {
        let service = ValuationService::from_latest(Arc::clone(&registry))?
            .with_training_config(config.training.clone())
            .with_explanation(config.explanation.clone())
            .with_policy(config.promotion_policy());
        let outcome = service.retrain(&dataset)?;
        step_done(&format!("{:?}", start.elapsed()));
        match outcome.rejection {
            None => print_summary(&service.performance_summary()),
            Some(reason) => {
                println!();
                println!("  {} {} not promoted: {}", "!".yellow(), outcome.version, reason);
                kv("Active version", service.active().version);
            }
        }
    }
    println!();
    Ok(())
}

fn print_summary(summary: &PerformanceSummary) {
    println!();
    kv("Version", summary.version);
    kv("Model", &summary.model_name);
    if let Some(score) = &summary.selected {
        kv("Test RMSE", format_currency(score.test_rmse));
        kv("Test R²", format!("{:.4}", score.test_r2));
        kv("Test MAE", format_currency(score.test_mae));
        if let Some(cv) = score.cv_rmse_mean {
            kv("CV RMSE", format_currency(cv));
        }
    }
    if let Some(bench) = &summary.benchmark {
        kv("Rating (R²)", bench.r2);
    }
    kv("Features", summary.n_features);
    kv("Rows", summary.dataset_size);
    if summary.below_threshold {
        println!("  {}", "no candidate met the selection thresholds".yellow());
    }
}

pub fn cmd_predict(config: &AppConfig, input: &Path, version: &str) -> anyhow::Result<()> {
    let record: PropertyRecord = read_json(input)?;
    let bundle = open_registry(config)?.load(&VersionSpec::parse(version)?)?;
    let result = Predictor::new(bundle).predict(&record)?;
    print_json(&result)
}

pub fn cmd_what_if(config: &AppConfig, base: &Path, scenarios: &Path, version: &str) -> anyhow::Result<()> {
    let base: PropertyRecord = read_json(base)?;
    let scenarios: Vec<PropertyRecord> = read_json(scenarios)?;
    let bundle = open_registry(config)?.load(&VersionSpec::parse(version)?)?;
    let report = ScenarioAnalyzer::new(Predictor::new(bundle)).evaluate(&base, &scenarios)?;
    print_json(&report)
}

pub fn cmd_versions(config: &AppConfig) -> anyhow::Result<()> {
    let registry = open_registry(config)?;
    let index = registry.index()?;
    section("Versions");
    let versions = registry.list()?;
    if versions.is_empty() {
        println!("  {}", dim("registry is empty"));
    }
    for version in versions {
        match index.entries.get(&version.to_string()) {
            Some(entry) => println!(
                "  {:<10} {:<20} {}",
                version.to_string().white().bold(),
                entry.model_name,
                dim(&entry.trained_at.format("%Y-%m-%d %H:%M:%S UTC").to_string())
            ),
            None => println!("  {}", version.to_string().white().bold()),
        }
    }
    println!();
    Ok(())
}

pub fn cmd_performance(config: &AppConfig, version: &str) -> anyhow::Result<()> {
    let bundle = open_registry(config)?.load(&VersionSpec::parse(version)?)?;
    section("Performance");
    let summary = summarize(&bundle);
    print_summary(&summary);

    println!();
    println!("  {}", muted("Candidates"));
    for (name, score) in &summary.scores {
        println!(
            "  {:<20} rmse {:>12}  r2 {:>7.4}",
            name,
            format_currency(score.test_rmse),
            score.test_r2
        );
    }
    println!();
    Ok(())
}
