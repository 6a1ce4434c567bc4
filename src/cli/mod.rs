//! Command-line interface
//!
//! Serve a variant, train one offline from a file, or inspect a dataset.

use clap::{Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::missions::Variant;
use crate::preprocessing::SchemaAnalyzer;
use crate::registry::ArtifactStore;
use crate::server::{run_server, ServerConfig};
use crate::training::{ModelKind, TrainEngine, TrainingOutcome};
use crate::utils::DataLoader;

// ─── Styling helpers ───────────────────────────────────────────────────────────

const W: usize = 58; // box inner width

fn dim(s: &str) -> ColoredString   { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

fn line_box_top()    { println!("  {}", dim("┌─────────────────────────────────────────────────────────┐")); }
fn line_box_bottom() { println!("  {}", dim("└─────────────────────────────────────────────────────────┘")); }
fn line_box_sep()    { println!("  {}", dim("├─────────────────────────────────────────────────────────┤")); }

fn line_box(content: &str) {
    let visible_len = strip_ansi(content).chars().count();
    let pad = W.saturating_sub(visible_len);
    println!("  {}  {}{} {}", dim("│"), content, " ".repeat(pad), dim("│"));
}

fn line_box_center(content: &str) {
    let visible_len = strip_ansi(content).chars().count();
    let total_pad = W.saturating_sub(visible_len);
    let left = total_pad / 2;
    let right = total_pad - left;
    println!("  {}  {}{}{} {}", dim("│"), " ".repeat(left), content, " ".repeat(right), dim("│"));
}

fn line_box_empty() { line_box(""); }

fn strip_ansi(s: &str) -> String {
    let mut out = String::new();
    let mut in_escape = false;
    for c in s.chars() {
        if c == '\x1b' { in_escape = true; continue; }
        if in_escape { if c == 'm' { in_escape = false; } continue; }
        out.push(c);
    }
    out
}

fn kv(key: &str, val: &str) -> String {
    format!("{} {}", muted(key), val.white())
}

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "exoplanet")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Disposition classifier for transit-survey candidates")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP service for one variant
    Serve {
        /// toi, koi, k2 or custom
        #[arg(short, long, default_value = "custom")]
        variant: Variant,

        /// Port; defaults to the variant's port
        #[arg(short, long)]
        port: Option<u16>,

        /// Bind address
        #[arg(long)]
        host: Option<String>,
    },

    /// Train a model from a CSV or Excel file
    Train {
        #[arg(short, long, default_value = "custom")]
        variant: Variant,

        /// Input data file
        #[arg(short, long)]
        data: PathBuf,

        /// Target column; auto-detected when omitted
        #[arg(short, long)]
        target: Option<String>,

        /// xgboost, random_forest, logistic or ensemble
        #[arg(short, long)]
        model_type: Option<ModelKind>,

        /// Artifact root; mission models are saved under <dir>/<variant>
        #[arg(long)]
        models_dir: Option<PathBuf>,
    },

    /// Show the detected schema of a dataset
    Info {
        #[arg(short, long)]
        data: PathBuf,

        #[arg(short, long, default_value = "custom")]
        variant: Variant,

        #[arg(short, long)]
        target: Option<String>,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Commands::Serve { variant, port, host } => cmd_serve(variant, port, host).await,
            Commands::Train { variant, data, target, model_type, models_dir } => {
                cmd_train(variant, &data, target, model_type, models_dir.as_deref())
            }
            Commands::Info { data, variant, target } => cmd_info(&data, variant, target.as_deref()),
        }
    }
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub fn cmd_train(
    variant: Variant,
    data_path: &Path,
    target: Option<String>,
    model_type: Option<ModelKind>,
    models_dir: Option<&Path>,
) -> anyhow::Result<()> {
    section(&format!("Train {}", variant.label()));

    step_run("Loading data");
    let start = Instant::now();
    let df = DataLoader::new().load_path(data_path)?;
    step_done(&format!("{} rows × {} cols in {:?}", df.height(), df.width(), start.elapsed()));

    let mut plan = variant.training_plan(model_type);
    if target.is_some() {
        plan = plan.with_target(target);
    }

    step_run(&format!("Training {}", plan.model.kind.to_string().cyan()));
    let start = Instant::now();
    let outcome = TrainEngine::new(plan).train(&df)?;
    step_done(&format!("{:?}", start.elapsed()));

    print_outcome(&outcome);

    if !variant.is_custom() {
        let root = models_dir
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(ServerConfig::for_variant(variant).models_dir));
        let store = ArtifactStore::new(root.join(variant.as_str()));
        step_run("Saving artifacts");
        store.save(&outcome.bundle)?;
        step_done(&store.dir().display().to_string());
    }

    println!();
    Ok(())
}

fn print_outcome(outcome: &TrainingOutcome) {
    let bundle = &outcome.bundle;
    let meta = &bundle.metadata;

    println!();
    println!("  {:<16} {}", muted("Target"), bundle.schema.target_column.white());
    println!("  {:<16} {}", muted("Samples"), meta.sample_count.to_string().white());
    println!("  {:<16} {}", muted("Features"), bundle.selected_features().join(", ").white());

    for (class, count) in &meta.class_distribution {
        println!("  {:<16} {}", muted(class), count.to_string().white());
    }

    if let Some(eval) = &meta.evaluation {
        println!();
        println!("  {:<16} {}", muted("Accuracy"), format!("{:.4}", eval.accuracy).white().bold());
        println!("  {:<20} {:>9} {:>9} {:>9} {:>8}", muted("Class"), muted("Precision"), muted("Recall"), muted("F1"), muted("Support"));
        println!("  {}", dim(&"─".repeat(60)));
        for (class, m) in &eval.per_class {
            println!("  {:<20} {:>9.3} {:>9.3} {:>9.3} {:>8}", class, m.precision, m.recall, m.f1_score, m.support);
        }
    }

    if let Some(cv) = &meta.cross_validation {
        println!();
        println!("  {:<16} {}", muted("CV accuracy"), format!("{:.4} ± {:.4}", cv.mean, cv.std).white().bold());
    }

    for warning in &outcome.warnings {
        println!("  {} {}", "!".yellow(), warning.yellow());
    }
}

pub fn cmd_info(data_path: &Path, variant: Variant, target: Option<&str>) -> anyhow::Result<()> {
    section("Data Info");

    let df = DataLoader::new().load_path(data_path)?;

    println!("  {:<12} {}", muted("File"), data_path.display());
    println!("  {:<12} {}", muted("Rows"), df.height());
    println!("  {:<12} {}", muted("Columns"), df.width());
    println!();

    let mut analyzer = SchemaAnalyzer::new();
    if let Some(profile) = variant.profile() {
        analyzer = analyzer
            .with_target_candidates(profile.targets)
            .with_allowed_features(profile.features);
    }
    let schema = analyzer.analyze(&df, target)?;

    println!("  {:<12} {}", muted("Target"), schema.target_column.white().bold());
    println!();
    println!("  {:<24} {:<12} {:>6}", muted("Feature"), muted("Kind"), muted("Nulls"));
    println!("  {}", dim(&"─".repeat(44)));

    for name in &schema.feature_columns {
        let kind = if schema.numeric_features.contains(name) { "numeric" } else { "categorical" };
        let nulls = df.column(name).map(|c| c.null_count()).unwrap_or(0);
        println!("  {:<24} {:<12} {:>6}", name, kind.truecolor(140, 140, 140), nulls);
    }

    println!();
    Ok(())
}

pub async fn cmd_serve(variant: Variant, port: Option<u16>, host: Option<String>) -> anyhow::Result<()> {
    let config = ServerConfig::for_variant(variant).with_port(port).with_host(host);
    let base = format!("http://{}:{}", config.host, config.port);

    println!();
    line_box_top();
    line_box_empty();
    line_box_center(&format!("{}", format!("{} Disposition Model", variant.label()).white().bold()));
    line_box_center(&format!("{}", dim(&format!("v{}", env!("CARGO_PKG_VERSION")))));
    line_box_empty();
    line_box_sep();
    line_box_empty();
    line_box(&kv("Health ", &format!("{}/health", base)));
    line_box(&kv("Train  ", &format!("{}/train", base)));
    line_box(&kv("Predict", &format!("{}/predict", base)));
    line_box_empty();
    line_box_sep();
    line_box_empty();
    line_box_center(&format!("{}", dim("ctrl+c to stop")));
    line_box_empty();
    line_box_bottom();
    println!();

    run_server(config).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_train_command() {
        let cli = Cli::try_parse_from([
            "exoplanet", "train", "--variant", "koi", "--data", "koi.csv", "--model-type", "xgboost",
        ])
        .unwrap();
        match cli.command {
            Commands::Train { variant, model_type, target, .. } => {
                assert_eq!(variant, Variant::Koi);
                assert_eq!(model_type, Some(ModelKind::Boosted));
                assert!(target.is_none());
            }
            _ => panic!("expected train"),
        }
    }

    #[test]
    fn test_rejects_unknown_variant() {
        assert!(Cli::try_parse_from(["exoplanet", "serve", "--variant", "tess"]).is_err());
    }

    #[test]
    fn test_strip_ansi() {
        let colored = format!("{}", "abc".red());
        assert_eq!(strip_ansi(&colored), "abc");
    }
}
