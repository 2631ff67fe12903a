//! `evaluate`: hold-out F1 of one model per positive cluster.

use std::fmt::Write;
use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use serde_json::json;
use tracing::{error, info};

use phytebyte_core::{ClusterEvaluation, Config};

use super::{build_phytebyte, Fingerprinting, TargetArgs};

#[derive(Args, Debug)]
pub struct EvaluateArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Negative pool (JSON Lines of candidate compounds)
    #[arg(long)]
    pub negatives: PathBuf,

    /// Negatives per positive. Overrides `sampling.neg_sample_size_factor`
    #[arg(long)]
    pub factor: Option<usize>,

    /// Output as JSON instead of human-readable
    #[arg(long)]
    pub json: bool,
}

pub fn handle_evaluate(config: &Config, args: EvaluateArgs) -> i32 {
    let result = run(config, &args).and_then(|report| {
        let out = if args.json {
            format_json(&report)?
        } else {
            format_report(&report)
        };
        Ok((report.len(), out))
    });

    match result {
        Ok((clusters, out)) => {
            print!("{}", out);
            info!("Evaluated {} clusters", clusters);
            0
        }
        Err(e) => {
            error!("Evaluation failed: {:#}", e);
            eprintln!("Error: {:#}", e);
            1
        }
    }
}

fn run(config: &Config, args: &EvaluateArgs) -> Result<Vec<ClusterEvaluation>> {
    let fingerprinting = Fingerprinting::from_config(config)?;
    let mut phytebyte = build_phytebyte(config, &args.target, &args.negatives, fingerprinting.writer())?;

    let mut classifier = config.classifier.kind.create(&config.classifier.params());
    let factor = args.factor.unwrap_or(config.sampling.neg_sample_size_factor);
    let result = phytebyte.evaluate_clusters(classifier.as_mut(), factor, config.classifier.true_threshold);

    fingerprinting.flush();
    Ok(result?)
}

fn f1_scores(report: &[ClusterEvaluation]) -> Vec<f32> {
    report.iter().filter_map(|c| c.f1).collect()
}

fn mean(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f32>() / values.len() as f32
}

fn format_json(report: &[ClusterEvaluation]) -> Result<String> {
    let value = json!({
        "clusters": report,
        "f1": f1_scores(report),
        "mean_f1": mean(&f1_scores(report)),
    });
    Ok(format!("{}\n", serde_json::to_string_pretty(&value)?))
}

fn format_report(report: &[ClusterEvaluation]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Per-Cluster Evaluation");
    let _ = writeln!(out, "======================\n");
    for c in report {
        let _ = write!(out, "  cluster {:>3}  {:>4} pos {:>5} neg  ", c.cluster_id, c.positives, c.negatives);
        match c.f1 {
            Some(f1) => {
                let _ = writeln!(out, "F1 {:.3}", f1);
            }
            None => {
                let _ = writeln!(out, "skipped (too small to split)");
            }
        }
    }
    let scores = f1_scores(report);
    let _ = writeln!(
        out,
        "\nMean F1: {:.3} over {} of {} clusters",
        mean(&scores),
        scores.len(),
        report.len()
    );
    out
}
