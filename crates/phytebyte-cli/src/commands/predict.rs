//! `predict`: train a production model and rank a compound library.

use std::fmt::Write;
use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use tracing::{error, info};

use phytebyte_core::{Config, JsonlCompoundLibrary, Prediction};

use super::{build_phytebyte, Fingerprinting, TargetArgs};

#[derive(Args, Debug)]
pub struct PredictArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Negative pool (JSON Lines of candidate compounds)
    #[arg(long)]
    pub negatives: PathBuf,

    /// Compounds to score (JSON Lines of candidate compounds)
    #[arg(long)]
    pub library: PathBuf,

    /// Keep only the N best-scoring compounds
    #[arg(long)]
    pub top: Option<usize>,

    /// Output as JSON instead of human-readable
    #[arg(long)]
    pub json: bool,
}

pub async fn handle_predict(config: &Config, args: PredictArgs) -> i32 {
    let result = run(config, &args).await.and_then(|predictions| {
        let out = if args.json {
            format!("{}\n", serde_json::to_string_pretty(&predictions)?)
        } else {
            format_predictions(&predictions)
        };
        Ok((predictions.len(), out))
    });

    match result {
        Ok((count, out)) => {
            print!("{}", out);
            info!("Reported {} predictions", count);
            0
        }
        Err(e) => {
            error!("Prediction failed: {:#}", e);
            eprintln!("Error: {:#}", e);
            1
        }
    }
}

async fn run(config: &Config, args: &PredictArgs) -> Result<Vec<Prediction>> {
    let fingerprinting = Fingerprinting::from_config(config)?;
    let mut phytebyte = build_phytebyte(config, &args.target, &args.negatives, fingerprinting.writer())?;
    phytebyte.set_scoring_fingerprinter(fingerprinting.reader());

    let classifier = config.classifier.kind.create(&config.classifier.params());
    let model = phytebyte.train(classifier, config.sampling.neg_sample_size_factor);
    fingerprinting.flush();

    let library = JsonlCompoundLibrary::new(&args.library);
    let mut predictions = phytebyte.sort_predicted(model?, &library).await?;
    if let Some(top) = args.top {
        predictions.truncate(top);
    }
    Ok(predictions)
}

fn format_predictions(predictions: &[Prediction]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Predicted Actives");
    let _ = writeln!(out, "=================\n");
    if predictions.is_empty() {
        let _ = writeln!(out, "No compounds could be scored.");
        return out;
    }

    let _ = writeln!(out, "{:>5}  {:>6}  {:<12}  {:<24}  SMILES", "RANK", "SCORE", "UID", "NAME");
    for (rank, prediction) in predictions.iter().enumerate() {
        let compound = &prediction.compound;
        let _ = writeln!(
            out,
            "{:>5}  {:>6.3}  {:<12}  {:<24}  {}",
            rank + 1,
            prediction.score,
            compound.uid,
            compound.name,
            compound.smiles
        );
    }
    out
}
