//! PhyteByte command-line interface
//!
//! Clusters known actives for a gene target, evaluates per-cluster models,
//! ranks a compound library by predicted activity and manages the encoding
//! cache.
//!
//! # Usage
//!
//! ```bash
//! # Inspect the positive clusters for PTGS2
//! phytebyte clusters --bioactivity data/bioactivity.jsonl --gene PTGS2
//!
//! # Hold-out F1 per cluster
//! phytebyte evaluate --bioactivity data/bioactivity.jsonl --negatives data/foods.jsonl
//!
//! # Rank a library, top 20 as JSON
//! phytebyte predict --bioactivity data/bioactivity.jsonl --negatives data/foods.jsonl \
//!     --library data/foods.jsonl --top 20 --json
//!
//! # Pre-compute encodings for a library
//! phytebyte cache build --library data/foods.jsonl
//!
//! # Run in debug mode
//! RUST_LOG=debug phytebyte cache inspect
//! ```
//!
//! # Configuration
//!
//! `--config` reads a single TOML file. Without it, `config/default.toml`,
//! `config/{PHYTEBYTE_ENV}.toml` and `PHYTEBYTE__*` variables are layered.
//! `RUST_LOG` takes precedence over `logging.level`.
//!
//! Exit codes: 0 on success, 1 on error.

mod commands;

use std::io;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use commands::cache::{handle_cache_command, CacheCommands};
use commands::clusters::{handle_clusters, ClustersArgs};
use commands::evaluate::{handle_evaluate, EvaluateArgs};
use commands::predict::{handle_predict, PredictArgs};

#[derive(Parser)]
#[command(name = "phytebyte", version, about = "Bioactivity modelling for food compounds")]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Cluster the target's known actives
    Clusters(ClustersArgs),

    /// Train and evaluate one model per positive cluster
    Evaluate(EvaluateArgs),

    /// Train on the first cluster and rank a compound library
    Predict(PredictArgs),

    /// Encoding cache maintenance
    #[command(subcommand)]
    Cache(CacheCommands),
}

fn init_logging(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    fmt()
        .with_writer(io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match commands::load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    init_logging(&config.logging.level);
    info!("PhyteByte starting");

    let code = match cli.command {
        Commands::Clusters(args) => handle_clusters(&config, args),
        Commands::Evaluate(args) => handle_evaluate(&config, args),
        Commands::Predict(args) => handle_predict(&config, args).await,
        Commands::Cache(cmd) => handle_cache_command(&config, cmd),
    };
    std::process::exit(code);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_predict_arguments() {
        let cli = Cli::try_parse_from([
            "phytebyte",
            "--config",
            "custom.toml",
            "predict",
            "--bioactivity",
            "pos.jsonl",
            "--negatives",
            "neg.jsonl",
            "--library",
            "lib.jsonl",
            "--gene",
            "PTGS2",
            "--gene",
            "PTGS1",
            "--top",
            "5",
            "--json",
        ])
        .unwrap();

        assert_eq!(cli.config, Some(PathBuf::from("custom.toml")));
        match cli.command {
            Commands::Predict(args) => {
                assert_eq!(args.target.genes, vec!["PTGS2", "PTGS1"]);
                assert_eq!(args.top, Some(5));
                assert!(args.json);
            }
            _ => panic!("expected predict"),
        }
    }

    #[test]
    fn test_parse_clusters_strategy_by_name() {
        let cli = Cli::try_parse_from([
            "phytebyte",
            "clusters",
            "--bioactivity",
            "pos.jsonl",
            "--strategy",
            "taylor-butina",
            "--threshold",
            "0.5",
        ])
        .unwrap();
        match cli.command {
            Commands::Clusters(args) => {
                assert_eq!(
                    args.strategy,
                    Some(phytebyte_core::ClusteringStrategy::Butina)
                );
                assert_eq!(args.threshold, Some(0.5));
            }
            _ => panic!("expected clusters"),
        }
    }

    #[test]
    fn test_unknown_strategy_rejected() {
        let result = Cli::try_parse_from([
            "phytebyte",
            "clusters",
            "--bioactivity",
            "pos.jsonl",
            "--strategy",
            "kmeans",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cache_build_encodings() {
        let cli = Cli::try_parse_from([
            "phytebyte",
            "cache",
            "build",
            "--library",
            "lib.jsonl",
            "--encoding",
            "bitarray",
        ])
        .unwrap();
        match cli.command {
            Commands::Cache(CacheCommands::Build(args)) => {
                assert_eq!(args.encodings, vec![phytebyte_encoding::Encoding::BitArray]);
            }
            _ => panic!("expected cache build"),
        }
    }
}
