//! `clusters`: group the target's known actives by structural similarity.

use std::fmt::Write;

use anyhow::Result;
use clap::Args;
use tracing::{error, info};

use phytebyte_core::{Cluster, ClusteringStrategy, Config, PhyteByte};

use super::{Fingerprinting, TargetArgs};

#[derive(Args, Debug)]
pub struct ClustersArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Clustering strategy (single, butina, leader). Overrides `clustering.strategy`
    #[arg(long)]
    pub strategy: Option<ClusteringStrategy>,

    /// Tanimoto similarity threshold in (0, 1]
    #[arg(long)]
    pub threshold: Option<f32>,

    /// Output as JSON instead of human-readable
    #[arg(long)]
    pub json: bool,
}

pub fn handle_clusters(config: &Config, args: ClustersArgs) -> i32 {
    let result = run(config, &args).and_then(|clusters| {
        let out = if args.json {
            format!("{}\n", serde_json::to_string_pretty(&clusters)?)
        } else {
            format_clusters(&clusters)
        };
        Ok((clusters.len(), out))
    });

    match result {
        Ok((count, out)) => {
            print!("{}", out);
            info!("Found {} clusters", count);
            0
        }
        Err(e) => {
            error!("Clustering failed: {:#}", e);
            eprintln!("Error: {:#}", e);
            1
        }
    }
}

fn run(config: &Config, args: &ClustersArgs) -> Result<Vec<Cluster>> {
    let fingerprinting = Fingerprinting::from_config(config)?;
    let mut phytebyte = PhyteByte::new(args.target.source(), args.target.target(config), fingerprinting.writer());
    phytebyte.set_positive_clusterer(
        args.strategy.unwrap_or(config.clustering.strategy),
        args.threshold.unwrap_or(config.clustering.similarity_threshold),
    )?;

    let clusters = phytebyte.cluster_positives()?;
    fingerprinting.flush();
    Ok(clusters)
}

fn format_clusters(clusters: &[Cluster]) -> String {
    let mut out = String::new();
    let total: usize = clusters.iter().map(Cluster::len).sum();

    let _ = writeln!(out, "Positive Clusters");
    let _ = writeln!(out, "=================\n");
    let _ = writeln!(out, "{} compounds in {} clusters\n", total, clusters.len());

    for cluster in clusters {
        let _ = writeln!(out, "Cluster {} ({} members)", cluster.id(), cluster.len());
        for member in cluster.members() {
            let _ = writeln!(out, "  {:>8}  {:<24}  {}", member.uid, member.display_name(), member.smiles);
        }
    }
    out
}
