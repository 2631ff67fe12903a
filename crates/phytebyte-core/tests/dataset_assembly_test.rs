//! Dataset assembly and scoring with full state verification.
//!
//! Every scenario prints the state before and after the operation so a
//! failing run shows what the pipeline actually produced.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use phytebyte_core::classifier::{ClassifierParams, LogisticRegressionClassifier};
use phytebyte_core::clustering::{Cluster, Clusterer, ClusteringStrategy};
use phytebyte_core::sampling::{RandomNegativeSampler, SamplingStrategy};
use phytebyte_core::library::CandidateIter;
use phytebyte_core::sources::BioactiveCompoundIter;
use phytebyte_core::{
    BinaryClassifierInput, BioactiveCompound, CandidateCompound, CompoundBioactivity,
    CompoundLibrary, InMemoryBioactivitySource, InMemoryCompoundLibrary, ModelInputLoader,
    PhyteByte, PipelineError, PipelineResult, ScoringOptions, TargetInput,
};
use phytebyte_encoding::{Encoding, Fingerprinter, HashedSmilesFingerprinter};

const GROUP_A: usize = 10;
const GROUP_B: usize = 5;

/// Splits positives at a uid boundary: `uid < boundary` first, the rest second.
struct UidSplitClusterer {
    boundary: u64,
}

impl Clusterer for UidSplitClusterer {
    fn find_clusters(&self, compounds: BioactiveCompoundIter<'_>) -> PipelineResult<Vec<Cluster>> {
        let (first, second): (Vec<BioactiveCompound>, Vec<BioactiveCompound>) = compounds
            .collect::<PipelineResult<Vec<_>>>()?
            .into_iter()
            .partition(|c| c.uid < self.boundary);
        Ok(vec![Cluster::new(0, first)?, Cluster::new(1, second)?])
    }

    fn name(&self) -> &'static str {
        "uid-split"
    }
}

fn create_test_fingerprinter() -> Arc<dyn Fingerprinter> {
    Arc::new(HashedSmilesFingerprinter::new(512, 2).unwrap())
}

fn create_test_positive(uid: u64, smiles: String) -> BioactiveCompound {
    BioactiveCompound {
        uid,
        pref_name: None,
        smiles,
        gene_target: "PTGS2".to_string(),
        name: format!("positive-{}", uid),
        bioactivities: vec![CompoundBioactivity::new(40.0, "nM", "IC50", "cox-2 assay")],
    }
}

/// Ten aryl alkanes (uids 0..10) and five cyclohexanols (uids 10..15).
fn create_test_positives() -> Vec<BioactiveCompound> {
    let aryl = (0..GROUP_A).map(|i| create_test_positive(i as u64, format!("c1ccccc1{}", "C".repeat(i + 1))));
    let cyclo = (0..GROUP_B).map(|i| {
        create_test_positive((GROUP_A + i) as u64, format!("OC1CCCCC1{}", "N".repeat(i + 1)))
    });
    aryl.chain(cyclo).collect()
}

/// Aliphatic candidates plus every positive structure, so exclusion is tested.
fn create_test_library(size: usize) -> InMemoryCompoundLibrary {
    const TAILS: [&str; 4] = ["", "O", "N", "S"];
    let mut compounds: Vec<CandidateCompound> = (0..size)
        .map(|i| {
            CandidateCompound::new(
                format!("fd{}", i),
                format!("candidate-{}", i),
                format!("{}{}", "C".repeat(i + 1), TAILS[i % TAILS.len()]),
            )
        })
        .collect();
    compounds.extend(
        create_test_positives()
            .into_iter()
            .map(|p| CandidateCompound::new(format!("dup{}", p.uid), p.name, p.smiles)),
    );
    InMemoryCompoundLibrary::new(compounds)
}

fn structures(rows: &[phytebyte_encoding::EncodedCompound]) -> HashSet<String> {
    rows.iter().map(|r| r.smiles.clone()).collect()
}

fn assemble(seed: u64, factor: usize, exclude_all: bool) -> PipelineResult<Vec<BinaryClassifierInput>> {
    let fp = create_test_fingerprinter();
    let source = InMemoryBioactivitySource::new(create_test_positives());
    let clusterer = UidSplitClusterer {
        boundary: GROUP_A as u64,
    };
    let mut sampler = RandomNegativeSampler::new(Arc::new(create_test_library(120)), fp.clone(), seed);
    let target = TargetInput::for_genes(["PTGS2"]);

    let mut loader = ModelInputLoader::new(
        &source,
        &mut sampler,
        &clusterer,
        &target,
        fp.as_ref(),
        Encoding::Dense,
    )
    .exclude_all_positives(exclude_all);
    Ok(loader.load(factor)?.to_vec())
}

#[test]
fn test_two_clusters_get_proportional_negatives_in_order() {
    println!("\n=== Two clusters of 10 and 5 positives, factor 3 ===");
    println!("STATE BEFORE: positives = {}", GROUP_A + GROUP_B);

    let inputs = assemble(42, 3, false).unwrap();

    println!(
        "STATE AFTER: inputs = {}, sizes = {:?}",
        inputs.len(),
        inputs
            .iter()
            .map(|i| (i.positives().len(), i.negatives().len()))
            .collect::<Vec<_>>()
    );
    assert_eq!(inputs.len(), 2);
    assert_eq!(inputs[0].positives().len(), GROUP_A);
    assert_eq!(inputs[0].negatives().len(), 30);
    assert_eq!(inputs[1].positives().len(), GROUP_B);
    assert_eq!(inputs[1].negatives().len(), 15);
    assert!(inputs[0].positives().iter().all(|p| p.smiles.starts_with("c1ccccc1")));
    assert!(inputs[1].positives().iter().all(|p| p.smiles.starts_with("OC1CCCCC1")));
    for input in &inputs {
        assert_eq!(input.encoding(), Encoding::Dense);
        assert_eq!(input.dimension(), 512);
        assert_eq!(structures(input.negatives()).len(), input.negatives().len());
    }

    println!("[PASS] 10 -> 30 and 5 -> 15 negatives, cluster order kept");
}

#[test]
fn test_negatives_never_contain_own_positives() {
    let inputs = assemble(7, 3, false).unwrap();

    for input in &inputs {
        let positives = structures(input.positives());
        let negatives = structures(input.negatives());
        assert!(
            positives.is_disjoint(&negatives),
            "overlap: {:?}",
            positives.intersection(&negatives).collect::<Vec<_>>()
        );
    }
    println!("[PASS] Per-cluster positives and negatives are disjoint");
}

#[test]
fn test_exclude_all_positives_spans_clusters() {
    let inputs = assemble(7, 3, true).unwrap();

    let all_positives: HashSet<String> = inputs.iter().flat_map(|i| structures(i.positives())).collect();
    for input in &inputs {
        assert!(structures(input.negatives()).is_disjoint(&all_positives));
    }
    println!("[PASS] No positive of any cluster appears as a negative");
}

#[test]
fn test_same_seed_same_datasets() {
    let first = assemble(1234, 2, false).unwrap();
    let second = assemble(1234, 2, false).unwrap();
    assert_eq!(first, second);

    let other = assemble(4321, 2, false).unwrap();
    assert_eq!(other[0].positives(), first[0].positives());
    assert_ne!(other[0].negatives(), first[0].negatives());
    println!("[PASS] Assembly is reproducible for a fixed seed");
}

#[test]
fn test_small_library_reports_insufficient_candidates() {
    let fp = create_test_fingerprinter();
    let source = InMemoryBioactivitySource::new(create_test_positives());
    let clusterer = UidSplitClusterer { boundary: 10 };
    let mut sampler = RandomNegativeSampler::new(Arc::new(create_test_library(20)), fp.clone(), 1);
    let target = TargetInput::default();

    let mut loader =
        ModelInputLoader::new(&source, &mut sampler, &clusterer, &target, fp.as_ref(), Encoding::BitArray);
    let err = loader.load(3).unwrap_err();
    println!("STATE AFTER: {}", err);

    // Own positives are excluded, so the first cluster sees 20 aliphatics + 5 cyclohexanols.
    assert!(matches!(
        err,
        PipelineError::InsufficientCandidates { requested: 30, produced: 25 }
    ));
    assert!(loader.model_inputs().is_empty());
}

#[test]
fn test_similarity_clustering_keeps_sample_ratio() {
    let fp = create_test_fingerprinter();
    let source = InMemoryBioactivitySource::new(create_test_positives());
    let clusterer = ClusteringStrategy::Butina.create(fp.clone(), 0.35).unwrap();
    let mut sampler = RandomNegativeSampler::new(Arc::new(create_test_library(300)), fp.clone(), 3);
    let target = TargetInput::default();

    let mut loader = ModelInputLoader::new(
        &source,
        &mut sampler,
        clusterer.as_ref(),
        &target,
        fp.as_ref(),
        Encoding::BitArray,
    );
    let inputs = loader.load(2).unwrap().to_vec();

    let total: usize = inputs.iter().map(|i| i.positives().len()).sum();
    println!("STATE AFTER: {} clusters covering {} positives", inputs.len(), total);
    assert_eq!(total, GROUP_A + GROUP_B);
    assert_eq!(inputs.len(), loader.positive_clusters().len());
    for (input, cluster) in inputs.iter().zip(loader.positive_clusters()) {
        assert_eq!(input.positives().len(), cluster.len());
        assert_eq!(input.negatives().len(), cluster.len() * 2);
    }
}

fn create_test_phytebyte(library_size: usize) -> PhyteByte {
    let fp = create_test_fingerprinter();
    let mut phytebyte = PhyteByte::new(
        Arc::new(InMemoryBioactivitySource::new(create_test_positives())),
        TargetInput::for_genes(["PTGS2"]),
        fp,
    );
    phytebyte
        .set_positive_clusterer(ClusteringStrategy::Single, 0.35)
        .unwrap();
    phytebyte.set_negative_sampler(
        SamplingStrategy::Random,
        Arc::new(create_test_library(library_size)),
        42,
    );
    phytebyte
}

fn create_test_params() -> ClassifierParams {
    ClassifierParams {
        epochs: 60,
        ..ClassifierParams::default()
    }
}

#[test]
fn test_facade_requires_collaborators() {
    let mut phytebyte = PhyteByte::new(
        Arc::new(InMemoryBioactivitySource::new(create_test_positives())),
        TargetInput::default(),
        create_test_fingerprinter(),
    );
    let mut classifier = LogisticRegressionClassifier::new(create_test_params());
    assert!(matches!(
        phytebyte.train_and_evaluate(&mut classifier, 3, 0.5),
        Err(PipelineError::InvalidParameter(_))
    ));
    assert_eq!(phytebyte.load_positive_compounds().unwrap().len(), GROUP_A + GROUP_B);
}

#[test]
fn test_facade_evaluates_each_cluster() {
    let mut phytebyte = create_test_phytebyte(120);
    let mut classifier = LogisticRegressionClassifier::new(create_test_params());

    let f1_scores = phytebyte.train_and_evaluate(&mut classifier, 3, 0.5).unwrap();
    println!("STATE AFTER: f1 = {:?}", f1_scores);
    assert_eq!(f1_scores.len(), 1);
    assert!(f1_scores.iter().all(|f| (0.0..=1.0).contains(f)));
}

#[tokio::test]
async fn test_facade_predict_drops_unencodable_and_keeps_order() {
    let mut phytebyte = create_test_phytebyte(120);
    let model = phytebyte
        .train(Box::new(LogisticRegressionClassifier::new(create_test_params())), 3)
        .unwrap();

    let scoring_library = InMemoryCompoundLibrary::new(vec![
        CandidateCompound::new("s0", "toluene", "c1ccccc1C"),
        CandidateCompound::new("s1", "broken ring", "C1CC"),
        CandidateCompound::new("s2", "propanol", "CCCO"),
        CandidateCompound::new("s3", "broken branch", "C(C"),
        CandidateCompound::new("s4", "cyclohexanol", "OC1CCCCC1"),
        CandidateCompound::new("s5", "ethylbenzene", "c1ccccc1CC"),
    ]);
    println!("STATE BEFORE: N = {}, unencodable M = 2", scoring_library.len());

    let predictions = phytebyte.predict(model.clone(), &scoring_library).await.unwrap();
    let uids: Vec<&str> = predictions.iter().map(|p| p.compound.uid.as_str()).collect();
    println!("STATE AFTER: {:?}", uids);
    assert_eq!(uids, vec!["s0", "s2", "s4", "s5"]);
    assert!(predictions.iter().all(|p| (0.0..=1.0).contains(&p.score)));

    let streamed: Vec<_> = phytebyte
        .predict_stream(model.clone(), &scoring_library)
        .unwrap()
        .collect()
        .await;
    assert_eq!(streamed, predictions);

    let sorted = phytebyte.sort_predicted(model, &scoring_library).await.unwrap();
    assert_eq!(sorted.len(), 4);
    assert!(sorted.windows(2).all(|w| w[0].score >= w[1].score));
    println!("[PASS] N - M predictions in input order, sorted view descending");
}

#[test]
fn test_singleton_cluster_is_skipped_not_fatal() {
    let mut positives: Vec<BioactiveCompound> = create_test_positives().into_iter().take(6).collect();
    positives.push(create_test_positive(6, "OS(=O)(=O)O".to_string()));
    println!("STATE BEFORE: {} positives, one outlier", positives.len());

    let mut phytebyte = PhyteByte::new(
        Arc::new(InMemoryBioactivitySource::new(positives)),
        TargetInput::for_genes(["PTGS2"]),
        create_test_fingerprinter(),
    );
    phytebyte.set_clusterer(Box::new(UidSplitClusterer { boundary: 6 }));
    phytebyte.set_negative_sampler(
        SamplingStrategy::Random,
        Arc::new(create_test_library(120)),
        42,
    );

    let mut classifier = LogisticRegressionClassifier::new(create_test_params());
    let report = phytebyte.evaluate_clusters(&mut classifier, 3, 0.5).unwrap();
    println!("STATE AFTER: {:?}", report);
    assert_eq!(report.len(), 2);
    assert_eq!((report[0].positives, report[0].negatives), (6, 18));
    assert!(report[0].f1.is_some());
    assert_eq!((report[1].positives, report[1].negatives), (1, 3));
    assert_eq!(report[1].f1, None);

    let f1_scores = phytebyte.train_and_evaluate(&mut classifier, 3, 0.5).unwrap();
    assert_eq!(f1_scores, vec![report[0].f1.unwrap()]);
    println!("[PASS] Outlier cluster reported without an F1, the rest evaluated");
}

/// Library that counts how many records `fetch_all` has handed out.
struct CountingLibrary {
    inner: InMemoryCompoundLibrary,
    pulled: Arc<AtomicUsize>,
}

impl CompoundLibrary for CountingLibrary {
    fn fetch_all(&self) -> PipelineResult<CandidateIter<'_>> {
        let pulled = Arc::clone(&self.pulled);
        Ok(Box::new(self.inner.fetch_all()?.inspect(move |_| {
            pulled.fetch_add(1, Ordering::SeqCst);
        })))
    }

    fn fetch_random<'a>(&'a self, excluded: &HashSet<String>, seed: u64) -> PipelineResult<CandidateIter<'a>> {
        self.inner.fetch_random(excluded, seed)
    }
}

#[tokio::test]
async fn test_predict_stream_reads_library_lazily() {
    let mut phytebyte = create_test_phytebyte(120);
    let model = phytebyte
        .train(Box::new(LogisticRegressionClassifier::new(create_test_params())), 3)
        .unwrap();
    phytebyte.set_scoring_options(ScoringOptions {
        workers: 1,
        item_timeout: Duration::from_secs(5),
    });

    let pulled = Arc::new(AtomicUsize::new(0));
    let library = CountingLibrary {
        inner: create_test_library(500),
        pulled: Arc::clone(&pulled),
    };
    let total = library.inner.len();

    let stream = phytebyte.predict_stream(model, &library).unwrap();
    assert_eq!(pulled.load(Ordering::SeqCst), 0);

    let first: Vec<_> = stream.take(2).collect().await;
    let read = pulled.load(Ordering::SeqCst);
    println!("STATE AFTER: 2 predictions, {} of {} records read", read, total);
    assert_eq!(first.len(), 2);
    assert_eq!(first[0].compound.uid, "fd0");
    assert!(read < 10, "read {} records for 2 predictions", read);
}
