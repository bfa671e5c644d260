//! End-to-end pipeline tests over fixture files
//!
//! Exercises the exchange formats (JSONL corpus, text embeddings, raw f32
//! transform) through both inference pipelines, plus the reproducibility and
//! coverage properties the statistics must hold.

use std::io::Write;

use lexassoc::config::RunConfig;
use lexassoc::corpus::Corpus;
use lexassoc::embedding::{EmbeddingTable, TransformMatrix};
use lexassoc::infer::{aggregate_scalar, PValueMode};
use lexassoc::pipeline::{AssociationPipeline, RegressionPipeline};
use lexassoc::resample::{ResamplingEngine, SeedSpawner, TrialFailurePolicy};

fn write_fixture_corpus() -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("temp corpus");
    let lines = [
        r#"{"tokens": ["may", "it", "please", "the", "court"], "attribute": "F"}"#,
        r#"{"tokens": ["mr", "chief", "justice", "may", "it", "please"], "attribute": "M"}"#,
        r#"{"tokens": ["the", "court", "below", "held", "justice"], "attribute": "M"}"#,
        r#"{"tokens": ["justice", "requires", "the", "court", "to", "reverse"], "attribute": "F"}"#,
        r#"{"tokens": ["we", "ask", "the", "court", "to", "affirm"], "attribute": "F"}"#,
        r#"{"tokens": ["the", "argument", "below", "was", "waived"], "attribute": "M"}"#,
    ];
    for line in lines {
        writeln!(file, "{line}").expect("write corpus line");
    }
    file
}

fn write_fixture_embeddings() -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("temp embeddings");
    let rows = [
        "the 0.1 0.2 0.1",
        "court 0.9 0.1 0.3",
        "justice 0.2 0.8 0.5",
        "may -0.1 0.4 0.2",
        "it 0.0 0.1 0.0",
        "please 0.3 0.3 0.1",
        "below -0.5 0.2 0.6",
        "to 0.05 0.0 0.1",
    ];
    for row in rows {
        writeln!(file, "{row}").expect("write embedding row");
    }
    file
}

fn fast_config() -> RunConfig {
    RunConfig {
        bootstrap_trials: 300,
        permutation_trials: 300,
        parallelism_degree: 4,
        ..Default::default()
    }
}

#[test]
fn association_pipeline_end_to_end() {
    let corpus_file = write_fixture_corpus();
    let corpus = Corpus::from_jsonl_path(corpus_file.path()).expect("load corpus");
    let config = fast_config();

    let report = AssociationPipeline::new(&corpus, &config).run().expect("run");

    // Every vocabulary token appears exactly once, sorted.
    let mut seen = report.tokens.iter().map(|t| t.token.clone()).collect::<Vec<_>>();
    let sorted = {
        let mut s = seen.clone();
        s.sort();
        s
    };
    assert_eq!(seen, sorted);
    seen.dedup();
    assert_eq!(seen.len(), report.tokens.len());

    for token in &report.tokens {
        // Ratio invariant and PPMI floor.
        assert!((token.record.ratio_a + token.record.ratio_b - 1.0).abs() < 1e-12);
        if let Some(ppmi) = token.record.ppmi {
            assert!(ppmi >= 0.0, "PPMI floor violated for {:?}", token.token);
        }
        if let Some(inference) = &token.inference {
            assert!(inference.ci_low[0] <= inference.ci_high[0]);
            assert!(inference.samples > 0);
            assert!(token.samples <= config.bootstrap_trials);
        }
    }

    // "court" is spoken mostly under F; it must carry a defined PPMI.
    let court = report.tokens.iter().find(|t| t.token == "court").expect("court");
    assert!(court.record.ppmi.is_some());
    assert!(court.record.ratio_b > court.record.ratio_a);
}

#[test]
fn association_runs_are_bit_reproducible() {
    let corpus_file = write_fixture_corpus();
    let corpus = Corpus::from_jsonl_path(corpus_file.path()).expect("load corpus");

    let serial = RunConfig {
        parallelism_degree: 1,
        ..fast_config()
    };
    let parallel = RunConfig {
        parallelism_degree: 8,
        ..fast_config()
    };

    let a = AssociationPipeline::new(&corpus, &serial).run().expect("serial");
    let b = AssociationPipeline::new(&corpus, &parallel).run().expect("parallel");

    assert_eq!(a.tokens.len(), b.tokens.len());
    for (ta, tb) in a.tokens.iter().zip(&b.tokens) {
        assert_eq!(ta.token, tb.token);
        assert_eq!(ta.samples, tb.samples);
        assert_eq!(ta.inference, tb.inference);
    }
}

#[test]
fn regression_pipeline_end_to_end_with_transform_file() {
    let corpus_file = write_fixture_corpus();
    let embeddings_file = write_fixture_embeddings();

    // 3x3 identity transform in the raw f32 exchange format.
    let mut transform_file = tempfile::NamedTempFile::new().expect("temp transform");
    #[rustfmt::skip]
    let identity: [f32; 9] = [
        1.0, 0.0, 0.0,
        0.0, 1.0, 0.0,
        0.0, 0.0, 1.0,
    ];
    for v in identity {
        transform_file.write_all(&v.to_le_bytes()).expect("write transform");
    }

    let corpus = Corpus::from_jsonl_path(corpus_file.path()).expect("load corpus");
    let embeddings = EmbeddingTable::from_text_path(embeddings_file.path()).expect("embeddings");
    let transform =
        TransformMatrix::from_f32le_path(transform_file.path(), embeddings.dim()).expect("transform");
    let config = fast_config();

    let pipeline =
        RegressionPipeline::new(&corpus, &embeddings, &transform, &config).expect("pipeline");
    let targets = vec!["court".to_string(), "justice".to_string()];
    let report = pipeline.run(&targets).expect("run");

    assert_eq!(report.tokens.len(), 2);
    assert_eq!(report.permutation_trials, 300);
    for token in &report.tokens {
        assert!(token.occurrences > 0, "{:?} should occur", token.token);
        let inference = token.inference.as_ref().expect("inference");
        assert_eq!(inference.ground_truth.len(), 1);
        assert!(inference.ground_truth[0] >= 0.0);
        let p = inference.p_value[0].expect("permutation p defined");
        assert!((0.0..=1.0).contains(&p));
        assert!(inference.ci_low[0] <= inference.ci_high[0]);
    }

    // "was"/"waived" are not in the embedding vocabulary, so the fallback
    // counter must be observable and nonzero after vectorizing.
    assert!(report.embedding_misses > 0);
}

#[test]
fn regression_runs_are_bit_reproducible() {
    let corpus_file = write_fixture_corpus();
    let embeddings_file = write_fixture_embeddings();
    let corpus = Corpus::from_jsonl_path(corpus_file.path()).expect("load corpus");
    let embeddings = EmbeddingTable::from_text_path(embeddings_file.path()).expect("embeddings");
    let transform = TransformMatrix::identity(embeddings.dim());
    let targets = vec!["court".to_string(), "the".to_string(), "justice".to_string()];

    let serial = RunConfig {
        parallelism_degree: 1,
        ..fast_config()
    };
    let parallel = RunConfig {
        parallelism_degree: 8,
        ..fast_config()
    };

    let a = RegressionPipeline::new(&corpus, &embeddings, &transform, &serial)
        .expect("pipeline")
        .run(&targets)
        .expect("serial");
    let b = RegressionPipeline::new(&corpus, &embeddings, &transform, &parallel)
        .expect("pipeline")
        .run(&targets)
        .expect("parallel");

    for (ta, tb) in a.tokens.iter().zip(&b.tokens) {
        assert_eq!(ta.token, tb.token);
        assert_eq!(ta.occurrences, tb.occurrences);
        assert_eq!(ta.inference, tb.inference);
    }
}

#[test]
fn confidence_interval_tracks_known_distribution() {
    // Trials drawn uniformly from [0, 1): the 90% percentile interval of the
    // empirical distribution must approach [0.05, 0.95].
    let seeds = SeedSpawner::new(375).spawn_n(5_000);
    let engine = ResamplingEngine::new(4, TrialFailurePolicy::Abort);
    let trials = engine
        .run(&seeds, |_, rng| {
            Ok(rand::Rng::random_range(rng, 0.0..1.0))
        })
        .expect("trials");
    let samples: Vec<f64> = trials.into_iter().flatten().collect();

    let inference =
        aggregate_scalar(0.5, &samples, 90.0, PValueMode::PermutationTail).expect("aggregate");
    assert!((inference.ci_low[0] - 0.05).abs() < 0.02, "low {}", inference.ci_low[0]);
    assert!((inference.ci_high[0] - 0.95).abs() < 0.02, "high {}", inference.ci_high[0]);
    // The median ground truth sits near the middle of a uniform null.
    let p = inference.p_value[0].expect("p defined");
    assert!((p - 0.5).abs() < 0.05, "p {p}");
}
