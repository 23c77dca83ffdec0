use annex::dataset::{self, Dataset};
use annex::dataset::io::random_dataset;
use annex::error::{AnnexError, Result};
use annex::eval::{Benchmark, BenchmarkConfig, exact_search, recall_at_k};
use annex::index::{IndexConfig, IndexFactory, IndexType, VectorIndex, make_index};
use rand::SeedableRng;
use rand::rngs::StdRng;

fn axis_dataset() -> Dataset {
    vec![
        ("a".to_string(), vec![1.0, 0.0]),
        ("b".to_string(), vec![0.0, 1.0]),
        ("c".to_string(), vec![0.7071, 0.7071]),
    ]
}

fn build(index_type: &str, dataset: &mut Dataset) -> Result<Box<dyn VectorIndex>> {
    let mut index = make_index(index_type, None, None, None, None)?;
    index.prepare_dataset(dataset);
    for (key, vector) in dataset.iter() {
        index.insert(key, vector)?;
    }
    Ok(index)
}

#[test]
fn cosine_index_finds_exact_match() -> Result<()> {
    let mut dataset = axis_dataset();
    let index = build("cosine", &mut dataset)?;

    assert_eq!(index.size(), 3);
    assert!(index.check());

    let hits = index.search(&[1.0, 0.0], 1)?;
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].0, "a");
    assert!(hits[0].1.abs() < 1e-5);
    Ok(())
}

#[test]
fn dot_product_index_searches_normalized_data() -> Result<()> {
    let mut dataset: Dataset = vec![
        ("a".to_string(), vec![3.0, 0.0]),
        ("b".to_string(), vec![0.0, 5.0]),
        ("c".to_string(), vec![2.0, 2.0]),
    ];
    let index = build("dot_product", &mut dataset)?;

    for (_, vector) in &dataset {
        let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    let hits = index.search(&dataset[1].1, 3)?;
    assert_eq!(hits.len(), 3);
    assert_eq!(hits[0].0, "b");
    assert!(hits[0].1.abs() < 1e-5);
    assert!(hits.windows(2).all(|pair| pair[0].1 <= pair[1].1));
    Ok(())
}

#[test]
fn search_on_empty_index_returns_nothing() -> Result<()> {
    let index = make_index("cosine", None, None, None, None)?;
    assert!(index.is_empty());
    assert!(index.search(&[1.0, 0.0], 5)?.is_empty());
    Ok(())
}

#[test]
fn search_returns_at_most_size_results() -> Result<()> {
    let mut dataset = axis_dataset();
    let index = build("cosine", &mut dataset)?;
    assert_eq!(index.search(&[0.5, 0.5], 10)?.len(), 3);
    Ok(())
}

#[test]
fn remove_shrinks_index_and_keeps_graph_consistent() -> Result<()> {
    for remove_method in ["no_link", "compensate_incoming_links"] {
        let mut rng = StdRng::seed_from_u64(3);
        let mut dataset = random_dataset(200, 8, &mut rng);
        let mut index = make_index("cosine", Some(8), Some(64), None, Some(remove_method))?;
        index.prepare_dataset(&mut dataset);
        for (key, vector) in &dataset {
            index.insert(key, vector)?;
        }

        for (key, _) in dataset.iter().take(50) {
            index.remove(key)?;
        }
        assert_eq!(index.size(), 150);
        assert!(index.check(), "graph broken after removal with {remove_method}");

        let hits = index.search(&dataset[100].1, 5)?;
        assert!(!hits.is_empty());
        assert!(hits.iter().all(|(key, _)| dataset[..50].iter().all(|(k, _)| k != key)));
    }
    Ok(())
}

#[test]
fn removing_unknown_key_fails() -> Result<()> {
    let mut dataset = axis_dataset();
    let mut index = build("cosine", &mut dataset)?;
    assert!(matches!(
        index.remove("missing"),
        Err(AnnexError::KeyNotFound(_))
    ));
    assert_eq!(index.size(), 3);
    Ok(())
}

#[test]
fn reinserting_key_replaces_vector() -> Result<()> {
    let mut dataset = axis_dataset();
    let mut index = build("cosine", &mut dataset)?;

    index.insert("a", &[-1.0, 0.0])?;
    assert_eq!(index.size(), 3);

    let hits = index.search(&[-1.0, 0.0], 1)?;
    assert_eq!(hits[0].0, "a");
    assert!(hits[0].1.abs() < 1e-5);
    Ok(())
}

#[test]
fn dimension_mismatch_is_rejected() -> Result<()> {
    let mut dataset = axis_dataset();
    let mut index = build("cosine", &mut dataset)?;
    assert!(matches!(
        index.insert("d", &[1.0, 2.0, 3.0]),
        Err(AnnexError::DimensionMismatch { .. })
    ));
    assert_eq!(index.size(), 3);
    Ok(())
}

#[test]
fn make_index_reports_invalid_parameters() {
    let err = make_index("hamming", None, None, None, None).unwrap_err();
    assert!(err.is_config());
    assert!(err.to_string().contains("hamming"));

    let err = make_index("cosine", None, None, Some("link_random"), None).unwrap_err();
    assert!(err.to_string().contains("link_random"));

    let err = make_index("cosine", None, None, None, Some("unlink_all")).unwrap_err();
    assert!(err.to_string().contains("unlink_all"));
}

#[test]
fn factory_reads_json_config() -> Result<()> {
    let config: IndexConfig = serde_json::from_str(
        r#"{"type":"dot_product","max_links":12,"insert_method":"link_diverse"}"#,
    )?;
    assert_eq!(config.index_type()?, IndexType::DotProduct);

    let mut index = IndexFactory::create(&config)?;
    index.insert("x", &[0.6, 0.8])?;
    assert_eq!(index.size(), 1);
    Ok(())
}

#[test]
fn hnsw_recall_tracks_exact_search() -> Result<()> {
    let mut rng = StdRng::seed_from_u64(17);
    let mut dataset = random_dataset(500, 12, &mut rng);
    let mut queries = random_dataset(20, 12, &mut rng);

    let index = build("dot_product", &mut dataset)?;
    index.prepare_dataset(&mut queries);

    let mut recall = 0.0;
    for (_, query) in &queries {
        let truth = exact_search(&dataset, query, 10, IndexType::DotProduct);
        let found = index.search(query, 10)?;
        recall += recall_at_k(&truth, &found);
    }
    recall /= queries.len() as f32;
    assert!(recall > 0.8, "recall too low: {recall}");
    Ok(())
}

#[test]
fn benchmark_runs_both_index_types() -> Result<()> {
    for index_type in ["dot_product", "cosine"] {
        let mut rng = StdRng::seed_from_u64(5);
        let dataset = random_dataset(400, 8, &mut rng);
        let config = BenchmarkConfig {
            index: IndexConfig::new(index_type).with_ef_construction(64),
            neighbors: 5,
            control_size: Some(40),
            remove_fraction: 0.25,
        };

        let report = Benchmark::new(config).run(dataset, &mut rng)?;
        assert_eq!(report.index_type, index_type);
        assert_eq!(report.dataset_size, 400);
        assert_eq!(report.control_size, 40);
        assert_eq!(report.insert.operations, 360);
        assert_eq!(report.remove.operations, 90);
        assert_eq!(report.index_size, 270);
        assert!(report.check_passed);
        assert!(report.recall > 0.5);
        assert!(report.recall_after_remove.is_some());
    }
    Ok(())
}

#[test]
fn benchmark_rejects_oversized_control_set() {
    let mut rng = StdRng::seed_from_u64(1);
    let dataset = random_dataset(10, 4, &mut rng);
    let config = BenchmarkConfig {
        control_size: Some(11),
        ..Default::default()
    };
    assert!(matches!(
        Benchmark::new(config).run(dataset, &mut rng),
        Err(AnnexError::Dataset(_))
    ));

    let mut dataset = random_dataset(3, 4, &mut rng);
    let mut control = Dataset::new();
    dataset::split_dataset(&mut dataset, &mut control, 3);
    assert!(dataset.is_empty());
    assert_eq!(control.len(), 3);
}
