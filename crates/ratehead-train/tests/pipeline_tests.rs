use std::fs;
use tempfile::TempDir;

use candle_core::Device;
use ratehead_core::config::{BackendKind, TrainingSettings};
use ratehead_core::dataset::load_dataset;
use ratehead_core::error::ServiceError;
use ratehead_core::traits::EmbeddingService;
use ratehead_core::types::{EmbeddingConfig, LinearHead};
use ratehead_embed::EmbeddingFetcher;
use ratehead_train::{export_head, load_head, train_head};

const DIM: usize = 4;

/// Row `i` maps to the basis vector `e_{i % DIM}` plus a small tilt.
struct BasisService;

impl EmbeddingService for BasisService {
    fn embed_chunk(&self, texts: &[String], config: &EmbeddingConfig) -> Result<Vec<Vec<f64>>, ServiceError> {
        Ok(texts
            .iter()
            .map(|t| {
                let i: usize = t.trim_start_matches("book ").parse().unwrap();
                let mut v = vec![0.0; config.dimension];
                v[i % DIM] = 1.0;
                v[(i + 1) % DIM] = 0.1;
                v
            })
            .collect())
    }
}

#[test]
fn smoke_train_beats_zero_baseline() {
    let tmp = TempDir::new().unwrap();
    let csv = tmp.path().join("books.csv");
    let mut body = String::from("description,rating\n");
    for i in 0..10 {
        body.push_str(&format!("book {},{}\n", i, 2.0 + (i % DIM) as f64 * 0.5));
    }
    fs::write(&csv, body).unwrap();

    let dataset = load_dataset(&csv, "description", "rating", None).expect("load");
    assert_eq!(dataset.len(), 10);

    let embed_cfg = EmbeddingConfig { dimension: DIM, chunk_size: 3, chunk_delay_ms: 0, ..EmbeddingConfig::default() };
    let xs = EmbeddingFetcher::new(&BasisService, &embed_cfg).fetch(&dataset.texts).expect("fetch");
    assert_eq!(xs.len(), dataset.len());

    let settings = TrainingSettings {
        epochs: 100,
        learning_rate: 0.1,
        backend: BackendKind::Adam,
        ..TrainingSettings::default()
    };
    let out = train_head(&xs, &dataset.labels, &settings, &Device::Cpu).expect("train");
    assert_eq!(out.split.validation.len(), 2);

    let val = || out.split.validation.iter().map(|&i| (xs[i].as_slice(), dataset.labels[i]));
    let (baseline, _) = LinearHead::zeros(DIM).mse_mae(val()).unwrap();
    let (trained, _) = out.head.mse_mae(val()).unwrap();
    assert!(trained < baseline, "trained={trained} baseline={baseline}");
    assert_eq!(out.history.last().unwrap().val_mse, Some(trained));

    let path = tmp.path().join("out/rating-head.json");
    export_head(&out.head, &path).expect("export");
    assert_eq!(load_head(&path, DIM).unwrap(), out.head);
}

#[test]
fn same_inputs_same_partition_and_weights() {
    let xs: Vec<Vec<f32>> = (0..25).map(|i| vec![(i % 5) as f32 / 5.0, 0.5, (i % 2) as f32]).collect();
    let ys: Vec<f64> = (0..25u32).map(|i| f64::from(i % 5) + 1.0).collect();
    let settings = TrainingSettings { epochs: 5, batch_size: 8, backend: BackendKind::Adam, ..TrainingSettings::default() };

    let a = train_head(&xs, &ys, &settings, &Device::Cpu).unwrap();
    let b = train_head(&xs, &ys, &settings, &Device::Cpu).unwrap();

    assert_eq!(a.split, b.split);
    assert_eq!(a.head.weights.len(), b.head.weights.len());
    for (wa, wb) in a.head.weights.iter().zip(&b.head.weights) {
        assert!((wa - wb).abs() < 1e-6);
    }
    assert!((a.head.bias - b.head.bias).abs() < 1e-6);
}
