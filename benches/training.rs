use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use exoplanet_classifier::prelude::*;
use polars::prelude::*;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use serde_json::json;

const CLASSES: [&str; 3] = ["CONFIRMED", "CANDIDATE", "FALSE POSITIVE"];

fn create_classification_data(n_rows: usize, n_features: usize) -> DataFrame {
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let labels: Vec<usize> = (0..n_rows).map(|_| rng.gen_range(0..CLASSES.len())).collect();

    let mut columns: Vec<Column> = (0..n_features)
        .map(|i| {
            let values: Vec<f64> = labels
                .iter()
                .map(|&c| c as f64 * (i + 1) as f64 + rng.gen::<f64>() * 4.0)
                .collect();
            Series::new(format!("feature_{}", i).into(), values).into()
        })
        .collect();

    let names: Vec<&str> = labels.iter().map(|&c| CLASSES[c]).collect();
    columns.push(Series::new("disposition".into(), names).into());

    DataFrame::new(columns).unwrap()
}

fn plan(kind: ModelKind) -> TrainingPlan {
    let mut plan = TrainingPlan::custom(kind);
    plan.cv_folds = None;
    plan.model.xgboost.n_estimators = 50;
    plan.model.random_forest.n_estimators = 50;
    plan
}

fn bench_training(c: &mut Criterion) {
    let mut group = c.benchmark_group("training");
    group.sample_size(10);

    for n_rows in [1000, 5000].iter() {
        let df = create_classification_data(*n_rows, 10);

        for kind in [ModelKind::Boosted, ModelKind::Bagged, ModelKind::Linear] {
            group.bench_with_input(
                BenchmarkId::new(kind.as_str(), n_rows),
                &df,
                |b, df| {
                    b.iter(|| TrainEngine::new(plan(kind)).train(black_box(df)).unwrap())
                },
            );
        }
    }

    group.finish();
}

fn bench_prediction(c: &mut Criterion) {
    let mut group = c.benchmark_group("prediction");

    let train_df = create_classification_data(2000, 10);
    let bundle = TrainEngine::new(plan(ModelKind::Ensemble))
        .train(&train_df)
        .unwrap()
        .bundle;

    let record = json!({
        "feature_0": 1.2, "feature_1": 2.5, "feature_2": 3.1, "feature_3": 4.0, "feature_4": 5.2,
        "feature_5": 6.3, "feature_6": 7.1, "feature_7": 8.8, "feature_8": 9.0, "feature_9": 10.4,
    });
    let record = record.as_object().unwrap().clone();

    group.bench_function("predict_record", |b| {
        b.iter(|| bundle.predict_record(black_box(&record)).unwrap())
    });

    group.finish();
}

criterion_group!(benches, bench_training, bench_prediction);
criterion_main!(benches);
