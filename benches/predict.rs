use criterion::{black_box, criterion_group, criterion_main, Criterion};
use sdg_classifier::{
    datasets::Item,
    pipelines::{text_classification::Config, Pipeline, TextClassifier},
};

const TOPICS: [(&str, &str); 4] = [
    ("escuelas maestros educación becas alfabetización", "4"),
    ("agua potable saneamiento higiene ríos acuíferos", "6"),
    ("energía solar eólica renovable electricidad", "7"),
    ("reciclaje residuos plásticos consumo producción", "12"),
];

fn mk_items(n: usize) -> Vec<Item> {
    (0..n)
        .map(|i| {
            let (words, label) = TOPICS[i % TOPICS.len()];
            Item::new(format!("{words} informe {i}"), label.to_string())
        })
        .collect()
}

fn bench_predict(c: &mut Criterion) {
    let items = mk_items(2_000);
    let model = TextClassifier::train_items(Config::default(), &items).unwrap();
    let batch = items
        .iter()
        .take(64)
        .map(|item| item.text.clone())
        .collect::<Vec<_>>();

    c.bench_function("predict_proba_batch_64", |b| {
        b.iter(|| {
            let res = model.predict_proba(black_box(&batch)).unwrap();
            black_box(res.len())
        })
    });
}

fn bench_fit(c: &mut Criterion) {
    let items = mk_items(2_000);
    let model = TextClassifier::train_items(Config::default(), &items[..100]).unwrap();
    let texts = items.iter().map(|i| i.text.clone()).collect::<Vec<_>>();
    let labels = items.iter().map(|i| i.label.clone()).collect::<Vec<_>>();

    c.bench_function("fit_2000_rows", |b| {
        b.iter(|| {
            let refit = model.fit(black_box(&texts), black_box(&labels)).unwrap();
            black_box(refit.vocabulary_size())
        })
    });
}

criterion_group!(benches, bench_predict, bench_fit);
criterion_main!(benches);
