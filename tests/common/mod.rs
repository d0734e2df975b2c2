#![allow(dead_code)]

use std::{
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex,
    },
    thread,
    time::Duration,
};

use chrono::Utc;
use sdg_classifier::{
    datasets::{Corpus, IngestValidator, Item},
    manager::RetrainPolicy,
    pipelines::{text_classification, Pipeline, PipelineError, TextClassifier},
    store::{ModelStore, StoreError},
    ModelManager, ModelVersion,
};

pub const TEXT_COLUMN: &str = "Textos_espanol";
pub const LABEL_COLUMN: &str = "sdg";

pub fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

pub fn validator() -> IngestValidator {
    IngestValidator::new(TEXT_COLUMN, LABEL_COLUMN, vec!["csv".to_string()])
}

/// A small corpus covering three goals
pub fn seed_corpus() -> Corpus {
    [
        ("las escuelas necesitan más maestros", "4"),
        ("educación primaria gratuita para todos los niños", "4"),
        ("becas universitarias y formación docente", "4"),
        ("alfabetización de adultos en zonas rurales", "4"),
        ("acceso universal al agua potable", "6"),
        ("saneamiento e higiene en las comunidades", "6"),
        ("tratamiento de aguas residuales", "6"),
        ("gestión sostenible de los ríos y acuíferos", "6"),
        ("energía solar para hogares aislados", "7"),
        ("parques eólicos y energía renovable", "7"),
        ("eficiencia energética en la industria", "7"),
        ("electricidad asequible y limpia", "7"),
    ]
    .into_iter()
    .map(|(text, label)| Item::new(text.to_string(), label.to_string()))
    .collect()
}

/// Ten rows for a goal the seed corpus does not know about
pub fn recycling_rows() -> Corpus {
    (0..10)
        .map(|i| {
            Item::new(
                format!("reciclaje de plásticos y residuos urbanos lote {}", i),
                "12".to_string(),
            )
        })
        .collect()
}

pub fn to_csv(corpus: &Corpus) -> String {
    let mut writer = csv::Writer::from_writer(vec![]);
    writer.write_record([TEXT_COLUMN, LABEL_COLUMN]).unwrap();

    for item in corpus.items() {
        writer.write_record([&item.text, &item.label]).unwrap();
    }

    String::from_utf8(writer.into_inner().unwrap()).unwrap()
}

pub fn trained_version() -> ModelVersion<TextClassifier> {
    let corpus = seed_corpus();
    let pipeline =
        TextClassifier::train_items(text_classification::Config::default(), corpus.items())
            .unwrap();

    ModelVersion::new(pipeline, corpus, Utc::now())
}

/// An in-memory store that can be told to fail. Clones share state.
pub struct MemoryStore<P> {
    pub saved: Arc<Mutex<Vec<ModelVersion<P>>>>,
    pub fail: Arc<AtomicBool>,
}

impl<P> MemoryStore<P> {
    pub fn new() -> Self {
        Self {
            saved: Arc::new(Mutex::new(vec![])),
            fail: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn saves(&self) -> usize {
        self.saved.lock().unwrap().len()
    }
}

impl<P> Clone for MemoryStore<P> {
    fn clone(&self) -> Self {
        Self {
            saved: self.saved.clone(),
            fail: self.fail.clone(),
        }
    }
}

impl<P: Clone + Send + Sync> ModelStore<P> for MemoryStore<P> {
    fn load(&self) -> Result<ModelVersion<P>, StoreError> {
        self.saved
            .lock()
            .unwrap()
            .last()
            .cloned()
            .ok_or_else(|| StoreError::Format("nothing saved".to_string()))
    }

    fn save(&self, version: &ModelVersion<P>) -> Result<(), StoreError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(StoreError::Io(std::io::Error::other("disk full")));
        }

        self.saved.lock().unwrap().push(version.clone());

        Ok(())
    }
}

/// Behavior knobs shared by every generation of a `StubPipeline`
#[derive(Default)]
pub struct StubControl {
    pub fail_fit: AtomicBool,
    pub fit_delay_ms: AtomicUsize,
    pub fits_running: AtomicUsize,
    pub max_concurrent_fits: AtomicUsize,
    pub fits_started: AtomicUsize,
}

/// A deterministic pipeline whose outputs reveal which generation produced them.
///
/// Generation `g` labels everything `g{g}` with confidence `g / 1000`, so a label and a
/// probability from different generations can be told apart.
#[derive(Clone)]
pub struct StubPipeline {
    pub generation: usize,
    pub trained_rows: usize,
    pub control: Arc<StubControl>,
}

impl StubPipeline {
    pub fn new(control: Arc<StubControl>) -> Self {
        Self {
            generation: 1,
            trained_rows: 0,
            control,
        }
    }

    fn label(&self) -> String {
        format!("g{}", self.generation)
    }
}

impl Pipeline for StubPipeline {
    fn classes(&self) -> &[String] {
        &[]
    }

    fn predict(&self, instances: &[String]) -> Result<Vec<String>, PipelineError> {
        if instances.iter().any(|i| i == "boom") {
            return Err(PipelineError::InvalidInput("boom".to_string()));
        }

        Ok(instances.iter().map(|_| self.label()).collect())
    }

    fn predict_proba(&self, instances: &[String]) -> Result<Vec<Vec<f64>>, PipelineError> {
        let p = self.generation as f64 / 1000.0;

        // The largest value in each row is the generation's own confidence
        Ok(instances.iter().map(|_| vec![p, 0.0]).collect())
    }

    fn fit(&self, texts: &[String], labels: &[String]) -> Result<Self, PipelineError> {
        let control = &self.control;
        control.fits_started.fetch_add(1, Ordering::SeqCst);

        let running = control.fits_running.fetch_add(1, Ordering::SeqCst) + 1;
        control
            .max_concurrent_fits
            .fetch_max(running, Ordering::SeqCst);

        let delay = control.fit_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            thread::sleep(Duration::from_millis(delay as u64));
        }

        control.fits_running.fetch_sub(1, Ordering::SeqCst);

        assert_eq!(texts.len(), labels.len());

        if control.fail_fit.load(Ordering::SeqCst) {
            return Err(PipelineError::Fit("forced failure".to_string()));
        }

        Ok(Self {
            generation: self.generation + 1,
            trained_rows: texts.len(),
            control: control.clone(),
        })
    }
}

pub fn stub_manager(
    policy: RetrainPolicy,
) -> (
    ModelManager<StubPipeline>,
    Arc<StubControl>,
    MemoryStore<StubPipeline>,
) {
    let control = Arc::new(StubControl::default());
    let store = MemoryStore::new();

    let initial = ModelVersion::new(StubPipeline::new(control.clone()), seed_corpus(), Utc::now());
    let manager = ModelManager::new(initial, Box::new(store.clone()), validator(), policy);

    (manager, control, store)
}
