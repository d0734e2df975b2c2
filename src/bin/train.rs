//! Command line tool to train an initial model from a CSV file

use chrono::Utc;
use log::info;
use pico_args::Arguments;
use sdg_classifier::{
    cli::{
        args::{required, Common},
        pipelines::Pipeline,
    },
    datasets::Corpus,
    manager::ClassificationReport,
    pipelines::Pipeline as _,
    store::{FsModelStore, ModelStore},
    ModelVersion,
};

const HELP: &str = "\
Usage: train PIPELINE DATASET [OPTIONS]

Arguments:
  PIPELINE             The pipeline to use (e.g., 'text-classification')
  DATASET              Path to a CSV file with the configured text and label columns

Options:
  -h, --help           Print help
  -c, --config         Path to a YAML config file
  -o, --output         Where to write the model (defaults to the configured store path)
  -a, --alpha          Naive Bayes smoothing
  -n, --ngram-max      Largest n-gram size
";

#[derive(Debug)]
struct Args {
    common: Common,
    pipeline: String,
    dataset: String,
    output: Option<String>,
    alpha: Option<f64>,
    ngram_max: Option<usize>,
}

impl Args {
    fn parse() -> anyhow::Result<Option<Self>> {
        let mut pargs = Arguments::from_env();

        let common = Common::parse(&mut pargs)?;

        // Help has a higher priority and should be handled separately.
        if common.help {
            return Ok(None);
        }

        let args = Args {
            output: pargs.opt_value_from_str(["-o", "--output"])?,
            alpha: pargs.opt_value_from_str(["-a", "--alpha"])?,
            ngram_max: pargs.opt_value_from_str(["-n", "--ngram-max"])?,
            pipeline: pargs
                .free_from_str()
                .map_err(|e| required("PIPELINE", e))?,
            dataset: pargs
                .free_from_str()
                .map_err(|e| required("DATASET", e))?,
            common,
        };

        Ok(Some(args))
    }
}

fn main() -> anyhow::Result<()> {
    let Some(args) = Args::parse()? else {
        print!("{}", HELP);

        return Ok(());
    };

    let mut config = args.common.init()?;

    if let Some(alpha) = args.alpha {
        config.pipeline.alpha = alpha;
    }

    if let Some(ngram_max) = args.ngram_max {
        config.pipeline.ngram_max = ngram_max;
    }

    let pipeline = Pipeline::try_from(args.pipeline.as_str())?;
    let validator = config.dataset.validator();

    let corpus = Corpus::load_csv(&args.dataset, &validator)?;
    info!("Loaded {} rows from {}", corpus.len(), args.dataset);

    let model = pipeline.train(config.pipeline.clone(), corpus.items())?;
    info!(
        "Trained {} with {} classes over {} features",
        pipeline,
        model.classes().len(),
        model.vocabulary_size()
    );

    let predicted = model.predict(&corpus.texts())?;
    let report = ClassificationReport::new(&corpus.labels(), &predicted);

    let output = args.output.unwrap_or(config.store.model_path);
    let store = FsModelStore::new(&output);

    store.save(&ModelVersion::new(model, corpus, Utc::now()))?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    println!("\nTraining accuracy: {:.4}", report.accuracy());
    println!("Model written to {}", output);

    Ok(())
}
