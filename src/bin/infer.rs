//! Command line tool for inference against a stored model

use anyhow::Result;
use pico_args::Arguments;
use sdg_classifier::{
    cli::args::Common,
    pipelines::TextClassifier,
    store::{FsModelStore, ModelStore},
    ModelVersion,
};

const HELP: &str = "\
Usage: infer [TEXT]... [OPTIONS]

Arguments:
  TEXT                 Texts to classify. When none are given, random training rows are used.

Options:
  -h, --help           Print help
  -c, --config         Path to a YAML config file
  -m, --model          The model file to load (defaults to the configured store path)
  -s, --samples        How many training rows to sample when no TEXT is given (default 10)
";

#[derive(Debug)]
struct Args {
    common: Common,

    /// The model file to load
    model: Option<String>,

    /// Number of random corpus rows to classify
    samples: usize,

    /// Texts to classify
    texts: Vec<String>,
}

fn parse_args() -> Result<Args, pico_args::Error> {
    let mut pargs = Arguments::from_env();

    let common = Common::parse(&mut pargs)?;
    let model = pargs.opt_value_from_str(["-m", "--model"])?;
    let samples = pargs.opt_value_from_str(["-s", "--samples"])?.unwrap_or(10);

    let texts = pargs
        .finish()
        .into_iter()
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect();

    Ok(Args {
        common,
        model,
        samples,
        texts,
    })
}

fn main() -> Result<()> {
    let args = parse_args()?;

    if args.common.help {
        println!("{}", HELP);
        return Ok(());
    }

    let config = args.common.init()?;

    let path = args.model.unwrap_or(config.store.model_path);
    let version: ModelVersion<TextClassifier> = FsModelStore::new(&path).load()?;

    // Pair each text with its expected label, if it came from the corpus
    let samples: Vec<(String, Option<String>)> = if args.texts.is_empty() {
        version
            .corpus
            .sample(args.samples)
            .into_iter()
            .map(|item| (item.text.clone(), Some(item.label.clone())))
            .collect()
    } else {
        args.texts.into_iter().map(|text| (text, None)).collect()
    };

    if samples.is_empty() {
        return Err(anyhow::anyhow!("Nothing to classify"));
    }

    let manager = sdg_classifier::ModelManager::new(
        version,
        Box::new(FsModelStore::new(&path)),
        config.dataset.validator(),
        config.retrain.policy,
    );

    let input = samples.iter().map(|(text, _)| text.clone()).collect::<Vec<_>>();
    let predictions = manager.predict(&input)?;

    for (i, ((text, expected), prediction)) in samples.iter().zip(predictions).enumerate() {
        let expected = expected.as_deref().unwrap_or("-");

        println!(
            "\n=== Item {i} ===\
             \n- Text: {text}\
             \n- Class: {}\
             \n- Probability: {:.4}\
             \n- Expected: {expected}\
             \n================",
            prediction.label, prediction.confidence
        );
    }

    Ok(())
}
