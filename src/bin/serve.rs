//! HTTP server for predictions and online retraining

use std::sync::Arc;

use anyhow::{Context, Result};
use log::info;
use pico_args::Arguments;
use sdg_classifier::{
    cli::args::Common,
    pipelines::{Pipeline as _, TextClassifier},
    server,
    store::FsModelStore,
    ModelManager,
};

const HELP: &str = "\
Usage: serve [OPTIONS]

Options:
  -h, --help           Print help
  -c, --config         Path to a YAML config file
  -m, --model          The model file to serve (defaults to the configured store path)
  -b, --bind           Address to listen on (e.g., '0.0.0.0:5000')
";

#[derive(Debug)]
struct Args {
    common: Common,
    model: Option<String>,
    bind: Option<std::net::SocketAddr>,
}

fn parse_args() -> Result<Args, pico_args::Error> {
    let mut pargs = Arguments::from_env();

    Ok(Args {
        common: Common::parse(&mut pargs)?,
        model: pargs.opt_value_from_str(["-m", "--model"])?,
        bind: pargs.opt_value_from_str(["-b", "--bind"])?,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = parse_args()?;

    if args.common.help {
        println!("{}", HELP);
        return Ok(());
    }

    let mut config = args.common.init()?;

    if let Some(model) = args.model {
        config.store.model_path = model;
    }

    if let Some(bind) = args.bind {
        config.server.bind_addr = bind;
    }

    // Without a model there is nothing to serve
    let manager = ModelManager::<TextClassifier>::load(
        Box::new(FsModelStore::new(&config.store.model_path)),
        config.dataset.validator(),
        config.retrain.policy,
    )
    .with_context(|| format!("Unable to load model from {}", config.store.model_path))?;

    let current = manager.current();
    info!(
        "Serving {} classes from {} training rows (retrain policy: {})",
        current.pipeline.classes().len(),
        current.corpus.len(),
        config.retrain.policy
    );
    drop(current);

    server::serve(Arc::new(manager), &config.server).await
}
