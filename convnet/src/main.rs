use std::{env, fs, process};

use anyhow::Context;
use convnet::{ModelGraph, Prediction};
use log::info;
use ndarray::ArrayD;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <graph.json> [model]", args[0]);
        process::exit(1);
    }

    let path = &args[1];
    let raw = fs::read_to_string(path).with_context(|| format!("failed to read {path}"))?;
    let graph = ModelGraph::from_json(&raw)?;

    let id = match args.get(2) {
        Some(name) => graph
            .id(name)
            .with_context(|| format!("there's no model named {name:?} in {path}"))?,
        None => graph.ids().last().context("the graph has no models")?,
    };

    let model = graph.get(id)?;
    let input_shape = graph.input_shape(id)?;
    info!("running {} on a batch of ones shaped {input_shape}", model.name());

    let x = ArrayD::<f32>::ones(input_shape.batched(1));
    let convert_to_class = model.num_classes().is_some();

    match graph.forward_pass(id, [x.view()], convert_to_class)? {
        Prediction::Scores(scores) => println!("{scores}"),
        Prediction::Classes(classes) => println!("{classes}"),
    }

    Ok(())
}
