mod cli;

use ddsm::classify::{classify, Globals};
use ddsm::{TransformRequest, Transformer};
use serde::Serialize;
use serde_json::{Map, Value};

fn main() {
    use clap::Parser;
    let cli = cli::Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_env("DDSM_LOG"))
        .with_writer(std::io::stderr)
        .init();

    for new_path in cli.directory.iter() {
        match new_path.canonicalize() {
            Err(e) => {
                eprintln!(
                    "Failed to resolve path for -C/--directory {}\n{}",
                    new_path.display(),
                    e
                );
                std::process::exit(1);
            }
            Ok(cwd) => {
                if let Err(err) = std::env::set_current_dir(&cwd) {
                    eprintln!("Failed to set work directory to {}\n{}", cwd.display(), err,);
                    std::process::exit(1);
                }

                tracing::info!(directory=%cwd.display(), "Changed working directory");
            }
        }
    }

    let command_result = match cli.command {
        cli::Command::Transform(transform_cli) => transform(transform_cli),
        cli::Command::Dev(dev_cli) => dev(dev_cli),
    };

    match command_result {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            for error in e.chain() {
                eprintln!("{error}")
            }
            std::process::exit(1);
        }
    }
}

/// Returns whether the template came through without errors
pub fn transform(cli: cli::TransformCommand) -> anyhow::Result<bool> {
    let request = load(&cli.input)?;
    let outcome = Transformer::<ddsm::layers::DatadogLayers>::default().transform(request);

    for diagnostic in &outcome.diagnostics {
        eprintln!("{diagnostic}");
    }

    output(&cli.output, &outcome.template)?;
    Ok(!outcome.has_errors())
}

fn load(input: &cli::InputArgs) -> anyhow::Result<TransformRequest> {
    let template = match &input.file {
        Some(file_path) => ddsm::template::load_file(file_path)?,
        None => {
            let stdin = std::io::read_to_string(std::io::stdin())?;
            ddsm::template::from_str(&stdin)?
        }
    };

    let mut params = match &input.params_file {
        Some(file_path) => match ddsm::template::load_file(file_path)? {
            Value::Object(params) => params,
            _ => anyhow::bail!("{} must contain a mapping", file_path.display()),
        },
        None => Map::new(),
    };
    for (key, value) in &input.params {
        params.insert(key.clone(), Value::String(value.clone()));
    }

    let params = (!params.is_empty()).then_some(Value::Object(params));
    Ok(TransformRequest::new(template, params, input.region.clone()))
}

fn output(output: &cli::OutputArgs, value: &impl Serialize) -> anyhow::Result<()> {
    match output.format {
        cli::OutputFormat::Yaml => serde_yaml::to_writer(std::io::stdout(), value)?,
        cli::OutputFormat::Json => {
            serde_json::to_writer_pretty(std::io::stdout(), value)?;
            println!();
        }
    };

    Ok(())
}

/// (ddsm-)developer utilities
///
/// A quick way to expose internal structures for debugging purposes
pub fn dev(cli: cli::DevCommand) -> anyhow::Result<bool> {
    use cli::DevSubCommand::*;

    let mut request = load(&cli.input)?;

    match cli.command {
        Config => {
            let transformer = Transformer::<ddsm::layers::DatadogLayers>::default();
            let config = transformer.configuration(&request)?;
            output(&cli.output, &config)?;
        }
        Resources => {
            let globals = Globals::from_template(&request.template);
            let resources = request
                .template
                .get_mut("Resources")
                .and_then(Value::as_object_mut)
                .ok_or_else(|| anyhow::anyhow!("template has no `Resources` mapping"))?;

            let summaries: Vec<_> = classify(resources, &globals)
                .iter()
                .map(|resource| resource.summary())
                .collect();
            output(&cli.output, &summaries)?;
        }
    }

    Ok(true)
}
