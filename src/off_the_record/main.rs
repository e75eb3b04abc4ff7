use clap::Parser;
use off_the_record::config::OtrConfig;
use off_the_record::error::{OtrError, Result};
use off_the_record::input::ParamsInput;
use off_the_record::record::Record;
use off_the_record::schema::Schema;
use off_the_record::value::{Params, Value};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

mod args;
use args::{Cli, Commands};

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let mut config = OtrConfig::load_from(&cwd)?;
    if cli.compact {
        config.pretty = false;
    }
    setup_tracing(&config, cli.verbose);

    match cli.command {
        Commands::Permits { schema } => handle_permits(&config, &schema),
        Commands::Assign {
            schema,
            params,
            permit,
            permit_all,
        } => handle_assign(&config, &schema, &params, permit, permit_all),
        Commands::Describe { schema } => handle_describe(&config, &schema),
    }
}

fn setup_tracing(config: &OtrConfig, verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_env("OTR_LOG").unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("off_the_record=debug")
        } else {
            EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("warn"))
        }
    });

    // Fails only when a global subscriber is already installed.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .ok();
}

fn handle_permits(config: &OtrConfig, schema: &Path) -> Result<()> {
    let model = Schema::load(schema)?.build()?;
    println!("{}", config.render(&model.permit_filters())?);
    Ok(())
}

fn handle_assign(
    config: &OtrConfig,
    schema: &Path,
    params: &Path,
    permit: Option<Vec<String>>,
    permit_all: bool,
) -> Result<()> {
    let model = Arc::new(Schema::load(schema)?.build()?);
    let body = load_params(params)?;

    // A bare object is taken as the model's own values.
    let mut input = match body.get(model.param_key()) {
        Some(Value::Map(_)) => ParamsInput::new(body),
        _ => ParamsInput::scoped(model.param_key(), body),
    };
    if permit_all {
        input = input.permit_all();
    } else if let Some(keys) = permit {
        input = input.permit(keys.into_iter().filter(|k| !k.trim().is_empty()));
    }

    let record = Record::from_input(model, &input)?;
    println!("{}", config.render(&record.to_params()?)?);
    Ok(())
}

#[derive(Serialize)]
struct AttributeSummary<'a> {
    name: &'a str,
    #[serde(rename = "type")]
    type_tag: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    default: Option<&'a Value>,
}

fn handle_describe(config: &OtrConfig, schema: &Path) -> Result<()> {
    let model = Schema::load(schema)?.build()?;
    let summary: Vec<AttributeSummary> = model
        .attributes()
        .map(|d| AttributeSummary {
            name: d.name(),
            type_tag: d.type_tag().map(|t| t.as_str()),
            default: d.default_value(),
        })
        .collect();
    println!("{}", config.render(&summary)?);
    Ok(())
}

/// Reads a params object.
fn load_params(path: &Path) -> Result<Params> {
    let json: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(path)?)?;
    match Value::from(json) {
        Value::Map(params) => Ok(params),
        _ => Err(OtrError::Schema(format!(
            "{}: params must be a JSON object",
            path.display()
        ))),
    }
}
