//! `sieve`: parse, encode, decode, and compile filter-language queries from
//! the command line, or explore a schema in an interactive shell.

mod cli;
mod error;
mod output;
mod shell;

use clap::Parser;
use cli::{Cli, Command};
use error::{CliError, CliResult};
use sieve::{Config, Engine, FlatMap, SchemaDef};
use std::process::ExitCode;
use tracing_subscriber::{EnvFilter, fmt};

fn init_tracing(verbose: u8) {
    let fallback = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> CliResult<()> {
    let format = cli.format;
    let needs_schema = match &cli.command {
        Command::Compile { .. } => Some("compile"),
        Command::Describe { .. } => Some("describe"),
        Command::Shell { .. } => Some("shell"),
        Command::Parse { .. }
        | Command::Print { .. }
        | Command::Encode { .. }
        | Command::Decode { .. } => None,
    };
    let engine = engine(&cli, needs_schema)?;

    let rendered = match cli.command {
        Command::Parse { text } => output::tree(&engine.parse(&text)?, format)?,
        Command::Print { text } => output::query(&engine.parse(&text)?, format)?,
        Command::Encode { text, simple } => {
            let query = engine.parse(&text)?;
            let map = if simple {
                sieve::core::query::FlatCodec::new(engine.config().query.default_limit)
                    .encode_simple(&query)
                    .map_err(sieve::Error::from)?
            } else {
                engine.encode(&query)?
            };
            output::flat(&map, format)?
        }
        Command::Decode { pairs } => output::query(&engine.decode(&flat_map(&pairs)?)?, format)?,
        Command::Compile { entity, text, flat } => {
            let compiled = match (text, flat.is_empty()) {
                (Some(text), _) => engine.compile_text(&entity, &text)?,
                (None, false) => engine.compile_flat(&entity, &flat_map(&flat)?)?,
                (None, true) => return Err(CliError::EmptyRequest),
            };
            output::compiled(&compiled, format)?
        }
        Command::Describe { entity } => {
            let model = engine
                .models()
                .get(&entity)
                .ok_or(CliError::UnknownEntity(entity))?;
            output::entity(&model, format)?
        }
        Command::Shell { entity } => {
            if engine.models().get(&entity).is_none() {
                return Err(CliError::UnknownEntity(entity));
            }
            return shell::Shell::new(&engine, entity, format).run();
        }
    };

    println!("{rendered}");

    Ok(())
}

fn engine(cli: &Cli, needs_schema: Option<&'static str>) -> CliResult<Engine> {
    let config = match &cli.config {
        Some(path) => Config::load(path).map_err(sieve::Error::from)?,
        None => Config::default(),
    };
    let schema = match (&cli.schema, needs_schema) {
        (Some(path), _) => SchemaDef::load(path).map_err(sieve::Error::from)?,
        (None, Some(command)) => return Err(CliError::MissingSchema { command }),
        (None, None) => SchemaDef::default(),
    };
    tracing::debug!(entities = schema.entities.len(), "schema loaded");

    Ok(Engine::new(schema, config)?)
}

/// Group `KEY=VALUE` pairs by key, keeping value order.
fn flat_map(pairs: &[String]) -> CliResult<FlatMap> {
    let mut map = FlatMap::new();
    for pair in pairs {
        let (key, value) = pair
            .split_once('=')
            .filter(|(key, _)| !key.is_empty())
            .ok_or_else(|| CliError::InvalidPair(pair.clone()))?;
        map.entry(key.to_string())
            .or_default()
            .push(value.to_string());
    }

    Ok(map)
}
