use std::{io::Write, path::PathBuf};

use clap::{Parser, Subcommand};
use imbl::HashMap;
use libtlainterp::{Error as InterpError, State};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

/// Interpreter for a subset of the TLA+ specification language.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Path to the TLA+ module to evaluate.
    #[arg(required_unless_present = "stdin", conflicts_with = "stdin")]
    module: Option<PathBuf>,

    /// Read the module from stdin instead of the filesystem.
    #[arg(long)]
    stdin: bool,

    /// A `NAME=EXPR` constant binding, evaluated as a TLA+ expression.
    /// Repeatable, once per declared `CONSTANT`.
    #[arg(short = 'c', long = "const", value_name = "NAME=EXPR")]
    consts: Vec<String>,

    /// Pretty-print the output ITF JSON instead of compact single-line.
    #[arg(long)]
    pretty: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Enumerate every state satisfying `Init`.
    Init,

    /// Enumerate every successor of a state under `Next`.
    Next {
        /// Path to an ITF JSON state to evaluate `Next` from. Reads stdin
        /// if omitted.
        #[arg(long)]
        state: Option<PathBuf>,
    },

    /// Breadth-first enumerate every state reachable via `Next` from the
    /// initial states.
    Reachable {
        /// Stop the search once this many states have been discovered.
        #[arg(long)]
        max_states: Option<usize>,
    },
}

#[derive(Debug, Error)]
enum Error {
    #[error("failed to read module: {0}")]
    ReadModule(std::io::Error),

    #[error("failed to read state input: {0}")]
    ReadState(std::io::Error),

    #[error("malformed --const argument `{0}`, expected NAME=EXPR")]
    MalformedConst(String),

    #[error("invalid ITF state JSON: {0}")]
    StateJson(#[from] serde_json::Error),

    #[error(transparent)]
    Interp(#[from] InterpError),

    #[error("failed to write output: {0}")]
    WriteOutput(std::io::Error),
}

fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let source = read_module(&args)?;
    let constants = parse_consts(&args.consts)?;

    let states = match &args.command {
        Command::Init => libtlainterp::compute_initial_states(&source, &constants)?,
        Command::Next { state } => {
            let from = read_state(state.as_ref())?;
            libtlainterp::compute_next_states(&source, &constants, &from)?
        }
        Command::Reachable { max_states } => {
            let reached = libtlainterp::compute_reachable_states(&source, &constants, *max_states)?;
            if reached.truncated {
                tracing::warn!(max_states = ?max_states, "reachability search truncated before exhausting the frontier");
            }
            reached.states
        }
    };

    write_states(&states, args.pretty)
}

/// Reads the module source from `args.module`, or stdin if `--stdin` was
/// given.
fn read_module(args: &Args) -> Result<String, Error> {
    match args.module.as_ref() {
        Some(path) => std::fs::read_to_string(path).map_err(Error::ReadModule),
        None => std::io::read_to_string(std::io::stdin().lock()).map_err(Error::ReadModule),
    }
}

/// Parses repeated `--const NAME=EXPR` arguments into a name-to-expression
/// map, ready for [`libtlainterp::compute_initial_states`] and friends.
fn parse_consts(consts: &[String]) -> Result<HashMap<String, String>, Error> {
    let mut out = HashMap::new();
    for entry in consts {
        let (name, expr) = entry.split_once('=').ok_or_else(|| Error::MalformedConst(entry.clone()))?;
        out.insert(name.trim().to_string(), expr.trim().to_string());
    }
    Ok(out)
}

/// Reads an ITF JSON state from `path`, or stdin if `path` is `None`.
fn read_state(path: Option<&PathBuf>) -> Result<State, Error> {
    let raw = match path {
        Some(path) => std::fs::read_to_string(path).map_err(Error::ReadState)?,
        None => std::io::read_to_string(std::io::stdin().lock()).map_err(Error::ReadState)?,
    };
    let json: serde_json::Value = serde_json::from_str(&raw)?;
    Ok(libtlainterp::state_from_itf(&json)?)
}

/// Serializes `states` to ITF JSON on stdout.
fn write_states(states: &[State], pretty: bool) -> Result<(), Error> {
    let json = libtlainterp::states_to_itf(states);
    let mut out = std::io::stdout().lock();
    if pretty {
        serde_json::to_writer_pretty(&mut out, &json).map_err(Error::StateJson)?;
    } else {
        serde_json::to_writer(&mut out, &json).map_err(Error::StateJson)?;
    }
    writeln!(out).map_err(Error::WriteOutput)?;
    Ok(())
}
