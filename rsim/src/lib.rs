//! File-level entry points for running rcpu programs: load a program
//! artifact (or assemble a source file directly), load an interrupt
//! schedule, and run the simulation.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use rcpu::processor::{simulation, InterruptQueue, SimulationResult};
use risa::Word;

#[derive(Debug)]
pub enum Error {
    Io(std::io::Error, PathBuf),
    Artifact(risa::Error),
    Asm(rasm::Error),
    Schedule(String),
    Simulation(rcpu::processor::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(err, path) => write!(f, "reading \"{}\" failed: {}", path.display(), err),
            Error::Artifact(err) => write!(f, "{}", err),
            Error::Asm(err) => {
                writeln!(f, "assembling failed:")?;
                write!(f, "{}", err)
            }
            Error::Schedule(msg) => write!(f, "invalid interrupt schedule: {}", msg),
            Error::Simulation(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for Error {}

/// Parse an interrupt-schedule file: a JSON object whose keys are tick
/// numbers and whose values are input tokens. A single-character token
/// becomes its code point; anything longer must parse as a decimal integer.
pub fn load_schedule<P: AsRef<Path>>(path: P) -> Result<InterruptQueue, Error> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|err| Error::Io(err, path.to_owned()))?;
    parse_schedule(&text)
}

fn parse_schedule(text: &str) -> Result<InterruptQueue, Error> {
    let raw: HashMap<String, String> =
        serde_json::from_str(text).map_err(|err| Error::Schedule(format!("{}", err)))?;

    let mut queue = BTreeMap::new();
    for (key, value) in raw {
        let tick: u64 = key.parse().map_err(|_| {
            Error::Schedule(format!("tick \"{}\" is not a non-negative integer", key))
        })?;
        let token = parse_token(&value).ok_or_else(|| {
            Error::Schedule(format!(
                "token \"{}\" is neither a single character nor an integer",
                value
            ))
        })?;
        queue.insert(tick, token);
    }
    Ok(queue)
}

fn parse_token(value: &str) -> Option<Word> {
    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(c as Word),
        _ => value.parse().ok(),
    }
}

/// Load a program artifact and an interrupt schedule, then run.
pub fn run_program_file<P, Q>(
    code: P,
    input: Q,
    output_int: bool,
    limit: u64,
) -> Result<SimulationResult, Error>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let program = risa::read_file(code).map_err(Error::Artifact)?;
    let queue = load_schedule(input)?;
    simulation(program, queue, limit, output_int).map_err(Error::Simulation)
}

/// Assemble a source file and run it directly, without writing an artifact.
pub fn run_asm_file<P, Q>(
    source: P,
    input: Q,
    output_int: bool,
    limit: u64,
) -> Result<SimulationResult, Error>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let source_path = source.as_ref();
    let text =
        fs::read_to_string(source_path).map_err(|err| Error::Io(err, source_path.to_owned()))?;
    let program = rasm::assemble(&text).map_err(Error::Asm)?;
    let queue = load_schedule(input)?;
    simulation(program, queue, limit, output_int).map_err(Error::Simulation)
}
