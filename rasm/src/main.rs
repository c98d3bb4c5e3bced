#[macro_use]
extern crate clap;

use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use clap::Arg;

#[derive(Debug)]
enum Error {
    Io(std::io::Error, PathBuf),
    Asm(rasm::Error),
    Artifact(risa::Error),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Io(err, path) => write!(f, "reading \"{}\" failed: {}", path.display(), err),
            Error::Asm(err) => {
                writeln!(f, "assembling failed:")?;
                write!(f, "{}", err)
            }
            Error::Artifact(err) => write!(f, "writing the program artifact failed: {}", err),
        }
    }
}

fn main() {
    if let Err(err) = run() {
        eprintln!("{}", err);
        process::exit(1);
    }
}

fn run() -> Result<(), Error> {
    let matches = app_from_crate!()
        .arg(
            Arg::with_name("SOURCE")
                .help("Assembly source file")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::with_name("TARGET")
                .help("Program artifact to write")
                .required(true)
                .index(2),
        )
        .get_matches();

    let source_path = Path::new(matches.value_of("SOURCE").unwrap());
    let target_path = Path::new(matches.value_of("TARGET").unwrap());

    let source = fs::read_to_string(source_path)
        .map_err(|err| Error::Io(err, source_path.to_owned()))?;

    let program = rasm::assemble(&source).map_err(|err| {
        Error::Asm(match source_path.to_str() {
            Some(path_str) => err.with_path(path_str),
            None => err,
        })
    })?;

    risa::write_file(target_path, &program).map_err(Error::Artifact)?;

    println!(
        "source LoC: {} code instr: {}",
        source.lines().count(),
        program.code.len()
    );
    Ok(())
}
