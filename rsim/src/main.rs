#[macro_use]
extern crate clap;

use std::process;

use clap::Arg;
use rcpu::constants::SIMULATION_LIMIT;

fn main() {
    env_logger::init();

    let matches = app_from_crate!()
        .arg(
            Arg::with_name("CODE")
                .help("Program artifact produced by rasm")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::with_name("INPUT")
                .help("Interrupt schedule as JSON (tick -> input token)")
                .required(true)
                .index(2),
        )
        .arg(
            Arg::with_name("MODE")
                .help("Render output as characters (str) or decimal integers (int)")
                .possible_values(&["str", "int"])
                .default_value("str")
                .index(3),
        )
        .get_matches();

    let output_int = matches.value_of("MODE") == Some("int");
    let result = rsim::run_program_file(
        matches.value_of("CODE").unwrap(),
        matches.value_of("INPUT").unwrap(),
        output_int,
        SIMULATION_LIMIT,
    );

    match result {
        Ok(result) => {
            println!("{}", result.output);
            println!("instr_counter: {} ticks: {}", result.instr_count, result.ticks);
        }
        Err(err) => {
            eprintln!("{}", err);
            process::exit(1);
        }
    }
}
