//! End-to-end runs of the bundled example programs against the shared
//! interrupt schedule.

use std::path::PathBuf;

use rcpu::constants::SIMULATION_LIMIT;
use rcpu::processor::{ExitCode, SimulationResult};

fn program(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/programs")
        .join(name)
}

fn schedule() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/input.json")
}

fn run(name: &str, output_int: bool) -> SimulationResult {
    rsim::run_asm_file(program(name), schedule(), output_int, SIMULATION_LIMIT).unwrap()
}

#[test]
fn cat_echoes_the_schedule() {
    let result = run("cat.asm", false);
    assert_eq!(result.output, "hello world");
    assert_eq!(result.exit_code, ExitCode::Halted);
    assert!(result.ticks >= result.instr_count);
}

#[test]
fn hello_prints_data_section_string() {
    let result = run("hello.asm", false);
    assert_eq!(result.output, "hello world");
    assert_eq!(result.exit_code, ExitCode::Halted);
}

#[test]
fn prob2_sums_even_fibonacci_numbers() {
    let result = run("prob2.asm", true);
    assert_eq!(result.output, "4613732");
    assert_eq!(result.exit_code, ExitCode::Halted);
}

#[test]
fn var_test_loads_stored_words() {
    let result = run("var_test.asm", false);
    assert_eq!(result.output, "test");
    assert_eq!(result.exit_code, ExitCode::Halted);
}

#[test]
fn readonly_write_terminates_with_partial_output() {
    let result = run("readonly.asm", false);
    assert_eq!(result.output, "h");
    assert_eq!(result.exit_code, ExitCode::ReadOnlyWrite);
}

#[test]
fn artifact_roundtrip_matches_direct_run() {
    let source = std::fs::read_to_string(program("hello.asm")).unwrap();
    let assembled = rasm::assemble(&source).unwrap();

    let artifact = std::env::temp_dir().join("rsim_hello_roundtrip.json");
    risa::write_file(&artifact, &assembled).unwrap();
    assert_eq!(risa::read_file(&artifact).unwrap(), assembled);

    let from_artifact =
        rsim::run_program_file(&artifact, schedule(), false, SIMULATION_LIMIT).unwrap();
    let direct = run("hello.asm", false);
    assert_eq!(from_artifact, direct);

    std::fs::remove_file(artifact).unwrap();
}
