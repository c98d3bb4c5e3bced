mod alu;
mod control;
mod datapath;
mod registers;

pub use self::alu::{Alu, AluOp, DivideByZero};
pub use self::control::{ControlUnit, InterruptQueue, TickResult};
pub use self::datapath::{DataPath, InputExhausted};
pub use self::registers::{ReadOnlyWrite, RegFile};

use std::error::Error as StdError;
use std::fmt;

use log::{debug, info, warn};
use risa::Program;

use crate::constants;

/// Why a run stopped. Everything except `Halted` terminates the run early
/// but still yields the output produced so far.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ExitCode {
    Halted,         // halt instruction was fetched (normal shutdown)
    InputExhausted, // in executed with an empty input buffer
    ReadOnlyWrite,  // r0 was selected as an output register
    DivisionByZero, // div or mod with a zero divisor
}

impl From<ReadOnlyWrite> for ExitCode {
    fn from(_: ReadOnlyWrite) -> ExitCode {
        ExitCode::ReadOnlyWrite
    }
}

impl From<InputExhausted> for ExitCode {
    fn from(_: InputExhausted) -> ExitCode {
        ExitCode::InputExhausted
    }
}

impl From<DivideByZero> for ExitCode {
    fn from(_: DivideByZero) -> ExitCode {
        ExitCode::DivisionByZero
    }
}

#[derive(Debug)]
pub enum Error {
    DataImageTooLarge(usize),
    TooLongExecution(u64),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::DataImageTooLarge(len) => write!(
                f,
                "data image of {} cells does not fit in data memory ({} cells)",
                len,
                constants::DATA_MEM_LEN
            ),
            Error::TooLongExecution(limit) => {
                write!(f, "too long execution, increase limit ({} instructions)", limit)
            }
        }
    }
}

impl StdError for Error {}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SimulationResult {
    pub output: String,
    pub instr_count: u64,
    pub ticks: u64,
    pub exit_code: ExitCode,
}

/// Run a program against an interrupt schedule until it stops or the
/// instruction cap is hit. One trace record is emitted per instruction.
pub fn simulation(
    program: Program,
    int_queue: InterruptQueue,
    limit: u64,
    output_int: bool,
) -> Result<SimulationResult, Error> {
    if program.data.len() > constants::DATA_MEM_LEN {
        return Err(Error::DataImageTooLarge(program.data.len()));
    }
    let mut data_memory = vec![0; constants::DATA_MEM_LEN];
    data_memory[..program.data.len()].copy_from_slice(&program.data);

    let data_path = DataPath::new(data_memory, output_int);
    let mut control_unit = ControlUnit::new(program.code, data_path, int_queue);

    let mut instr_counter: u64 = 0;
    debug!("{}", control_unit);
    let exit_code = loop {
        if instr_counter >= limit {
            return Err(Error::TooLongExecution(limit));
        }
        match control_unit.decode_and_execute_instruction() {
            TickResult::Continue => {
                instr_counter += 1;
                debug!("{}", control_unit);
            }
            TickResult::Stop(code) => break code,
        }
    };

    match exit_code {
        ExitCode::Halted => {}
        ExitCode::InputExhausted => warn!("input buffer is empty"),
        ExitCode::ReadOnlyWrite => warn!("cannot write to read-only register r0"),
        ExitCode::DivisionByZero => warn!("division by zero"),
    }

    let output = control_unit.data_path().render_output();
    info!("output buffer: {:?}", output);

    Ok(SimulationResult {
        output,
        instr_count: instr_counter,
        ticks: control_unit.current_tick(),
        exit_code,
    })
}
