//! Instruction set and program artifact shared by the assembler and the
//! processor model.
//!
//! The artifact is a JSON document `{ "code": [...], "data": [...] }`. Each
//! code entry carries the lowercase mnemonic in `opcode` plus the subset of
//! `arg1`, `arg2`, `arg2_type` and `out` that the opcode uses; `data` is the
//! initial data-memory image, with the interrupt vector as its prefix.
//! Reading an artifact validates every field against the closed enum sets
//! and rejects instructions whose field shape does not match their opcode.

use std::convert::TryFrom;
use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use std::str::FromStr;

use num_derive::{FromPrimitive, ToPrimitive};
use num_traits::ToPrimitive;
use serde::{Deserialize, Deserializer, Serialize};
use util::ParseEnumError;

/// Machine word. All registers, memory cells and immediates are this type.
pub type Word = i32;

/// Number of interrupt-vector slots at the bottom of data memory.
pub const INTERRUPTION_VECTOR_SZ: usize = 1;

pub const REGISTER_COUNT: usize = 7;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Opcode {
    LD,
    SV,

    ADD,
    SUB,
    MUL,
    DIV,
    MOD,
    CMP,

    OUT,
    IN,

    JMP,
    JE,
    JNE,

    IRET,
    STI,
    CLI,

    #[serde(rename = "halt")]
    HLT,
}

impl Opcode {
    /// The assembler mnemonic, also used in the artifact.
    pub fn mnemonic(self) -> &'static str {
        match self {
            Opcode::LD => "ld",
            Opcode::SV => "sv",
            Opcode::ADD => "add",
            Opcode::SUB => "sub",
            Opcode::MUL => "mul",
            Opcode::DIV => "div",
            Opcode::MOD => "mod",
            Opcode::CMP => "cmp",
            Opcode::OUT => "out",
            Opcode::IN => "in",
            Opcode::JMP => "jmp",
            Opcode::JE => "je",
            Opcode::JNE => "jne",
            Opcode::IRET => "iret",
            Opcode::STI => "sti",
            Opcode::CLI => "cli",
            Opcode::HLT => "halt",
        }
    }
}

impl FromStr for Opcode {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Opcode, ParseEnumError> {
        match s {
            "ld" => Ok(Opcode::LD),
            "sv" => Ok(Opcode::SV),
            "add" => Ok(Opcode::ADD),
            "sub" => Ok(Opcode::SUB),
            "mul" => Ok(Opcode::MUL),
            "div" => Ok(Opcode::DIV),
            "mod" => Ok(Opcode::MOD),
            "cmp" => Ok(Opcode::CMP),
            "out" => Ok(Opcode::OUT),
            "in" => Ok(Opcode::IN),
            "jmp" => Ok(Opcode::JMP),
            "je" => Ok(Opcode::JE),
            "jne" => Ok(Opcode::JNE),
            "iret" => Ok(Opcode::IRET),
            "sti" => Ok(Opcode::STI),
            "cli" => Ok(Opcode::CLI),
            "halt" => Ok(Opcode::HLT),
            _ => Err(ParseEnumError::new(s, "Opcode")),
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

#[derive(
    Clone, Copy, PartialEq, Eq, Debug, FromPrimitive, ToPrimitive, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Register {
    R0, // Always zero (read only)
    R1,
    R2,
    R3,
    R4,
    PC, // Program counter
    SP, // Stack pointer
}

impl Register {
    pub fn name(self) -> &'static str {
        match self {
            Register::R0 => "r0",
            Register::R1 => "r1",
            Register::R2 => "r2",
            Register::R3 => "r3",
            Register::R4 => "r4",
            Register::PC => "pc",
            Register::SP => "sp",
        }
    }
}

impl FromStr for Register {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Register, ParseEnumError> {
        match s {
            "r0" => Ok(Register::R0),
            "r1" => Ok(Register::R1),
            "r2" => Ok(Register::R2),
            "r3" => Ok(Register::R3),
            "r4" => Ok(Register::R4),
            "pc" => Ok(Register::PC),
            "sp" => Ok(Register::SP),
            _ => Err(ParseEnumError::new(s, "Register")),
        }
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[inline]
pub fn register_index(id: Register) -> usize {
    id.to_usize().unwrap()
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum OperandType {
    #[serde(rename = "reg")]
    Register,
    #[serde(rename = "const")]
    Constant,
}

/// Second operand of an instruction: a register or a 32-bit immediate.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Operand {
    Register(Register),
    Constant(Word),
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Operand::Register(r) => f.write_str(r.name()),
            Operand::Constant(c) => write!(f, "{}", c),
        }
    }
}

/// One decoded instruction. Which of the optional fields are present is
/// fixed by the opcode; `read` rejects artifacts that violate the shape.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(try_from = "RawInstruction", into = "RawInstruction")]
pub struct Instruction {
    pub opcode: Opcode,
    pub arg1: Option<Register>,
    pub arg2: Option<Operand>,
    pub out: Option<Register>,
}

impl Instruction {
    pub fn nullary(opcode: Opcode) -> Instruction {
        Instruction {
            opcode,
            arg1: None,
            arg2: None,
            out: None,
        }
    }

    /// Arithmetic/logic form: `op out, arg1, arg2`.
    pub fn compute(opcode: Opcode, out: Register, arg1: Register, arg2: Operand) -> Instruction {
        Instruction {
            opcode,
            arg1: Some(arg1),
            arg2: Some(arg2),
            out: Some(out),
        }
    }

    /// Single-operand form used by `jmp`, `out` and `in`.
    pub fn unary(opcode: Opcode, arg2: Operand) -> Instruction {
        Instruction {
            opcode,
            arg1: None,
            arg2: Some(arg2),
            out: None,
        }
    }

    /// Conditional branch form: `op arg1, target`.
    pub fn branch(opcode: Opcode, arg1: Register, target: Operand) -> Instruction {
        Instruction {
            opcode,
            arg1: Some(arg1),
            arg2: Some(target),
            out: None,
        }
    }

    /// Memory load: `ld out, addr`.
    pub fn load(out: Register, addr: Operand) -> Instruction {
        Instruction {
            opcode: Opcode::LD,
            arg1: None,
            arg2: Some(addr),
            out: Some(out),
        }
    }

    /// Memory store: `sv src, addr`.
    pub fn store(src: Register, addr: Operand) -> Instruction {
        Instruction {
            opcode: Opcode::SV,
            arg1: Some(src),
            arg2: Some(addr),
            out: None,
        }
    }

    /// Panics when absent; `read` guarantees presence for opcodes that use it.
    pub fn arg1(&self) -> Register {
        self.arg1.expect("instruction has no arg1")
    }

    pub fn arg2(&self) -> Operand {
        self.arg2.expect("instruction has no arg2")
    }

    pub fn out(&self) -> Register {
        self.out.expect("instruction has no out")
    }

    fn check_shape(&self) -> Result<(), String> {
        let required: &[&str] = match self.opcode {
            Opcode::ADD | Opcode::SUB | Opcode::MUL | Opcode::DIV | Opcode::MOD | Opcode::CMP => {
                &["arg1", "arg2", "out"]
            }
            Opcode::JE | Opcode::JNE => &["arg1", "arg2"],
            Opcode::JMP | Opcode::OUT | Opcode::IN => &["arg2"],
            Opcode::LD => &["arg2", "out"],
            Opcode::SV => &["arg1", "arg2"],
            Opcode::IRET | Opcode::STI | Opcode::CLI | Opcode::HLT => &[],
        };
        for field in required {
            let present = match *field {
                "arg1" => self.arg1.is_some(),
                "arg2" => self.arg2.is_some(),
                _ => self.out.is_some(),
            };
            if !present {
                return Err(format!("{} instruction is missing {}", self.opcode, field));
            }
        }
        if self.opcode == Opcode::IN {
            if let Some(Operand::Constant(_)) = self.arg2 {
                return Err("in instruction requires a register operand".to_string());
            }
        }
        Ok(())
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.opcode.mnemonic())?;
        if let Some(out) = self.out {
            write!(f, " {}", out)?;
        }
        if let Some(arg1) = self.arg1 {
            write!(f, " {}", arg1)?;
        }
        if let Some(arg2) = self.arg2 {
            write!(f, " {}", arg2)?;
        }
        Ok(())
    }
}

/// Data-memory cell as it appears in the artifact: a plain integer or a
/// string that parses as one.
#[derive(Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum Cell {
    Int(i64),
    Text(String),
}

impl Cell {
    fn to_word(&self) -> Result<Word, String> {
        match self {
            Cell::Int(value) => {
                Word::try_from(*value).map_err(|_| format!("cell {} out of 32-bit range", value))
            }
            Cell::Text(text) => text
                .parse::<Word>()
                .map_err(|_| format!("cell \"{}\" does not parse as an integer", text)),
        }
    }
}

/// On-disk shape of an instruction, with `arg2` split into value and type tag.
#[derive(Serialize, Deserialize)]
struct RawInstruction {
    opcode: Opcode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    arg1: Option<Register>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    arg2: Option<Cell>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    arg2_type: Option<OperandType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    out: Option<Register>,
}

impl TryFrom<RawInstruction> for Instruction {
    type Error = String;

    fn try_from(raw: RawInstruction) -> Result<Instruction, String> {
        let arg2 = match (raw.arg2, raw.arg2_type) {
            (None, None) => None,
            (Some(cell), Some(OperandType::Constant)) => Some(Operand::Constant(cell.to_word()?)),
            (Some(Cell::Text(name)), Some(OperandType::Register)) => Some(Operand::Register(
                name.parse().map_err(|err| format!("{}", err))?,
            )),
            (Some(Cell::Int(value)), Some(OperandType::Register)) => {
                return Err(format!("{} is not a register name", value));
            }
            _ => return Err("arg2 and arg2_type must appear together".to_string()),
        };
        Ok(Instruction {
            opcode: raw.opcode,
            arg1: raw.arg1,
            arg2,
            out: raw.out,
        })
    }
}

impl From<Instruction> for RawInstruction {
    fn from(instr: Instruction) -> RawInstruction {
        let (arg2, arg2_type) = match instr.arg2 {
            None => (None, None),
            Some(Operand::Register(r)) => (
                Some(Cell::Text(r.name().to_string())),
                Some(OperandType::Register),
            ),
            Some(Operand::Constant(c)) => (Some(Cell::Int(c.into())), Some(OperandType::Constant)),
        };
        RawInstruction {
            opcode: instr.opcode,
            arg1: instr.arg1,
            arg2,
            arg2_type,
            out: instr.out,
        }
    }
}

/// Program artifact: instruction list plus initial data-memory image.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Program {
    pub code: Vec<Instruction>,
    #[serde(deserialize_with = "deserialize_data")]
    pub data: Vec<Word>,
}

fn deserialize_data<'de, D>(deserializer: D) -> Result<Vec<Word>, D::Error>
where
    D: Deserializer<'de>,
{
    let cells = Vec::<Cell>::deserialize(deserializer)?;
    cells
        .iter()
        .map(|cell| cell.to_word().map_err(serde::de::Error::custom))
        .collect()
}

impl Program {
    pub fn validate(&self) -> Result<(), Error> {
        if self.code.is_empty() {
            return Err(Error::Schema("program has no instructions".to_string()));
        }
        if self.data.len() < INTERRUPTION_VECTOR_SZ {
            return Err(Error::Schema(
                "data image is shorter than the interrupt vector".to_string(),
            ));
        }
        for (i, instr) in self.code.iter().enumerate() {
            instr
                .check_shape()
                .map_err(|msg| Error::Schema(format!("instruction {}: {}", i, msg)))?;
        }
        Ok(())
    }
}

#[derive(Debug)]
pub enum Error {
    Io(std::io::Error),
    Json(serde_json::Error),
    Schema(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Io(err) => write!(f, "{}", err),
            Error::Json(err) => write!(f, "invalid program artifact: {}", err),
            Error::Schema(msg) => write!(f, "invalid program artifact: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Error {
        Error::Json(err)
    }
}

pub fn read<R: Read>(reader: &mut R) -> Result<Program, Error> {
    let program: Program = serde_json::from_reader(reader)?;
    program.validate()?;
    Ok(program)
}

pub fn write<W: Write>(writer: &mut W, program: &Program) -> Result<(), Error> {
    serde_json::to_writer_pretty(writer, program)?;
    Ok(())
}

pub fn read_file<P: AsRef<Path>>(path: P) -> Result<Program, Error> {
    read(&mut BufReader::new(File::open(path)?))
}

pub fn write_file<P: AsRef<Path>>(path: P, program: &Program) -> Result<(), Error> {
    write(&mut BufWriter::new(File::create(path)?), program)
}
