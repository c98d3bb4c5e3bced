//! Assembler for the rcpu register machine.
//!
//! The main entry point is [`assemble`](fn.assemble.html), which takes a
//! program in the machine's assembly dialect and produces the
//! [`Program`](../risa/struct.Program.html) artifact consumed by the
//! simulator.
//!
//! Parsing is implemented with [pest]; the crate's [`Error`](type.Error.html)
//! type is an alias of `pest::error::Error`, so every error, including the
//! semantic ones raised during label resolution and operand checking, is
//! anchored to a source span and pretty-prints with line and column context.
//!
//! # Assembly dialect
//!
//! A program is a sequence of lines. `section data` and `section text`
//! switch the active section; a `;` starts a comment that runs to the end of
//! the line; a line holding just `name:` defines a label. Operands are
//! separated by whitespace, optionally with a comma.
//!
//! In the data section:
//!
//!  Directive | Description | Example
//! -----------|-------------|--------
//! `word`     | append one cell, an integer or a character literal | `word 'h'`
//! `int`      | set an interrupt-vector slot to a handler address | `int 0 handler`
//!
//! Data labels name the address of the next appended cell. The first data
//! cell lands just above the interrupt vector.
//!
//! In the text section, each non-label line is a mnemonic plus operands:
//!
//!  Mnemonic | Syntax | Description
//! ----------|--------|------------
//! `add sub mul div mod cmp` | `op out, arg1, arg2` | arithmetic into `out`; `cmp` also sets the zero flag
//! `ld`      | `ld out, addr`  | load from memory (immediate or register address)
//! `sv`      | `sv src, addr`  | store to memory
//! `in`      | `in reg`        | read one input token into a register
//! `out`     | `out value`     | emit a register or immediate on the output port
//! `jmp`     | `jmp target`    | unconditional jump
//! `je jne`  | `op reg, target`| branch on the register being zero / non-zero
//! `sti cli` | no operands     | enable / disable interrupts
//! `iret`    | no operands     | return from an interrupt handler
//! `halt`    | no operands     | stop the machine
//!
//! Code labels may stand in for any immediate operand (they resolve to
//! instruction indices); data labels may only be used with `ld` and `sv`.
//! Character literals such as `'x'` become their code point in any
//! immediate position. A terminating `halt` is appended to every program.
//!
//! [pest]: https://docs.rs/pest/

mod encode;
mod labels;
mod lines;
mod parser;
mod scan;


use parser::{AsmParser, Rule};
use pest::iterators::Pair;
use pest::{Parser, Span};
use risa::Program;

pub type Error = pest::error::Error<Rule>;

pub type Result<T> = std::result::Result<T, Error>;

/// Translate assembly source into a program artifact.
///
/// The first pass records labels and lays out the data image; the second
/// pass resolves operands and emits the instruction list.
pub fn assemble(input: &str) -> Result<Program> {
    let program = parse(input)?;
    let lines = lines::collect(program)?;
    let layout = scan::scan(&lines)?;
    encode::encode(&lines, layout)
}

fn parse(input: &str) -> Result<Pair<'_, Rule>> {
    Ok(AsmParser::parse(Rule::program, input)?.next().unwrap())
}

fn new_parser_error(span: Span, message: String) -> Error {
    Error::new_from_span(pest::error::ErrorVariant::CustomError { message }, span)
}
