use pest::Span;
use risa::{Instruction, Opcode, Operand, Program, Register, Word, INTERRUPTION_VECTOR_SZ};

use crate::labels::Labels;
use crate::lines::{Line, Term, TermValue};
use crate::scan::Layout;
use crate::{new_parser_error, Result};

/// A term after label substitution and classification.
enum Resolved {
    Register(Register),
    Value(Word),
}

/// Substitute labels, then classify. Code labels may appear as operands of
/// any opcode; data labels only for `ld` and `sv`. Everything else must be
/// a register name, an integer or a character literal.
fn resolve(term: &Term, opcode: Opcode, labels: &Labels) -> Result<Resolved> {
    match term.value {
        TermValue::Int(value) => Ok(Resolved::Value(value)),
        TermValue::Char(c) => Ok(Resolved::Value(c as Word)),
        TermValue::Name(name) => {
            if let Some(&index) = labels.code.get(name) {
                Ok(Resolved::Value(index as Word))
            } else if let Some(&address) = labels.data.get(name) {
                if opcode == Opcode::LD || opcode == Opcode::SV {
                    Ok(Resolved::Value(address as Word))
                } else {
                    Err(new_parser_error(
                        term.span.clone(),
                        format!(
                            "{}: can only use labels from the data section in ld and sv",
                            name
                        ),
                    ))
                }
            } else if let Ok(register) = name.parse::<Register>() {
                Ok(Resolved::Register(register))
            } else {
                Err(new_parser_error(
                    term.span.clone(),
                    format!("term {} must be either register, integer or char", name),
                ))
            }
        }
    }
}

fn operand(resolved: Resolved) -> Operand {
    match resolved {
        Resolved::Register(register) => Operand::Register(register),
        Resolved::Value(value) => Operand::Constant(value),
    }
}

fn require_register(resolved: Resolved, term: &Term, what: &str) -> Result<Register> {
    match resolved {
        Resolved::Register(register) => Ok(register),
        Resolved::Value(_) => Err(new_parser_error(
            term.span.clone(),
            format!("{} must be a register", what),
        )),
    }
}

fn check_arity(terms: &[Term], expected: usize, span: &Span, opcode: Opcode) -> Result<()> {
    if terms.len() != expected {
        return Err(new_parser_error(
            span.clone(),
            format!(
                "{} command must have exactly {} arg{}",
                opcode,
                expected,
                if expected == 1 { "" } else { "s" }
            ),
        ));
    }
    Ok(())
}

fn encode_instruction(line: &Line, labels: &Labels) -> Result<Instruction> {
    let (mnemonic, span, terms) = match line {
        Line::Instruction {
            mnemonic,
            span,
            terms,
        } => (*mnemonic, span, terms),
        _ => unreachable!(),
    };
    let opcode: Opcode = mnemonic.parse().map_err(|_| {
        new_parser_error(span.clone(), format!("unknown instruction {}", mnemonic))
    })?;

    match opcode {
        Opcode::ADD | Opcode::SUB | Opcode::MUL | Opcode::DIV | Opcode::MOD | Opcode::CMP => {
            check_arity(terms, 3, span, opcode)?;
            let out = require_register(resolve(&terms[0], opcode, labels)?, &terms[0], "output")?;
            let arg1 = require_register(
                resolve(&terms[1], opcode, labels)?,
                &terms[1],
                "first argument",
            )?;
            let arg2 = operand(resolve(&terms[2], opcode, labels)?);
            Ok(Instruction::compute(opcode, out, arg1, arg2))
        }
        Opcode::JMP | Opcode::OUT => {
            check_arity(terms, 1, span, opcode)?;
            let arg2 = operand(resolve(&terms[0], opcode, labels)?);
            Ok(Instruction::unary(opcode, arg2))
        }
        Opcode::IN => {
            check_arity(terms, 1, span, opcode)?;
            let register =
                require_register(resolve(&terms[0], opcode, labels)?, &terms[0], "in argument")?;
            if register == Register::R0 {
                return Err(new_parser_error(
                    terms[0].span.clone(),
                    "in cannot target the read-only register r0".to_string(),
                ));
            }
            Ok(Instruction::unary(opcode, Operand::Register(register)))
        }
        Opcode::JE | Opcode::JNE => {
            check_arity(terms, 2, span, opcode)?;
            let arg1 = require_register(
                resolve(&terms[0], opcode, labels)?,
                &terms[0],
                "first argument",
            )?;
            let target = operand(resolve(&terms[1], opcode, labels)?);
            Ok(Instruction::branch(opcode, arg1, target))
        }
        Opcode::LD => {
            check_arity(terms, 2, span, opcode)?;
            let out = require_register(resolve(&terms[0], opcode, labels)?, &terms[0], "output")?;
            let addr = operand(resolve(&terms[1], opcode, labels)?);
            Ok(Instruction::load(out, addr))
        }
        Opcode::SV => {
            check_arity(terms, 2, span, opcode)?;
            let src = require_register(resolve(&terms[0], opcode, labels)?, &terms[0], "data")?;
            let addr = operand(resolve(&terms[1], opcode, labels)?);
            Ok(Instruction::store(src, addr))
        }
        Opcode::IRET | Opcode::STI | Opcode::CLI | Opcode::HLT => {
            check_arity(terms, 0, span, opcode)?;
            Ok(Instruction::nullary(opcode))
        }
    }
}

fn vector_slot(index: &Term) -> Result<usize> {
    if let TermValue::Int(value) = index.value {
        if value >= 0 && (value as usize) < INTERRUPTION_VECTOR_SZ {
            return Ok(value as usize);
        }
    }
    Err(new_parser_error(
        index.span.clone(),
        format!(
            "interruption vector num must be from 0 to {}",
            INTERRUPTION_VECTOR_SZ - 1
        ),
    ))
}

fn vector_target(target: &Term, labels: &Labels) -> Result<Word> {
    match target.value {
        TermValue::Int(value) => Ok(value),
        TermValue::Name(name) => match labels.code.get(name) {
            Some(&index) => Ok(index as Word),
            None => Err(new_parser_error(
                target.span.clone(),
                "interruption vector address must be an int or a code label".to_string(),
            )),
        },
        TermValue::Char(_) => Err(new_parser_error(
            target.span.clone(),
            "interruption vector address must be an int or a code label".to_string(),
        )),
    }
}

/// Second pass: emit instructions with all labels resolved and fill the
/// interrupt-vector slots. A terminating `halt` is always appended so that
/// execution cannot fall off the end of the program.
pub fn encode<'i>(lines: &[Line<'i>], layout: Layout<'i>) -> Result<Program> {
    let Layout { labels, mut data } = layout;
    let mut code = Vec::new();

    // Section placement was checked by the first pass.
    for line in lines {
        match line {
            Line::Section(_) | Line::Label { .. } | Line::Word { .. } => {}
            Line::Vector { index, target, .. } => {
                let slot = vector_slot(index)?;
                data[slot] = vector_target(target, &labels)?;
            }
            Line::Instruction { .. } => {
                code.push(encode_instruction(line, &labels)?);
            }
        }
    }

    code.push(Instruction::nullary(Opcode::HLT));
    Ok(Program { code, data })
}
