use pest::Span;
use risa::{Word, INTERRUPTION_VECTOR_SZ};

use crate::labels::Labels;
use crate::lines::{Line, Section, Term, TermValue};
use crate::{new_parser_error, Error, Result};

/// Result of the first pass: the label maps and the initial data image.
/// The interrupt-vector slots stay zero here; they are filled by the second
/// pass once code labels are known.
pub struct Layout<'i> {
    pub labels: Labels<'i>,
    pub data: Vec<Word>,
}

fn no_active_section(span: &Span) -> Error {
    new_parser_error(span.clone(), "no active section".to_string())
}

fn word_value(term: &Term) -> Result<Word> {
    match term.value {
        TermValue::Int(value) => Ok(value),
        TermValue::Char(c) => Ok(c as Word),
        TermValue::Name(name) => Err(new_parser_error(
            term.span.clone(),
            format!(
                "invalid data: {}. only ints and chars are supported",
                name
            ),
        )),
    }
}

/// First pass: walk the lines, define labels, build the data image and
/// count instructions.
pub fn scan<'i>(lines: &[Line<'i>]) -> Result<Layout<'i>> {
    let mut labels = Labels::new();
    let mut data = vec![0; INTERRUPTION_VECTOR_SZ];
    let mut instr_count: u32 = 0;
    let mut section = None;

    for line in lines {
        match line {
            Line::Section(new_section) => section = Some(*new_section),
            Line::Label { name, span } => match section {
                Some(Section::Text) => labels.define_code(*name, span, instr_count)?,
                Some(Section::Data) => labels.define_data(*name, span, data.len() as u32)?,
                None => return Err(no_active_section(span)),
            },
            Line::Word { value } => match section {
                Some(Section::Data) => data.push(word_value(value)?),
                Some(Section::Text) => {
                    return Err(new_parser_error(
                        value.span.clone(),
                        "word declaration outside the data section".to_string(),
                    ));
                }
                None => return Err(no_active_section(&value.span)),
            },
            Line::Vector { span, .. } => match section {
                Some(Section::Data) => {}
                Some(Section::Text) => {
                    return Err(new_parser_error(
                        span.clone(),
                        "interruption vector declaration outside the data section".to_string(),
                    ));
                }
                None => return Err(no_active_section(span)),
            },
            Line::Instruction { mnemonic, span, .. } => match section {
                Some(Section::Text) => instr_count += 1,
                Some(Section::Data) => {
                    return Err(new_parser_error(
                        span.clone(),
                        format!(
                            "unknown declaration {}. only word and int are supported in the data \
                             section",
                            mnemonic
                        ),
                    ));
                }
                None => return Err(no_active_section(span)),
            },
        }
    }

    Ok(Layout { labels, data })
}
