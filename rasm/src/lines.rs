use matches::debug_assert_matches;
use pest::iterators::Pair;
use pest::Span;
use risa::Word;

use crate::parser::Rule;
use crate::{new_parser_error, Result};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Section {
    Data,
    Text,
}

#[derive(Clone, Copy, Debug)]
pub enum TermValue<'i> {
    Int(Word),
    Char(char),
    Name(&'i str),
}

#[derive(Clone, Debug)]
pub struct Term<'i> {
    pub span: Span<'i>,
    pub value: TermValue<'i>,
}

/// One source line in syntactic form, before label resolution.
#[derive(Clone, Debug)]
pub enum Line<'i> {
    Section(Section),
    Label {
        name: &'i str,
        span: Span<'i>,
    },
    Word {
        value: Term<'i>,
    },
    Vector {
        index: Term<'i>,
        target: Term<'i>,
        span: Span<'i>,
    },
    Instruction {
        mnemonic: &'i str,
        span: Span<'i>,
        terms: Vec<Term<'i>>,
    },
}

fn parse_term(pair: Pair<Rule>) -> Result<Term> {
    debug_assert_matches!(pair.as_rule(), Rule::term);
    let span = pair.as_span();
    let inner = pair.into_inner().next().unwrap();
    let value = match inner.as_rule() {
        Rule::int => TermValue::Int(inner.as_str().parse().map_err(|_| {
            new_parser_error(
                inner.as_span(),
                format!("integer {} is out of the 32-bit range", inner.as_str()),
            )
        })?),
        Rule::char_literal => {
            let c = inner.into_inner().next().unwrap();
            TermValue::Char(c.as_str().chars().next().unwrap())
        }
        Rule::identifier => TermValue::Name(inner.as_str()),
        _ => unreachable!(),
    };
    Ok(Term { span, value })
}

/// Flatten the parse tree into a list of lines.
pub fn collect(program: Pair<Rule>) -> Result<Vec<Line>> {
    debug_assert_matches!(program.as_rule(), Rule::program);

    let mut lines = Vec::new();
    for pair in program.into_inner() {
        match pair.as_rule() {
            Rule::section_decl => {
                let name = pair.into_inner().last().unwrap();
                let section = match name.as_str() {
                    "data" => Section::Data,
                    "text" => Section::Text,
                    other => {
                        return Err(new_parser_error(
                            name.as_span(),
                            format!("unknown section name {}", other),
                        ));
                    }
                };
                lines.push(Line::Section(section));
            }
            Rule::label_decl => {
                let name = pair.into_inner().next().unwrap();
                lines.push(Line::Label {
                    name: name.as_str(),
                    span: name.as_span(),
                });
            }
            Rule::data_word => {
                let term = pair.into_inner().last().unwrap();
                lines.push(Line::Word {
                    value: parse_term(term)?,
                });
            }
            Rule::data_vector => {
                let span = pair.as_span();
                let mut terms = pair
                    .into_inner()
                    .filter(|p| p.as_rule() == Rule::term)
                    .map(parse_term)
                    .collect::<Result<Vec<_>>>()?;
                let target = terms.pop().unwrap();
                let index = terms.pop().unwrap();
                lines.push(Line::Vector {
                    index,
                    target,
                    span,
                });
            }
            Rule::instruction => {
                let span = pair.as_span();
                let mut pairs = pair.into_inner();
                let mnemonic = pairs.next().unwrap();
                let terms = pairs.map(parse_term).collect::<Result<Vec<_>>>()?;
                lines.push(Line::Instruction {
                    mnemonic: mnemonic.as_str(),
                    span,
                    terms,
                });
            }
            Rule::EOI => {}
            _ => unreachable!(),
        }
    }
    Ok(lines)
}
