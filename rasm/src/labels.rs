use std::collections::HashMap;

use pest::Span;

use crate::{new_parser_error, Result};

pub type LabelMap<'i> = HashMap<&'i str, u32>;

/// Code labels resolve to instruction indices, data labels to memory
/// addresses. The name spaces are disjoint but share duplicate detection:
/// redefining a name across either set is an error.
pub struct Labels<'i> {
    pub code: LabelMap<'i>,
    pub data: LabelMap<'i>,
}

impl<'i> Labels<'i> {
    pub fn new() -> Labels<'i> {
        Labels {
            code: HashMap::new(),
            data: HashMap::new(),
        }
    }

    fn check_free(&self, name: &str, span: &Span<'i>) -> Result<()> {
        if self.code.contains_key(name) || self.data.contains_key(name) {
            Err(new_parser_error(
                span.clone(),
                format!("duplicate label: {}", name),
            ))
        } else {
            Ok(())
        }
    }

    pub fn define_code(&mut self, name: &'i str, span: &Span<'i>, index: u32) -> Result<()> {
        self.check_free(name, span)?;
        self.code.insert(name, index);
        Ok(())
    }

    pub fn define_data(&mut self, name: &'i str, span: &Span<'i>, address: u32) -> Result<()> {
        self.check_free(name, span)?;
        self.data.insert(name, address);
        Ok(())
    }
}
