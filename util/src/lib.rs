use std::{error::Error, fmt};

/// Error produced when a mnemonic, register name or other closed-set token
/// cannot be matched against its enum.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct ParseEnumError {
    pub value: String,
    pub enum_name: &'static str,
}

impl ParseEnumError {
    pub fn new(value: &str, enum_name: &'static str) -> ParseEnumError {
        ParseEnumError {
            value: value.to_string(),
            enum_name,
        }
    }
}

impl fmt::Display for ParseEnumError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Failed to parse \"{}\" as {}.",
            &self.value, &self.enum_name
        )
    }
}

impl Error for ParseEnumError {}
