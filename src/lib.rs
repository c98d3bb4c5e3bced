//! Tick-accurate model of a small 32-bit register machine with a single
//! interrupt line. The [`processor`] module contains the hardware units
//! (ALU, register file, datapath, control unit) and the simulation driver;
//! program artifacts are defined by the [`risa`] crate and produced by the
//! `rasm` assembler.

pub mod constants;
pub mod processor;

#[cfg(test)]
mod test;
