use risa::{register_index, Register, Word, REGISTER_COUNT};

use crate::constants;

/// Signal raised when `r0` is selected as an output register.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct ReadOnlyWrite;

/// Register file: the seven machine registers plus the three selector
/// latches that pick the operands and the destination of the current
/// microstep.
pub struct RegFile {
    registers: [Word; REGISTER_COUNT],
    operand_1: Register,
    operand_2: Register,
    output: Register,
}

impl RegFile {
    pub fn new() -> RegFile {
        let mut registers = [0; REGISTER_COUNT];
        registers[register_index(Register::SP)] = constants::DATA_MEM_SZ as Word;
        RegFile {
            registers,
            operand_1: Register::R0,
            operand_2: Register::R0,
            output: Register::R1,
        }
    }

    pub fn get(&self, id: Register) -> Word {
        self.registers[register_index(id)]
    }

    pub(crate) fn set(&mut self, id: Register, value: Word) {
        self.registers[register_index(id)] = value;
    }

    /// Select the register set for the next microstep. Selecting `r0` as
    /// the output is a write-to-read-only fault.
    pub fn latch(
        &mut self,
        operand_1: Register,
        operand_2: Register,
        output: Register,
    ) -> Result<(), ReadOnlyWrite> {
        self.operand_1 = operand_1;
        self.operand_2 = operand_2;
        if output == Register::R0 {
            return Err(ReadOnlyWrite);
        }
        self.output = output;
        Ok(())
    }

    pub fn operand_1(&self) -> Register {
        self.operand_1
    }

    pub fn operand_2(&self) -> Register {
        self.operand_2
    }

    pub fn output(&self) -> Register {
        self.output
    }
}
