use risa::{Register, Word};

use super::alu::{Alu, AluOp, DivideByZero};
use super::registers::{ReadOnlyWrite, RegFile};

/// Signal raised when `in` executes with no pending input token.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct InputExhausted;

/// The datapath: data memory, register file and ALU tied together by three
/// buses, plus the input/output ports. The control unit drives it one
/// microstep at a time.
pub struct DataPath {
    data_memory: Vec<Word>,
    reg_file: RegFile,
    alu: Alu,
    alu_bus: Word,
    output_bus: Word,
    data_bus: Word,
    input_buffer: Vec<Word>,
    input_pointer: usize,
    output_buffer: Vec<Word>,
    output_int: bool,
}

impl DataPath {
    pub fn new(data_memory: Vec<Word>, output_int: bool) -> DataPath {
        DataPath {
            data_memory,
            reg_file: RegFile::new(),
            alu: Alu::new(),
            alu_bus: 0,
            output_bus: 0,
            data_bus: 0,
            input_buffer: Vec::new(),
            input_pointer: 0,
            output_buffer: Vec::new(),
            output_int,
        }
    }

    pub fn latch_registers(
        &mut self,
        operand_1: Register,
        operand_2: Register,
        output: Register,
    ) -> Result<(), ReadOnlyWrite> {
        self.reg_file.latch(operand_1, operand_2, output)
    }

    /// Drive the ALU inputs from the selected registers. A constant takes
    /// the place of the right input; the data bus always carries the
    /// second operand register.
    pub fn latch_alu(&mut self, const_operand: Option<Word>) {
        let left = self.reg_file.get(self.reg_file.operand_1());
        let right = match const_operand {
            Some(value) => value,
            None => self.reg_file.get(self.reg_file.operand_2()),
        };
        self.alu.latch(left, right);
        self.data_bus = self.reg_file.get(self.reg_file.operand_2());
    }

    pub fn execute_alu(&mut self, op: AluOp) -> Result<(), DivideByZero> {
        let result = self.alu.execute(op)?;
        self.alu_bus = result;
        self.output_bus = result;
        Ok(())
    }

    /// Store the output bus into the selected output register.
    pub fn latch_output(&mut self) {
        let output = self.reg_file.output();
        self.reg_file.set(output, self.output_bus);
    }

    /// Write the data bus to memory at the address on the ALU bus.
    pub fn write(&mut self) {
        self.data_memory[self.alu_bus as usize] = self.data_bus;
    }

    /// Read memory at the address on the ALU bus onto the output bus.
    pub fn read(&mut self) {
        self.output_bus = self.data_memory[self.alu_bus as usize];
    }

    /// Emit the ALU bus value on the output port.
    pub fn print(&mut self) {
        self.output_buffer.push(self.alu_bus);
    }

    /// Take the next token from the input port onto the output bus.
    pub fn input(&mut self) -> Result<(), InputExhausted> {
        match self.input_buffer.get(self.input_pointer) {
            Some(&token) => {
                self.output_bus = token;
                self.input_pointer += 1;
                Ok(())
            }
            None => Err(InputExhausted),
        }
    }

    /// Enqueue an interrupt payload on the input port.
    pub fn push_input(&mut self, token: Word) {
        self.input_buffer.push(token);
    }

    pub fn zero_flag(&self) -> bool {
        self.alu.zero_flag()
    }

    pub fn register(&self, id: Register) -> Word {
        self.reg_file.get(id)
    }

    pub(crate) fn set_register(&mut self, id: Register, value: Word) {
        self.reg_file.set(id, value);
    }

    pub fn reg_file(&self) -> &RegFile {
        &self.reg_file
    }

    pub fn memory(&self, address: usize) -> Word {
        self.data_memory.get(address).copied().unwrap_or(0)
    }

    pub fn output_buffer(&self) -> &[Word] {
        &self.output_buffer
    }

    /// Render the output buffer: decimal concatenation in integer mode,
    /// code points as characters otherwise.
    pub fn render_output(&self) -> String {
        if self.output_int {
            self.output_buffer
                .iter()
                .map(|value| value.to_string())
                .collect()
        } else {
            self.output_buffer
                .iter()
                .map(|&value| char::from_u32(value as u32).unwrap_or('\u{fffd}'))
                .collect()
        }
    }
}
