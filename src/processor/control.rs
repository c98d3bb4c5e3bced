use std::collections::BTreeMap;
use std::fmt;

use risa::{Instruction, Opcode, Operand, Register, Word, INTERRUPTION_VECTOR_SZ};

use super::alu::AluOp;
use super::datapath::DataPath;
use super::ExitCode;

/// Pending interrupts, keyed by the earliest tick at which each may be
/// admitted. An ordered map gives cheap minimum-key extraction.
pub type InterruptQueue = BTreeMap<u64, Word>;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TickResult {
    Continue,
    Stop(ExitCode),
}

/// Control unit: fetches instructions, sequences the datapath microsteps
/// and accounts for ticks. Interrupt admission happens at the fetch
/// boundary, before the fetched instruction executes.
pub struct ControlUnit {
    program: Vec<Instruction>,
    data_path: DataPath,
    int_queue: InterruptQueue,
    interrupt_vector: [Word; INTERRUPTION_VECTOR_SZ],
    tick: u64,
    instr_cnt: u64,
    int_enabled: bool,
    is_interrupted: bool,
    instr: Option<Instruction>,
}

fn alu_op(opcode: Opcode) -> AluOp {
    match opcode {
        Opcode::DIV => AluOp::DIV,
        Opcode::MOD => AluOp::MOD,
        Opcode::CMP => AluOp::CMP,
        Opcode::ADD => AluOp::ADD,
        Opcode::SUB => AluOp::SUB,
        Opcode::MUL => AluOp::MUL,
        _ => unreachable!(),
    }
}

impl ControlUnit {
    pub fn new(
        program: Vec<Instruction>,
        data_path: DataPath,
        int_queue: InterruptQueue,
    ) -> ControlUnit {
        ControlUnit {
            program,
            data_path,
            int_queue,
            interrupt_vector: [0; INTERRUPTION_VECTOR_SZ],
            tick: 0,
            instr_cnt: 0,
            int_enabled: false,
            is_interrupted: false,
            instr: None,
        }
    }

    fn tick(&mut self) {
        self.tick += 1;
    }

    pub fn current_tick(&self) -> u64 {
        self.tick
    }

    pub fn data_path(&self) -> &DataPath {
        &self.data_path
    }

    pub fn in_interrupt(&self) -> bool {
        self.is_interrupted
    }

    /// The PC increment at the end of a dispatch is free: it happens within
    /// the last microstep of the instruction.
    fn latch_program_counter(&mut self) {
        let pc = self.data_path.register(Register::PC);
        self.data_path
            .set_register(Register::PC, pc.wrapping_add(1));
    }

    pub fn decode_and_execute_instruction(&mut self) -> TickResult {
        match self.step() {
            Ok(()) => TickResult::Continue,
            Err(code) => TickResult::Stop(code),
        }
    }

    fn step(&mut self) -> Result<(), ExitCode> {
        if self.int_enabled && !self.is_interrupted {
            let pending = match self.int_queue.iter().next() {
                Some((&at_tick, &payload)) if self.tick >= at_tick => Some((at_tick, payload)),
                _ => None,
            };
            if let Some((at_tick, payload)) = pending {
                self.int_queue.remove(&at_tick);
                self.admit_interrupt(payload)?;
            }
        }

        let pc = self.data_path.register(Register::PC);
        let instr = self.program[pc as usize];
        self.instr = Some(instr);
        self.instr_cnt += 1;

        match instr.opcode {
            Opcode::HLT => return Err(ExitCode::Halted),

            Opcode::IRET => {
                self.data_path
                    .latch_registers(Register::SP, Register::R0, Register::SP)?;
                self.data_path.latch_alu(None);
                self.data_path.execute_alu(AluOp::INC)?;
                self.data_path.latch_output();
                self.tick();

                self.data_path
                    .latch_registers(Register::SP, Register::R0, Register::PC)?;
                self.data_path.latch_alu(None);
                self.data_path.execute_alu(AluOp::LEFT)?;
                self.data_path.read();
                self.data_path.latch_output();
                self.tick();

                self.is_interrupted = false;
                return Ok(());
            }

            Opcode::JMP | Opcode::JE | Opcode::JNE => {
                if instr.opcode != Opcode::JMP {
                    self.data_path
                        .latch_registers(instr.arg1(), Register::R0, Register::R1)?;
                    self.data_path.latch_alu(None);
                    self.data_path.execute_alu(AluOp::CMP)?;
                    self.tick();
                }
                let zero = self.data_path.zero_flag();
                let taken = instr.opcode == Opcode::JMP
                    || instr.opcode == Opcode::JE && zero
                    || instr.opcode == Opcode::JNE && !zero;
                if taken {
                    match instr.arg2() {
                        Operand::Constant(target) => {
                            self.data_path.latch_registers(
                                Register::R0,
                                Register::R0,
                                Register::PC,
                            )?;
                            self.data_path.latch_alu(Some(target));
                        }
                        Operand::Register(target) => {
                            self.data_path
                                .latch_registers(Register::R0, target, Register::PC)?;
                            self.data_path.latch_alu(None);
                        }
                    }
                    self.data_path.execute_alu(AluOp::RIGHT)?;
                    self.data_path.latch_output();
                    self.tick();
                    return Ok(());
                }
            }

            Opcode::OUT => {
                match instr.arg2() {
                    Operand::Constant(value) => {
                        self.data_path
                            .latch_registers(Register::R0, Register::R0, Register::R1)?;
                        self.data_path.latch_alu(Some(value));
                    }
                    Operand::Register(source) => {
                        self.data_path
                            .latch_registers(Register::R0, source, Register::R1)?;
                        self.data_path.latch_alu(None);
                    }
                }
                self.data_path.execute_alu(AluOp::RIGHT)?;
                self.data_path.print();
                self.tick();
            }

            Opcode::IN => {
                let dest = match instr.arg2() {
                    Operand::Register(register) => register,
                    Operand::Constant(_) => unreachable!(),
                };
                self.data_path
                    .latch_registers(Register::R0, Register::R0, dest)?;
                self.data_path.latch_alu(None);
                self.data_path.execute_alu(AluOp::NOP)?;
                self.data_path.input()?;
                self.data_path.latch_output();
                self.tick();
            }

            Opcode::ADD | Opcode::SUB | Opcode::MUL | Opcode::DIV | Opcode::MOD | Opcode::CMP => {
                match instr.arg2() {
                    Operand::Register(arg2) => {
                        self.data_path
                            .latch_registers(instr.arg1(), arg2, instr.out())?;
                        self.data_path.latch_alu(None);
                    }
                    Operand::Constant(value) => {
                        self.data_path
                            .latch_registers(instr.arg1(), Register::R0, instr.out())?;
                        self.data_path.latch_alu(Some(value));
                    }
                }
                self.data_path.execute_alu(alu_op(instr.opcode))?;
                self.data_path.latch_output();
                self.tick();
            }

            Opcode::LD => {
                match instr.arg2() {
                    Operand::Register(address) => {
                        self.data_path
                            .latch_registers(Register::R0, address, instr.out())?;
                        self.data_path.latch_alu(None);
                    }
                    Operand::Constant(address) => {
                        self.data_path
                            .latch_registers(Register::R0, Register::R0, instr.out())?;
                        self.data_path.latch_alu(Some(address));
                    }
                }
                self.data_path.execute_alu(AluOp::RIGHT)?;
                self.data_path.read();
                self.data_path.latch_output();
                self.tick();
            }

            Opcode::SV => {
                match instr.arg2() {
                    Operand::Register(address) => {
                        self.data_path
                            .latch_registers(address, instr.arg1(), Register::R1)?;
                        self.data_path.latch_alu(None);
                        self.data_path.execute_alu(AluOp::LEFT)?;
                    }
                    Operand::Constant(address) => {
                        self.data_path
                            .latch_registers(Register::R0, instr.arg1(), Register::R1)?;
                        self.data_path.latch_alu(Some(address));
                        self.data_path.execute_alu(AluOp::RIGHT)?;
                    }
                }
                self.data_path.write();
                self.tick();
            }

            Opcode::STI | Opcode::CLI => {
                self.int_enabled = instr.opcode == Opcode::STI;
                self.tick();
            }
        }

        self.latch_program_counter();
        Ok(())
    }

    /// Admit one pending interrupt: push the return address, move the stack
    /// pointer, and load the program counter through the interrupt vector.
    /// Three ticks, then the payload becomes available on the input port.
    fn admit_interrupt(&mut self, payload: Word) -> Result<(), ExitCode> {
        self.data_path
            .latch_registers(Register::SP, Register::PC, Register::R1)?;
        self.data_path.latch_alu(None);
        self.data_path.execute_alu(AluOp::LEFT)?;
        self.data_path.write();
        self.tick();

        self.data_path
            .latch_registers(Register::SP, Register::R0, Register::SP)?;
        self.data_path.latch_alu(None);
        self.data_path.execute_alu(AluOp::DEC)?;
        self.data_path.latch_output();
        self.tick();

        self.data_path
            .latch_registers(Register::R0, Register::R0, Register::PC)?;
        self.data_path.latch_alu(Some(self.interrupt_vector[0]));
        self.data_path.execute_alu(AluOp::RIGHT)?;
        self.data_path.read();
        self.data_path.latch_output();
        self.tick();

        self.data_path.push_input(payload);
        self.is_interrupted = true;
        Ok(())
    }
}

impl fmt::Display for ControlUnit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let dp = &self.data_path;
        let sp = dp.register(Register::SP);
        write!(
            f,
            "{{INSTR: {}, TICK: {}, PC: {}, R0: {}, R1: {}, R2: {}, R3: {}, R4: {}, SP: {}, \
             MEM[SP]: {}, OP1: {}, OP2: {}, OUT: {}, INT: {}}}",
            self.instr_cnt,
            self.tick,
            dp.register(Register::PC),
            dp.register(Register::R0),
            dp.register(Register::R1),
            dp.register(Register::R2),
            dp.register(Register::R3),
            dp.register(Register::R4),
            sp,
            dp.memory(sp as usize),
            dp.reg_file().operand_1(),
            dp.reg_file().operand_2(),
            dp.reg_file().output(),
            self.is_interrupted,
        )?;
        if let Some(instr) = &self.instr {
            write!(f, " {}", instr)?;
        }
        Ok(())
    }
}
