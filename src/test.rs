use std::collections::BTreeMap;

use risa::{Instruction, Opcode, Operand, Program, Register, Word};

use crate::constants;
use crate::processor::{simulation, ControlUnit, DataPath, Error, ExitCode, TickResult};

fn reg(register: Register) -> Operand {
    Operand::Register(register)
}

fn imm(value: Word) -> Operand {
    Operand::Constant(value)
}

fn machine(code: Vec<Instruction>, data: Vec<Word>, queue: BTreeMap<u64, Word>) -> ControlUnit {
    let mut memory = vec![0; constants::DATA_MEM_LEN];
    memory[..data.len()].copy_from_slice(&data);
    ControlUnit::new(code, DataPath::new(memory, false), queue)
}

fn run(control_unit: &mut ControlUnit) -> ExitCode {
    for _ in 0..10_000 {
        if let TickResult::Stop(code) = control_unit.decode_and_execute_instruction() {
            return code;
        }
    }
    panic!("program did not stop");
}

#[test]
fn arithmetic_writes_output_register() {
    let mut cu = machine(
        vec![
            Instruction::compute(Opcode::ADD, Register::R1, Register::R0, imm(40)),
            Instruction::compute(Opcode::ADD, Register::R1, Register::R1, imm(2)),
            Instruction::nullary(Opcode::HLT),
        ],
        vec![0],
        BTreeMap::new(),
    );

    assert_eq!(run(&mut cu), ExitCode::Halted);
    assert_eq!(cu.data_path().register(Register::R1), 42);
    assert_eq!(cu.current_tick(), 2);
}

#[test]
fn arithmetic_wraps_in_signed_range() {
    let mut cu = machine(
        vec![
            Instruction::compute(Opcode::ADD, Register::R1, Register::R0, imm(Word::MAX)),
            Instruction::compute(Opcode::ADD, Register::R1, Register::R1, imm(1)),
            Instruction::nullary(Opcode::HLT),
        ],
        vec![0],
        BTreeMap::new(),
    );

    run(&mut cu);
    assert_eq!(cu.data_path().register(Register::R1), Word::MIN);
}

#[test]
fn cmp_writes_scratch_register_and_zero_flag() {
    let mut cu = machine(
        vec![
            Instruction::compute(Opcode::ADD, Register::R1, Register::R0, imm(5)),
            Instruction::compute(Opcode::ADD, Register::R2, Register::R0, imm(9)),
            Instruction::compute(Opcode::CMP, Register::R2, Register::R1, imm(5)),
            Instruction::nullary(Opcode::HLT),
        ],
        vec![0],
        BTreeMap::new(),
    );

    run(&mut cu);
    // cmp writes its difference into the scratch register.
    assert_eq!(cu.data_path().register(Register::R2), 0);
    assert!(cu.data_path().zero_flag());
}

#[test]
fn store_and_load_through_memory() {
    let mut cu = machine(
        vec![
            Instruction::compute(Opcode::ADD, Register::R1, Register::R0, imm(77)),
            Instruction::store(Register::R1, imm(50)),
            Instruction::load(Register::R2, imm(50)),
            Instruction::compute(Opcode::ADD, Register::R3, Register::R0, imm(50)),
            Instruction::load(Register::R4, reg(Register::R3)),
            Instruction::nullary(Opcode::HLT),
        ],
        vec![0],
        BTreeMap::new(),
    );

    assert_eq!(run(&mut cu), ExitCode::Halted);
    assert_eq!(cu.data_path().memory(50), 77);
    assert_eq!(cu.data_path().register(Register::R2), 77);
    // Register-indirect load uses the register value as the address.
    assert_eq!(cu.data_path().register(Register::R4), 77);
    assert_eq!(cu.data_path().register(Register::R0), 0);
}

#[test]
fn store_through_register_address() {
    let mut cu = machine(
        vec![
            Instruction::compute(Opcode::ADD, Register::R1, Register::R0, imm(90)),
            Instruction::compute(Opcode::ADD, Register::R2, Register::R0, imm(33)),
            Instruction::store(Register::R2, reg(Register::R1)),
            Instruction::nullary(Opcode::HLT),
        ],
        vec![0],
        BTreeMap::new(),
    );

    run(&mut cu);
    assert_eq!(cu.data_path().memory(90), 33);
}

#[test]
fn unconditional_jump_costs_one_tick() {
    let mut cu = machine(
        vec![
            Instruction::unary(Opcode::JMP, imm(2)),
            Instruction::unary(Opcode::OUT, imm(120)),
            Instruction::nullary(Opcode::HLT),
        ],
        vec![0],
        BTreeMap::new(),
    );

    assert_eq!(run(&mut cu), ExitCode::Halted);
    assert!(cu.data_path().output_buffer().is_empty());
    assert_eq!(cu.current_tick(), 1);
}

#[test]
fn taken_branch_costs_two_ticks() {
    // r0 is zero, so je takes the branch over the out.
    let mut cu = machine(
        vec![
            Instruction::branch(Opcode::JE, Register::R0, imm(2)),
            Instruction::unary(Opcode::OUT, imm(120)),
            Instruction::nullary(Opcode::HLT),
        ],
        vec![0],
        BTreeMap::new(),
    );

    assert_eq!(run(&mut cu), ExitCode::Halted);
    assert!(cu.data_path().output_buffer().is_empty());
    assert_eq!(cu.current_tick(), 2);
}

#[test]
fn untaken_branch_costs_one_tick_and_falls_through() {
    let mut cu = machine(
        vec![
            Instruction::branch(Opcode::JNE, Register::R0, imm(2)),
            Instruction::unary(Opcode::OUT, imm(120)),
            Instruction::nullary(Opcode::HLT),
        ],
        vec![0],
        BTreeMap::new(),
    );

    assert_eq!(run(&mut cu), ExitCode::Halted);
    assert_eq!(cu.data_path().output_buffer(), &[120]);
    assert_eq!(cu.current_tick(), 2); // 1 for the compare, 1 for the out
}

#[test]
fn branch_through_register_target() {
    let mut cu = machine(
        vec![
            Instruction::compute(Opcode::ADD, Register::R1, Register::R0, imm(3)),
            Instruction::unary(Opcode::JMP, reg(Register::R1)),
            Instruction::unary(Opcode::OUT, imm(120)),
            Instruction::nullary(Opcode::HLT),
        ],
        vec![0],
        BTreeMap::new(),
    );

    assert_eq!(run(&mut cu), ExitCode::Halted);
    assert!(cu.data_path().output_buffer().is_empty());
}

#[test]
fn interrupt_admission_waits_for_scheduled_tick() {
    // Handler lives at instruction 2; the vector cell holds that index.
    let mut queue = BTreeMap::new();
    queue.insert(5, 120);
    let mut cu = machine(
        vec![
            Instruction::nullary(Opcode::STI),
            Instruction::unary(Opcode::JMP, imm(1)),
            Instruction::unary(Opcode::IN, reg(Register::R1)),
            Instruction::unary(Opcode::OUT, reg(Register::R1)),
            Instruction::nullary(Opcode::HLT),
        ],
        vec![2],
        queue,
    );

    let mut steps = 0;
    let exit = loop {
        match cu.decode_and_execute_instruction() {
            TickResult::Continue => steps += 1,
            TickResult::Stop(code) => break code,
        }
        assert!(steps < 100, "program did not stop");
    };

    assert_eq!(exit, ExitCode::Halted);
    // Spinning costs one tick per jmp; the admission fires at the first
    // fetch boundary at or after tick 5 and costs three ticks itself.
    assert_eq!(cu.current_tick(), 10);
    assert_eq!(steps, 7);
    assert_eq!(cu.data_path().output_buffer(), &[120]);
    assert!(cu.in_interrupt());
    assert_eq!(
        cu.data_path().register(Register::SP),
        constants::DATA_MEM_SZ as Word - 1
    );
    // The return address was pushed at the old stack top.
    assert_eq!(cu.data_path().memory(constants::DATA_MEM_SZ), 1);
}

#[test]
fn iret_restores_stack_and_return_address() {
    let mut queue = BTreeMap::new();
    queue.insert(0, 120);
    let mut cu = machine(
        vec![
            Instruction::nullary(Opcode::STI),
            Instruction::unary(Opcode::JMP, imm(3)),
            Instruction::nullary(Opcode::IRET),
            Instruction::nullary(Opcode::HLT),
        ],
        vec![2],
        queue,
    );

    assert_eq!(run(&mut cu), ExitCode::Halted);
    assert!(!cu.in_interrupt());
    assert_eq!(
        cu.data_path().register(Register::SP),
        constants::DATA_MEM_SZ as Word
    );
    assert_eq!(cu.current_tick(), 7); // sti 1, admission 3, iret 2, jmp 1
}

#[test]
fn interrupts_are_ignored_while_disabled() {
    let mut queue = BTreeMap::new();
    queue.insert(0, 120);
    let mut cu = machine(
        vec![
            Instruction::unary(Opcode::OUT, imm(104)),
            Instruction::unary(Opcode::OUT, imm(105)),
            Instruction::nullary(Opcode::HLT),
        ],
        vec![0],
        queue,
    );

    assert_eq!(run(&mut cu), ExitCode::Halted);
    assert_eq!(cu.data_path().output_buffer(), &[104, 105]);
    assert!(!cu.in_interrupt());
}

#[test]
fn in_with_empty_buffer_stops_the_run() {
    let mut cu = machine(
        vec![
            Instruction::unary(Opcode::IN, reg(Register::R1)),
            Instruction::nullary(Opcode::HLT),
        ],
        vec![0],
        BTreeMap::new(),
    );

    assert_eq!(run(&mut cu), ExitCode::InputExhausted);
}

#[test]
fn write_to_r0_stops_with_partial_output() {
    let program = Program {
        code: vec![
            Instruction::unary(Opcode::OUT, imm(104)),
            Instruction::compute(Opcode::ADD, Register::R0, Register::R0, imm(1)),
            Instruction::nullary(Opcode::HLT),
        ],
        data: vec![0],
    };

    let result = simulation(program, BTreeMap::new(), 100, false).unwrap();
    assert_eq!(result.exit_code, ExitCode::ReadOnlyWrite);
    assert_eq!(result.output, "h");
    assert_eq!(result.instr_count, 1);
}

#[test]
fn division_by_zero_stops_the_run() {
    let program = Program {
        code: vec![
            Instruction::compute(Opcode::ADD, Register::R1, Register::R0, imm(5)),
            Instruction::compute(Opcode::DIV, Register::R2, Register::R1, imm(0)),
            Instruction::nullary(Opcode::HLT),
        ],
        data: vec![0],
    };

    let result = simulation(program, BTreeMap::new(), 100, false).unwrap();
    assert_eq!(result.exit_code, ExitCode::DivisionByZero);
}

#[test]
fn halt_costs_no_ticks_and_no_instructions() {
    let program = Program {
        code: vec![Instruction::nullary(Opcode::HLT)],
        data: vec![0],
    };

    let result = simulation(program, BTreeMap::new(), 100, false).unwrap();
    assert_eq!(result.exit_code, ExitCode::Halted);
    assert_eq!(result.instr_count, 0);
    assert_eq!(result.ticks, 0);
}

#[test]
fn instruction_cap_is_fatal() {
    let program = Program {
        code: vec![Instruction::unary(Opcode::JMP, imm(0))],
        data: vec![0],
    };

    match simulation(program, BTreeMap::new(), 10, false) {
        Err(Error::TooLongExecution(10)) => {}
        other => panic!("expected instruction cap error, got {:?}", other),
    }
}

#[test]
fn oversized_data_image_is_rejected() {
    let program = Program {
        code: vec![Instruction::nullary(Opcode::HLT)],
        data: vec![0; constants::DATA_MEM_LEN + 1],
    };

    match simulation(program, BTreeMap::new(), 10, false) {
        Err(Error::DataImageTooLarge(_)) => {}
        other => panic!("expected data image error, got {:?}", other),
    }
}

#[test]
fn ticks_dominate_instruction_count() {
    let program = Program {
        code: vec![
            Instruction::compute(Opcode::ADD, Register::R1, Register::R0, imm(3)),
            Instruction::branch(Opcode::JNE, Register::R1, imm(4)),
            Instruction::nullary(Opcode::HLT),
            Instruction::nullary(Opcode::HLT),
            Instruction::unary(Opcode::OUT, imm(33)),
            Instruction::nullary(Opcode::HLT),
        ],
        data: vec![0],
    };

    let result = simulation(program, BTreeMap::new(), 100, false).unwrap();
    assert!(result.ticks >= result.instr_count);
}
