//! Property-based tests for the CPU core and memory mapper.

use h6280::bus::{translate, Bus, MemoryMap, NUM_BANKS, PHYSICAL_SIZE};
use h6280::cpu::{
    opcode_info, AddressingMode, Cpu, CpuConfig, IrqLine, LineState, Timer, FLAG_BREAK,
    FLAG_CARRY, FLAG_INTERRUPT_DISABLE, FLAG_OVERFLOW, FLAG_RESERVED, TIMER_CONTROL_START,
    TIMER_PRESCALE,
};
use proptest::prelude::*;

const PROGRAM_START: u16 = 0x8000;

/// Flat RAM, identity mapping, reset to $8000.
fn setup_cpu(program: &[u8]) -> (Cpu, MemoryMap) {
    let mut bus = MemoryMap::flat();
    bus.load(0x1FFE, &PROGRAM_START.to_le_bytes());
    let mut cpu = Cpu::with_config(CpuConfig::default());
    cpu.reset(&mut bus);
    for bank in 0..NUM_BANKS {
        cpu.set_mpr(bank, bank as u8);
    }
    bus.load(PROGRAM_START as u32, program);
    (cpu, bus)
}

fn run_steps<B: Bus>(cpu: &mut Cpu, bus: &mut B, steps: usize) {
    for _ in 0..steps {
        cpu.step(bus);
    }
}

const SUBROUTINE_START: u16 = 0x8800;
const IRQ1_HANDLER: u16 = 0x9100;

/// Saves and restores every register, then returns.
const SUBROUTINE: [u8; 9] = [
    0x48, 0xDA, 0x5A, 0x08, // PHA; PHX; PHY; PHP
    0x28, 0x7A, 0xFA, 0x68, // PLP; PLY; PLX; PLA
    0x60, // RTS
];
const SUBROUTINE_SAVES: usize = 4;

const IRQ1_ROUTINE: [u8; 7] = [
    0xDA, 0x5A, 0x08, // PHX; PHY; PHP
    0x28, 0x7A, 0xFA, // PLP; PLY; PLX
    0x40, // RTI
];

/// Flat memory that keeps the physical address of every write.
struct WriteLog {
    memory: MemoryMap,
    writes: Vec<u32>,
}

impl Bus for WriteLog {
    fn read(&mut self, addr: u32) -> u8 {
        self.memory.read(addr)
    }

    fn write(&mut self, addr: u32, value: u8) {
        self.writes.push(addr);
        self.memory.write(addr, value);
    }
}

/// One register value pushed on the way in and pulled on the way out.
#[derive(Clone, Copy, Debug)]
enum Saved {
    A(u8),
    X(u8),
    Y(u8),
    Status(u8),
}

impl Saved {
    fn push_code(self) -> Vec<u8> {
        match self {
            Saved::A(v) => vec![0xA9, v, 0x48], // LDA #v; PHA
            Saved::X(v) => vec![0xA2, v, 0xDA], // LDX #v; PHX
            Saved::Y(v) => vec![0xA0, v, 0x5A], // LDY #v; PHY
            Saved::Status(v) => vec![0xA9, v, 0x48, 0x28, 0x08], // LDA #v; PHA; PLP; PHP
        }
    }

    fn push_steps(self) -> usize {
        match self {
            Saved::Status(_) => 4,
            _ => 2,
        }
    }

    fn pull_opcode(self) -> u8 {
        match self {
            Saved::A(_) => 0x68,
            Saved::X(_) => 0xFA,
            Saved::Y(_) => 0x7A,
            Saved::Status(_) => 0x28,
        }
    }
}

fn saved_register() -> impl Strategy<Value = Saved> {
    prop_oneof![
        any::<u8>().prop_map(Saved::A),
        any::<u8>().prop_map(Saved::X),
        any::<u8>().prop_map(Saved::Y),
        // I stays clear so IRQ1 is always taken.
        any::<u8>().prop_map(|v| Saved::Status(v & !FLAG_INTERRUPT_DISABLE)),
    ]
}

fn registers(cpu: &Cpu) -> (u8, u8, u8, u8) {
    let ctx = cpu.context();
    (ctx.a, ctx.x, ctx.y, ctx.p)
}

/// Assert IRQ1, run its routine to the RTI and check nothing leaked.
fn service_irq1<B: Bus>(cpu: &mut Cpu, bus: &mut B) -> Result<(), TestCaseError> {
    let before = registers(cpu);
    let (pc, sp) = (cpu.context().pc, cpu.context().sp);

    cpu.set_irq_line(bus, IrqLine::Irq1, LineState::Asserted);
    cpu.set_irq_line(bus, IrqLine::Irq1, LineState::Clear);
    prop_assert_eq!(cpu.context().pc, IRQ1_HANDLER);
    prop_assert_eq!(cpu.context().sp, sp.wrapping_sub(3));

    run_steps(cpu, bus, IRQ1_ROUTINE.len());
    prop_assert_eq!(cpu.context().pc, pc);
    prop_assert_eq!(cpu.context().sp, sp);
    prop_assert_eq!(registers(cpu), before);
    Ok(())
}

/// Run a `JSR` into the subroutine and back, optionally taking IRQ1
/// while the subroutine has its registers on the stack.
fn call_subroutine<B: Bus>(
    cpu: &mut Cpu,
    bus: &mut B,
    interrupted: bool,
) -> Result<(), TestCaseError> {
    let before = registers(cpu);
    let (pc, sp) = (cpu.context().pc, cpu.context().sp);

    cpu.step(bus);
    prop_assert_eq!(cpu.context().pc, SUBROUTINE_START);
    prop_assert_eq!(cpu.context().sp, sp.wrapping_sub(2));

    run_steps(cpu, bus, SUBROUTINE_SAVES);
    if interrupted {
        service_irq1(cpu, bus)?;
    }
    run_steps(cpu, bus, SUBROUTINE.len() - SUBROUTINE_SAVES);
    prop_assert_eq!(cpu.context().pc, pc + 3);
    prop_assert_eq!(cpu.context().sp, sp);
    prop_assert_eq!(registers(cpu), before);
    Ok(())
}

proptest! {
    #[test]
    fn translate_matches_mapper_formula(mmr in any::<[u8; 8]>(), logical in any::<u16>()) {
        let physical = translate(&mmr, logical);
        let expected = ((mmr[(logical >> 13) as usize] as u32) << 13) | (logical as u32 & 0x1FFF);
        prop_assert_eq!(physical, expected);
        prop_assert!((physical as usize) < PHYSICAL_SIZE);
    }

    #[test]
    fn binary_adc_sets_carry_and_overflow(a in any::<u8>(), m in any::<u8>(), carry in any::<bool>()) {
        let carry_op = if carry { 0x38 } else { 0x18 };
        let (mut cpu, mut bus) = setup_cpu(&[carry_op, 0xA9, a, 0x69, m]);
        run_steps(&mut cpu, &mut bus, 3);

        let sum = a as u16 + m as u16 + carry as u16;
        let result = sum as u8;
        let ctx = cpu.context();
        prop_assert_eq!(ctx.a, result);
        prop_assert_eq!(ctx.flag(FLAG_CARRY), sum > 0xFF);
        prop_assert_eq!(ctx.flag(FLAG_OVERFLOW), (a ^ result) & (m ^ result) & 0x80 != 0);
    }

    #[test]
    fn binary_sbc_sets_borrow_and_overflow(a in any::<u8>(), m in any::<u8>(), carry in any::<bool>()) {
        let carry_op = if carry { 0x38 } else { 0x18 };
        let (mut cpu, mut bus) = setup_cpu(&[carry_op, 0xA9, a, 0xE9, m]);
        run_steps(&mut cpu, &mut bus, 3);

        let diff = a as i16 - m as i16 - (!carry) as i16;
        let result = diff as u8;
        let ctx = cpu.context();
        prop_assert_eq!(ctx.a, result);
        prop_assert_eq!(ctx.flag(FLAG_CARRY), diff >= 0);
        prop_assert_eq!(ctx.flag(FLAG_OVERFLOW), (a ^ m) & (a ^ result) & 0x80 != 0);
    }

    #[test]
    fn decimal_arithmetic_leaves_overflow(
        a in any::<u8>(),
        m in any::<u8>(),
        overflow in any::<bool>(),
        subtract in any::<bool>(),
    ) {
        let op = if subtract { 0xE9 } else { 0x69 };
        let (mut cpu, mut bus) = setup_cpu(&[0xF8, 0xA9, a, op, m]);
        cpu.context_mut().set_flag(FLAG_OVERFLOW, overflow);
        run_steps(&mut cpu, &mut bus, 3);

        prop_assert_eq!(cpu.context().flag(FLAG_OVERFLOW), overflow);
    }

    #[test]
    fn break_and_reserved_bits_read_set_after_any_instruction(
        opcode in any::<u8>(),
        operands in any::<[u8; 6]>(),
        status in any::<u8>(),
    ) {
        // Block transfers are covered separately; a random length makes them slow.
        prop_assume!(opcode_info(opcode).mode != AddressingMode::BlockTransfer);
        let mut program = vec![opcode];
        program.extend_from_slice(&operands);
        let (mut cpu, mut bus) = setup_cpu(&program);
        cpu.context_mut().p = status;

        cpu.step(&mut bus);

        prop_assert_eq!(cpu.context().p & (FLAG_BREAK | FLAG_RESERVED), FLAG_BREAK | FLAG_RESERVED);
    }

    #[test]
    fn instruction_length_matches_pc_advance(opcode in any::<u8>(), operands in any::<[u8; 6]>()) {
        let info = opcode_info(opcode);
        let moves_pc = matches!(
            info.mnemonic,
            "BRK" | "JMP" | "JSR" | "BSR" | "RTS" | "RTI" | "BRA"
        ) || matches!(info.mode, AddressingMode::Relative | AddressingMode::ZeroPageRelative);
        prop_assume!(!moves_pc && info.mode != AddressingMode::BlockTransfer);

        let mut program = vec![opcode];
        program.extend_from_slice(&operands);
        let (mut cpu, mut bus) = setup_cpu(&program);
        let cycles = cpu.step(&mut bus);

        prop_assert_eq!(cpu.context().pc, PROGRAM_START + info.size() as u16);
        prop_assert!(cycles >= info.cycles as u32);
    }

    #[test]
    fn stack_unwinds_through_pushes_calls_and_interrupts(
        saved in prop::collection::vec(saved_register(), 1..24),
        call_at in any::<prop::sample::Index>(),
        irq_at in any::<prop::sample::Index>(),
        irq_in_call in any::<bool>(),
    ) {
        let call_at = call_at.index(saved.len() + 1);
        let irq_at = (!irq_in_call).then(|| irq_at.index(saved.len() + 1));
        let [sub_lo, sub_hi] = SUBROUTINE_START.to_le_bytes();

        let mut program = vec![0x58]; // CLI
        for index in 0..=saved.len() {
            if index == call_at {
                program.extend_from_slice(&[0x20, sub_lo, sub_hi]); // JSR
            }
            if let Some(slot) = saved.get(index) {
                program.extend(slot.push_code());
            }
        }
        program.extend(saved.iter().rev().map(|slot| slot.pull_opcode()));

        let (mut cpu, mut memory) = setup_cpu(&program);
        memory.load(SUBROUTINE_START as u32, &SUBROUTINE);
        memory.load(IRQ1_HANDLER as u32, &IRQ1_ROUTINE);
        memory.load(0xFFF8, &IRQ1_HANDLER.to_le_bytes());
        let mut bus = WriteLog { memory, writes: Vec::new() };

        cpu.step(&mut bus);
        for index in 0..=saved.len() {
            if index == call_at {
                call_subroutine(&mut cpu, &mut bus, irq_in_call)?;
            }
            if irq_at == Some(index) {
                service_irq1(&mut cpu, &mut bus)?;
            }
            if let Some(slot) = saved.get(index) {
                run_steps(&mut cpu, &mut bus, slot.push_steps());
            }
        }
        prop_assert_eq!(cpu.context().sp as usize, 0xFF - saved.len());

        for slot in saved.iter().rev() {
            cpu.step(&mut bus);
            let ctx = cpu.context();
            let (pulled, pushed) = match *slot {
                Saved::A(v) => (ctx.a, v),
                Saved::X(v) => (ctx.x, v),
                Saved::Y(v) => (ctx.y, v),
                Saved::Status(v) => (ctx.p, v | FLAG_BREAK | FLAG_RESERVED),
            };
            prop_assert_eq!(pulled, pushed, "pulling {:?}", slot);
        }
        prop_assert_eq!(cpu.context().sp, 0xFF);
        prop_assert!(!bus.writes.is_empty());
        for addr in &bus.writes {
            prop_assert!((0x2100..=0x21FF).contains(addr), "write outside page one: {:06X}", addr);
        }
    }

    #[test]
    fn context_survives_serialization(
        pc in any::<u16>(),
        a in any::<u8>(),
        x in any::<u8>(),
        y in any::<u8>(),
        sp in any::<u8>(),
        mmr in any::<[u8; 8]>(),
        irq_mask in 0u8..8,
        reload in 0u8..0x80,
    ) {
        let mut cpu = Cpu::new();
        {
            let ctx = cpu.context_mut();
            ctx.pc = pc;
            ctx.a = a;
            ctx.x = x;
            ctx.y = y;
            ctx.sp = sp;
            ctx.mmr = mmr;
            ctx.irq_mask = irq_mask;
            ctx.timer.write_reload(reload);
            ctx.timer.write_control(TIMER_CONTROL_START);
        }

        let bytes = cpu.save_context().expect("encode context");
        let mut restored = Cpu::new();
        restored.load_context(&bytes).expect("decode context");

        prop_assert_eq!(restored.get_context(), cpu.get_context());
    }

    #[test]
    fn highest_priority_unmasked_line_wins(
        asserted in any::<[bool; 3]>(),
        mask in 0u8..8,
        order in Just(vec![0usize, 1, 2]).prop_shuffle(),
    ) {
        let (mut cpu, mut bus) = setup_cpu(&[0x58, 0xEA]); // CLI; NOP
        bus.load(0xFFF6, &0x9000u16.to_le_bytes());
        bus.load(0xFFF8, &0x9100u16.to_le_bytes());
        bus.load(0xFFFA, &0x9200u16.to_le_bytes());
        cpu.irq_status_write(2, mask);
        for index in order {
            if asserted[index] {
                cpu.set_irq_line(&mut bus, IrqLine::MASKABLE[index], LineState::Asserted);
            }
        }

        cpu.step(&mut bus);
        cpu.step(&mut bus);

        let expected = IrqLine::MASKABLE
            .iter()
            .zip(asserted)
            .find(|(line, on)| *on && mask & line.mask_bit() == 0)
            .map(|(line, _)| *line);
        let expected_pc = match expected {
            Some(IrqLine::Timer) => 0x9200,
            Some(IrqLine::Irq1) => 0x9100,
            Some(_) => 0x9000,
            None => PROGRAM_START + 2,
        };
        prop_assert_eq!(cpu.context().pc, expected_pc);
    }

    #[test]
    fn self_branch_consumes_exactly_the_budget(cycles in 1i32..200_000) {
        let (mut cpu, mut bus) = setup_cpu(&[0x80, 0xFE]); // BRA *
        prop_assert_eq!(cpu.execute(&mut bus, cycles), cycles);
        prop_assert_eq!(cpu.context().pc, PROGRAM_START);
    }

    #[test]
    fn timer_counter_stays_within_reload(reload in 0u8..0x80, elapsed in 0i32..0x20000) {
        let mut timer = Timer::new();
        timer.write_reload(reload);
        timer.write_control(TIMER_CONTROL_START);
        let period = (reload as i32 + 1) * TIMER_PRESCALE;

        let fired = timer.tick(elapsed);

        prop_assert!(timer.read_counter() <= reload);
        prop_assert!(timer.value > 0 && timer.value <= period);
        prop_assert_eq!(fired as i32, elapsed / period);
    }
}
