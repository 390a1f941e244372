use super::*;
use crate::bus::MemoryMap;
use crate::cpu::{CpuConfig, DEFAULT_CLOCK_HZ};

const MAIN_START: u16 = 0x8000;
const SUB_START: u16 = 0x9000;

/// Two cores on one flat bus. The main core stores a byte, the sub core
/// copies it elsewhere; both then idle on `BRA *`.
fn machine_with_two_cores() -> (Scheduler<MemoryMap>, CoreId, CoreId) {
    let mut bus = MemoryMap::flat();
    bus.load(0x1FFE, &MAIN_START.to_le_bytes());
    bus.load(
        MAIN_START as u32,
        &[
            0xA9, 0x42, // LDA #$42
            0x8D, 0x00, 0x30, // STA $3000
            0x80, 0xFE, // BRA *
        ],
    );
    bus.load(
        SUB_START as u32,
        &[
            0xAD, 0x00, 0x30, // LDA $3000
            0x8D, 0x01, 0x30, // STA $3001
            0x80, 0xFE, // BRA *
        ],
    );

    let mut machine = Scheduler::new(bus);
    let main = machine.add_cpu("main", Cpu::init(DEFAULT_CLOCK_HZ, CpuConfig::default(), None));
    let sub = machine.add_cpu(
        "sub",
        Cpu::init(DEFAULT_CLOCK_HZ / 2, CpuConfig::default(), None),
    );
    machine.reset();
    for id in [main, sub] {
        let cpu = machine.cpu_mut(id).expect("core exists");
        for bank in 0..8 {
            cpu.set_mpr(bank, bank as u8);
        }
    }
    machine.cpu_mut(sub).expect("core exists").context_mut().pc = SUB_START;
    (machine, main, sub)
}

#[test]
fn cores_take_turns_on_the_shared_bus() {
    let (mut machine, main, sub) = machine_with_two_cores();
    assert_eq!(machine.core_count(), 2);
    assert_eq!(machine.core_name(main), Some("main"));
    assert_eq!(machine.core_name(sub), Some("sub"));

    machine.run_slice();

    assert_eq!(machine.bus().peek(0x3000), 0x42);
    assert_eq!(machine.bus().peek(0x3001), 0x42);
    assert_eq!(machine.cpu(sub).expect("core exists").context().pc, SUB_START + 6);
}

#[test]
fn each_core_runs_at_its_own_clock() {
    let (mut machine, main, sub) = machine_with_two_cores();

    machine.run_for(1_000_000);

    let elapsed = machine.elapsed_nanos();
    assert_eq!(elapsed, 16 * DEFAULT_SLICE_NANOS);
    assert_eq!(machine.cycles(main), Some(cycles_at(DEFAULT_CLOCK_HZ, elapsed)));
    assert_eq!(machine.cycles(sub), Some(cycles_at(DEFAULT_CLOCK_HZ / 2, elapsed)));
    assert_eq!(machine.cycles(7), None);
}

#[test]
fn overrun_is_paid_back_in_the_next_slice() {
    let mut bus = MemoryMap::flat();
    bus.load(0x1FFE, &MAIN_START.to_le_bytes());
    // LDA ($10),Y forever: 7 cycle instructions never land on a slice edge.
    let mut program = Vec::new();
    for _ in 0..0x1000 {
        program.extend_from_slice(&[0xB1, 0x10]);
    }
    bus.load(MAIN_START as u32, &program);

    let mut machine = Scheduler::new(bus);
    let id = machine.add_cpu("main", Cpu::new());
    machine.reset();
    {
        let cpu = machine.cpu_mut(id).expect("core exists");
        for bank in 0..8 {
            cpu.set_mpr(bank, bank as u8);
        }
    }
    machine.set_slice_nanos(1_000);

    for _ in 0..20 {
        machine.run_slice();
        let target = cycles_at(DEFAULT_CLOCK_HZ, machine.elapsed_nanos());
        let done = machine.cycles(id).expect("core exists");
        assert!(done >= target, "core fell behind: {done} < {target}");
        assert!(done < target + 7, "core ran ahead: {done} vs {target}");
    }
}

#[test]
fn set_irq_line_reaches_the_named_core() {
    let (mut machine, main, sub) = machine_with_two_cores();

    assert!(machine.set_irq_line(sub, IrqLine::Irq1, LineState::Asserted));
    assert!(!machine.set_irq_line(9, IrqLine::Irq1, LineState::Asserted));

    let asserted = |id| {
        machine
            .cpu(id)
            .expect("core exists")
            .context()
            .line_state(IrqLine::Irq1)
            .is_asserted()
    };
    assert!(asserted(sub));
    assert!(!asserted(main));
}

#[test]
fn state_round_trip_restores_every_core() {
    let (mut machine, main, sub) = machine_with_two_cores();
    machine.run_slice();
    let saved = machine.save_state().expect("encode state");
    let main_ctx = machine.cpu(main).expect("core exists").get_context();
    let sub_ctx = machine.cpu(sub).expect("core exists").get_context();
    let cycles = machine.cycles(main);
    let elapsed = machine.elapsed_nanos();

    machine.run_for(500_000);
    machine.cpu_mut(sub).expect("core exists").context_mut().a = 0x99;
    machine.load_state(&saved).expect("decode state");

    assert_eq!(machine.cpu(main).expect("core exists").get_context(), main_ctx);
    assert_eq!(machine.cpu(sub).expect("core exists").get_context(), sub_ctx);
    assert_eq!(machine.cycles(main), cycles);
    assert_eq!(machine.elapsed_nanos(), elapsed);
}

#[test]
fn load_state_checks_core_count_and_length() {
    let (machine, _, _) = machine_with_two_cores();
    let saved = machine.save_state().expect("encode state");

    let mut single = Scheduler::new(MemoryMap::flat());
    single.add_cpu("main", Cpu::new());
    assert!(matches!(
        single.load_state(&saved),
        Err(Error::CoreCountMismatch {
            expected: 1,
            found: 2
        })
    ));

    let (mut machine, _, _) = machine_with_two_cores();
    let mut padded = saved.clone();
    padded.extend_from_slice(&[0, 0]);
    assert!(matches!(
        machine.load_state(&padded),
        Err(Error::TrailingContextBytes { extra: 2 })
    ));
}

#[test]
fn state_file_round_trip() {
    let (mut machine, main, _) = machine_with_two_cores();
    machine.run_slice();
    let path = std::env::temp_dir().join(format!("h6280-state-{}.bin", std::process::id()));

    machine.save_state_to_file(&path).expect("write state");
    let expected = machine.cpu(main).expect("core exists").get_context();
    machine.reset();
    machine.load_state_from_file(&path).expect("read state");
    let _ = std::fs::remove_file(&path);

    assert_eq!(machine.cpu(main).expect("core exists").get_context(), expected);
    assert!(matches!(
        machine.load_state_from_file(&path),
        Err(Error::Io(_))
    ));
}

#[test]
fn reset_rewinds_time() {
    let (mut machine, main, _) = machine_with_two_cores();
    machine.run_for(200_000);
    assert!(machine.cycles(main).unwrap_or(0) > 0);

    machine.reset();

    assert_eq!(machine.elapsed_nanos(), 0);
    assert_eq!(machine.cycles(main), Some(0));
    assert_eq!(machine.cpu(main).expect("core exists").context().pc, MAIN_START);
}

#[test]
fn slice_length_is_never_zero() {
    let mut machine = Scheduler::new(MemoryMap::flat());
    machine.add_cpu("main", Cpu::new());
    machine.set_slice_nanos(0);
    machine.run_for(3);
    assert_eq!(machine.elapsed_nanos(), 3);
}
