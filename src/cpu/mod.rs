mod config;
mod debug;
mod env;
mod execute;
mod io;
mod opcodes;
mod registers;
mod timer;

pub use self::config::*;
pub use self::debug::{Breakpoints, CpuInfo, DebugAction, DebugHook, CPU_INFO};
pub use self::opcodes::{opcode_info, AddressingMode, OpcodeInfo, OPCODE_TABLE};
pub use self::registers::*;
pub use self::timer::{Timer, TIMER_CONTROL_START, TIMER_PRESCALE};

use crate::bus::{Bus, NUM_BANKS};
use crate::error::{Error, Result};

const VECTOR_IRQ2_BRK: u16 = 0xFFF6;
const VECTOR_IRQ1: u16 = 0xFFF8;
const VECTOR_TIMER: u16 = 0xFFFA;
const VECTOR_NMI: u16 = 0xFFFC;
const VECTOR_RESET: u16 = 0xFFFE;

/// Zero page and stack both live in logical page 1.
const ZERO_PAGE_BASE: u16 = 0x2000;

/// Cycles charged for vectoring to an interrupt handler.
pub const INTERRUPT_CYCLES: i32 = 8;

/// Host callback run whenever the core vectors to a hardware interrupt.
pub type IrqCallback = Box<dyn FnMut(IrqLine)>;

/// HuC6280 CPU core.
///
/// Owns one register file and nothing else: the bus is borrowed for the
/// duration of each call, so several cores can take turns on one memory map.
pub struct Cpu {
    ctx: Context,
    config: CpuConfig,
    irq_callback: Option<IrqCallback>,
    debug_hook: Option<Box<dyn DebugHook>>,
    /// Cycles left in the current `execute` slice.
    icount: i32,
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}

impl Cpu {
    pub fn new() -> Self {
        Self::with_config(CpuConfig::default())
    }

    pub fn with_config(config: CpuConfig) -> Self {
        Self {
            ctx: Context::default(),
            config,
            irq_callback: None,
            debug_hook: None,
            icount: 0,
        }
    }

    /// Build a core for a machine: clock rate, wiring and an optional
    /// interrupt-acknowledge callback.
    pub fn init(clock_hz: u32, config: CpuConfig, irq_callback: Option<IrqCallback>) -> Self {
        let mut cpu = Self::with_config(config.with_clock(clock_hz));
        cpu.irq_callback = irq_callback;
        cpu
    }

    pub fn reset<B: Bus + ?Sized>(&mut self, bus: &mut B) {
        self.ctx = Context::default();
        self.icount = 0;
        self.ctx.pc = self.read_vector(bus, VECTOR_RESET);
        self.ctx.ppc = self.ctx.pc;
        log::debug!("reset: PC={:04X}", self.ctx.pc);
    }

    /// Run for about `cycles` cycles and return how many were used.
    ///
    /// The last instruction may overrun the budget. With the stall guard on,
    /// a self-branch burns the rest of the slice and the requested count is
    /// returned. A breakpoint returns early with the cycles used so far.
    pub fn execute<B: Bus + ?Sized>(&mut self, bus: &mut B, cycles: i32) -> i32 {
        let owed = std::mem::take(&mut self.ctx.extra_cycles);
        self.icount = cycles - owed;
        self.advance_timer(owed);

        let taken = self.check_interrupts(bus);
        self.charge(taken);

        while self.icount > 0 {
            self.ctx.ppc = self.ctx.pc;

            if self.config.debug && self.debug_break() {
                break;
            }

            let used = self.execute_instruction(bus);
            self.charge(used);

            if self.config.stall_guard && self.ctx.pc == self.ctx.ppc {
                log::debug!(
                    "stall at {:04X}, skipping {} cycles",
                    self.ctx.pc,
                    self.icount.max(0)
                );
                self.advance_timer(self.icount);
                self.icount = 0;
                break;
            }

            let taken = self.check_interrupts(bus);
            self.charge(taken);
        }

        cycles - self.icount
    }

    /// Execute exactly one instruction, or enter one pending interrupt.
    /// Returns the cycles used, including any owed interrupt-entry cycles.
    pub fn step<B: Bus + ?Sized>(&mut self, bus: &mut B) -> u32 {
        let owed = std::mem::take(&mut self.ctx.extra_cycles);
        self.advance_timer(owed);

        let taken = self.check_interrupts(bus);
        if taken > 0 {
            self.advance_timer(taken);
            return (owed + taken) as u32;
        }

        self.ctx.ppc = self.ctx.pc;
        let used = self.execute_instruction(bus);
        self.advance_timer(used);
        (owed + used) as u32
    }

    /// Drive an interrupt input. A pending, unmasked interrupt is taken
    /// at once; its entry cost is charged to the next `execute` call.
    pub fn set_irq_line<B: Bus + ?Sized>(&mut self, bus: &mut B, line: IrqLine, state: LineState) {
        if line == IrqLine::Nmi {
            if self.ctx.nmi_state == state {
                return;
            }
            self.ctx.nmi_state = state;
            if state.is_asserted() {
                self.ctx.nmi_pending = true;
            }
        } else {
            self.ctx.set_line_state(line, state);
        }
        self.ctx.extra_cycles += self.check_interrupts(bus);
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    pub fn context_mut(&mut self) -> &mut Context {
        &mut self.ctx
    }

    pub fn get_context(&self) -> Context {
        self.ctx.clone()
    }

    pub fn set_context(&mut self, ctx: Context) {
        self.ctx = ctx;
        log::debug!("context restored: PC={:04X}", self.ctx.pc);
    }

    /// Serialize the register file with bincode.
    pub fn save_context(&self) -> Result<Vec<u8>> {
        Ok(bincode::encode_to_vec(&self.ctx, bincode::config::standard())?)
    }

    pub fn load_context(&mut self, bytes: &[u8]) -> Result<()> {
        let (ctx, read): (Context, usize) =
            bincode::decode_from_slice(bytes, bincode::config::standard())?;
        if read != bytes.len() {
            return Err(Error::TrailingContextBytes {
                extra: bytes.len() - read,
            });
        }
        self.set_context(ctx);
        Ok(())
    }

    /// Read a register by id. Mapper registers need the debug flag.
    pub fn get_reg(&self, id: RegisterId) -> Option<u32> {
        let ctx = &self.ctx;
        let value = match id {
            RegisterId::Pc => ctx.pc as u32,
            RegisterId::PrevPc => ctx.ppc as u32,
            RegisterId::Sp => ctx.sp as u32,
            RegisterId::P => ctx.p as u32,
            RegisterId::A => ctx.a as u32,
            RegisterId::X => ctx.x as u32,
            RegisterId::Y => ctx.y as u32,
            RegisterId::IrqMask => ctx.irq_mask as u32,
            RegisterId::TimerState => ctx.timer.control() as u32,
            RegisterId::NmiState => ctx.nmi_state.is_asserted() as u32,
            RegisterId::Irq1State => ctx.line_state(IrqLine::Irq1).is_asserted() as u32,
            RegisterId::Irq2State => ctx.line_state(IrqLine::Irq2).is_asserted() as u32,
            RegisterId::TimerIrqState => ctx.line_state(IrqLine::Timer).is_asserted() as u32,
            RegisterId::Mpr(index) => {
                if !self.config.debug {
                    return None;
                }
                *ctx.mmr.get(index as usize)? as u32
            }
        };
        Some(value)
    }

    /// Write a register by id. Returns `false` when the register is not
    /// reachable in the current configuration.
    ///
    /// Line-state registers only record the level; they do not vector.
    pub fn set_reg(&mut self, id: RegisterId, value: u32) -> bool {
        let ctx = &mut self.ctx;
        match id {
            RegisterId::Pc => ctx.pc = value as u16,
            RegisterId::PrevPc => ctx.ppc = value as u16,
            RegisterId::Sp => ctx.sp = value as u8,
            RegisterId::P => ctx.p = value as u8,
            RegisterId::A => ctx.a = value as u8,
            RegisterId::X => ctx.x = value as u8,
            RegisterId::Y => ctx.y = value as u8,
            RegisterId::IrqMask => ctx.irq_mask = value as u8 & IRQ_MASK_ALL,
            RegisterId::TimerState => ctx.timer.write_control(value as u8),
            RegisterId::NmiState => ctx.nmi_state = LineState::from(value != 0),
            RegisterId::Irq1State => ctx.set_line_state(IrqLine::Irq1, (value != 0).into()),
            RegisterId::Irq2State => ctx.set_line_state(IrqLine::Irq2, (value != 0).into()),
            RegisterId::TimerIrqState => ctx.set_line_state(IrqLine::Timer, (value != 0).into()),
            RegisterId::Mpr(index) => {
                if !self.config.debug {
                    return false;
                }
                match ctx.mmr.get_mut(index as usize) {
                    Some(slot) => *slot = value as u8,
                    None => return false,
                }
            }
        }
        true
    }

    /// Mapper register access for machine glue (banking setup).
    pub fn mpr(&self, index: usize) -> u8 {
        self.ctx.mmr[index % NUM_BANKS]
    }

    pub fn set_mpr(&mut self, index: usize, value: u8) {
        self.ctx.mmr[index % NUM_BANKS] = value;
    }

    #[inline]
    pub fn translate(&self, logical: u16) -> u32 {
        self.ctx.translate(logical)
    }

    /// Last byte written to the shared I/O page.
    pub fn io_buffer(&self) -> u8 {
        self.ctx.io_buffer
    }

    /// Report a write to another device on the shared I/O page.
    pub fn set_io_buffer(&mut self, value: u8) {
        self.ctx.io_buffer = value;
    }

    pub fn config(&self) -> &CpuConfig {
        &self.config
    }

    pub fn set_debug(&mut self, debug: bool) {
        self.config.debug = debug;
    }

    pub fn set_irq_callback(&mut self, callback: Option<IrqCallback>) {
        self.irq_callback = callback;
    }

    pub fn set_debug_hook(&mut self, hook: Option<Box<dyn DebugHook>>) {
        self.debug_hook = hook;
    }

    pub fn take_debug_hook(&mut self) -> Option<Box<dyn DebugHook>> {
        self.debug_hook.take()
    }

    pub fn info(&self) -> &'static CpuInfo {
        &CPU_INFO
    }

    fn debug_break(&mut self) -> bool {
        match self.debug_hook.as_mut() {
            Some(hook) => hook.before_instruction(&self.ctx) == DebugAction::Break,
            None => false,
        }
    }

    #[inline]
    fn charge(&mut self, cycles: i32) {
        if cycles > 0 {
            self.icount -= cycles;
            self.advance_timer(cycles);
        }
    }

    fn advance_timer(&mut self, cycles: i32) {
        let fired = self.ctx.timer.tick(cycles);
        if fired > 0 {
            log::trace!("timer underflow x{} at {:04X}", fired, self.ctx.pc);
            self.ctx.set_line_state(IrqLine::Timer, LineState::Asserted);
        }
    }

    /// Service at most one interrupt. Returns the cycles spent on entry.
    fn check_interrupts<B: Bus + ?Sized>(&mut self, bus: &mut B) -> i32 {
        if self.ctx.nmi_pending {
            self.ctx.nmi_pending = false;
            return self.take_interrupt(bus, IrqLine::Nmi);
        }
        if self.ctx.flag(FLAG_INTERRUPT_DISABLE) {
            return 0;
        }
        let pending = IrqLine::MASKABLE.into_iter().find(|line| {
            self.ctx.line_state(*line).is_asserted() && self.ctx.irq_mask & line.mask_bit() == 0
        });
        match pending {
            Some(line) => self.take_interrupt(bus, line),
            None => 0,
        }
    }

    fn take_interrupt<B: Bus + ?Sized>(&mut self, bus: &mut B, line: IrqLine) -> i32 {
        let vector = match line {
            IrqLine::Timer => VECTOR_TIMER,
            IrqLine::Irq1 => VECTOR_IRQ1,
            IrqLine::Irq2 => VECTOR_IRQ2_BRK,
            IrqLine::Nmi => VECTOR_NMI,
        };
        let pc = self.ctx.pc;
        self.push_byte(bus, (pc >> 8) as u8);
        self.push_byte(bus, pc as u8);
        self.ctx.set_flag(FLAG_BREAK, false);
        let status = self.ctx.p;
        self.push_byte(bus, status);
        self.ctx.set_flag(FLAG_DECIMAL, false);
        self.ctx.set_flag(FLAG_INTERRUPT_DISABLE, true);
        if let Some(callback) = self.irq_callback.as_mut() {
            callback(line);
        }
        self.ctx.pc = self.read_vector(bus, vector);
        log::trace!("{:?} interrupt from {:04X} to {:04X}", line, pc, self.ctx.pc);
        INTERRUPT_CYCLES
    }

    fn read_vector<B: Bus + ?Sized>(&mut self, bus: &mut B, vector: u16) -> u16 {
        let lo = self.read8(bus, vector) as u16;
        let hi = self.read8(bus, vector.wrapping_add(1)) as u16;
        (hi << 8) | lo
    }

    fn read_physical<B: Bus + ?Sized>(&mut self, bus: &mut B, addr: u32) -> u8 {
        match self.decode_control_register(addr) {
            Some(register) => self.read_control_register(register),
            None => bus.read(addr),
        }
    }

    fn write_physical<B: Bus + ?Sized>(&mut self, bus: &mut B, addr: u32, value: u8) {
        match self.decode_control_register(addr) {
            Some(register) => self.write_control_register(register, value),
            None => bus.write(addr, value),
        }
    }

    #[inline]
    fn read8<B: Bus + ?Sized>(&mut self, bus: &mut B, logical: u16) -> u8 {
        let addr = self.ctx.translate(logical);
        self.read_physical(bus, addr)
    }

    #[inline]
    fn write8<B: Bus + ?Sized>(&mut self, bus: &mut B, logical: u16, value: u8) {
        let addr = self.ctx.translate(logical);
        self.write_physical(bus, addr, value);
    }

    fn read_zero_page_word<B: Bus + ?Sized>(&mut self, bus: &mut B, zp: u8) -> u16 {
        let lo = self.read8(bus, ZERO_PAGE_BASE | zp as u16) as u16;
        let hi = self.read8(bus, ZERO_PAGE_BASE | zp.wrapping_add(1) as u16) as u16;
        (hi << 8) | lo
    }

    fn fetch_byte<B: Bus + ?Sized>(&mut self, bus: &mut B) -> u8 {
        let value = self.read8(bus, self.ctx.pc);
        self.ctx.pc = self.ctx.pc.wrapping_add(1);
        value
    }

    fn fetch_word<B: Bus + ?Sized>(&mut self, bus: &mut B) -> u16 {
        let lo = self.fetch_byte(bus) as u16;
        let hi = self.fetch_byte(bus) as u16;
        (hi << 8) | lo
    }

    fn push_byte<B: Bus + ?Sized>(&mut self, bus: &mut B, value: u8) {
        let addr = ZERO_PAGE_BASE | STACK_PAGE | self.ctx.sp as u16;
        self.write8(bus, addr, value);
        self.ctx.sp = self.ctx.sp.wrapping_sub(1);
    }

    fn pop_byte<B: Bus + ?Sized>(&mut self, bus: &mut B) -> u8 {
        self.ctx.sp = self.ctx.sp.wrapping_add(1);
        let addr = ZERO_PAGE_BASE | STACK_PAGE | self.ctx.sp as u16;
        self.read8(bus, addr)
    }
}
