use std::collections::BTreeSet;

use super::registers::Context;

/// Outcome of a debugger callback.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DebugAction {
    Continue,
    /// Stop `execute` before the instruction at `ctx.pc` runs.
    Break,
}

/// Called before every instruction while the core runs with `debug` on.
pub trait DebugHook {
    fn before_instruction(&mut self, ctx: &Context) -> DebugAction;
}

impl<F> DebugHook for F
where
    F: FnMut(&Context) -> DebugAction,
{
    fn before_instruction(&mut self, ctx: &Context) -> DebugAction {
        self(ctx)
    }
}

/// Address breakpoints plus single-step.
///
/// After a stop, the next call at the same address is let through so the
/// following `execute` resumes instead of breaking in place again.
#[derive(Clone, Debug, Default)]
pub struct Breakpoints {
    addresses: BTreeSet<u16>,
    single_step: bool,
    resume_at: Option<u16>,
    hits: Vec<u16>,
}

impl Breakpoints {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, addr: u16) -> bool {
        self.addresses.insert(addr)
    }

    pub fn remove(&mut self, addr: u16) -> bool {
        self.addresses.remove(&addr)
    }

    pub fn contains(&self, addr: u16) -> bool {
        self.addresses.contains(&addr)
    }

    pub fn set_single_step(&mut self, enabled: bool) {
        self.single_step = enabled;
    }

    /// Addresses stopped at so far, oldest first.
    pub fn hits(&self) -> &[u16] {
        &self.hits
    }
}

impl DebugHook for Breakpoints {
    fn before_instruction(&mut self, ctx: &Context) -> DebugAction {
        if self.resume_at.take() == Some(ctx.pc) {
            return DebugAction::Continue;
        }
        if self.single_step || self.addresses.contains(&ctx.pc) {
            self.resume_at = Some(ctx.pc);
            self.hits.push(ctx.pc);
            log::debug!("breakpoint at {:04X}", ctx.pc);
            return DebugAction::Break;
        }
        DebugAction::Continue
    }
}

/// Static description of the core for front ends and debuggers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CpuInfo {
    pub name: &'static str,
    pub family: &'static str,
    pub version: &'static str,
    /// Master clock cycles per CPU cycle on the reference machine.
    pub clock_divider: u32,
    pub min_instruction_len: u8,
    pub max_instruction_len: u8,
    pub data_bits: u8,
    pub logical_address_bits: u8,
    pub physical_address_bits: u8,
    pub irq_lines: u8,
    /// Fixed value the core uses for cycles of interrupt entry.
    pub interrupt_cycles: u8,
}

pub const CPU_INFO: CpuInfo = CpuInfo {
    name: "HuC6280",
    family: "Hudson 6280",
    version: env!("CARGO_PKG_VERSION"),
    clock_divider: 3,
    min_instruction_len: 1,
    max_instruction_len: 7,
    data_bits: 8,
    logical_address_bits: 16,
    physical_address_bits: 21,
    irq_lines: 3,
    interrupt_cycles: super::INTERRUPT_CYCLES as u8,
};
