use super::timer::Timer;
use crate::bus::{translate, NUM_BANKS};

pub const FLAG_CARRY: u8 = 0b0000_0001;
pub const FLAG_ZERO: u8 = 0b0000_0010;
pub const FLAG_INTERRUPT_DISABLE: u8 = 0b0000_0100;
pub const FLAG_DECIMAL: u8 = 0b0000_1000;
pub const FLAG_BREAK: u8 = 0b0001_0000;
/// Bit 5. The HuC6280 calls it T (memory-operation mode); that mode is not
/// modelled, so the bit behaves as the reserved bit and reads back set.
pub const FLAG_RESERVED: u8 = 0b0010_0000;
pub const FLAG_OVERFLOW: u8 = 0b0100_0000;
pub const FLAG_NEGATIVE: u8 = 0b1000_0000;

pub const IRQ_MASK_IRQ2: u8 = 0x01;
pub const IRQ_MASK_IRQ1: u8 = 0x02;
pub const IRQ_MASK_TIMER: u8 = 0x04;
pub const IRQ_MASK_ALL: u8 = IRQ_MASK_IRQ2 | IRQ_MASK_IRQ1 | IRQ_MASK_TIMER;

pub const STACK_PAGE: u16 = 0x0100;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, bincode::Encode, bincode::Decode)]
pub enum LineState {
    #[default]
    Clear,
    Asserted,
}

impl LineState {
    pub fn is_asserted(self) -> bool {
        matches!(self, LineState::Asserted)
    }
}

impl From<bool> for LineState {
    fn from(asserted: bool) -> Self {
        if asserted {
            LineState::Asserted
        } else {
            LineState::Clear
        }
    }
}

/// Interrupt inputs. The three maskable sources are listed in service
/// priority order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IrqLine {
    Timer,
    Irq1,
    Irq2,
    Nmi,
}

impl IrqLine {
    pub const MASKABLE: [IrqLine; 3] = [IrqLine::Timer, IrqLine::Irq1, IrqLine::Irq2];

    /// Bit in the interrupt mask / status registers.
    pub fn mask_bit(self) -> u8 {
        match self {
            IrqLine::Timer => IRQ_MASK_TIMER,
            IrqLine::Irq1 => IRQ_MASK_IRQ1,
            IrqLine::Irq2 => IRQ_MASK_IRQ2,
            IrqLine::Nmi => 0,
        }
    }

    pub(crate) fn state_index(self) -> Option<usize> {
        match self {
            IrqLine::Irq1 => Some(0),
            IrqLine::Irq2 => Some(1),
            IrqLine::Timer => Some(2),
            IrqLine::Nmi => None,
        }
    }
}

/// Complete HuC6280 register file, including interrupt controller and
/// timer state. This is what `get_context`/`set_context` move around.
#[derive(Clone, Debug, PartialEq, Eq, bincode::Encode, bincode::Decode)]
pub struct Context {
    /// PC of the instruction most recently started.
    pub ppc: u16,
    pub pc: u16,
    pub sp: u8,
    pub a: u8,
    pub x: u8,
    pub y: u8,
    pub p: u8,
    pub mmr: [u8; NUM_BANKS],
    pub irq_mask: u8,
    /// Line levels for IRQ1, IRQ2 and the timer, in that order.
    pub irq_state: [LineState; 3],
    pub nmi_state: LineState,
    /// Set on a clear-to-asserted NMI edge, consumed on entry.
    pub nmi_pending: bool,
    pub timer: Timer,
    pub io_buffer: u8,
    /// Interrupt-entry cycles owed by the next `execute` call.
    pub extra_cycles: i32,
}

impl Default for Context {
    fn default() -> Self {
        Self {
            ppc: 0,
            pc: 0,
            sp: 0xFF,
            a: 0,
            x: 0,
            y: 0,
            p: FLAG_INTERRUPT_DISABLE | FLAG_BREAK,
            mmr: [0; NUM_BANKS],
            irq_mask: 0,
            irq_state: [LineState::Clear; 3],
            nmi_state: LineState::Clear,
            nmi_pending: false,
            timer: Timer::new(),
            io_buffer: 0,
            extra_cycles: 0,
        }
    }
}

impl Context {
    #[inline]
    pub fn flag(&self, flag: u8) -> bool {
        self.p & flag != 0
    }

    #[inline]
    pub fn set_flag(&mut self, flag: u8, value: bool) {
        if value {
            self.p |= flag;
        } else {
            self.p &= !flag;
        }
    }

    #[inline]
    pub fn translate(&self, logical: u16) -> u32 {
        translate(&self.mmr, logical)
    }

    pub fn line_state(&self, line: IrqLine) -> LineState {
        match line.state_index() {
            Some(index) => self.irq_state[index],
            None => self.nmi_state,
        }
    }

    pub fn set_line_state(&mut self, line: IrqLine, state: LineState) {
        match line.state_index() {
            Some(index) => self.irq_state[index] = state,
            None => self.nmi_state = state,
        }
    }
}

/// Symbolic register identifiers for debuggers, save-state tooling and
/// machine glue.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RegisterId {
    Pc,
    PrevPc,
    Sp,
    P,
    A,
    X,
    Y,
    IrqMask,
    TimerState,
    NmiState,
    Irq1State,
    Irq2State,
    TimerIrqState,
    /// Mapper register 0-7. Only reachable with the debug flag on.
    Mpr(u8),
}

impl RegisterId {
    pub const ALL: [RegisterId; 13] = [
        RegisterId::Pc,
        RegisterId::PrevPc,
        RegisterId::Sp,
        RegisterId::P,
        RegisterId::A,
        RegisterId::X,
        RegisterId::Y,
        RegisterId::IrqMask,
        RegisterId::TimerState,
        RegisterId::NmiState,
        RegisterId::Irq1State,
        RegisterId::Irq2State,
        RegisterId::TimerIrqState,
    ];

    pub fn name(self) -> String {
        match self {
            RegisterId::Pc => "PC".into(),
            RegisterId::PrevPc => "PPC".into(),
            RegisterId::Sp => "S".into(),
            RegisterId::P => "P".into(),
            RegisterId::A => "A".into(),
            RegisterId::X => "X".into(),
            RegisterId::Y => "Y".into(),
            RegisterId::IrqMask => "IM".into(),
            RegisterId::TimerState => "TMR".into(),
            RegisterId::NmiState => "NMI".into(),
            RegisterId::Irq1State => "IRQ1".into(),
            RegisterId::Irq2State => "IRQ2".into(),
            RegisterId::TimerIrqState => "IRQT".into(),
            RegisterId::Mpr(index) => format!("M{}", index as u16 + 1),
        }
    }
}
