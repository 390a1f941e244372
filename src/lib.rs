pub mod bus;
pub mod cpu;
pub mod disasm;
pub mod error;
pub mod machine;

pub use crate::bus::{Bus, MemoryMap};
pub use crate::cpu::{Context, Cpu, CpuConfig, IrqLine, LineState, RegisterId};
pub use crate::error::{Error, Result};
