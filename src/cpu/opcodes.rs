/// Operand addressing modes of the HuC6280 instruction set.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AddressingMode {
    Implied,
    Accumulator,
    Immediate,
    ZeroPage,
    ZeroPageX,
    ZeroPageY,
    Absolute,
    AbsoluteX,
    AbsoluteY,
    /// `JMP ($nnnn)`
    AbsoluteIndirect,
    /// `JMP ($nnnn,X)`
    AbsoluteIndexedIndirect,
    /// `($zz)`
    ZeroPageIndirect,
    /// `($zz,X)`
    ZeroPageIndexedIndirect,
    /// `($zz),Y`
    ZeroPageIndirectIndexed,
    Relative,
    /// BBR/BBS: zero-page operand followed by a branch offset.
    ZeroPageRelative,
    /// TST forms: immediate mask followed by the tested operand.
    ImmediateZeroPage,
    ImmediateZeroPageX,
    ImmediateAbsolute,
    ImmediateAbsoluteX,
    /// Source, destination and length words.
    BlockTransfer,
}

impl AddressingMode {
    /// Instruction length in bytes, opcode included.
    pub fn instruction_len(self) -> u8 {
        use AddressingMode::*;
        match self {
            Implied | Accumulator => 1,
            Immediate | ZeroPage | ZeroPageX | ZeroPageY | ZeroPageIndirect
            | ZeroPageIndexedIndirect | ZeroPageIndirectIndexed | Relative => 2,
            Absolute | AbsoluteX | AbsoluteY | AbsoluteIndirect | AbsoluteIndexedIndirect
            | ZeroPageRelative | ImmediateZeroPage | ImmediateZeroPageX => 3,
            ImmediateAbsolute | ImmediateAbsoluteX => 4,
            BlockTransfer => 7,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OpcodeInfo {
    pub mnemonic: &'static str,
    pub mode: AddressingMode,
    /// Base cost. Taken branches add 2, block transfers add 6 per byte.
    pub cycles: u8,
    /// Not part of the documented instruction matrix; executes as a NOP.
    pub illegal: bool,
}

impl OpcodeInfo {
    pub fn size(&self) -> u8 {
        self.mode.instruction_len()
    }
}

const fn op(mnemonic: &'static str, mode: AddressingMode, cycles: u8) -> OpcodeInfo {
    OpcodeInfo {
        mnemonic,
        mode,
        cycles,
        illegal: false,
    }
}

/// Undefined opcodes behave as 2-cycle, single-byte no-ops.
const ILLEGAL: OpcodeInfo = OpcodeInfo {
    mnemonic: "???",
    mode: AddressingMode::Implied,
    cycles: 2,
    illegal: true,
};

#[inline]
pub fn opcode_info(opcode: u8) -> &'static OpcodeInfo {
    &OPCODE_TABLE[opcode as usize]
}

use AddressingMode::*;

/// HuC6280 cycle-accurate opcode matrix.
///
/// Key differences from 65C02 timing:
///   - ZP read/write: 4, absolute read/write: 5
///   - (zp), (zp,X), (zp),Y: 7
///   - JSR/RTS/RTI: 7, BRK: 8, BSR: 8
///   - No page-crossing penalties
pub static OPCODE_TABLE: [OpcodeInfo; 256] = [
    // $00-$0F
    op("BRK", Implied, 8),
    op("ORA", ZeroPageIndexedIndirect, 7),
    op("SXY", Implied, 3),
    op("ST0", Immediate, 5),
    op("TSB", ZeroPage, 6),
    op("ORA", ZeroPage, 4),
    op("ASL", ZeroPage, 6),
    op("RMB0", ZeroPage, 7),
    op("PHP", Implied, 3),
    op("ORA", Immediate, 2),
    op("ASL", Accumulator, 2),
    ILLEGAL,
    op("TSB", Absolute, 6),
    op("ORA", Absolute, 5),
    op("ASL", Absolute, 6),
    op("BBR0", ZeroPageRelative, 6),
    // $10-$1F
    op("BPL", Relative, 2),
    op("ORA", ZeroPageIndirectIndexed, 7),
    op("ORA", ZeroPageIndirect, 7),
    op("ST1", Immediate, 5),
    op("TRB", ZeroPage, 6),
    op("ORA", ZeroPageX, 4),
    op("ASL", ZeroPageX, 6),
    op("RMB1", ZeroPage, 7),
    op("CLC", Implied, 2),
    op("ORA", AbsoluteY, 5),
    op("INC", Accumulator, 2),
    ILLEGAL,
    op("TRB", Absolute, 6),
    op("ORA", AbsoluteX, 5),
    op("ASL", AbsoluteX, 7),
    op("BBR1", ZeroPageRelative, 6),
    // $20-$2F
    op("JSR", Absolute, 7),
    op("AND", ZeroPageIndexedIndirect, 7),
    op("SAX", Implied, 3),
    op("ST2", Immediate, 5),
    op("BIT", ZeroPage, 4),
    op("AND", ZeroPage, 4),
    op("ROL", ZeroPage, 6),
    op("RMB2", ZeroPage, 7),
    op("PLP", Implied, 4),
    op("AND", Immediate, 2),
    op("ROL", Accumulator, 2),
    ILLEGAL,
    op("BIT", Absolute, 5),
    op("AND", Absolute, 5),
    op("ROL", Absolute, 6),
    op("BBR2", ZeroPageRelative, 6),
    // $30-$3F
    op("BMI", Relative, 2),
    op("AND", ZeroPageIndirectIndexed, 7),
    op("AND", ZeroPageIndirect, 7),
    ILLEGAL,
    op("BIT", ZeroPageX, 4),
    op("AND", ZeroPageX, 4),
    op("ROL", ZeroPageX, 6),
    op("RMB3", ZeroPage, 7),
    op("SEC", Implied, 2),
    op("AND", AbsoluteY, 5),
    op("DEC", Accumulator, 2),
    ILLEGAL,
    op("BIT", AbsoluteX, 5),
    op("AND", AbsoluteX, 5),
    op("ROL", AbsoluteX, 7),
    op("BBR3", ZeroPageRelative, 6),
    // $40-$4F
    op("RTI", Implied, 7),
    op("EOR", ZeroPageIndexedIndirect, 7),
    op("SAY", Implied, 3),
    op("TMA", Immediate, 4),
    op("BSR", Relative, 8),
    op("EOR", ZeroPage, 4),
    op("LSR", ZeroPage, 6),
    op("RMB4", ZeroPage, 7),
    op("PHA", Implied, 3),
    op("EOR", Immediate, 2),
    op("LSR", Accumulator, 2),
    ILLEGAL,
    op("JMP", Absolute, 4),
    op("EOR", Absolute, 5),
    op("LSR", Absolute, 6),
    op("BBR4", ZeroPageRelative, 6),
    // $50-$5F
    op("BVC", Relative, 2),
    op("EOR", ZeroPageIndirectIndexed, 7),
    op("EOR", ZeroPageIndirect, 7),
    op("TAM", Immediate, 5),
    op("CSL", Implied, 3),
    op("EOR", ZeroPageX, 4),
    op("LSR", ZeroPageX, 6),
    op("RMB5", ZeroPage, 7),
    op("CLI", Implied, 2),
    op("EOR", AbsoluteY, 5),
    op("PHY", Implied, 3),
    ILLEGAL,
    ILLEGAL,
    op("EOR", AbsoluteX, 5),
    op("LSR", AbsoluteX, 7),
    op("BBR5", ZeroPageRelative, 6),
    // $60-$6F
    op("RTS", Implied, 7),
    op("ADC", ZeroPageIndexedIndirect, 7),
    op("CLA", Implied, 2),
    ILLEGAL,
    op("STZ", ZeroPage, 4),
    op("ADC", ZeroPage, 4),
    op("ROR", ZeroPage, 6),
    op("RMB6", ZeroPage, 7),
    op("PLA", Implied, 4),
    op("ADC", Immediate, 2),
    op("ROR", Accumulator, 2),
    ILLEGAL,
    op("JMP", AbsoluteIndirect, 7),
    op("ADC", Absolute, 5),
    op("ROR", Absolute, 6),
    op("BBR6", ZeroPageRelative, 6),
    // $70-$7F
    op("BVS", Relative, 2),
    op("ADC", ZeroPageIndirectIndexed, 7),
    op("ADC", ZeroPageIndirect, 7),
    op("TII", BlockTransfer, 17),
    op("STZ", ZeroPageX, 4),
    op("ADC", ZeroPageX, 4),
    op("ROR", ZeroPageX, 6),
    op("RMB7", ZeroPage, 7),
    op("SEI", Implied, 2),
    op("ADC", AbsoluteY, 5),
    op("PLY", Implied, 4),
    ILLEGAL,
    op("JMP", AbsoluteIndexedIndirect, 7),
    op("ADC", AbsoluteX, 5),
    op("ROR", AbsoluteX, 7),
    op("BBR7", ZeroPageRelative, 6),
    // $80-$8F
    op("BRA", Relative, 2),
    op("STA", ZeroPageIndexedIndirect, 7),
    op("CLX", Implied, 2),
    op("TST", ImmediateZeroPage, 8),
    op("STY", ZeroPage, 4),
    op("STA", ZeroPage, 4),
    op("STX", ZeroPage, 4),
    op("SMB0", ZeroPage, 7),
    op("DEY", Implied, 2),
    op("BIT", Immediate, 2),
    op("TXA", Implied, 2),
    ILLEGAL,
    op("STY", Absolute, 5),
    op("STA", Absolute, 5),
    op("STX", Absolute, 5),
    op("BBS0", ZeroPageRelative, 6),
    // $90-$9F
    op("BCC", Relative, 2),
    op("STA", ZeroPageIndirectIndexed, 7),
    op("STA", ZeroPageIndirect, 7),
    op("TST", ImmediateAbsolute, 8),
    op("STY", ZeroPageX, 4),
    op("STA", ZeroPageX, 4),
    op("STX", ZeroPageY, 4),
    op("SMB1", ZeroPage, 7),
    op("TYA", Implied, 2),
    op("STA", AbsoluteY, 5),
    op("TXS", Implied, 2),
    ILLEGAL,
    op("STZ", Absolute, 5),
    op("STA", AbsoluteX, 5),
    op("STZ", AbsoluteX, 5),
    op("BBS1", ZeroPageRelative, 6),
    // $A0-$AF
    op("LDY", Immediate, 2),
    op("LDA", ZeroPageIndexedIndirect, 7),
    op("LDX", Immediate, 2),
    op("TST", ImmediateZeroPageX, 8),
    op("LDY", ZeroPage, 4),
    op("LDA", ZeroPage, 4),
    op("LDX", ZeroPage, 4),
    op("SMB2", ZeroPage, 7),
    op("TAY", Implied, 2),
    op("LDA", Immediate, 2),
    op("TAX", Implied, 2),
    ILLEGAL,
    op("LDY", Absolute, 5),
    op("LDA", Absolute, 5),
    op("LDX", Absolute, 5),
    op("BBS2", ZeroPageRelative, 6),
    // $B0-$BF
    op("BCS", Relative, 2),
    op("LDA", ZeroPageIndirectIndexed, 7),
    op("LDA", ZeroPageIndirect, 7),
    op("TST", ImmediateAbsoluteX, 8),
    op("LDY", ZeroPageX, 4),
    op("LDA", ZeroPageX, 4),
    op("LDX", ZeroPageY, 4),
    op("SMB3", ZeroPage, 7),
    op("CLV", Implied, 2),
    op("LDA", AbsoluteY, 5),
    op("TSX", Implied, 2),
    ILLEGAL,
    op("LDY", AbsoluteX, 5),
    op("LDA", AbsoluteX, 5),
    op("LDX", AbsoluteY, 5),
    op("BBS3", ZeroPageRelative, 6),
    // $C0-$CF
    op("CPY", Immediate, 2),
    op("CMP", ZeroPageIndexedIndirect, 7),
    op("CLY", Implied, 2),
    op("TDD", BlockTransfer, 17),
    op("CPY", ZeroPage, 4),
    op("CMP", ZeroPage, 4),
    op("DEC", ZeroPage, 6),
    op("SMB4", ZeroPage, 7),
    op("INY", Implied, 2),
    op("CMP", Immediate, 2),
    op("DEX", Implied, 2),
    ILLEGAL,
    op("CPY", Absolute, 5),
    op("CMP", Absolute, 5),
    op("DEC", Absolute, 6),
    op("BBS4", ZeroPageRelative, 6),
    // $D0-$DF
    op("BNE", Relative, 2),
    op("CMP", ZeroPageIndirectIndexed, 7),
    op("CMP", ZeroPageIndirect, 7),
    op("TIN", BlockTransfer, 17),
    op("CSH", Implied, 3),
    op("CMP", ZeroPageX, 4),
    op("DEC", ZeroPageX, 6),
    op("SMB5", ZeroPage, 7),
    op("CLD", Implied, 2),
    op("CMP", AbsoluteY, 5),
    op("PHX", Implied, 3),
    ILLEGAL,
    ILLEGAL,
    op("CMP", AbsoluteX, 5),
    op("DEC", AbsoluteX, 7),
    op("BBS5", ZeroPageRelative, 6),
    // $E0-$EF
    op("CPX", Immediate, 2),
    op("SBC", ZeroPageIndexedIndirect, 7),
    ILLEGAL,
    op("TIA", BlockTransfer, 17),
    op("CPX", ZeroPage, 4),
    op("SBC", ZeroPage, 4),
    op("INC", ZeroPage, 6),
    op("SMB6", ZeroPage, 7),
    op("INX", Implied, 2),
    op("SBC", Immediate, 2),
    op("NOP", Implied, 2),
    ILLEGAL,
    op("CPX", Absolute, 5),
    op("SBC", Absolute, 5),
    op("INC", Absolute, 6),
    op("BBS6", ZeroPageRelative, 6),
    // $F0-$FF
    op("BEQ", Relative, 2),
    op("SBC", ZeroPageIndirectIndexed, 7),
    op("SBC", ZeroPageIndirect, 7),
    op("TAI", BlockTransfer, 17),
    op("SET", Implied, 2),
    op("SBC", ZeroPageX, 4),
    op("INC", ZeroPageX, 6),
    op("SMB7", ZeroPage, 7),
    op("SED", Implied, 2),
    op("SBC", AbsoluteY, 5),
    op("PLX", Implied, 4),
    ILLEGAL,
    ILLEGAL,
    op("SBC", AbsoluteX, 5),
    op("INC", AbsoluteX, 7),
    op("BBS7", ZeroPageRelative, 6),
];
