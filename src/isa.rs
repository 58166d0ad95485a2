use std::fmt;

use fxhash::FxBuildHasher;
use indexmap::IndexMap;
use lazy_static::lazy_static;

/// Number of addressable words in main memory (2^12).
pub const MEMORY_SIZE: usize = 4096;

/// Highest valid memory address.
pub const MAX_ADDR: u16 = (MEMORY_SIZE - 1) as u16;

/// Top nibble of `LOCO`, the only instruction with a signed 12-bit operand.
pub const LOCO_OPCODE: u16 = 0b0111;

/// Top byte of `INSP`.
pub const INSP_PREFIX: u16 = 0b1111_1100;
/// Top byte of `DESP`.
pub const DESP_PREFIX: u16 = 0b1111_1110;

/// Shape of the variable part of an instruction word.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum OperandClass {
    /// Whole word is a fixed pattern.
    None,
    /// 8-bit prefix, 8-bit unsigned operand.
    Unsigned8,
    /// 4-bit opcode, 12-bit address or (for `LOCO`) signed constant.
    Operand12,
}

impl OperandClass {
    /// Amount of bits taken up by the opcode.
    pub fn opcode_width(self) -> u32 {
        match self {
            OperandClass::None => 16,
            OperandClass::Unsigned8 => 8,
            OperandClass::Operand12 => 4,
        }
    }

    /// Amount of bits taken up by the operand.
    pub fn operand_width(self) -> u32 {
        16 - self.opcode_width()
    }
}

/// Single entry of the MAC-1 instruction set.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Instruction {
    pub mnemonic: &'static str,
    /// Full instruction word with the operand bits cleared.
    pub opcode: u16,
    pub class: OperandClass,
}

impl Instruction {
    const fn new(mnemonic: &'static str, opcode: u16, class: OperandClass) -> Self {
        Instruction {
            mnemonic,
            opcode,
            class,
        }
    }

    /// Opcode as a bit string of length 4, 8 or 16.
    pub fn opcode_bits(&self) -> String {
        let width = self.class.opcode_width();
        let prefix = self.opcode >> (16 - width);
        format!("{prefix:0width$b}", width = width as usize)
    }

    /// Mask selecting the operand bits of a word.
    pub fn operand_mask(&self) -> u16 {
        match self.class {
            OperandClass::None => 0,
            class => (1u16 << class.operand_width()) - 1,
        }
    }

    /// Whether `word` was produced by this instruction.
    pub fn matches(&self, word: u16) -> bool {
        word & !self.operand_mask() == self.opcode
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.mnemonic)
    }
}

/// The complete MAC-1 instruction set, in opcode order.
#[rustfmt::skip]
pub static INSTRUCTIONS: [Instruction; 23] = [
    Instruction::new("LODD", 0b0000 << 12, OperandClass::Operand12),
    Instruction::new("STOD", 0b0001 << 12, OperandClass::Operand12),
    Instruction::new("ADDD", 0b0010 << 12, OperandClass::Operand12),
    Instruction::new("SUBD", 0b0011 << 12, OperandClass::Operand12),
    Instruction::new("JPOS", 0b0100 << 12, OperandClass::Operand12),
    Instruction::new("JZER", 0b0101 << 12, OperandClass::Operand12),
    Instruction::new("JUMP", 0b0110 << 12, OperandClass::Operand12),
    Instruction::new("LOCO", LOCO_OPCODE << 12, OperandClass::Operand12),
    Instruction::new("LODL", 0b1000 << 12, OperandClass::Operand12),
    Instruction::new("STOL", 0b1001 << 12, OperandClass::Operand12),
    Instruction::new("ADDL", 0b1010 << 12, OperandClass::Operand12),
    Instruction::new("SUBL", 0b1011 << 12, OperandClass::Operand12),
    Instruction::new("JNEG", 0b1100 << 12, OperandClass::Operand12),
    Instruction::new("JNZE", 0b1101 << 12, OperandClass::Operand12),
    Instruction::new("CALL", 0b1110 << 12, OperandClass::Operand12),
    Instruction::new("PSHI", 0b1111_0000_0000_0000, OperandClass::None),
    Instruction::new("POPI", 0b1111_0010_0000_0000, OperandClass::None),
    Instruction::new("PUSH", 0b1111_0100_0000_0000, OperandClass::None),
    Instruction::new("POP",  0b1111_0110_0000_0000, OperandClass::None),
    Instruction::new("RETN", 0b1111_1000_0000_0000, OperandClass::None),
    Instruction::new("SWAP", 0b1111_1010_0000_0000, OperandClass::None),
    Instruction::new("INSP", INSP_PREFIX << 8, OperandClass::Unsigned8),
    Instruction::new("DESP", DESP_PREFIX << 8, OperandClass::Unsigned8),
];

type FxMap<K, V> = IndexMap<K, V, FxBuildHasher>;

lazy_static! {
    static ref BY_MNEMONIC: FxMap<&'static str, &'static Instruction> =
        INSTRUCTIONS.iter().map(|instr| (instr.mnemonic, instr)).collect();
}

/// Find an instruction by its (already upper-cased) mnemonic.
pub fn lookup(mnemonic: &str) -> Option<&'static Instruction> {
    BY_MNEMONIC.get(mnemonic).copied()
}

/// Find the instruction that encodes to `word`, if any.
pub fn identify(word: u16) -> Option<&'static Instruction> {
    INSTRUCTIONS.iter().find(|instr| instr.matches(word))
}
