use std::fmt;

use crate::isa::{self, OperandClass, DESP_PREFIX, INSP_PREFIX, LOCO_OPCODE};

/// Display representations of one memory word.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Decoded {
    /// Full word in two's complement, 16 digits
    pub binary: String,
    /// Operand value, signed only for `LOCO`
    pub decimal: String,
    /// Operand as 4 uppercase hex digits
    pub hex: String,
}

/// Decode a raw memory word into its binary, decimal and hex columns.
pub fn decode(word: i16) -> Decoded {
    let (decimal, hex) = operand(word);
    Decoded {
        binary: format!("{:016b}", word as u16),
        decimal: decimal.to_string(),
        hex: format!("{hex:04X}"),
    }
}

/// Operand of `word` as `(decimal, hex)`.
///
/// The 12-bit operand is sign-extended for `LOCO` only, every other 12-bit operand is an address.
pub fn operand(word: i16) -> (i32, u16) {
    let word = word as u16;
    let top4 = word >> 12;
    let top8 = word >> 8;

    if top4 <= 0b1110 {
        let operand12 = word & 0x0FFF;
        let decimal = if top4 == LOCO_OPCODE {
            sign_extend12(operand12)
        } else {
            operand12 as i32
        };
        (decimal, operand12)
    } else if top8 == INSP_PREFIX || top8 == DESP_PREFIX {
        let operand8 = word & 0x00FF;
        (operand8 as i32, operand8)
    } else {
        (0, 0)
    }
}

fn sign_extend12(value: u16) -> i32 {
    if value & 0x0800 != 0 {
        value as i32 - 0x1000
    } else {
        value as i32
    }
}

/// Render `word` back to assembly, `???` if it is not a valid instruction.
pub fn disassemble(word: i16) -> String {
    let Some(instr) = isa::identify(word as u16) else {
        return "???".to_string();
    };
    match instr.class {
        OperandClass::None => instr.mnemonic.to_string(),
        OperandClass::Unsigned8 | OperandClass::Operand12 => {
            let (decimal, _) = operand(word);
            format!("{} {}", instr.mnemonic, decimal)
        }
    }
}

/// Decoded word at a specific memory address, as shown in the memory table.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct DecodedView {
    pub address: u16,
    pub decoded: Decoded,
}

impl DecodedView {
    pub fn new(address: u16, word: i16) -> Self {
        DecodedView {
            address,
            decoded: decode(word),
        }
    }

    /// Address as 4 decimal digits.
    pub fn address(&self) -> String {
        format!("{:04}", self.address)
    }

    pub fn binary(&self) -> &str {
        &self.decoded.binary
    }

    pub fn decimal(&self) -> &str {
        &self.decoded.decimal
    }

    pub fn hex(&self) -> &str {
        &self.decoded.hex
    }
}

impl fmt::Display for DecodedView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {:>6} {}",
            self.address(),
            self.binary(),
            self.decimal(),
            self.hex()
        )
    }
}
