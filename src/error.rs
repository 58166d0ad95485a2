use std::fmt::Display;

use miette::{Diagnostic, LabeledSpan};
use thiserror::Error;

use crate::span::Span;

/// Marker that starts every assembler error report.
pub const ERROR_MARKER: &str = "ERROR";

/// Everything that can go wrong while assembling.
#[derive(Error, Clone, PartialEq, Eq, Debug)]
pub enum ErrorKind {
    #[error("duplicate label `{0}`")]
    DuplicateLabel(String),
    #[error("unknown mnemonic `{0}`")]
    UnknownMnemonic(String),
    #[error("mnemonic `{0}` requires an operand")]
    MissingOperand(String),
    #[error("operand `{0}` is not a valid integer")]
    InvalidOperand(String),
    #[error("symbol `{0}` is not defined")]
    UndefinedSymbol(String),
    #[error("operand `{operand}` ({value}) is out of range (0-{max})")]
    OperandOutOfRange {
        operand: String,
        value: i64,
        max: i64,
    },
    #[error("program of {instructions} words runs into the variable region starting at {first_variable}")]
    AddressSpaceOverflow {
        instructions: usize,
        first_variable: i32,
    },
}

impl ErrorKind {
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::DuplicateLabel(_) => "asm::duplicate_label",
            ErrorKind::UnknownMnemonic(_) => "asm::unknown_mnemonic",
            ErrorKind::MissingOperand(_) => "asm::missing_operand",
            ErrorKind::InvalidOperand(_) => "asm::invalid_operand",
            ErrorKind::UndefinedSymbol(_) => "asm::undefined_symbol",
            ErrorKind::OperandOutOfRange { .. } => "asm::operand_range",
            ErrorKind::AddressSpaceOverflow { .. } => "asm::address_space",
        }
    }

    pub fn help(&self) -> &'static str {
        match self {
            ErrorKind::DuplicateLabel(_) => "labels and variables may only be declared once",
            ErrorKind::UnknownMnemonic(_) => {
                "valid mnemonics are LODD STOD ADDD SUBD JPOS JZER JUMP LOCO LODL STOL ADDL SUBL \
                 JNEG JNZE CALL PSHI POPI PUSH POP RETN SWAP INSP DESP"
            }
            ErrorKind::MissingOperand(_) => "add a label or value after the mnemonic",
            ErrorKind::InvalidOperand(_) => "LOCO, INSP and DESP take a decimal literal like 42",
            ErrorKind::UndefinedSymbol(_) => {
                "declare the label on an instruction, or alone on a line to make a variable"
            }
            ErrorKind::OperandOutOfRange { .. } => {
                "INSP and DESP take 0 to 255, addresses range from 0 to 4095"
            }
            ErrorKind::AddressSpaceOverflow { .. } => {
                "shorten the program or declare fewer variables"
            }
        }
    }

    fn label(&self) -> &'static str {
        match self {
            ErrorKind::DuplicateLabel(_) => "declared again here",
            ErrorKind::UnknownMnemonic(_) => "unknown mnemonic",
            ErrorKind::MissingOperand(_) => "missing operand",
            ErrorKind::InvalidOperand(_) => "not an integer",
            ErrorKind::UndefinedSymbol(_) => "undefined symbol",
            ErrorKind::OperandOutOfRange { .. } => "out of range",
            ErrorKind::AddressSpaceOverflow { .. } => "overlaps variables",
        }
    }
}

/// Assembly failure, pointing at the offending source line.
#[derive(Error, Clone, PartialEq, Eq, Debug)]
#[error("{kind} on line {}", .line + 1)]
pub struct AsmError {
    pub kind: ErrorKind,
    /// Zero-based source line
    pub line: usize,
    pub span: Span,
}

impl AsmError {
    pub fn new(kind: ErrorKind, line: usize, span: Span) -> Self {
        AsmError { kind, line, span }
    }

    /// Text that replaces the whole listing when assembly fails.
    pub fn report(&self) -> String {
        format!("{ERROR_MARKER} IN ASSEMBLY:\n{self}\n\n(Check your code and try again)")
    }
}

impl Diagnostic for AsmError {
    fn code<'a>(&'a self) -> Option<Box<dyn Display + 'a>> {
        Some(Box::new(self.kind.code()))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn Display + 'a>> {
        Some(Box::new(self.kind.help()))
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        Some(Box::new(std::iter::once(LabeledSpan::at(
            self.span,
            self.kind.label(),
        ))))
    }
}

/// Main memory access failures.
#[derive(Error, Diagnostic, Clone, Copy, PartialEq, Eq, Debug)]
pub enum MemoryError {
    #[error("memory address {0} is out of range (0-4095)")]
    #[diagnostic(
        code(memory::address),
        help("main memory holds 4096 words, addressed from 0 to 4095")
    )]
    AddressOutOfRange(i32),
    #[error("main memory is not linked")]
    #[diagnostic(
        code(memory::not_linked),
        help("attach a memory store with `link_memory` before writing the program")
    )]
    NotLinked,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::Idx;

    #[test]
    fn display_uses_one_based_lines() {
        let err = AsmError::new(
            ErrorKind::UndefinedSymbol("x".into()),
            4,
            Span::new(Idx(10), 1),
        );
        assert_eq!(err.to_string(), "symbol `x` is not defined on line 5");
        assert!(err.report().starts_with(ERROR_MARKER));
        assert_eq!(
            err.code().map(|code| code.to_string()),
            Some("asm::undefined_symbol".to_string())
        );
    }

    #[test]
    fn memory_error_messages() {
        assert_eq!(
            MemoryError::AddressOutOfRange(4096).to_string(),
            "memory address 4096 is out of range (0-4095)"
        );
        assert_eq!(MemoryError::NotLinked.to_string(), "main memory is not linked");
    }
}
