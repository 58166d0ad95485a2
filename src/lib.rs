// Instruction set
pub mod isa;
pub use isa::{Instruction, OperandClass, MEMORY_SIZE};

// Assembling
mod lexer;
mod span;
pub use span::Span;
pub mod symbol;
pub use symbol::SymbolTable;
mod asm;
pub use asm::{assemble, assemble_with, AsmOptions, EncodedWord, Program};

// Memory and display
pub mod decode;
pub use decode::{decode, disassemble, Decoded, DecodedView};
mod memory;
pub use memory::Memory;
mod workbench;
pub use workbench::Workbench;

mod error;
pub use error::{AsmError, ErrorKind, MemoryError, ERROR_MARKER};

mod config;
pub use config::Config;

/// Amount of lines to show as context, each side of focus line (line containing span).
pub const DIAGNOSTIC_CONTEXT_LINES: usize = 2;
