use fxhash::FxBuildHasher;
use indexmap::IndexMap;

use crate::{
    error::{AsmError, ErrorKind},
    isa::MAX_ADDR,
    lexer::Line,
};

// Symbol -> address, in declaration order
type FxMap<K, V> = IndexMap<K, V, FxBuildHasher>;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SymbolKind {
    /// Address of the instruction on the same line
    Label,
    /// Word allocated from the top of memory
    Variable,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Symbol {
    /// Resolved address. Not bounds-checked until the symbol is used as an operand.
    pub addr: i32,
    pub kind: SymbolKind,
    /// Zero-based line of the declaration
    pub line: usize,
}

/// Labels and variables resolved by the first pass, in declaration order.
#[derive(Clone, Debug)]
pub struct SymbolTable {
    table: FxMap<String, Symbol>,
    /// Instruction words counted by the first pass
    instructions: usize,
    /// Next address a variable would be given
    next_variable: i32,
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable {
            table: IndexMap::with_hasher(FxBuildHasher::default()),
            instructions: 0,
            next_variable: MAX_ADDR as i32,
        }
    }

    /// First pass: assign an address to every label and variable.
    ///
    /// Instruction labels count up from 0, one word per instruction line. Variables count down
    /// from the top of memory.
    pub(crate) fn build(lines: &[Line<'_>]) -> Result<Self, AsmError> {
        let mut symbols = SymbolTable::new();
        for line in lines {
            if let Some(label) = line.label {
                let addr = if line.is_variable() {
                    let addr = symbols.next_variable;
                    symbols.next_variable -= 1;
                    addr
                } else {
                    symbols.instructions as i32
                };
                let kind = if line.is_variable() {
                    SymbolKind::Variable
                } else {
                    SymbolKind::Label
                };
                symbols
                    .declare(label.text, Symbol { addr, kind, line: line.index })
                    .map_err(|kind| AsmError::new(kind, line.index, label.span))?;
            }
            if line.body.is_some() {
                symbols.instructions += 1;
            }
        }
        Ok(symbols)
    }

    fn declare(&mut self, name: &str, symbol: Symbol) -> Result<(), ErrorKind> {
        if self.table.contains_key(name) {
            return Err(ErrorKind::DuplicateLabel(name.to_string()));
        }
        self.table.insert(name.to_string(), symbol);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Symbol> {
        self.table.get(name)
    }

    pub fn addr(&self, name: &str) -> Option<i32> {
        self.get(name).map(|symbol| symbol.addr)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Symbol)> {
        self.table.iter().map(|(name, symbol)| (name.as_str(), symbol))
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Amount of instruction words in the program.
    pub fn instructions(&self) -> usize {
        self.instructions
    }

    /// Lowest address handed out to a variable, if any were declared.
    pub fn first_variable(&self) -> Option<i32> {
        (self.next_variable < MAX_ADDR as i32).then_some(self.next_variable + 1)
    }

    /// Whether instruction words would be placed on top of variables, or past the end of memory.
    pub fn overlaps(&self) -> bool {
        self.instructions as i64 > self.next_variable as i64 + 1
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer;

    fn build(src: &str) -> Result<SymbolTable, AsmError> {
        let lines: Vec<_> = lexer::lines(src).collect();
        SymbolTable::build(&lines)
    }

    #[test]
    fn labels_count_instructions() {
        let symbols = build("start: LOCO 1\n/ comment\n\nSTOD x\nloop: JUMP loop\nx:\n").unwrap();
        assert_eq!(symbols.addr("start"), Some(0));
        assert_eq!(symbols.addr("loop"), Some(2));
        assert_eq!(symbols.get("loop").unwrap().kind, SymbolKind::Label);
        assert_eq!(symbols.instructions(), 3);
    }

    #[test]
    fn variables_count_down_from_top() {
        let symbols = build("x:\nLODD x\ny:\nz:").unwrap();
        assert_eq!(symbols.addr("x"), Some(4095));
        assert_eq!(symbols.addr("y"), Some(4094));
        assert_eq!(symbols.addr("z"), Some(4093));
        assert_eq!(symbols.get("x").unwrap().kind, SymbolKind::Variable);
        assert_eq!(symbols.first_variable(), Some(4093));
        // Variables do not take instruction slots
        assert_eq!(symbols.instructions(), 1);
    }

    #[test]
    fn declaration_order_is_kept() {
        let symbols = build("b:\na: PUSH\nc:").unwrap();
        let names: Vec<_> = symbols.iter().map(|(name, _)| name).collect();
        assert_eq!(names, ["b", "a", "c"]);
    }

    #[test]
    fn duplicate_label() {
        for src in ["a: PUSH\na: POP", "a:\na:", "a:\nPUSH\na: POP"] {
            let err = build(src).unwrap_err();
            assert_eq!(err.kind, ErrorKind::DuplicateLabel("a".into()));
        }
        let err = build("x:\nPUSH\n\nx: POP").unwrap_err();
        assert_eq!(err.line, 3);
    }

    #[test]
    fn fresh_table_per_build() {
        build("a: PUSH").unwrap();
        assert!(build("a: PUSH").is_ok());
    }

    #[test]
    fn overlap_detection() {
        assert!(!build("PUSH\nx:").unwrap().overlaps());
        assert_eq!(build("PUSH").unwrap().first_variable(), None);

        let mut src = String::new();
        for _ in 0..4095 {
            src.push_str("PUSH\n");
        }
        src.push_str("x:\n");
        assert!(!build(&src).unwrap().overlaps());
        src.push_str("y:\n");
        assert!(build(&src).unwrap().overlaps());
    }
}
