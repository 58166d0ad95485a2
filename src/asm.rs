use std::fmt;

use crate::{
    error::{AsmError, ErrorKind},
    isa::{self, Instruction, OperandClass, LOCO_OPCODE, MAX_ADDR},
    lexer::{self, Line, Token, COMMENT},
    symbol::SymbolTable,
};

/// Assembler settings.
#[derive(Clone, Copy, Default, Debug)]
pub struct AsmOptions {
    /// Reject programs whose instructions run into the variable region.
    pub strict: bool,
}

/// One assembled instruction word along with what it was assembled from.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct EncodedWord {
    pub word: u16,
    pub mnemonic: &'static str,
    /// Operand as written, or as parsed for 8-bit operands
    pub operand: Option<String>,
    /// Address or constant the operand resolved to
    pub resolved: Option<i64>,
    /// Zero-based source line
    pub line: usize,
}

impl EncodedWord {
    /// The word as 16 binary digits.
    pub fn bits(&self) -> String {
        format!("{:016b}", self.word)
    }
}

/// Formats as a listing line: `<bits> / <MNEMONIC> [operand] [(resolved)]`.
impl fmt::Display for EncodedWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {COMMENT} {}", self.bits(), self.mnemonic)?;
        if let Some(operand) = &self.operand {
            write!(f, " {operand}")?;
        }
        if let Some(resolved) = self.resolved {
            write!(f, " ({resolved})")?;
        }
        Ok(())
    }
}

/// Output of a successful assembly.
#[derive(Clone, Debug)]
pub struct Program {
    words: Vec<EncodedWord>,
    symbols: SymbolTable,
}

impl Program {
    pub fn words(&self) -> &[EncodedWord] {
        &self.words
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Raw machine words in load order.
    pub fn machine_code(&self) -> impl Iterator<Item = u16> + '_ {
        self.words.iter().map(|word| word.word)
    }

    /// Listing text, one annotated word per line.
    pub fn listing(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for word in &self.words {
            writeln!(f, "{word}")?;
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a Program {
    type Item = &'a EncodedWord;
    type IntoIter = std::slice::Iter<'a, EncodedWord>;

    fn into_iter(self) -> Self::IntoIter {
        self.words.iter()
    }
}

/// Assemble `src` with default options.
pub fn assemble(src: &str) -> Result<Program, AsmError> {
    assemble_with(src, AsmOptions::default())
}

/// Two-pass assembly. The first error aborts the whole run.
pub fn assemble_with(src: &str, options: AsmOptions) -> Result<Program, AsmError> {
    let lines: Vec<Line> = lexer::lines(src).collect();
    let symbols = SymbolTable::build(&lines)?;
    if options.strict && symbols.overlaps() {
        return Err(overflow_error(&lines, &symbols));
    }

    let mut words = Vec::with_capacity(symbols.instructions());
    for line in &lines {
        if let Some((mnemonic, operand)) = line.instruction() {
            words.push(encode(line, mnemonic, operand, &symbols)?);
        }
    }
    Ok(Program { words, symbols })
}

fn overflow_error(lines: &[Line], symbols: &SymbolTable) -> AsmError {
    let first_variable = symbols.first_variable().unwrap_or(MAX_ADDR as i32 + 1);
    // First instruction placed at or beyond the variable region
    let line = lines
        .iter()
        .filter(|line| line.body.is_some())
        .nth(first_variable.max(0) as usize)
        .or(lines.last());
    let kind = ErrorKind::AddressSpaceOverflow {
        instructions: symbols.instructions(),
        first_variable,
    };
    match line {
        Some(line) => AsmError::new(kind, line.index, line.span()),
        None => AsmError::new(kind, 0, Default::default()),
    }
}

/// Second pass for a single instruction line.
fn encode<'a>(
    line: &Line,
    mnemonic: Token<'a>,
    operand: Option<Token<'a>>,
    symbols: &SymbolTable,
) -> Result<EncodedWord, AsmError> {
    let name = mnemonic.text.to_uppercase();
    let instr = isa::lookup(&name)
        .ok_or_else(|| AsmError::new(ErrorKind::UnknownMnemonic(name), line.index, mnemonic.span))?;

    let err_at = |kind: ErrorKind, tok: Option<Token<'a>>| {
        AsmError::new(kind, line.index, tok.map_or(mnemonic.span, |tok| tok.span))
    };
    let require = |operand: Option<Token<'a>>| -> Result<Token<'a>, AsmError> {
        operand.ok_or_else(|| err_at(ErrorKind::MissingOperand(instr.mnemonic.into()), None))
    };

    let word = EncodedWord {
        word: instr.opcode,
        mnemonic: instr.mnemonic,
        operand: None,
        resolved: None,
        line: line.index,
    };

    match instr.class {
        OperandClass::None => Ok(word),
        OperandClass::Unsigned8 => {
            let tok = require(operand)?;
            let value = parse_int(tok).map_err(|kind| err_at(kind, Some(tok)))?;
            if !(0..=u8::MAX as i64).contains(&value) {
                let kind = ErrorKind::OperandOutOfRange {
                    operand: tok.text.into(),
                    value,
                    max: u8::MAX as i64,
                };
                return Err(err_at(kind, Some(tok)));
            }
            Ok(EncodedWord {
                word: instr.opcode | value as u16,
                operand: Some(value.to_string()),
                ..word
            })
        }
        OperandClass::Operand12 => {
            let tok = require(operand)?;
            let value = if is_constant(instr) {
                parse_int(tok).map_err(|kind| err_at(kind, Some(tok)))?
            } else {
                resolve(tok, symbols).map_err(|kind| err_at(kind, Some(tok)))?
            };
            Ok(EncodedWord {
                word: instr.opcode | operand12(value),
                operand: Some(tok.text.into()),
                resolved: Some(value),
                ..word
            })
        }
    }
}

/// `LOCO` takes a signed literal, every other 12-bit operand is an address.
fn is_constant(instr: &Instruction) -> bool {
    instr.opcode >> 12 == LOCO_OPCODE
}

/// Low 12 bits of the two's complement of `value`. Out of range constants are truncated.
fn operand12(value: i64) -> u16 {
    (value & 0x0FFF) as u16
}

fn parse_int(tok: Token) -> Result<i64, ErrorKind> {
    tok.text
        .parse::<i64>()
        .map_err(|_| ErrorKind::InvalidOperand(tok.text.into()))
}

fn resolve(tok: Token, symbols: &SymbolTable) -> Result<i64, ErrorKind> {
    let addr = symbols
        .addr(tok.text)
        .ok_or_else(|| ErrorKind::UndefinedSymbol(tok.text.into()))?;
    if !(0..=MAX_ADDR as i32).contains(&addr) {
        return Err(ErrorKind::OperandOutOfRange {
            operand: tok.text.into(),
            value: addr as i64,
            max: MAX_ADDR as i64,
        });
    }
    Ok(addr as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(src: &str) -> Vec<String> {
        assemble(src)
            .unwrap()
            .words()
            .iter()
            .map(|word| word.to_string())
            .collect()
    }

    fn error(src: &str) -> ErrorKind {
        assemble(src).unwrap_err().kind
    }

    #[test]
    fn fixed_patterns() {
        assert_eq!(
            listing("PSHI\npopi\nPush\nPOP\nRETN\nSWAP"),
            [
                "1111000000000000 / PSHI",
                "1111001000000000 / POPI",
                "1111010000000000 / PUSH",
                "1111011000000000 / POP",
                "1111100000000000 / RETN",
                "1111101000000000 / SWAP",
            ]
        );
    }

    #[test]
    fn loco_is_signed_and_truncated() {
        assert_eq!(listing("LOCO 5"), ["0111000000000101 / LOCO 5 (5)"]);
        assert_eq!(listing("LOCO -1"), ["0111111111111111 / LOCO -1 (-1)"]);
        assert_eq!(listing("LOCO -2048"), ["0111100000000000 / LOCO -2048 (-2048)"]);
        // Wider than 12 bits: only the low 12 are kept
        assert_eq!(listing("LOCO 4096"), ["0111000000000000 / LOCO 4096 (4096)"]);
        assert_eq!(listing("LOCO 4097"), ["0111000000000001 / LOCO 4097 (4097)"]);
        assert_eq!(listing("LOCO -4097"), ["0111111111111111 / LOCO -4097 (-4097)"]);
    }

    #[test]
    fn loco_operand_errors() {
        assert_eq!(error("LOCO"), ErrorKind::MissingOperand("LOCO".into()));
        assert_eq!(error("LOCO five"), ErrorKind::InvalidOperand("five".into()));
    }

    #[test]
    fn insp_desp() {
        assert_eq!(listing("INSP 200"), ["1111110011001000 / INSP 200"]);
        assert_eq!(listing("desp 0"), ["1111111000000000 / DESP 0"]);
        assert_eq!(listing("DESP 255"), ["1111111011111111 / DESP 255"]);
        assert_eq!(
            error("INSP 300"),
            ErrorKind::OperandOutOfRange {
                operand: "300".into(),
                value: 300,
                max: 255
            }
        );
        assert!(matches!(error("DESP -1"), ErrorKind::OperandOutOfRange { .. }));
        assert_eq!(error("INSP"), ErrorKind::MissingOperand("INSP".into()));
        assert_eq!(error("INSP x"), ErrorKind::InvalidOperand("x".into()));
        // Anything past 32 bits is still a number, just out of range
        assert_eq!(
            error("INSP 4294967296"),
            ErrorKind::OperandOutOfRange {
                operand: "4294967296".into(),
                value: 4294967296,
                max: 255
            }
        );
    }

    #[test]
    fn labels_resolve_unsigned() {
        let mut src = String::new();
        for _ in 0..10 {
            src.push_str("PUSH\n");
        }
        src.push_str("L: LOCO 1\nJUMP L\n");
        let words = assemble(&src).unwrap();
        let jump = &words.words()[11];
        assert_eq!(jump.bits(), "0110000000001010");
        assert_eq!(jump.resolved, Some(10));
        assert_eq!(jump.to_string(), "0110000000001010 / JUMP L (10)");
    }

    #[test]
    fn mixed_case_and_crlf() {
        assert_eq!(
            listing("loop:  loco -2049\r\nJuMp loop"),
            [
                "0111011111111111 / LOCO -2049 (-2049)",
                "0110000000000000 / JUMP loop (0)",
            ]
        );
    }

    #[test]
    fn forward_references() {
        assert_eq!(
            listing("JUMP end\nPUSH\nend: RETN"),
            [
                "0110000000000010 / JUMP end (2)",
                "1111010000000000 / PUSH",
                "1111100000000000 / RETN",
            ]
        );
    }

    #[test]
    fn variables() {
        let src = "x:\ny:\nLODD x\nSTOD y\nADDD x";
        assert_eq!(
            listing(src),
            [
                "0000111111111111 / LODD x (4095)",
                "0001111111111110 / STOD y (4094)",
                "0010111111111111 / ADDD x (4095)",
            ]
        );
    }

    #[test]
    fn every_address_mnemonic() {
        let mnemonics = [
            "LODD", "STOD", "ADDD", "SUBD", "JPOS", "JZER", "JUMP", "LODL", "STOL", "ADDL",
            "SUBL", "JNEG", "JNZE", "CALL",
        ];
        for mnemonic in mnemonics {
            let program = assemble(&format!("here: {mnemonic} here")).unwrap();
            let word = &program.words()[0];
            assert_eq!(word.word & 0x0FFF, 0);
            assert_eq!(word.word, isa::lookup(mnemonic).unwrap().opcode);
        }
    }

    #[test]
    fn address_operand_errors() {
        assert_eq!(error("JUMP"), ErrorKind::MissingOperand("JUMP".into()));
        assert_eq!(error("JUMP nowhere"), ErrorKind::UndefinedSymbol("nowhere".into()));
        // Labels are case sensitive
        assert_eq!(error("Top: JUMP top"), ErrorKind::UndefinedSymbol("top".into()));
        // Numbers are not addresses
        assert_eq!(error("LODD 5"), ErrorKind::UndefinedSymbol("5".into()));
    }

    #[test]
    fn variable_below_zero_is_out_of_range() {
        let mut src = String::new();
        for i in 0..4097 {
            src.push_str(&format!("v{i}:\n"));
        }
        src.push_str("LODD v4096\n");
        assert_eq!(
            error(&src),
            ErrorKind::OperandOutOfRange {
                operand: "v4096".into(),
                value: -1,
                max: 4095
            }
        );
    }

    #[test]
    fn unknown_mnemonic() {
        for name in ["HALT", "NOP", "LOAD", "x"] {
            assert_eq!(error(name), ErrorKind::UnknownMnemonic(name.to_uppercase()));
        }
    }

    #[test]
    fn first_error_wins() {
        let err = assemble("PUSH\nJUMP a\nFOO\n").unwrap_err();
        assert_eq!(err.kind, ErrorKind::UndefinedSymbol("a".into()));
        assert_eq!(err.line, 1);
        // Pass 1 errors come before any encoding errors
        let err = assemble("FOO\na: PUSH\na: POP").unwrap_err();
        assert_eq!(err.kind, ErrorKind::DuplicateLabel("a".into()));
    }

    #[test]
    fn error_span_points_at_operand() {
        let src = "PUSH\n  JUMP  missing\n";
        let err = assemble(src).unwrap_err();
        assert_eq!(&src[err.span.as_range()], "missing");
        let err = assemble("  BOGUS 1").unwrap_err();
        assert_eq!(err.span.as_range(), 2..7);
    }

    #[test]
    fn comments_and_blank_lines_emit_nothing() {
        let program = assemble("/ only a comment\n\n   \n/ LOCO 1").unwrap();
        assert!(program.is_empty());
        assert_eq!(program.listing(), "");
    }

    #[test]
    fn strict_mode_rejects_overlap() {
        let mut src = String::from("x:\n");
        for _ in 0..4096 {
            src.push_str("PUSH\n");
        }
        assert!(assemble(&src).is_ok());
        let err = assemble_with(&src, AsmOptions { strict: true }).unwrap_err();
        assert_eq!(
            err.kind,
            ErrorKind::AddressSpaceOverflow {
                instructions: 4096,
                first_variable: 4095
            }
        );
        // Instruction 4095 is on line 4096
        assert_eq!(err.line, 4096);
        assert!(assemble_with("x:\nLODD x", AsmOptions { strict: true }).is_ok());
    }

    #[test]
    fn listing_text() {
        let program = assemble("start: LOCO 7\nINSP 1\nJUMP start").unwrap();
        assert_eq!(
            program.listing(),
            "0111000000000111 / LOCO 7 (7)\n\
             1111110000000001 / INSP 1\n\
             0110000000000000 / JUMP start (0)\n"
        );
        assert_eq!(
            program.machine_code().collect::<Vec<_>>(),
            [0x7007, 0xFC01, 0x6000]
        );
    }
}
