use crate::span::Span;

/// Label separator, `name:`
pub const LABEL_DELIM: char = ':';
/// Lines starting with this are comments. Also separates a word from its annotation in listings.
pub const COMMENT: char = '/';

/// Piece of source text along with its location.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Token<'a> {
    pub text: &'a str,
    pub span: Span,
}

/// A single non-blank, non-comment line of assembly.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Line<'a> {
    /// Zero-based line number in the source
    pub index: usize,
    /// Whole line, trimmed
    pub whole: Token<'a>,
    /// `name` from a leading `name:`
    pub label: Option<Token<'a>>,
    /// Instruction text following the label, if any
    pub body: Option<Token<'a>>,
}

impl<'a> Line<'a> {
    /// A label with nothing after it declares a variable.
    pub fn is_variable(&self) -> bool {
        self.label.is_some() && self.body.is_none()
    }

    /// Split the body into mnemonic and operand.
    pub fn instruction(&self) -> Option<(Token<'a>, Option<Token<'a>>)> {
        self.body.map(|body| split_instruction(body))
    }

    /// Best span to point at for errors on this line.
    pub fn span(&self) -> Span {
        self.whole.span
    }
}

/// Iterate over the lines of `src` that carry a label or an instruction.
pub fn lines(src: &str) -> impl Iterator<Item = Line<'_>> + '_ {
    let mut offset = 0;
    src.split('\n').enumerate().filter_map(move |(index, raw)| {
        let start = offset;
        offset += raw.len() + 1;
        classify(start, index, raw)
    })
}

fn classify(start: usize, index: usize, raw: &str) -> Option<Line<'_>> {
    let whole = trimmed(start, raw);
    if whole.text.is_empty() || whole.text.starts_with(COMMENT) {
        return None;
    }

    let base = whole.span.start();
    let (label, rest) = match whole.text.split_once(LABEL_DELIM) {
        Some((label, rest)) => (
            Some(trimmed(base, label)),
            trimmed(base + label.len() + LABEL_DELIM.len_utf8(), rest),
        ),
        None => (None, whole),
    };
    let body = (!rest.text.is_empty()).then_some(rest);

    Some(Line {
        index,
        whole,
        label,
        body,
    })
}

fn split_instruction(body: Token<'_>) -> (Token<'_>, Option<Token<'_>>) {
    let Some(end) = body.text.find(char::is_whitespace) else {
        return (body, None);
    };
    let base = body.span.start();
    let mnemonic = trimmed(base, &body.text[..end]);
    let operand = trimmed(base + end, &body.text[end..]);
    (mnemonic, (!operand.text.is_empty()).then_some(operand))
}

/// `text`, found `offset` bytes into the source, without surrounding whitespace.
fn trimmed(offset: usize, text: &str) -> Token<'_> {
    let rest = text.trim_start();
    let start = offset + (text.len() - rest.len());
    let text = rest.trim_end();
    Token {
        text,
        span: Span::at(start, text.len()),
    }
}
