use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong across the toolkit.
///
/// Errors surface at the component boundary that detected them; the lexer
/// and parser never swallow one, and analyses leave no cached state behind
/// on failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("malformed grammar: {0}")]
    GrammarBuild(String),

    #[error("analysis requires a context-free grammar")]
    GrammarClass,

    #[error("regex error: {kind} at offset {position}")]
    Regex { kind: RegexErrorKind, position: usize },

    #[error("no token recognized at offset {position} (line {line}, column {column})")]
    Lex {
        position: usize,
        line: usize,
        column: usize,
    },

    #[error("parse failed at token {token_index}{}", fmt_parse_detail(.last_token, .expected))]
    Parse {
        token_index: usize,
        last_token: Option<String>,
        expected: Vec<String>,
    },

    #[error("derivation is ambiguous")]
    Ambiguity,

    #[error("internal invariant violated: {0}")]
    Internal(String),
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegexErrorKind {
    #[error("unexpected end of expression")]
    UnexpectedEnd,
    #[error("unbalanced group")]
    UnbalancedGroup,
    #[error("unbalanced character class")]
    UnbalancedClass,
    #[error("invalid escape")]
    BadEscape,
    #[error("invalid character class")]
    BadClass,
    #[error("invalid quantifier")]
    BadQuantifier,
    #[error("quantifier without operand")]
    DanglingQuantifier,
    #[error("reserved character must be escaped")]
    ReservedChar,
}

fn fmt_parse_detail(last_token: &Option<String>, expected: &[String]) -> String {
    let mut out = String::new();
    if let Some(tok) = last_token {
        out.push_str(&format!(" ({tok})"));
    }
    if !expected.is_empty() {
        out.push_str(&format!(", expected one of: {}", expected.join(", ")));
    }
    out
}
