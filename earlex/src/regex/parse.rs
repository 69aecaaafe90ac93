//! The metaregex reader.
//!
//! Feature set: literals, `\n \t \r \f \0 \\`, `\xHHHH`, escaped reserved
//! characters, `.`, `^`, `$`, character classes with negation and ranges,
//! the `? * + {n} {n,} {n,m}` quantifiers, grouping, and alternation with
//! lowest precedence. Reserved characters must be escaped to match
//! literally.

use std::collections::HashMap;

use lazy_static::lazy_static;

use crate::error::{Error, RegexErrorKind, Result};
use crate::lexer::charclass::CharacterClass;
use crate::regex::MatchExpr;

lazy_static! {
    static ref CONTROL_ESCAPES: HashMap<char, char> = {
        let mut m = HashMap::new();
        m.insert('n', '\n');
        m.insert('t', '\t');
        m.insert('r', '\r');
        m.insert('f', '\x0c');
        m.insert('0', '\0');
        m.insert('\\', '\\');
        m
    };
}

const RESERVED: &[char] = &[
    '.', '[', ']', '{', '}', '(', ')', '\\', '*', '+', '?', '|', '^', '$', '/', '-',
];

pub fn parse(src: &str) -> Result<MatchExpr> {
    let mut p = Reader {
        chars: src.chars().collect(),
        pos: 0,
    };
    let expr = p.alternation()?;
    match p.peek() {
        None => Ok(expr),
        Some(')') => Err(p.err(RegexErrorKind::UnbalancedGroup)),
        Some(_) => Err(p.err(RegexErrorKind::ReservedChar)),
    }
}

struct Reader {
    chars: Vec<char>,
    pos: usize,
}

impl Reader {
    fn err(&self, kind: RegexErrorKind) -> Error {
        Error::Regex {
            kind,
            position: self.pos,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    fn alternation(&mut self) -> Result<MatchExpr> {
        let mut branches = vec![self.sequence()?];
        while self.peek() == Some('|') {
            self.bump();
            branches.push(self.sequence()?);
        }
        if branches.len() == 1 {
            Ok(branches.pop().unwrap())
        } else {
            Ok(MatchExpr::Alternation(branches))
        }
    }

    fn sequence(&mut self) -> Result<MatchExpr> {
        let mut items = Vec::new();
        while let Some(c) = self.peek() {
            if c == '|' || c == ')' {
                break;
            }
            items.push(self.postfix()?);
        }
        if items.len() == 1 {
            Ok(items.pop().unwrap())
        } else {
            Ok(MatchExpr::Sequence(items))
        }
    }

    fn postfix(&mut self) -> Result<MatchExpr> {
        let mut expr = self.atom()?;
        while let Some(c) = self.peek() {
            expr = match c {
                '?' => {
                    self.bump();
                    MatchExpr::optional(expr)
                }
                '*' => {
                    self.bump();
                    MatchExpr::Star(Box::new(expr))
                }
                '+' => {
                    self.bump();
                    MatchExpr::Plus(Box::new(expr))
                }
                '{' => {
                    self.bump();
                    let (min, max) = self.bounds()?;
                    MatchExpr::Quantified {
                        expr: Box::new(expr),
                        min,
                        max,
                    }
                }
                _ => break,
            };
        }
        Ok(expr)
    }

    fn atom(&mut self) -> Result<MatchExpr> {
        let Some(c) = self.peek() else {
            return Err(self.err(RegexErrorKind::UnexpectedEnd));
        };
        match c {
            '.' => {
                self.bump();
                Ok(MatchExpr::Always)
            }
            '^' => {
                self.bump();
                Ok(MatchExpr::Start)
            }
            '$' => {
                self.bump();
                Ok(MatchExpr::End)
            }
            '(' => {
                self.bump();
                let inner = self.alternation()?;
                if self.bump() != Some(')') {
                    return Err(self.err(RegexErrorKind::UnbalancedGroup));
                }
                Ok(MatchExpr::Submatch(Box::new(inner)))
            }
            '[' => self.class(),
            '\\' => {
                self.bump();
                Ok(MatchExpr::Literal(self.escape()?))
            }
            '?' | '*' | '+' => Err(self.err(RegexErrorKind::DanglingQuantifier)),
            c if RESERVED.contains(&c) => Err(self.err(RegexErrorKind::ReservedChar)),
            c => {
                self.bump();
                Ok(MatchExpr::Literal(c))
            }
        }
    }

    fn escape(&mut self) -> Result<char> {
        let Some(c) = self.bump() else {
            return Err(self.err(RegexErrorKind::UnexpectedEnd));
        };
        if let Some(mapped) = CONTROL_ESCAPES.get(&c) {
            return Ok(*mapped);
        }
        if c == 'x' {
            let mut value = 0u32;
            for _ in 0..4 {
                let Some(d) = self.bump().and_then(|h| h.to_digit(16)) else {
                    return Err(self.err(RegexErrorKind::BadEscape));
                };
                value = value * 16 + d;
            }
            return char::from_u32(value).ok_or_else(|| self.err(RegexErrorKind::BadEscape));
        }
        if RESERVED.contains(&c) {
            return Ok(c);
        }
        Err(self.err(RegexErrorKind::BadEscape))
    }

    fn class(&mut self) -> Result<MatchExpr> {
        self.bump(); // [
        let mut cc = CharacterClass::new();
        if self.peek() == Some('^') {
            self.bump();
            cc.negate();
        }
        loop {
            let Some(c) = self.peek() else {
                return Err(self.err(RegexErrorKind::UnbalancedClass));
            };
            if c == ']' {
                self.bump();
                break;
            }
            let lo = self.class_char()?;
            if self.peek() == Some('-') {
                self.bump();
                match self.peek() {
                    Some(']') | None => return Err(self.err(RegexErrorKind::BadClass)),
                    _ => {}
                }
                let hi = self.class_char()?;
                if (hi as u32) < (lo as u32) || !cc.add_range(lo, hi) {
                    return Err(self.err(RegexErrorKind::BadClass));
                }
            } else if !cc.add_char(lo) {
                return Err(self.err(RegexErrorKind::BadClass));
            }
        }
        Ok(MatchExpr::Class(cc))
    }

    fn class_char(&mut self) -> Result<char> {
        let Some(c) = self.bump() else {
            return Err(self.err(RegexErrorKind::UnbalancedClass));
        };
        match c {
            '\\' => self.escape(),
            '-' => Err(self.err(RegexErrorKind::BadClass)),
            c => Ok(c),
        }
    }

    fn bounds(&mut self) -> Result<(u32, Option<u32>)> {
        let min = self.number()?;
        match self.bump() {
            Some('}') => Ok((min, Some(min))),
            Some(',') => {
                if self.peek() == Some('}') {
                    self.bump();
                    return Ok((min, None));
                }
                let max = self.number()?;
                if self.bump() != Some('}') {
                    return Err(self.err(RegexErrorKind::BadQuantifier));
                }
                if max < min {
                    return Err(self.err(RegexErrorKind::BadQuantifier));
                }
                Ok((min, Some(max)))
            }
            _ => Err(self.err(RegexErrorKind::BadQuantifier)),
        }
    }

    fn number(&mut self) -> Result<u32> {
        let mut digits = String::new();
        while let Some(c) = self.peek() {
            if !c.is_ascii_digit() {
                break;
            }
            digits.push(c);
            self.bump();
        }
        digits
            .parse()
            .map_err(|_| self.err(RegexErrorKind::BadQuantifier))
    }
}
