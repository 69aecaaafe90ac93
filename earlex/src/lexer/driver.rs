//! The streaming token recognizer.
//!
//! A maximal-munch DFA walker with the accept-on-dead-end rule: characters
//! are consumed while a transition exists; at the first dead end the state
//! either accepts (emitting a token, or silently dropping an ignore match)
//! or the input is rejected. One `` `. `` token closes a cleanly exhausted
//! stream.

use crate::error::{Error, Result};
use crate::grammar::Grammar;
use crate::lexer::dfa::Dfa;
use crate::token::Token;

/// A compiled lexer. Immutable; [`Lexer::open`] starts an independent
/// scan over one character stream.
#[derive(Debug)]
pub struct Lexer {
    grammar: Grammar,
    dfa: Dfa,
}

impl Lexer {
    pub(crate) fn new(grammar: Grammar, dfa: Dfa) -> Self {
        Lexer { grammar, dfa }
    }

    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    pub fn dfa(&self) -> &Dfa {
        &self.dfa
    }

    pub fn open<I>(&self, input: I) -> LexerState<'_, I>
    where
        I: Iterator<Item = char>,
    {
        LexerState {
            lexer: self,
            input,
            lookahead: None,
            pos: 0,
            line: 1,
            col: 1,
            state: self.dfa.initial,
            bottom_sent: false,
            failed: false,
        }
    }

    /// Collect every token of `input`, the closing `` `. `` included.
    pub fn tokenize(&self, input: &str) -> Result<Vec<Token>> {
        self.open(input.chars()).collect()
    }
}

/// The mutable state of one scan. Owned by a single invocation; tokens
/// stream out through the `Iterator` impl.
pub struct LexerState<'lx, I> {
    lexer: &'lx Lexer,
    input: I,
    lookahead: Option<char>,
    pos: usize,
    line: usize,
    col: usize,
    state: usize,
    bottom_sent: bool,
    failed: bool,
}

impl<I> LexerState<'_, I>
where
    I: Iterator<Item = char>,
{
    fn peek(&mut self) -> Option<char> {
        if self.lookahead.is_none() {
            self.lookahead = self.input.next();
        }
        self.lookahead
    }

    fn consume(&mut self) -> char {
        let c = self.lookahead.take().expect("consume without lookahead");
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        c
    }

    fn read_token(&mut self) -> Result<Option<Token>> {
        let dfa = &self.lexer.dfa;
        let mut buf = String::new();
        let (mut first_pos, mut first_line, mut first_col) = (self.pos, self.line, self.col);
        let (mut last_pos, mut last_line, mut last_col) = (self.pos, self.line, self.col);

        loop {
            let next = self.peek().and_then(|c| dfa.states[self.state].query(c));
            if let Some(next_state) = next {
                last_pos = self.pos;
                last_line = self.line;
                last_col = self.col;
                buf.push(self.consume());
                self.state = next_state;
                continue;
            }

            // Dead end, or end of input. Zero-width accepts are refused:
            // a token must consume at least one character, and an ignore
            // match that consumed nothing cannot make progress.
            let accept = dfa.states[self.state]
                .accept
                .clone()
                .filter(|_| !buf.is_empty());
            if let Some(accept) = accept {
                self.state = accept.next;
                if accept.terminal.is_epsilon() {
                    buf.clear();
                    first_pos = self.pos;
                    first_line = self.line;
                    first_col = self.col;
                    last_pos = self.pos;
                    last_line = self.line;
                    last_col = self.col;
                    continue;
                }
                return Ok(Some(Token {
                    terminal: accept.terminal,
                    literal: buf,
                    first_pos,
                    last_pos,
                    first_line,
                    last_line,
                    first_col,
                    last_col,
                }));
            }

            if self.peek().is_none() && buf.is_empty() {
                if self.bottom_sent {
                    return Ok(None);
                }
                self.bottom_sent = true;
                return Ok(Some(Token {
                    terminal: self.lexer.grammar.bottom(),
                    literal: String::new(),
                    first_pos: self.pos,
                    last_pos: self.pos,
                    first_line: self.line,
                    last_line: self.line,
                    first_col: self.col,
                    last_col: self.col,
                }));
            }

            return Err(Error::Lex {
                position: self.pos,
                line: self.line,
                column: self.col,
            });
        }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn current_line(&self) -> usize {
        self.line
    }

    pub fn current_column(&self) -> usize {
        self.col
    }
}

impl<I> Iterator for LexerState<'_, I>
where
    I: Iterator<Item = char>,
{
    type Item = Result<Token>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.read_token() {
            Ok(Some(token)) => Some(Ok(token)),
            Ok(None) => None,
            Err(err) => {
                self.failed = true;
                Some(Err(err))
            }
        }
    }
}
