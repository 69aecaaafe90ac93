//! Lexer domains: blocks of terminal definitions wired by inclusion and
//! forwarding.
//!
//! A block's effective termdef list is its own termdefs plus those of its
//! inclusion closure in declaration order, with local definitions
//! overriding included ones of the same terminal. Ignore expressions
//! combine by alternation. Every termdef forwards somewhere: its own next
//! block, else the block default, else the block itself.

use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::error::{Error, Result};
use crate::grammar::Grammar;
use crate::lexer::dfa::{Dfa, DfaAccept, DfaInterval, DfaState};
use crate::lexer::driver::Lexer;
use crate::lexer::ndfa::{AcceptOrigin, NdfaBuilder};
use crate::particle::Particle;
use crate::regex::{parse::parse as parse_regex, MatchExpr};

#[derive(Debug, Clone)]
pub struct Termdef {
    pub terminal: Particle,
    pub expr: MatchExpr,
    pub next_block: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct Block {
    pub name: String,
    pub termdefs: Vec<Termdef>,
    pub inclusions: Vec<usize>,
    pub ignore: Option<MatchExpr>,
    pub default_forward: Option<usize>,
}

/// A complete lexical specification over one grammar's terminals. Block 0
/// is where lexing starts.
#[derive(Debug, Clone)]
pub struct Domain {
    grammar: Grammar,
    blocks: Vec<Block>,
}

impl Domain {
    pub fn builder(grammar: &Grammar) -> DomainBuilder {
        DomainBuilder {
            grammar: grammar.clone(),
            blocks: Vec::new(),
            error: None,
        }
    }

    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Flatten inclusions, combine ignores, and resolve every termdef's
    /// forward block.
    fn normalize(&self) -> Domain {
        let mut blocks = Vec::with_capacity(self.blocks.len());
        for (i, block) in self.blocks.iter().enumerate() {
            let mut termdefs = block.termdefs.clone();
            let mut seen_terms: HashSet<usize> = block
                .termdefs
                .iter()
                .map(|td| td.terminal.id())
                .collect();
            let mut ignores: Vec<MatchExpr> = block.ignore.iter().cloned().collect();

            let mut queue = block.inclusions.clone();
            let mut visited: HashSet<usize> = queue.iter().copied().collect();
            visited.insert(i);
            let mut qi = 0;
            while qi < queue.len() {
                let inc = queue[qi];
                qi += 1;
                let other = &self.blocks[inc];
                for td in &other.termdefs {
                    if seen_terms.insert(td.terminal.id()) {
                        termdefs.push(td.clone());
                    }
                }
                if let Some(ignore) = &other.ignore {
                    ignores.push(ignore.clone());
                }
                for next in &other.inclusions {
                    if visited.insert(*next) {
                        queue.push(*next);
                    }
                }
            }

            for td in &mut termdefs {
                td.next_block = td
                    .next_block
                    .or(block.default_forward)
                    .or(Some(i));
            }

            blocks.push(Block {
                name: block.name.clone(),
                termdefs,
                inclusions: Vec::new(),
                ignore: match ignores.len() {
                    0 => None,
                    1 => Some(ignores.pop().unwrap()),
                    _ => Some(MatchExpr::Alternation(ignores)),
                },
                default_forward: None,
            });
        }
        Domain {
            grammar: self.grammar.clone(),
            blocks,
        }
    }

    /// Compile the domain into a streaming lexer: one NDFA and DFA per
    /// block, fused into a single state arena with cross-block accept
    /// forwarding.
    pub fn compile(&self) -> Result<Lexer> {
        let norm = self.normalize();

        let mut protos = Vec::with_capacity(norm.blocks.len());
        for (i, block) in norm.blocks.iter().enumerate() {
            let mut b = NdfaBuilder::new();
            let virtual_initial = b.add_node();
            if let Some(ignore) = &block.ignore {
                let frag = ignore.emit(&mut b);
                b.mark_accepting(
                    &frag,
                    AcceptOrigin {
                        block: i,
                        termdef: None,
                    },
                );
                b.epsilon_edge(virtual_initial, frag.start);
            }
            for (j, td) in block.termdefs.iter().enumerate() {
                let frag = td.expr.emit(&mut b);
                b.mark_accepting(
                    &frag,
                    AcceptOrigin {
                        block: i,
                        termdef: Some(j),
                    },
                );
                b.epsilon_edge(virtual_initial, frag.start);
            }
            let ndfa = b.finish(virtual_initial);
            protos.push(crate::lexer::dfa::subset_construct(&ndfa));
        }

        let mut block_initials = Vec::with_capacity(protos.len());
        let mut offset = 0usize;
        for proto in &protos {
            block_initials.push(offset);
            offset += proto.len();
        }

        let mut states = Vec::with_capacity(offset);
        for (i, proto) in protos.iter().enumerate() {
            let base = block_initials[i];
            for (local, ps) in proto.iter().enumerate() {
                let intervals = ps
                    .intervals
                    .iter()
                    .map(|iv| DfaInterval {
                        lower: iv.lower,
                        upper: iv.upper,
                        next: iv.next.map(|t| t + base),
                    })
                    .collect();
                let accept = match ps.accept {
                    None => None,
                    Some(None) => Some(DfaAccept {
                        terminal: self.grammar.epsilon(),
                        next: block_initials[i],
                    }),
                    Some(Some(td_idx)) => {
                        let td = &norm.blocks[i].termdefs[td_idx];
                        let forward = td.next_block.unwrap_or(i);
                        Some(DfaAccept {
                            terminal: td.terminal,
                            next: block_initials[forward],
                        })
                    }
                };
                states.push(DfaState {
                    id: base + local,
                    intervals,
                    accept,
                });
            }
        }

        Ok(Lexer::new(
            self.grammar.clone(),
            Dfa {
                states,
                initial: block_initials[0],
            },
        ))
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for block in &self.blocks {
            writeln!(f, "{}:{{{{", block.name)?;
            if let Some(fwd) = block.default_forward {
                writeln!(f, "    {{{}}}", self.blocks[fwd].name)?;
            }
            if let Some(ignore) = &block.ignore {
                writeln!(f, "    _ /{ignore}/")?;
            }
            for td in &block.termdefs {
                write!(
                    f,
                    "    {} /{}/",
                    self.grammar.particle_name(td.terminal),
                    td.expr
                )?;
                if let Some(next) = td.next_block {
                    write!(f, " {{{}}}", self.blocks[next].name)?;
                }
                writeln!(f)?;
            }
            for inc in &block.inclusions {
                writeln!(f, "    {{{{{}}}}}", self.blocks[*inc].name)?;
            }
            writeln!(f, "}}}}")?;
        }
        Ok(())
    }
}

/// Fluent construction of a [`Domain`]. Like the grammar builder, misuse
/// is remembered and surfaces from [`DomainBuilder::build`].
pub struct DomainBuilder {
    grammar: Grammar,
    blocks: Vec<ProtoBlock>,
    error: Option<Error>,
}

struct ProtoBlock {
    name: String,
    termdefs: Vec<(String, MatchExpr, Option<String>)>,
    inclusions: Vec<String>,
    ignore: Option<MatchExpr>,
    default_forward: Option<String>,
}

impl DomainBuilder {
    fn fail(&mut self, reason: impl Into<String>) {
        if self.error.is_none() {
            self.error = Some(Error::GrammarBuild(reason.into()));
        }
    }

    fn fail_with(&mut self, err: Error) {
        if self.error.is_none() {
            self.error = Some(err);
        }
    }

    /// Open a new block; the first one opened is the start block.
    pub fn block(mut self, name: &str) -> Self {
        if self.blocks.iter().any(|b| b.name == name) {
            self.fail(format!("lexer block '{name}' already exists"));
            return self;
        }
        self.blocks.push(ProtoBlock {
            name: name.to_string(),
            termdefs: Vec::new(),
            inclusions: Vec::new(),
            ignore: None,
            default_forward: None,
        });
        self
    }

    fn current(&mut self) -> Option<&mut ProtoBlock> {
        self.blocks.last_mut()
    }

    pub fn termdef(mut self, terminal: &str, expr: MatchExpr) -> Self {
        let entry = (terminal.to_string(), expr, None);
        let mut err = None;
        match self.current() {
            None => err = Some("termdef before any block"),
            Some(block) => block.termdefs.push(entry),
        }
        if let Some(e) = err {
            self.fail(e);
        }
        self
    }

    /// Like [`DomainBuilder::termdef`], parsing the expression from its
    /// surface syntax.
    pub fn termdef_src(mut self, terminal: &str, src: &str) -> Self {
        match parse_regex(src) {
            Ok(expr) => self.termdef(terminal, expr),
            Err(err) => {
                self.fail_with(err);
                self
            }
        }
    }

    /// Route the latest termdef to another block after it accepts.
    pub fn to_block(mut self, name: &str) -> Self {
        let mut err = None;
        match self.current().and_then(|b| b.termdefs.last_mut()) {
            None => err = Some("to_block before any termdef"),
            Some(td) => {
                if td.2.is_some() {
                    err = Some("to_block given twice for one termdef");
                } else {
                    td.2 = Some(name.to_string());
                }
            }
        }
        if let Some(e) = err {
            self.fail(e);
        }
        self
    }

    pub fn include(mut self, name: &str) -> Self {
        let name = name.to_string();
        let mut err = None;
        match self.current() {
            None => err = Some("include before any block"),
            Some(block) => block.inclusions.push(name),
        }
        if let Some(e) = err {
            self.fail(e);
        }
        self
    }

    pub fn ignore(mut self, expr: MatchExpr) -> Self {
        let mut err = None;
        match self.current() {
            None => err = Some("ignore before any block"),
            Some(block) => {
                if block.ignore.is_some() {
                    err = Some("ignore given twice for one block");
                } else {
                    block.ignore = Some(expr);
                }
            }
        }
        if let Some(e) = err {
            self.fail(e);
        }
        self
    }

    pub fn ignore_src(mut self, src: &str) -> Self {
        match parse_regex(src) {
            Ok(expr) => self.ignore(expr),
            Err(err) => {
                self.fail_with(err);
                self
            }
        }
    }

    pub fn default_to_block(mut self, name: &str) -> Self {
        let name = name.to_string();
        let mut err = None;
        match self.current() {
            None => err = Some("default_to_block before any block"),
            Some(block) => {
                if block.default_forward.is_some() {
                    err = Some("default_to_block given twice for one block");
                } else {
                    block.default_forward = Some(name);
                }
            }
        }
        if let Some(e) = err {
            self.fail(e);
        }
        self
    }

    pub fn build(self) -> Result<Domain> {
        if let Some(err) = self.error {
            return Err(err);
        }
        if self.blocks.is_empty() {
            return Err(Error::GrammarBuild("lexer domain has no blocks".into()));
        }
        let index: HashMap<&str, usize> = self
            .blocks
            .iter()
            .enumerate()
            .map(|(i, b)| (b.name.as_str(), i))
            .collect();
        let lookup_block = |name: &str| -> Result<usize> {
            index
                .get(name)
                .copied()
                .ok_or_else(|| Error::GrammarBuild(format!("unknown lexer block '{name}'")))
        };
        let lookup_terminal = |name: &str| -> Result<Particle> {
            match self.grammar.particle_by_name(name) {
                Some(p) if p.is_terminal() => Ok(p),
                _ => Err(Error::GrammarBuild(format!(
                    "termdef names unknown terminal '{name}'"
                ))),
            }
        };

        let mut blocks = Vec::with_capacity(self.blocks.len());
        for proto in &self.blocks {
            let mut termdefs = Vec::with_capacity(proto.termdefs.len());
            for (term, expr, next) in &proto.termdefs {
                termdefs.push(Termdef {
                    terminal: lookup_terminal(term)?,
                    expr: expr.clone(),
                    next_block: next.as_deref().map(&lookup_block).transpose()?,
                });
            }
            blocks.push(Block {
                name: proto.name.clone(),
                termdefs,
                inclusions: proto
                    .inclusions
                    .iter()
                    .map(|n| lookup_block(n.as_str()))
                    .collect::<Result<_>>()?,
                ignore: proto.ignore.clone(),
                default_forward: proto
                    .default_forward
                    .as_deref()
                    .map(&lookup_block)
                    .transpose()?,
            });
        }
        Ok(Domain {
            grammar: self.grammar,
            blocks,
        })
    }
}
