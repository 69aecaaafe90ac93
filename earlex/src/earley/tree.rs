use std::fmt::Write as _;
use std::ops::Range;

use crate::earley::chart::{Chart, Link};
use crate::error::{Error, Result};
use crate::grammar::Grammar;
use crate::index::IndexedGrammar;
use crate::lr::EpsilonLr0Dfa;
use crate::particle::Particle;
use crate::production::ProductionId;
use crate::token::Token;

/// A concrete syntax tree node.
///
/// Leaves carry their token (or stand for ε); internal nodes carry the
/// production that produced them. `span` is the half-open range of token
/// indices the node covers, so ε-subtrees have empty spans.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode {
    pub particle: Particle,
    pub production: Option<ProductionId>,
    pub token: Option<Token>,
    pub span: Range<usize>,
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty() && self.production.is_none()
    }

    /// In-order tokens under this node.
    pub fn tokens(&self) -> Vec<&Token> {
        let mut out = Vec::new();
        self.collect_tokens(&mut out);
        out
    }

    fn collect_tokens<'a>(&'a self, out: &mut Vec<&'a Token>) {
        if let Some(tok) = &self.token {
            out.push(tok);
        }
        for c in &self.children {
            c.collect_tokens(out);
        }
    }

    /// Indented dump for debugging.
    pub fn render(&self, g: &Grammar) -> String {
        let mut out = String::new();
        self.render_into(g, 0, &mut out);
        out
    }

    fn render_into(&self, g: &Grammar, depth: usize, out: &mut String) {
        let pad = "  ".repeat(depth);
        let label = g.particle_def(self.particle).to_string();
        match (&self.token, self.production) {
            (Some(tok), _) => {
                let _ = writeln!(out, "{pad}{label} \"{}\"", tok.literal.escape_debug());
            }
            (None, Some(pid)) => {
                let _ = writeln!(out, "{pad}{label} [{}]", g.production_string(g.production(pid)));
            }
            (None, None) => {
                let _ = writeln!(out, "{pad}{label}");
            }
        }
        for c in &self.children {
            c.render_into(g, depth + 1, out);
        }
    }
}

/// The canonical ε-derivation of a nullable nonterminal as a tree with an
/// empty span at `pos`, following the basic index's witness productions.
pub fn epsilon_subtree(ig: &IndexedGrammar, p: Particle, pos: usize) -> Result<TreeNode> {
    let g = ig.grammar();
    if p.is_epsilon() {
        return Ok(TreeNode {
            particle: p,
            production: None,
            token: None,
            span: pos..pos,
            children: Vec::new(),
        });
    }
    let pid = ig.basic()?.epsilon_production(p).ok_or_else(|| {
        Error::Internal(format!(
            "no ε-derivation recorded for {}",
            g.particle_def(p)
        ))
    })?;
    let mut children = Vec::new();
    for sym in &g.production(pid).rhs {
        children.push(epsilon_subtree(ig, *sym, pos)?);
    }
    Ok(TreeNode {
        particle: p,
        production: Some(pid),
        token: None,
        span: pos..pos,
        children,
    })
}

pub(crate) struct TreeBuilder<'a> {
    pub chart: &'a Chart,
    pub dfa: &'a EpsilonLr0Dfa,
    pub ig: &'a IndexedGrammar<'a>,
    pub nullable: &'a [bool],
    pub nihilistic: &'a [bool],
}

impl<'a> TreeBuilder<'a> {
    /// Materialize the subtree for a reduction of `lhs` ending at `entry`,
    /// walking causal links right to left.
    pub fn node_for(&self, lhs: Particle, entry_idx: usize) -> Result<TreeNode> {
        let g = self.dfa.grammar();
        let entry = &self.chart.entries[entry_idx];
        let state = self.dfa.state(entry.state);
        let prods = state
            .reductions
            .get(&lhs.id())
            .ok_or_else(|| Error::Internal("missing reduction after successful parse".into()))?;
        if prods.len() > 1 {
            return Err(Error::Ambiguity);
        }
        let pid = prods[0];
        let rhs = g.production(pid).rhs.clone();
        let mut children: Vec<Option<TreeNode>> = vec![None; rhs.len()];
        let mut cur = entry_idx;

        for idx in (0..rhs.len()).rev() {
            let sym = rhs[idx];
            let e = &self.chart.entries[cur];
            if sym.is_scannable() {
                let token = e.token.clone().ok_or_else(|| {
                    Error::Internal("terminal transition entry carries no token".into())
                })?;
                children[idx] = Some(TreeNode {
                    particle: sym,
                    production: None,
                    token: Some(token),
                    span: e.pos - 1..e.pos,
                    children: Vec::new(),
                });
                let preds: Vec<&Link> = e.links.iter().filter(|l| l.cause.is_none()).collect();
                match preds.len() {
                    1 => cur = preds[0].pred,
                    0 => {
                        return Err(Error::Internal(
                            "missing predecessor link for terminal transition".into(),
                        ))
                    }
                    _ => return Err(Error::Ambiguity),
                }
            } else if sym.is_nonterminal() {
                if self.nihilistic[sym.id()] {
                    children[idx] = Some(epsilon_subtree(self.ig, sym, e.pos)?);
                    continue;
                }
                let causes: Vec<&Link> = e.links.iter().filter(|l| l.cause.is_some()).collect();
                match causes.len() {
                    1 => {
                        let link = causes[0];
                        children[idx] = Some(self.node_for(sym, link.cause.unwrap())?);
                        cur = link.pred;
                    }
                    0 if self.nullable[sym.id()] => {
                        children[idx] = Some(epsilon_subtree(self.ig, sym, e.pos)?);
                    }
                    0 => {
                        return Err(Error::Internal(
                            "missing causal link after successful parse".into(),
                        ))
                    }
                    _ => return Err(Error::Ambiguity),
                }
            } else {
                return Err(Error::Internal(
                    "unexpected particle kind on reduced rhs".into(),
                ));
            }
        }

        Ok(TreeNode {
            particle: lhs,
            production: Some(pid),
            token: None,
            span: entry.parent..entry.pos,
            children: children.into_iter().map(Option::unwrap).collect(),
        })
    }
}
