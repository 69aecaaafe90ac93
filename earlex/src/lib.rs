//! earlex — an ε-aware Earley parser and DFA lexer toolkit.
//!
//! Given a context-free grammar and a lexical specification, the crate
//! produces a parser that turns a character stream into a syntax tree:
//!
//! - grammars are built fluently and analyzed lazily ([`grammar`],
//!   [`index`]);
//! - the nihilistic normal form conditions nullable nonterminals so the
//!   recognizer can forward over them unambiguously ([`nnf`]);
//! - an ε-aware LR(0) item-set automaton drives an Earley chart with a
//!   shared packed forest ([`lr`], [`earley`]);
//! - regular expressions compile through an NDFA into interval-partitioned
//!   DFAs grouped into lexer blocks with inclusion and forwarding
//!   ([`regex`], [`lexer`]).
//!
//! Everything built here is immutable after construction and freely
//! shareable across threads; the chart and lexer state are owned by a
//! single parse or scan.

pub mod earley;
pub mod error;
pub mod grammar;
pub mod index;
pub mod lexer;
pub mod lr;
pub mod nnf;
pub mod particle;
pub mod production;
pub mod regex;
pub mod token;

pub use earley::tree::TreeNode;
pub use earley::EarleyParser;
pub use error::{Error, RegexErrorKind, Result};
pub use grammar::{Grammar, GrammarBuilder};
pub use index::IndexedGrammar;
pub use lexer::{Domain, DomainBuilder, Lexer};
pub use particle::{Particle, ParticleKind};
pub use production::{Production, ProductionClass, Regularity};
pub use regex::MatchExpr;
pub use token::Token;

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::grammar::{Grammar, GrammarBuilder};

    /// The nullable-quadruple grammar: S derives four A's, each of which
    /// may vanish.
    pub fn a4_grammar() -> Grammar {
        GrammarBuilder::new()
            .name("a4")
            .terminals(&["a"])
            .nonterminals(&["S", "A", "E"])
            .rule("`*", &["S", "`."])
            .rule("S", &["A", "A", "A", "A"])
            .rule("A", &["a"])
            .rule("A", &["E"])
            .rule("E", &["`e"])
            .build()
            .unwrap()
    }

    #[test]
    fn test_fixtures_build() {
        let g = a4_grammar();
        assert_eq!(g.name(), "a4");
    }
}
