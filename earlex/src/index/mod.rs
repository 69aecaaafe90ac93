//! Cached grammar analyses.
//!
//! An [`IndexedGrammar`] pairs a grammar with lazily computed, memoized
//! analyses. A failed computation caches nothing, so a later call observes
//! the same error rather than a half-built index.

use std::sync::OnceLock;

use crate::error::{Error, Result};
use crate::grammar::Grammar;

mod basic;
mod class;
mod ff;
mod name;

pub use basic::BasicIndex;
pub use class::ClassIndex;
pub use ff::FfIndex;
pub use name::NameIndex;

pub struct IndexedGrammar<'g> {
    grammar: &'g Grammar,
    basic: OnceLock<BasicIndex>,
    class: OnceLock<ClassIndex>,
    ff: OnceLock<FfIndex>,
    names: OnceLock<NameIndex>,
}

impl<'g> IndexedGrammar<'g> {
    pub fn new(grammar: &'g Grammar) -> Self {
        IndexedGrammar {
            grammar,
            basic: OnceLock::new(),
            class: OnceLock::new(),
            ff: OnceLock::new(),
            names: OnceLock::new(),
        }
    }

    pub fn grammar(&self) -> &'g Grammar {
        self.grammar
    }

    pub fn class(&self) -> &ClassIndex {
        self.class.get_or_init(|| ClassIndex::build(self.grammar))
    }

    fn require_context_free(&self) -> Result<()> {
        if self.class().class().context_free() {
            Ok(())
        } else {
            Err(Error::GrammarClass)
        }
    }

    pub fn basic(&self) -> Result<&BasicIndex> {
        if let Some(idx) = self.basic.get() {
            return Ok(idx);
        }
        self.require_context_free()?;
        let _ = self.basic.set(BasicIndex::build(self.grammar));
        Ok(self.basic.get().unwrap())
    }

    pub fn ff(&self) -> Result<&FfIndex> {
        if let Some(idx) = self.ff.get() {
            return Ok(idx);
        }
        self.require_context_free()?;
        let built = FfIndex::build(self.grammar, self.basic()?);
        let _ = self.ff.set(built);
        Ok(self.ff.get().unwrap())
    }

    pub fn names(&self) -> Result<&NameIndex> {
        if let Some(idx) = self.names.get() {
            return Ok(idx);
        }
        self.require_context_free()?;
        let _ = self.names.set(NameIndex::build(self.grammar));
        Ok(self.names.get().unwrap())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::GrammarBuilder;

    #[test]
    fn test_analyses_are_memoized() {
        let g = GrammarBuilder::new()
            .name("g")
            .terminals(&["x"])
            .nonterminals(&["S"])
            .rule("S", &["x"])
            .rule("`*", &["S", "`."])
            .build()
            .unwrap();
        let ig = IndexedGrammar::new(&g);
        let a = ig.basic().unwrap() as *const _;
        let b = ig.basic().unwrap() as *const _;
        assert_eq!(a, b);
    }
}
