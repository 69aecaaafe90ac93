pub mod charclass;
pub mod dfa;
pub mod domain;
pub mod driver;
pub mod interval;
pub mod ndfa;

pub use charclass::{CharacterClass, CharacterRange};
pub use dfa::{Dfa, DfaState};
pub use domain::{Block, Domain, DomainBuilder, Termdef};
pub use driver::{Lexer, LexerState};
pub use ndfa::{Ndfa, NdfaNode};
