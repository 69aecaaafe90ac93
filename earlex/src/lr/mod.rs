pub mod graph;
pub mod item;

pub use graph::{DfaState, EpsilonLr0Dfa};
pub use item::{ItemSet, Lr0Item};
