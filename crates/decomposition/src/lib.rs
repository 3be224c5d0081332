//!
//! The cascade decomposition of counter-free automata. A deterministic
//! automaton is first turned into a tree subset automaton, whose layers are
//! then decomposed into a cascade of reset automata. From the cascade a past
//! time temporal logic formula is synthesised that accepts exactly the words
//! accepted by the automaton.
//!
//! This crate does not use unsafe code.

#![forbid(unsafe_code)]

mod cascade;
mod display;
mod error;
mod scc_decomposition;
mod stratify;
mod subset_tree;
mod synthesis;
mod tsa;

#[cfg(test)]
mod test_automata;

pub use cascade::*;
pub use error::*;
pub use scc_decomposition::*;
pub use synthesis::*;
pub use tsa::*;
