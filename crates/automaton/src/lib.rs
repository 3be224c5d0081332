//!
//! A crate containing finite automata over propositional alphabets, together
//! with the automaton algebra (reversal, determinisation, reachability and
//! minimisation).
//!
//! This crate does not use unsafe code.

#![forbid(unsafe_code)]

mod alphabet;
mod automaton;
mod determinize;
mod minimize;
mod random_automaton;
mod reachability;
mod reverse;

pub use alphabet::*;
pub use automaton::*;
pub use random_automaton::*;
