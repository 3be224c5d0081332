//!
//! A crate containing IO related functionality. This includes the reading and
//! writing of automata in the DOT based format produced by MONA, and the
//! interface to external formula to automaton compilers.
//!

#![forbid(unsafe_code)]

mod guard;
mod line_iterator;

pub mod compiler;
pub mod io_dot;

pub use guard::Guard;
