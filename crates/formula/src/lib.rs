//!
//! A crate containing the abstract syntax of past and future linear temporal
//! logic over finite traces, together with the switch between the two and
//! their evaluation on finite traces.
//!
//! This crate does not use unsafe code.

#![forbid(unsafe_code)]

mod evaluate;
mod formula;

pub use formula::*;
