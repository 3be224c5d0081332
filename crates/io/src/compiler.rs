use std::collections::BTreeSet;
use std::error::Error;

use cascade_automaton::Automaton;
use log::debug;
use regex::Regex;

use crate::io_dot::read_dot;

/// An external tool that compiles a temporal formula, given as text, into a
/// deterministic automaton in the DOT format understood by [read_dot]. For
/// example MONA, driven by an LTLf to MONA translation.
pub trait DfaCompiler {
    fn compile(&self, formula: &str) -> Result<String, Box<dyn Error>>;
}

/// Returns the atomic propositions of a formula in the textual LTLf syntax,
/// which are the lower case identifiers other than the constants.
pub fn formula_propositions(formula: &str) -> Vec<String> {
    let identifier_regex = Regex::new(r"[a-z][a-z0-9_]*").expect("Regex compilation should not fail");

    let propositions: BTreeSet<&str> = identifier_regex
        .find_iter(formula)
        .map(|found| found.as_str())
        .filter(|name| !matches!(*name, "true" | "false" | "last" | "end"))
        .collect();

    propositions.into_iter().map(String::from).collect()
}

/// Compiles the formula with the given compiler and reads the resulting
/// automaton over the propositions of the formula.
pub fn automaton_from_formula(compiler: &impl DfaCompiler, formula: &str) -> Result<Automaton, Box<dyn Error>> {
    let dot = compiler.compile(formula)?;
    debug!("Compiled {} into {} bytes of DOT output", formula, dot.len());

    read_dot(dot.as_bytes(), formula_propositions(formula))
}
