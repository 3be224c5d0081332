use rustc_hash::FxHashMap;

use crate::Formula;
use crate::FormulaNode;

impl Formula {
    /// Evaluates the formula on a finite trace of the given length, where
    /// `valuation(t, name)` gives the truth of atom `name` at position `t`.
    ///
    /// Returns the truth value at every position. `Before` and `Next` are
    /// strict, they are false at the first and last position respectively.
    pub fn evaluate(&self, length: usize, valuation: impl Fn(usize, &str) -> bool) -> Vec<bool> {
        let mut cache: FxHashMap<*const FormulaNode, Vec<bool>> = FxHashMap::default();
        evaluate_rec(self, length, &valuation, &mut cache)
    }

    /// Past semantics: the formula holds at the last position of the trace.
    /// The empty trace has no last position, so nothing holds on it.
    pub fn holds_at_end(&self, length: usize, valuation: impl Fn(usize, &str) -> bool) -> bool {
        if length == 0 {
            return false;
        }

        self.evaluate(length, valuation)[length - 1]
    }

    /// Future semantics: the formula holds at the first position of the trace.
    pub fn holds_at_start(&self, length: usize, valuation: impl Fn(usize, &str) -> bool) -> bool {
        if length == 0 {
            return false;
        }

        self.evaluate(length, valuation)[0]
    }
}

fn evaluate_rec(
    formula: &Formula,
    length: usize,
    valuation: &impl Fn(usize, &str) -> bool,
    cache: &mut FxHashMap<*const FormulaNode, Vec<bool>>,
) -> Vec<bool> {
    if let Some(result) = cache.get(&formula.key()) {
        return result.clone();
    }

    let result: Vec<bool> = match formula.node() {
        FormulaNode::True => vec![true; length],
        FormulaNode::False => vec![false; length],
        FormulaNode::Atom(name) => (0..length).map(|t| valuation(t, name)).collect(),
        FormulaNode::Not(argument) => evaluate_rec(argument, length, valuation, cache)
            .into_iter()
            .map(|value| !value)
            .collect(),
        FormulaNode::And(left, right) => {
            let left = evaluate_rec(left, length, valuation, cache);
            let right = evaluate_rec(right, length, valuation, cache);
            left.iter().zip(right.iter()).map(|(l, r)| *l && *r).collect()
        }
        FormulaNode::Or(left, right) => {
            let left = evaluate_rec(left, length, valuation, cache);
            let right = evaluate_rec(right, length, valuation, cache);
            left.iter().zip(right.iter()).map(|(l, r)| *l || *r).collect()
        }
        FormulaNode::Before(argument) => {
            let argument = evaluate_rec(argument, length, valuation, cache);
            (0..length).map(|t| t > 0 && argument[t - 1]).collect()
        }
        FormulaNode::Next(argument) => {
            let argument = evaluate_rec(argument, length, valuation, cache);
            (0..length).map(|t| t + 1 < length && argument[t + 1]).collect()
        }
        FormulaNode::Since(left, right) => {
            let left = evaluate_rec(left, length, valuation, cache);
            let right = evaluate_rec(right, length, valuation, cache);

            let mut result = vec![false; length];
            for t in 0..length {
                let previous = t > 0 && result[t - 1];
                result[t] = right[t] || (left[t] && previous);
            }
            result
        }
        FormulaNode::Until(left, right) => {
            let left = evaluate_rec(left, length, valuation, cache);
            let right = evaluate_rec(right, length, valuation, cache);

            let mut result = vec![false; length];
            for t in (0..length).rev() {
                let next = t + 1 < length && result[t + 1];
                result[t] = right[t] || (left[t] && next);
            }
            result
        }
    };

    cache.insert(formula.key(), result.clone());
    result
}
