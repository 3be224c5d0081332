use std::collections::BTreeSet;
use std::fmt;
use std::sync::LazyLock;

use cascade_automaton::Alphabet;
use cascade_automaton::Letter;
use pest::iterators::Pairs;
use pest::pratt_parser::Assoc::*;
use pest::pratt_parser::Op;
use pest::pratt_parser::PrattParser;
use pest::Parser;
use pest_derive::Parser;

use crate::io_dot::IOError;

#[derive(Parser)]
#[grammar = "guard_grammar.pest"]
struct GuardParser;

/// A propositional formula labelling a transition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Guard {
    True,
    False,
    Proposition(String),
    Not(Box<Guard>),
    And(Box<Guard>, Box<Guard>),
    Or(Box<Guard>, Box<Guard>),
    Implies(Box<Guard>, Box<Guard>),
}

static GUARD_PRATT_PARSER: LazyLock<PrattParser<Rule>> = LazyLock::new(|| {
    // Precedence is defined lowest to highest
    PrattParser::new()
        .op(Op::infix(Rule::Implies, Right))
        .op(Op::infix(Rule::Or, Left))
        .op(Op::infix(Rule::And, Left))
        .op(Op::prefix(Rule::Negation))
});

impl Guard {
    /// Parses a guard such as `~a & (b | c)`.
    pub fn parse(text: &str) -> Result<Guard, IOError> {
        let mut pairs =
            GuardParser::parse(Rule::Guard, text).map_err(|error| IOError::InvalidGuard(error.to_string()))?;

        let guard = pairs
            .next()
            .ok_or_else(|| IOError::InvalidGuard(text.to_string()))?;
        let expr = guard
            .into_inner()
            .next()
            .ok_or_else(|| IOError::InvalidGuard(text.to_string()))?;

        Ok(parse_expr(&GUARD_PRATT_PARSER, expr.into_inner()))
    }

    /// Adds the propositions occurring in the guard to the given set.
    pub fn propositions(&self, result: &mut BTreeSet<String>) {
        match self {
            Guard::True | Guard::False => {}
            Guard::Proposition(name) => {
                result.insert(name.clone());
            }
            Guard::Not(argument) => argument.propositions(result),
            Guard::And(left, right) | Guard::Or(left, right) | Guard::Implies(left, right) => {
                left.propositions(result);
                right.propositions(result);
            }
        }
    }

    /// Evaluates the guard in the given letter. Propositions outside the
    /// alphabet are false.
    pub fn holds(&self, alphabet: &Alphabet, letter: Letter) -> bool {
        match self {
            Guard::True => true,
            Guard::False => false,
            Guard::Proposition(name) => alphabet
                .index_of(name)
                .is_some_and(|index| alphabet.holds(letter, index)),
            Guard::Not(argument) => !argument.holds(alphabet, letter),
            Guard::And(left, right) => left.holds(alphabet, letter) && right.holds(alphabet, letter),
            Guard::Or(left, right) => left.holds(alphabet, letter) || right.holds(alphabet, letter),
            Guard::Implies(left, right) => !left.holds(alphabet, letter) || right.holds(alphabet, letter),
        }
    }
}

fn parse_expr(pratt: &PrattParser<Rule>, pairs: Pairs<Rule>) -> Guard {
    pratt
        .map_primary(|primary| match primary.as_rule() {
            Rule::True => Guard::True,
            Rule::False => Guard::False,
            Rule::Proposition => Guard::Proposition(primary.as_str().to_string()),
            Rule::Expr => parse_expr(pratt, primary.into_inner()),
            rule => unreachable!("Unexpected primary rule {:?}", rule),
        })
        .map_prefix(|op, argument| match op.as_rule() {
            Rule::Negation => Guard::Not(Box::new(argument)),
            rule => unreachable!("Unexpected prefix rule {:?}", rule),
        })
        .map_infix(|left, op, right| match op.as_rule() {
            Rule::And => Guard::And(Box::new(left), Box::new(right)),
            Rule::Or => Guard::Or(Box::new(left), Box::new(right)),
            Rule::Implies => Guard::Implies(Box::new(left), Box::new(right)),
            rule => unreachable!("Unexpected infix rule {:?}", rule),
        })
        .parse(pairs)
}

impl fmt::Display for Guard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Guard::True => write!(f, "true"),
            Guard::False => write!(f, "false"),
            Guard::Proposition(name) => write!(f, "{}", name),
            Guard::Not(argument) => write!(f, "!{}", argument),
            Guard::And(left, right) => write!(f, "({} && {})", left, right),
            Guard::Or(left, right) => write!(f, "({} || {})", left, right),
            Guard::Implies(left, right) => write!(f, "({} -> {})", left, right),
        }
    }
}
