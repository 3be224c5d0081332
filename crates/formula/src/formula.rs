use std::collections::BTreeSet;
use std::fmt;
use std::rc::Rc;

use rustc_hash::FxHashMap;
use rustc_hash::FxHashSet;

/// A temporal logic formula. Subformulas are shared, so cloning is cheap and
/// formulas built from the same parts form a directed acyclic graph.
///
/// The past operators are `Before` (yesterday) and `Since`, the future
/// operators are `Next` and `Until`.
#[derive(Clone)]
pub struct Formula(Rc<FormulaNode>);

/// The operator at the top of a [Formula].
#[derive(Debug, PartialEq, Eq)]
pub enum FormulaNode {
    True,
    False,
    Atom(String),
    Not(Formula),
    And(Formula, Formula),
    Or(Formula, Formula),
    Before(Formula),
    Since(Formula, Formula),
    Next(Formula),
    Until(Formula, Formula),
}

impl Formula {
    fn from_node(node: FormulaNode) -> Formula {
        Formula(Rc::new(node))
    }

    /// Returns the operator at the top of this formula.
    pub fn node(&self) -> &FormulaNode {
        &self.0
    }

    /// Returns true iff both formulas are the same shared node.
    pub fn ptr_eq(&self, other: &Formula) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// The address of the shared node, used to memoise traversals.
    pub(crate) fn key(&self) -> *const FormulaNode {
        Rc::as_ptr(&self.0)
    }

    pub fn tt() -> Formula {
        Formula::from_node(FormulaNode::True)
    }

    pub fn ff() -> Formula {
        Formula::from_node(FormulaNode::False)
    }

    pub fn atom(name: impl Into<String>) -> Formula {
        Formula::from_node(FormulaNode::Atom(name.into()))
    }

    pub fn is_true(&self) -> bool {
        matches!(self.node(), FormulaNode::True)
    }

    pub fn is_false(&self) -> bool {
        matches!(self.node(), FormulaNode::False)
    }

    /// Negation, folding constants and double negations.
    pub fn not(argument: Formula) -> Formula {
        match argument.node() {
            FormulaNode::True => Formula::ff(),
            FormulaNode::False => Formula::tt(),
            FormulaNode::Not(inner) => inner.clone(),
            _ => Formula::from_node(FormulaNode::Not(argument)),
        }
    }

    /// Conjunction, folding constants and identical operands.
    pub fn and(left: Formula, right: Formula) -> Formula {
        if left.is_false() || right.is_false() {
            Formula::ff()
        } else if left.is_true() {
            right
        } else if right.is_true() || left == right {
            left
        } else {
            Formula::from_node(FormulaNode::And(left, right))
        }
    }

    /// Disjunction, folding constants and identical operands.
    pub fn or(left: Formula, right: Formula) -> Formula {
        if left.is_true() || right.is_true() {
            Formula::tt()
        } else if left.is_false() {
            right
        } else if right.is_false() || left == right {
            left
        } else {
            Formula::from_node(FormulaNode::Or(left, right))
        }
    }

    /// The conjunction of all the given formulas, true when there are none.
    pub fn conjunction(operands: impl IntoIterator<Item = Formula>) -> Formula {
        operands.into_iter().fold(Formula::tt(), Formula::and)
    }

    /// The disjunction of all the given formulas, false when there are none.
    pub fn disjunction(operands: impl IntoIterator<Item = Formula>) -> Formula {
        operands.into_iter().fold(Formula::ff(), Formula::or)
    }

    /// `Y φ`: φ held at the previous position, which must exist.
    pub fn before(argument: Formula) -> Formula {
        if argument.is_false() {
            Formula::ff()
        } else {
            Formula::from_node(FormulaNode::Before(argument))
        }
    }

    /// `φ S ψ`: ψ held at some position up to now, and φ held ever since.
    pub fn since(left: Formula, right: Formula) -> Formula {
        if right.is_false() || right.is_true() {
            right
        } else {
            Formula::from_node(FormulaNode::Since(left, right))
        }
    }

    /// `X φ`: there is a next position at which φ holds.
    pub fn next(argument: Formula) -> Formula {
        if argument.is_false() {
            Formula::ff()
        } else {
            Formula::from_node(FormulaNode::Next(argument))
        }
    }

    /// `φ U ψ`: ψ holds at some position from now on, and φ holds until then.
    pub fn until(left: Formula, right: Formula) -> Formula {
        if right.is_false() || right.is_true() {
            right
        } else {
            Formula::from_node(FormulaNode::Until(left, right))
        }
    }

    /// `O φ = true S φ`.
    pub fn once(argument: Formula) -> Formula {
        Formula::since(Formula::tt(), argument)
    }

    /// `H φ = !O !φ`.
    pub fn historically(argument: Formula) -> Formula {
        Formula::not(Formula::once(Formula::not(argument)))
    }

    /// `F φ = true U φ`.
    pub fn eventually(argument: Formula) -> Formula {
        Formula::until(Formula::tt(), argument)
    }

    /// `G φ = !F !φ`.
    pub fn globally(argument: Formula) -> Formula {
        Formula::not(Formula::eventually(Formula::not(argument)))
    }

    /// Holds exactly at the first position of a trace.
    pub fn first() -> Formula {
        Formula::not(Formula::before(Formula::tt()))
    }

    /// Replaces every past operator by its future counterpart and vice versa,
    /// `Y` by `X` and `S` by `U`. Shared subformulas stay shared.
    pub fn switch_direction(&self) -> Formula {
        let mut cache: FxHashMap<*const FormulaNode, Formula> = FxHashMap::default();
        self.switch_direction_rec(&mut cache)
    }

    fn switch_direction_rec(&self, cache: &mut FxHashMap<*const FormulaNode, Formula>) -> Formula {
        if let Some(result) = cache.get(&self.key()) {
            return result.clone();
        }

        let result = match self.node() {
            FormulaNode::True => Formula::tt(),
            FormulaNode::False => Formula::ff(),
            FormulaNode::Atom(name) => Formula::atom(name.clone()),
            FormulaNode::Not(argument) => Formula::not(argument.switch_direction_rec(cache)),
            FormulaNode::And(left, right) => {
                Formula::and(left.switch_direction_rec(cache), right.switch_direction_rec(cache))
            }
            FormulaNode::Or(left, right) => {
                Formula::or(left.switch_direction_rec(cache), right.switch_direction_rec(cache))
            }
            FormulaNode::Before(argument) => Formula::next(argument.switch_direction_rec(cache)),
            FormulaNode::Since(left, right) => {
                Formula::until(left.switch_direction_rec(cache), right.switch_direction_rec(cache))
            }
            FormulaNode::Next(argument) => Formula::before(argument.switch_direction_rec(cache)),
            FormulaNode::Until(left, right) => {
                Formula::since(left.switch_direction_rec(cache), right.switch_direction_rec(cache))
            }
        };

        cache.insert(self.key(), result.clone());
        result
    }

    /// Returns the direct subformulas.
    pub fn children(&self) -> Vec<&Formula> {
        match self.node() {
            FormulaNode::True | FormulaNode::False | FormulaNode::Atom(_) => vec![],
            FormulaNode::Not(argument) | FormulaNode::Before(argument) | FormulaNode::Next(argument) => {
                vec![argument]
            }
            FormulaNode::And(left, right)
            | FormulaNode::Or(left, right)
            | FormulaNode::Since(left, right)
            | FormulaNode::Until(left, right) => vec![left, right],
        }
    }

    /// Returns the number of distinct shared nodes.
    pub fn size(&self) -> usize {
        let mut visited: FxHashSet<*const FormulaNode> = FxHashSet::default();
        let mut stack = vec![self];

        while let Some(formula) = stack.pop() {
            if visited.insert(formula.key()) {
                stack.extend(formula.children());
            }
        }

        visited.len()
    }

    /// Returns the atomic propositions occurring in the formula.
    pub fn atoms(&self) -> BTreeSet<String> {
        let mut visited: FxHashSet<*const FormulaNode> = FxHashSet::default();
        let mut result = BTreeSet::new();
        let mut stack = vec![self];

        while let Some(formula) = stack.pop() {
            if visited.insert(formula.key()) {
                if let FormulaNode::Atom(name) = formula.node() {
                    result.insert(name.clone());
                }
                stack.extend(formula.children());
            }
        }

        result
    }

    /// Returns true iff the formula contains no future operators.
    pub fn is_past(&self) -> bool {
        !self.contains(|node| matches!(node, FormulaNode::Next(_) | FormulaNode::Until(_, _)))
    }

    /// Returns true iff the formula contains no past operators.
    pub fn is_future(&self) -> bool {
        !self.contains(|node| matches!(node, FormulaNode::Before(_) | FormulaNode::Since(_, _)))
    }

    fn contains(&self, predicate: impl Fn(&FormulaNode) -> bool) -> bool {
        let mut visited: FxHashSet<*const FormulaNode> = FxHashSet::default();
        let mut stack = vec![self];

        while let Some(formula) = stack.pop() {
            if visited.insert(formula.key()) {
                if predicate(formula.node()) {
                    return true;
                }
                stack.extend(formula.children());
            }
        }

        false
    }
}

impl PartialEq for Formula {
    fn eq(&self, other: &Formula) -> bool {
        self.ptr_eq(other) || self.0 == other.0
    }
}

impl Eq for Formula {}

impl fmt::Debug for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_node(f, &FxHashMap::default(), true)
    }
}

/// Displays a formula where every shared subformula is written once, as a
/// numbered definition `fN := ...` on its own line, and referred to by `fN`
/// elsewhere. The last line is the formula itself.
pub struct SharedFormula<'a> {
    formula: &'a Formula,
}

impl fmt::Display for SharedFormula<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let definitions = self.formula.shared_subformulas();
        let names: FxHashMap<*const FormulaNode, usize> = definitions
            .iter()
            .enumerate()
            .map(|(index, definition)| (definition.key(), index))
            .collect();

        for (index, definition) in definitions.iter().enumerate() {
            write!(f, "f{} := ", index)?;
            definition.write_node(f, &names, true)?;
            writeln!(f)?;
        }

        self.formula.write_node(f, &names, true)
    }
}

impl Formula {
    /// Returns a [SharedFormula] that displays this formula with its shared
    /// subformulas written once.
    pub fn display_shared(&self) -> SharedFormula<'_> {
        SharedFormula { formula: self }
    }

    /// Returns the number of nodes of the formula written as a tree, which
    /// is the length of its plain [fmt::Display] up to a constant factor.
    /// Saturates at `usize::MAX`.
    pub fn tree_size(&self) -> usize {
        let mut sizes: FxHashMap<*const FormulaNode, usize> = FxHashMap::default();
        let mut stack = vec![(self, false)];

        while let Some((formula, expanded)) = stack.pop() {
            if expanded {
                let size = formula
                    .children()
                    .into_iter()
                    .fold(1usize, |size, child| size.saturating_add(sizes[&child.key()]));
                sizes.insert(formula.key(), size);
            } else if !sizes.contains_key(&formula.key()) {
                stack.push((formula, true));
                stack.extend(formula.children().into_iter().map(|child| (child, false)));
            }
        }

        sizes[&self.key()]
    }

    /// Returns the non-atomic subformulas that occur more than once as the
    /// argument of an operator, where every subformula precedes the
    /// subformulas that contain it.
    fn shared_subformulas(&self) -> Vec<&Formula> {
        let mut references: FxHashMap<*const FormulaNode, usize> = FxHashMap::default();
        let mut visited: FxHashSet<*const FormulaNode> = FxHashSet::default();
        let mut stack = vec![self];

        while let Some(formula) = stack.pop() {
            if visited.insert(formula.key()) {
                for child in formula.children() {
                    *references.entry(child.key()).or_default() += 1;
                    stack.push(child);
                }
            }
        }

        let mut result = Vec::new();
        let mut visited: FxHashSet<*const FormulaNode> = FxHashSet::default();
        let mut stack = vec![(self, false)];

        while let Some((formula, expanded)) = stack.pop() {
            if expanded {
                let shared = references.get(&formula.key()).is_some_and(|count| *count > 1);
                if shared && !formula.children().is_empty() {
                    result.push(formula);
                }
            } else if visited.insert(formula.key()) {
                stack.push((formula, true));
                stack.extend(formula.children().into_iter().rev().map(|child| (child, false)));
            }
        }

        result
    }

    /// Writes the operator at the top of this formula, and its arguments
    /// either by name when they occur in `names` or inline otherwise.
    fn write_node(
        &self,
        f: &mut fmt::Formatter<'_>,
        names: &FxHashMap<*const FormulaNode, usize>,
        top: bool,
    ) -> fmt::Result {
        if !top {
            if let Some(index) = names.get(&self.key()) {
                return write!(f, "f{}", index);
            }
        }

        match self.node() {
            FormulaNode::True => write!(f, "true"),
            FormulaNode::False => write!(f, "false"),
            FormulaNode::Atom(name) => write!(f, "{}", name),
            FormulaNode::Not(argument) => {
                write!(f, "!")?;
                argument.write_node(f, names, false)
            }
            FormulaNode::And(left, right) => Formula::write_binary(f, names, left, "&&", right),
            FormulaNode::Or(left, right) => Formula::write_binary(f, names, left, "||", right),
            FormulaNode::Before(argument) => Formula::write_unary(f, names, "Y", argument),
            FormulaNode::Since(left, right) => Formula::write_binary(f, names, left, "S", right),
            FormulaNode::Next(argument) => Formula::write_unary(f, names, "X", argument),
            FormulaNode::Until(left, right) => Formula::write_binary(f, names, left, "U", right),
        }
    }

    fn write_unary(
        f: &mut fmt::Formatter<'_>,
        names: &FxHashMap<*const FormulaNode, usize>,
        operator: &str,
        argument: &Formula,
    ) -> fmt::Result {
        write!(f, "{}(", operator)?;
        argument.write_node(f, names, false)?;
        write!(f, ")")
    }

    fn write_binary(
        f: &mut fmt::Formatter<'_>,
        names: &FxHashMap<*const FormulaNode, usize>,
        left: &Formula,
        operator: &str,
        right: &Formula,
    ) -> fmt::Result {
        write!(f, "(")?;
        left.write_node(f, names, false)?;
        write!(f, " {} ", operator)?;
        right.write_node(f, names, false)?;
        write!(f, ")")
    }
}
