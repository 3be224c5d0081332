use std::collections::BTreeSet;
use std::collections::VecDeque;
use std::fmt;

use cascade_automaton::Alphabet;
use cascade_automaton::Automaton;
use cascade_automaton::Letter;
use cascade_automaton::StateIndex;
use cascade_automaton::Transition;
use itertools::Itertools;
use log::debug;

use crate::stratify::stratify;
use crate::subset_tree::SubsetTree;
use crate::DecompositionError;

/// The index of a node in the tree subset automaton.
pub type NodeIndex = usize;

/// A node of the tree subset automaton, representing a subset of the states
/// of the underlying automaton.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtendedNode {
    pub(crate) states: Vec<StateIndex>,
    pub(crate) parent: Option<NodeIndex>,
    pub(crate) children: BTreeSet<NodeIndex>,

    /// The targets whose subset is exactly the image of this subset.
    pub(crate) subset_transitions: Vec<NodeIndex>,

    /// The targets lifted to the height of this node.
    pub(crate) transitions: Vec<NodeIndex>,

    pub(crate) equivalence_class: usize,
    pub(crate) height: usize,
    pub(crate) synthetic: bool,
}

impl ExtendedNode {
    /// Returns the sorted subset of automaton states.
    pub fn states(&self) -> &[StateIndex] {
        &self.states
    }

    pub fn parent(&self) -> Option<NodeIndex> {
        self.parent
    }

    /// Returns the children in increasing index order.
    pub fn children(&self) -> &BTreeSet<NodeIndex> {
        &self.children
    }

    /// Returns the target of the lifted transition for the given letter,
    /// which has the same height as this node.
    pub fn transition(&self, letter: Letter) -> NodeIndex {
        self.transitions[letter.index()]
    }

    /// Returns the lifted transition targets indexed by letter.
    pub fn transitions(&self) -> &[NodeIndex] {
        &self.transitions
    }

    /// Returns the target whose subset is exactly the image of this subset
    /// under the given letter.
    pub fn subset_transition(&self, letter: Letter) -> NodeIndex {
        self.subset_transitions[letter.index()]
    }

    pub fn equivalence_class(&self) -> usize {
        self.equivalence_class
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns true iff the node was inserted to balance the tree.
    pub fn is_synthetic(&self) -> bool {
        self.synthetic
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// The tree subset automaton (TSA) of a deterministic automaton.
///
/// The nodes form a tree of subsets of the automaton states with the set of
/// all states at the root and singletons at the leaves. Every node has one
/// transition per letter to a node of the same height, and the transitions
/// of the children of a node lead to children of the target of that node.
pub struct TreeSubsetAutomaton {
    nodes: Vec<ExtendedNode>,
    height_classes: Vec<Vec<NodeIndex>>,
    num_of_classes: usize,

    alphabet: Alphabet,
    initial_state: StateIndex,
    accepting: Vec<bool>,
}

impl TreeSubsetAutomaton {
    /// Constructs the tree subset automaton of a total deterministic automaton.
    pub fn new(automaton: &Automaton) -> Result<TreeSubsetAutomaton, DecompositionError> {
        automaton.validate()?;
        let start = std::time::Instant::now();

        let tree = SubsetTree::new(automaton);
        let (nodes, num_of_classes) = stratify(tree);

        let mut height_classes: Vec<Vec<NodeIndex>> = vec![Vec::new(); nodes[0].height + 1];
        for (index, node) in nodes.iter().enumerate() {
            height_classes[node.height].push(index);
        }

        debug!(
            "Tree subset automaton with {} nodes, {} equivalence classes and height {}",
            nodes.len(),
            num_of_classes,
            nodes[0].height
        );
        debug!("Time tsa: {:.3}s", start.elapsed().as_secs_f64());

        Ok(TreeSubsetAutomaton {
            nodes,
            height_classes,
            num_of_classes,
            alphabet: automaton.alphabet().clone(),
            initial_state: automaton.initial_state(),
            accepting: (0..automaton.num_of_states())
                .map(|state| automaton.is_accepting(state))
                .collect(),
        })
    }

    pub fn node(&self, index: NodeIndex) -> &ExtendedNode {
        &self.nodes[index]
    }

    pub fn nodes(&self) -> &[ExtendedNode] {
        &self.nodes
    }

    pub fn num_of_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// The root contains all states of the automaton.
    pub fn root(&self) -> NodeIndex {
        0
    }

    /// Returns the height of the root.
    pub fn height(&self) -> usize {
        self.nodes[0].height
    }

    pub fn nodes_at_height(&self, height: usize) -> &[NodeIndex] {
        &self.height_classes[height]
    }

    /// Returns the nodes at the given distance from the root.
    pub fn nodes_at_depth(&self, depth: usize) -> &[NodeIndex] {
        &self.height_classes[self.height() - depth]
    }

    pub fn num_of_equivalence_classes(&self) -> usize {
        self.num_of_classes
    }

    pub fn alphabet(&self) -> &Alphabet {
        &self.alphabet
    }

    /// Returns the proper ancestors of a node, starting with its parent.
    pub fn ancestors(&self, node: NodeIndex) -> Vec<NodeIndex> {
        let mut result = Vec::new();
        let mut current = self.nodes[node].parent;

        while let Some(ancestor) = current {
            result.push(ancestor);
            current = self.nodes[ancestor].parent;
        }

        result
    }

    /// Returns the proper descendants of a node in breadth first order.
    pub fn descendants(&self, node: NodeIndex) -> Vec<NodeIndex> {
        let mut result = Vec::new();
        let mut queue: VecDeque<NodeIndex> = self.nodes[node].children.iter().copied().collect();

        while let Some(descendant) = queue.pop_front() {
            result.push(descendant);
            queue.extend(self.nodes[descendant].children.iter().copied());
        }

        result
    }

    /// Returns true iff `ancestor` is a proper ancestor of `node`.
    pub fn is_ancestor(&self, ancestor: NodeIndex, node: NodeIndex) -> bool {
        let mut current = self.nodes[node].parent;

        while let Some(parent) = current {
            if parent == ancestor {
                return true;
            }
            current = self.nodes[parent].parent;
        }

        false
    }

    /// Returns the node itself or its ancestor with the given height, if any.
    pub fn ancestor_at_height(&self, node: NodeIndex, height: usize) -> Option<NodeIndex> {
        let mut current = node;

        while self.nodes[current].height < height {
            current = self.nodes[current].parent?;
        }

        (self.nodes[current].height == height).then_some(current)
    }

    /// Returns the leaf reached from the root by repeatedly choosing the
    /// first child that contains the given state.
    pub fn leaf_of_state(&self, state: StateIndex) -> NodeIndex {
        let mut current = self.root();
        assert!(
            self.nodes[current].states.binary_search(&state).is_ok(),
            "State {state} is not a state of the automaton"
        );

        while let Some(child) = self.nodes[current]
            .children
            .iter()
            .find(|child| self.nodes[**child].states.binary_search(&state).is_ok())
        {
            current = *child;
        }

        debug_assert!(self.nodes[current].is_leaf(), "The children of a node cover its states");
        current
    }

    /// Returns true iff the exact image of the node under the letter belongs
    /// to the equivalence class of the node. These transitions permute the
    /// children, all others map the children onto a single child.
    pub fn is_in_class_transition(&self, node: NodeIndex, letter: Letter) -> bool {
        let target = self.nodes[node].subset_transition(letter);
        self.nodes[target].equivalence_class == self.nodes[node].equivalence_class
    }

    /// Returns the automaton formed by the leaves that are reachable from the
    /// leaf of the initial state. It accepts the same language as the
    /// automaton the tree was constructed from.
    pub fn isomorphic_automaton(&self) -> Automaton {
        let initial = self.leaf_of_state(self.initial_state);

        let mut index_of: Vec<Option<StateIndex>> = vec![None; self.nodes.len()];
        let mut leaves = vec![initial];
        let mut queue = VecDeque::from([initial]);
        let mut transitions = Vec::new();
        index_of[initial] = Some(0);

        while let Some(leaf) = queue.pop_front() {
            let from = index_of[leaf].expect("Queued leaves are numbered");

            for letter in self.alphabet.letters() {
                let target = self.nodes[leaf].transition(letter);
                let to = match index_of[target] {
                    Some(to) => to,
                    None => {
                        let to = leaves.len();
                        index_of[target] = Some(to);
                        leaves.push(target);
                        queue.push_back(target);
                        to
                    }
                };

                transitions.push((from, Transition::new(letter, to)));
            }
        }

        let accepting: Vec<StateIndex> = leaves
            .iter()
            .enumerate()
            .filter(|(_, leaf)| self.accepting[self.nodes[**leaf].states[0]])
            .map(|(index, _)| index)
            .collect();

        Automaton::new(leaves.len(), 0, accepting, self.alphabet.clone(), transitions)
    }
}

impl fmt::Display for TreeSubsetAutomaton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, node) in self.nodes.iter().enumerate() {
            writeln!(
                f,
                "{}) parent: {}, states: {{{}}}, height: {}, class: {}, delta: [{}]",
                index,
                node.parent.map_or("None".to_string(), |parent| parent.to_string()),
                node.states.iter().format(", "),
                node.height,
                node.equivalence_class,
                node.transitions
                    .iter()
                    .enumerate()
                    .format_with(", ", |(letter, target), f| f(&format_args!("{} -> {}", letter, target)))
            )?;
        }

        Ok(())
    }
}
