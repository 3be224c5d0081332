use std::collections::BTreeSet;
use std::collections::VecDeque;

use cascade_automaton::Automaton;
use cascade_automaton::StateIndex;
use log::debug;
use log::trace;

use crate::NodeIndex;

/// A node of the subset tree while its transitions are being resolved.
pub(crate) struct SubsetNode {
    pub states: Vec<StateIndex>,
    pub parent: Option<NodeIndex>,
    pub children: BTreeSet<NodeIndex>,
    pub transitions: Vec<Option<NodeIndex>>,
}

/// The tree of state subsets underlying the tree subset automaton, before
/// heights are assigned. The root is node zero and contains all states.
///
/// Every node `m` has for every letter a transition to a node whose subset is
/// exactly the image of the subset of `m`. For a node `c` with parent `m` the
/// target of `c` lies in the subtree of the target of `m`.
pub(crate) struct SubsetTree {
    pub nodes: Vec<SubsetNode>,
}

impl SubsetTree {
    /// Builds the subset tree of a total deterministic automaton.
    pub fn new(automaton: &Automaton) -> SubsetTree {
        let mut tree = SubsetTree { nodes: Vec::new() };
        tree.add_node((0..automaton.num_of_states()).collect(), None, automaton);

        // Creating nodes and moving subtrees can invalidate the transitions
        // that were resolved before in the same pass, so repeat until stable.
        let mut passes = 0;
        loop {
            passes += 1;

            let mut changed = tree.resolve_transitions(automaton);
            changed |= tree.complete_singletons(automaton);

            trace!("Pass {passes} resulted in {} nodes", tree.nodes.len());
            if !changed {
                break;
            }
        }

        debug!(
            "Subset tree has {} nodes after {} passes",
            tree.nodes.len(),
            passes
        );
        tree
    }

    fn add_node(&mut self, states: Vec<StateIndex>, parent: Option<NodeIndex>, automaton: &Automaton) -> NodeIndex {
        let index = self.nodes.len();
        trace!("New node {index} with states {:?} below {:?}", states, parent);

        self.nodes.push(SubsetNode {
            states,
            parent,
            children: BTreeSet::new(),
            transitions: vec![None; automaton.alphabet().num_of_letters()],
        });

        if let Some(parent) = parent {
            self.nodes[parent].children.insert(index);
        }

        index
    }

    fn set_parent(&mut self, node: NodeIndex, parent: NodeIndex) {
        if let Some(old) = self.nodes[node].parent {
            self.nodes[old].children.remove(&node);
        }

        self.nodes[node].parent = Some(parent);
        self.nodes[parent].children.insert(node);
    }

    /// Returns the nodes in breadth first order, starting at the root.
    fn breadth_first_order(&self) -> Vec<NodeIndex> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut queue = VecDeque::from([0]);

        while let Some(node) = queue.pop_front() {
            order.push(node);
            queue.extend(self.nodes[node].children.iter().copied());
        }

        order
    }

    /// Recomputes the transitions of all nodes, parents before children.
    /// Returns true iff the tree structure changed.
    fn resolve_transitions(&mut self, automaton: &Automaton) -> bool {
        let mut changed = false;

        for node in self.breadth_first_order() {
            let parent = self.nodes[node].parent;

            for letter in automaton.alphabet().letters() {
                let anchor = match parent {
                    None => node,
                    Some(parent) => match self.nodes[parent].transitions[letter.index()] {
                        Some(anchor) => anchor,
                        None => {
                            // The parent was created during this pass.
                            debug_assert!(changed, "Only new nodes can lack transitions");
                            continue;
                        }
                    },
                };

                let image = automaton.compute_set_transition(&self.nodes[node].states, letter);
                let (target, created) = self.resolve_target(anchor, &image, automaton);
                changed |= created;

                self.nodes[node].transitions[letter.index()] = Some(target);
            }
        }

        changed
    }

    /// Returns the node with exactly the given subset in the subtree of the
    /// anchor, which is created when it does not exist yet. The second value
    /// indicates that a node was created.
    fn resolve_target(&mut self, anchor: NodeIndex, image: &[StateIndex], automaton: &Automaton) -> (NodeIndex, bool) {
        debug_assert!(is_subset(image, &self.nodes[anchor].states), "The image must be contained in the anchor");

        if let Some(found) = self.find_in_subtree(anchor, image) {
            return (found, false);
        }

        // Descend to the deepest node that still contains the image.
        let mut current = anchor;
        while let Some(child) = self.nodes[current]
            .children
            .iter()
            .find(|child| is_subset(image, &self.nodes[**child].states))
            .copied()
        {
            current = child;
        }

        let new_node = self.add_node(image.to_vec(), Some(current), automaton);

        // The siblings that are contained in the new subset move below it.
        let contained: Vec<NodeIndex> = self.nodes[current]
            .children
            .iter()
            .filter(|child| **child != new_node && is_subset(&self.nodes[**child].states, image))
            .copied()
            .collect();

        for child in contained {
            trace!("Moved node {child} below {new_node}");
            self.set_parent(child, new_node);
        }

        (new_node, true)
    }

    /// Searches the subtree of the anchor, including the anchor, in breadth
    /// first order for a node with exactly the given subset.
    fn find_in_subtree(&self, anchor: NodeIndex, subset: &[StateIndex]) -> Option<NodeIndex> {
        let mut queue = VecDeque::from([anchor]);

        while let Some(node) = queue.pop_front() {
            if self.nodes[node].states == subset {
                return Some(node);
            }

            queue.extend(self.nodes[node].children.iter().copied());
        }

        None
    }

    /// Adds a singleton child for every state of a node that is not covered by
    /// its children. Returns true iff a node was added.
    fn complete_singletons(&mut self, automaton: &Automaton) -> bool {
        let mut changed = false;

        for node in 0..self.nodes.len() {
            if self.nodes[node].states.len() <= 1 {
                continue;
            }

            let covered: BTreeSet<StateIndex> = self.nodes[node]
                .children
                .iter()
                .flat_map(|child| self.nodes[*child].states.iter().copied())
                .collect();

            let uncovered: Vec<StateIndex> = self.nodes[node]
                .states
                .iter()
                .filter(|state| !covered.contains(state))
                .copied()
                .collect();

            for state in uncovered {
                self.add_node(vec![state], Some(node), automaton);
                changed = true;
            }
        }

        changed
    }
}

/// Returns true iff the sorted `subset` is contained in the sorted `superset`.
pub(crate) fn is_subset(subset: &[StateIndex], superset: &[StateIndex]) -> bool {
    subset.iter().all(|state| superset.binary_search(state).is_ok())
}

#[cfg(test)]
mod tests {
    use cascade_automaton::random_automaton;
    use test_log::test;

    use super::*;

    #[test]
    fn test_random_subset_tree() {
        for _ in 0..20 {
            let automaton = random_automaton(5, 1, true);
            let tree = SubsetTree::new(&automaton);

            for (index, node) in tree.nodes.iter().enumerate() {
                let mut covered = BTreeSet::new();

                for child in &node.children {
                    let child_node = &tree.nodes[*child];
                    assert_eq!(child_node.parent, Some(index));
                    assert!(child_node.states.len() < node.states.len());
                    assert!(is_subset(&child_node.states, &node.states));
                    covered.extend(child_node.states.iter().copied());

                    // Siblings form an antichain.
                    for other in node.children.iter().filter(|other| *other != child) {
                        assert!(!is_subset(&child_node.states, &tree.nodes[*other].states));
                    }
                }

                if node.states.len() > 1 {
                    assert_eq!(covered.into_iter().collect::<Vec<_>>(), node.states);
                }

                for letter in automaton.alphabet().letters() {
                    let target = node.transitions[letter.index()].expect("All transitions are resolved");
                    assert_eq!(
                        tree.nodes[target].states,
                        automaton.compute_set_transition(&node.states, letter)
                    );
                }
            }
        }
    }
}
