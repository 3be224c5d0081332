use std::collections::BTreeSet;
use std::collections::VecDeque;

use log::debug;
use log::trace;

use crate::scc_decomposition;
use crate::subset_tree::SubsetTree;
use crate::ExtendedNode;
use crate::NodeIndex;

/// Assigns equivalence classes and heights to the nodes of the subset tree,
/// balances the tree and lifts the transitions. Returns the nodes and the
/// number of equivalence classes.
pub(crate) fn stratify(tree: SubsetTree) -> (Vec<ExtendedNode>, usize) {
    let mut nodes: Vec<ExtendedNode> = tree
        .nodes
        .into_iter()
        .map(|node| {
            let transitions: Vec<NodeIndex> = node
                .transitions
                .into_iter()
                .map(|target| target.expect("Every transition is resolved in the final pass"))
                .collect();

            ExtendedNode {
                states: node.states,
                parent: node.parent,
                children: node.children,
                subset_transitions: transitions.clone(),
                transitions,
                equivalence_class: 0,
                height: 0,
                synthetic: false,
            }
        })
        .collect();

    let classes = scc_decomposition(nodes.len(), |node| nodes[node].subset_transitions.clone());
    for (node, class) in nodes.iter_mut().zip(classes) {
        node.equivalence_class = class;
    }

    let num_of_classes = compute_heights(&mut nodes);
    let num_of_classes = balance(&mut nodes, num_of_classes);
    lift_transitions(&mut nodes);

    (nodes, num_of_classes)
}

/// Singletons have height zero, every other node is one higher than the
/// highest class that is directly reachable from its class through
/// transitions or child edges. Returns the number of classes.
fn compute_heights(nodes: &mut [ExtendedNode]) -> usize {
    let num_of_classes = nodes
        .iter()
        .map(|node| node.equivalence_class + 1)
        .max()
        .unwrap_or(0);

    // The condensation of the transitions and child edges.
    let mut successors: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); num_of_classes];
    let mut singleton = vec![false; num_of_classes];
    for node in nodes.iter() {
        let class = node.equivalence_class;
        singleton[class] = node.states.len() == 1;

        for target in node.subset_transitions.iter().chain(node.children.iter()) {
            let target_class = nodes[*target].equivalence_class;
            if target_class != class {
                successors[class].insert(target_class);
            }
        }
    }

    let mut predecessors: Vec<Vec<usize>> = vec![Vec::new(); num_of_classes];
    let mut remaining: Vec<usize> = vec![0; num_of_classes];
    for (class, targets) in successors.iter().enumerate() {
        remaining[class] = targets.len();
        for target in targets {
            predecessors[*target].push(class);
        }
    }

    // Longest paths in reverse topological order.
    let mut heights = vec![0; num_of_classes];
    let mut queue: VecDeque<usize> = (0..num_of_classes).filter(|class| remaining[*class] == 0).collect();
    let mut processed = 0;

    while let Some(class) = queue.pop_front() {
        processed += 1;

        heights[class] = if singleton[class] {
            0
        } else {
            1 + successors[class].iter().map(|target| heights[*target]).max().unwrap_or(0)
        };
        trace!("Class {class} has height {}", heights[class]);

        for predecessor in &predecessors[class] {
            remaining[*predecessor] -= 1;
            if remaining[*predecessor] == 0 {
                queue.push_back(*predecessor);
            }
        }
    }
    debug_assert_eq!(processed, num_of_classes, "The condensation must be acyclic");

    for node in nodes.iter_mut() {
        node.height = heights[node.equivalence_class];
    }

    num_of_classes
}

/// Inserts synthetic copies of a node between the node and its parent until
/// every parent is exactly one higher than its children. Every synthetic node
/// gets a class of its own. Returns the new number of classes.
fn balance(nodes: &mut Vec<ExtendedNode>, mut num_of_classes: usize) -> usize {
    let num_of_original = nodes.len();

    for node in 0..num_of_original {
        let mut current = node;

        while let Some(parent) = nodes[current].parent {
            if nodes[parent].height == nodes[current].height + 1 {
                break;
            }

            let synthetic = nodes.len();
            trace!("Inserted synthetic node {synthetic} between {parent} and {current}");

            let copy = ExtendedNode {
                states: nodes[current].states.clone(),
                parent: Some(parent),
                children: BTreeSet::from([current]),
                subset_transitions: nodes[current].subset_transitions.clone(),
                transitions: nodes[current].transitions.clone(),
                equivalence_class: num_of_classes,
                height: nodes[current].height + 1,
                synthetic: true,
            };
            nodes.push(copy);
            num_of_classes += 1;

            nodes[parent].children.remove(&current);
            nodes[parent].children.insert(synthetic);
            nodes[current].parent = Some(synthetic);

            current = synthetic;
        }
    }

    debug!("Balancing added {} synthetic nodes", nodes.len() - num_of_original);
    num_of_classes
}

/// Replaces every transition target by its ancestor at the height of the source.
fn lift_transitions(nodes: &mut [ExtendedNode]) {
    for node in 0..nodes.len() {
        let height = nodes[node].height;

        for letter in 0..nodes[node].subset_transitions.len() {
            let mut target = nodes[node].subset_transitions[letter];
            while nodes[target].height < height {
                target = nodes[target]
                    .parent
                    .expect("A node below the source height has an ancestor at that height");
            }

            debug_assert_eq!(nodes[target].height, height, "Transitions never lead upwards");
            nodes[node].transitions[letter] = target;
        }
    }
}
