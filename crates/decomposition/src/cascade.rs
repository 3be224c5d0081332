use std::collections::BTreeMap;
use std::collections::VecDeque;

use cascade_automaton::Automaton;
use cascade_automaton::Letter;
use cascade_automaton::StateIndex;
use cascade_automaton::Transition;
use itertools::Itertools;
use log::debug;
use log::trace;
use rustc_hash::FxHashMap;
use rustc_hash::FxHashSet;

use crate::DecompositionError;
use crate::NodeIndex;
use crate::TreeSubsetAutomaton;

/// A state of a single cascade layer.
pub type CascadeState = usize;

/// One cascade state per layer, starting at layer zero.
pub type Configuration = Vec<CascadeState>;

/// The effect of a letter on a layer for a fixed configuration of the layers
/// above it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LayerTransition {
    /// Every state of the layer is kept.
    Identity,

    /// Every state of the layer moves to the given state.
    Reset(CascadeState),
}

/// A single layer of the cascade decomposition. It reads the letter together
/// with the configuration of the layers above it.
pub struct CascadeAutomaton {
    layer: usize,

    /// The tree nodes represented by every cascade state.
    theta_inv: Vec<Vec<NodeIndex>>,

    /// Maps the configurations up to and including this layer to the nodes
    /// at the depth of this layer.
    psi_inv: BTreeMap<Configuration, NodeIndex>,

    /// The states that can occur below a parent configuration.
    local_states: BTreeMap<Configuration, Vec<CascadeState>>,

    delta: FxHashMap<(CascadeState, Configuration, Letter), CascadeState>,
    kinds: FxHashMap<(Configuration, Letter), LayerTransition>,

    initial_state: CascadeState,
}

impl CascadeAutomaton {
    pub fn layer(&self) -> usize {
        self.layer
    }

    pub fn num_of_states(&self) -> usize {
        self.theta_inv.len()
    }

    pub fn initial_state(&self) -> CascadeState {
        self.initial_state
    }

    /// Returns the tree nodes that the given cascade state represents.
    pub fn theta_inv(&self, state: CascadeState) -> &[NodeIndex] {
        &self.theta_inv[state]
    }

    /// Returns the tree node of a configuration of length `layer + 1`.
    pub fn node(&self, configuration: &[CascadeState]) -> Option<NodeIndex> {
        self.psi_inv.get(configuration).copied()
    }

    /// Returns the configurations up to this layer in lexicographic order.
    pub fn configurations(&self) -> impl Iterator<Item = &Configuration> + '_ {
        self.psi_inv.keys()
    }

    /// Returns the configurations of the layers above in lexicographic order.
    pub fn parent_configurations(&self) -> impl Iterator<Item = &Configuration> + '_ {
        self.local_states.keys()
    }

    /// Returns the states that can occur under the given parent configuration.
    pub fn local_states(&self, parent: &[CascadeState]) -> &[CascadeState] {
        self.local_states.get(parent).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Returns the successor of `state` under `letter` while the layers above
    /// are in configuration `parent`.
    pub fn delta(&self, state: CascadeState, parent: &[CascadeState], letter: Letter) -> Option<CascadeState> {
        self.delta.get(&(state, parent.to_vec(), letter)).copied()
    }

    /// Returns whether the letter keeps or resets this layer under the given
    /// parent configuration.
    pub fn transition_kind(&self, parent: &[CascadeState], letter: Letter) -> Option<LayerTransition> {
        self.kinds.get(&(parent.to_vec(), letter)).copied()
    }
}

/// The decomposition of a counter-free automaton into a cascade of reset
/// automata, one layer per depth of its tree subset automaton.
pub struct CascadeDecomposition {
    automaton: Automaton,
    tsa: TreeSubsetAutomaton,
    layers: Vec<CascadeAutomaton>,

    /// The cascade state of every node within its layer.
    theta: Vec<CascadeState>,
    configurations: Vec<Configuration>,

    phi_inv: Vec<Vec<Configuration>>,
    initial_configuration: Configuration,
}

impl CascadeDecomposition {
    /// Decomposes a total deterministic automaton. Fails when the automaton
    /// is invalid or when one of the layers is not a reset automaton.
    pub fn new(automaton: &Automaton) -> Result<CascadeDecomposition, DecompositionError> {
        let tsa = TreeSubsetAutomaton::new(automaton)?;
        let start = std::time::Instant::now();

        let num_of_layers = tsa.height() + 1;
        let mut theta: Vec<Option<CascadeState>> = vec![None; tsa.num_of_nodes()];
        theta[tsa.root()] = Some(0);

        for layer in 1..num_of_layers {
            assign_theta(&tsa, layer, &mut theta)?;
        }

        let theta: Vec<CascadeState> = theta
            .into_iter()
            .map(|state| state.expect("Every node is assigned a cascade state"))
            .collect();

        // The configurations of all nodes, parents before children.
        let mut configurations: Vec<Configuration> = vec![Vec::new(); tsa.num_of_nodes()];
        configurations[tsa.root()] = vec![0];
        for depth in 1..num_of_layers {
            for node in tsa.nodes_at_depth(depth) {
                let parent = tsa.node(*node).parent().expect("Only the root has no parent");
                let mut configuration = configurations[parent].clone();
                configuration.push(theta[*node]);
                configurations[*node] = configuration;
            }
        }

        let leaf = tsa.leaf_of_state(automaton.initial_state());
        let initial_configuration = configurations[leaf].clone();

        let mut layers = Vec::with_capacity(num_of_layers);
        for layer in 0..num_of_layers {
            layers.push(build_layer(&tsa, layer, &theta, &configurations, &initial_configuration)?);
        }

        let mut phi_inv: Vec<Vec<Configuration>> = vec![Vec::new(); automaton.num_of_states()];
        for leaf in tsa.nodes_at_height(0) {
            phi_inv[tsa.node(*leaf).states()[0]].push(configurations[*leaf].clone());
        }
        for configurations in &mut phi_inv {
            configurations.sort();
        }

        debug!(
            "Cascade with {} layers of sizes [{}]",
            num_of_layers,
            layers.iter().map(|layer| layer.num_of_states()).format(", ")
        );
        debug!("Time cascade: {:.3}s", start.elapsed().as_secs_f64());

        Ok(CascadeDecomposition {
            automaton: automaton.clone(),
            tsa,
            layers,
            theta,
            configurations,
            phi_inv,
            initial_configuration,
        })
    }

    /// Returns the automaton that was decomposed.
    pub fn automaton(&self) -> &Automaton {
        &self.automaton
    }

    pub fn tsa(&self) -> &TreeSubsetAutomaton {
        &self.tsa
    }

    pub fn layers(&self) -> &[CascadeAutomaton] {
        &self.layers
    }

    pub fn layer(&self, index: usize) -> &CascadeAutomaton {
        &self.layers[index]
    }

    pub fn num_of_layers(&self) -> usize {
        self.layers.len()
    }

    /// Returns the cascade state of a tree node within its layer.
    pub fn theta(&self, node: NodeIndex) -> CascadeState {
        self.theta[node]
    }

    /// Returns the configuration of the path from the root to the given node.
    pub fn configuration_of(&self, node: NodeIndex) -> &[CascadeState] {
        &self.configurations[node]
    }

    /// The configuration of the leaf of the initial state.
    pub fn initial_configuration(&self) -> &[CascadeState] {
        &self.initial_configuration
    }

    /// Moves all layers simultaneously, every layer reads the letter and the
    /// configuration of the layers above it before the step.
    pub fn step(&self, configuration: &[CascadeState], letter: Letter) -> Configuration {
        assert_eq!(
            configuration.len(),
            self.layers.len(),
            "A configuration has one state per layer"
        );

        let mut result = Vec::with_capacity(configuration.len());
        for (index, layer) in self.layers.iter().enumerate() {
            let next = layer
                .delta(configuration[index], &configuration[..index], letter)
                .unwrap_or_else(|| panic!("Configuration {:?} has no successor in layer {index}", configuration));
            result.push(next);
        }

        result
    }

    /// Returns the automaton state of a full configuration.
    pub fn phi(&self, configuration: &[CascadeState]) -> StateIndex {
        let leaf = self
            .layers
            .last()
            .and_then(|layer| layer.node(configuration))
            .unwrap_or_else(|| panic!("Configuration {:?} is not a full configuration", configuration));

        self.tsa.node(leaf).states()[0]
    }

    /// Returns the full configurations that are mapped onto the given state.
    pub fn phi_inv(&self, state: StateIndex) -> &[Configuration] {
        &self.phi_inv[state]
    }

    /// Returns the automaton over the full configurations that are reachable
    /// from the initial configuration. It accepts the same language as the
    /// decomposed automaton.
    pub fn isomorphic_automaton(&self) -> Automaton {
        let alphabet = self.automaton.alphabet();

        let mut index_of: FxHashMap<Configuration, StateIndex> = FxHashMap::default();
        let mut states = vec![self.initial_configuration.clone()];
        let mut queue = VecDeque::from([0]);
        let mut transitions = Vec::new();
        index_of.insert(self.initial_configuration.clone(), 0);

        while let Some(from) = queue.pop_front() {
            for letter in alphabet.letters() {
                let next = self.step(&states[from], letter);

                let to = match index_of.get(&next) {
                    Some(to) => *to,
                    None => {
                        let to = states.len();
                        index_of.insert(next.clone(), to);
                        states.push(next);
                        queue.push_back(to);
                        to
                    }
                };

                transitions.push((from, Transition::new(letter, to)));
            }
        }

        let accepting: Vec<StateIndex> = states
            .iter()
            .enumerate()
            .filter(|(_, configuration)| self.automaton.is_accepting(self.phi(configuration)))
            .map(|(index, _)| index)
            .collect();

        Automaton::new(states.len(), 0, accepting, alphabet.clone(), transitions)
    }
}

/// Assigns the cascade states of the children of the nodes at depth
/// `layer - 1`. Within an equivalence class the children of the lowest node
/// are numbered first and the in-class transitions carry these numbers to
/// the children of the other members.
fn assign_theta(
    tsa: &TreeSubsetAutomaton,
    layer: usize,
    theta: &mut [Option<CascadeState>],
) -> Result<(), DecompositionError> {
    let mut classes: BTreeMap<usize, Vec<NodeIndex>> = BTreeMap::new();
    for node in tsa.nodes_at_depth(layer - 1) {
        classes
            .entry(tsa.node(*node).equivalence_class())
            .or_default()
            .push(*node);
    }

    for (class, members) in classes {
        let representative = *members.iter().min().expect("Classes are not empty");

        let mut next_state = 0;
        for child in tsa.node(representative).children() {
            theta[*child] = Some(next_state);
            next_state += 1;
        }

        let mut visited: FxHashSet<NodeIndex> = FxHashSet::default();
        let mut queue = VecDeque::from([representative]);
        visited.insert(representative);

        while let Some(member) = queue.pop_front() {
            for letter in tsa.alphabet().letters() {
                if !tsa.is_in_class_transition(member, letter) {
                    continue;
                }

                for child in tsa.node(member).children() {
                    let image = tsa.node(*child).transition(letter);
                    let state = theta[*child].expect("The children of visited members are assigned");

                    match theta[image] {
                        None => theta[image] = Some(state),
                        Some(existing) if existing != state => {
                            debug!("Class {class} maps cascade state {state} onto {existing} in layer {layer}");
                            return Err(DecompositionError::NotCounterFree { layer });
                        }
                        Some(_) => {}
                    }
                }

                let target = tsa.node(member).transition(letter);
                if visited.insert(target) {
                    queue.push_back(target);
                }
            }
        }

        for member in &members {
            let mut seen = FxHashSet::default();

            for child in tsa.node(*member).children() {
                let state = match theta[*child] {
                    Some(state) => state,
                    None => {
                        trace!("Node {child} is not reached from the representative {representative}");
                        theta[*child] = Some(next_state);
                        next_state += 1;
                        next_state - 1
                    }
                };

                if !seen.insert(state) {
                    debug!("Two children of node {member} share cascade state {state} in layer {layer}");
                    return Err(DecompositionError::NotCounterFree { layer });
                }
            }
        }
    }

    Ok(())
}

/// Builds the cascade automaton of the given layer from the cascade states
/// of the nodes. Fails when a letter neither keeps nor resets the layer.
fn build_layer(
    tsa: &TreeSubsetAutomaton,
    layer: usize,
    theta: &[CascadeState],
    configurations: &[Configuration],
    initial_configuration: &[CascadeState],
) -> Result<CascadeAutomaton, DecompositionError> {
    let nodes = tsa.nodes_at_depth(layer);

    let num_of_states = nodes.iter().map(|node| theta[*node] + 1).max().unwrap_or(0);
    let mut theta_inv: Vec<Vec<NodeIndex>> = vec![Vec::new(); num_of_states];
    let mut psi_inv = BTreeMap::new();
    let mut local_states: BTreeMap<Configuration, Vec<CascadeState>> = BTreeMap::new();
    let mut delta = FxHashMap::default();

    for node in nodes {
        let state = theta[*node];
        let configuration = &configurations[*node];
        let parent = configuration[..layer].to_vec();

        theta_inv[state].push(*node);
        psi_inv.insert(configuration.clone(), *node);
        local_states.entry(parent.clone()).or_default().push(state);

        for letter in tsa.alphabet().letters() {
            let target = tsa.node(*node).transition(letter);
            delta.insert((state, parent.clone(), letter), theta[target]);
        }
    }

    let mut kinds = FxHashMap::default();
    for (parent, states) in &mut local_states {
        states.sort_unstable();

        for letter in tsa.alphabet().letters() {
            let images: Vec<CascadeState> = states
                .iter()
                .map(|state| delta[&(*state, parent.clone(), letter)])
                .collect();

            let kind = if images.iter().zip(states.iter()).all(|(image, state)| image == state) {
                LayerTransition::Identity
            } else if images.iter().all(|image| *image == images[0]) {
                LayerTransition::Reset(images[0])
            } else {
                debug!(
                    "Letter {} maps {:?} onto {:?} below {:?} in layer {layer}",
                    tsa.alphabet().format_letter(letter),
                    states,
                    images,
                    parent
                );
                return Err(DecompositionError::NotCounterFree { layer });
            };

            kinds.insert((parent.clone(), letter), kind);
        }
    }

    trace!("Layer {layer} has {num_of_states} states and {} configurations", psi_inv.len());

    Ok(CascadeAutomaton {
        layer,
        theta_inv,
        psi_inv,
        local_states,
        delta,
        kinds,
        initial_state: initial_configuration[layer],
    })
}

#[cfg(test)]
mod tests {
    use cascade_automaton::all_words;
    use cascade_automaton::random_automaton;
    use test_log::test;

    use crate::test_automata::a_and_next_a;
    use crate::test_automata::large_tree;
    use crate::test_automata::last_letter_a;
    use crate::test_automata::once_a_then_b;
    use crate::test_automata::parity;

    use super::*;

    /// Checks that every layer is a reset automaton and that the cascade
    /// accepts the same words as the automaton.
    fn check_cascade(automaton: &Automaton, cascade: &CascadeDecomposition) {
        assert_eq!(cascade.num_of_layers(), cascade.tsa().height() + 1);
        assert_eq!(cascade.initial_configuration().len(), cascade.num_of_layers());
        assert_eq!(cascade.phi(cascade.initial_configuration()), automaton.initial_state());

        for layer in cascade.layers() {
            for parent in layer.parent_configurations() {
                for letter in automaton.alphabet().letters() {
                    let states = layer.local_states(parent);
                    let images: Vec<CascadeState> = states
                        .iter()
                        .map(|state| layer.delta(*state, parent, letter).expect("Every local state has a successor"))
                        .collect();

                    match layer.transition_kind(parent, letter) {
                        Some(LayerTransition::Identity) => assert_eq!(images, states),
                        Some(LayerTransition::Reset(target)) => assert!(images.iter().all(|image| *image == target)),
                        None => panic!("Layer {} has no transition kind for {:?}", layer.layer(), parent),
                    }
                }
            }
        }

        for state in 0..automaton.num_of_states() {
            for configuration in cascade.phi_inv(state) {
                assert_eq!(cascade.phi(configuration), state);
            }
        }

        let isomorphic = cascade.isomorphic_automaton();
        for word in all_words(automaton.alphabet(), 6) {
            assert_eq!(automaton.accepts(&word), isomorphic.accepts(&word), "Word {:?}", word);
        }
    }

    #[test]
    fn test_once_a_then_b() {
        let automaton = once_a_then_b();
        let cascade = CascadeDecomposition::new(&automaton).unwrap();
        check_cascade(&automaton, &cascade);

        assert_eq!(cascade.num_of_layers(), 4);
        assert_eq!(cascade.layer(0).num_of_states(), 1);
        assert_eq!(cascade.layer(0).node(&[0]), Some(cascade.tsa().root()));
    }

    #[test]
    fn test_last_letter_a() {
        let automaton = last_letter_a();
        let cascade = CascadeDecomposition::new(&automaton).unwrap();
        check_cascade(&automaton, &cascade);

        // Both letters reset the single lower layer.
        let a = automaton.alphabet().letter(["a"]);
        assert_eq!(cascade.num_of_layers(), 2);
        assert_eq!(cascade.layer(1).transition_kind(&[0], a), Some(LayerTransition::Reset(1)));
        assert_eq!(cascade.initial_configuration(), &[0, 0]);
    }

    #[test]
    fn test_step() {
        let automaton = a_and_next_a();
        let cascade = CascadeDecomposition::new(&automaton).unwrap();
        check_cascade(&automaton, &cascade);

        let a = automaton.alphabet().letter(["a"]);
        let mut configuration = cascade.initial_configuration().to_vec();
        let mut state = automaton.initial_state();

        for _ in 0..3 {
            configuration = cascade.step(&configuration, a);
            state = automaton.successor(state, a).expect("The automaton is total");
            assert_eq!(cascade.phi(&configuration), state);
        }

        assert!(automaton.is_accepting(cascade.phi(&configuration)));
    }

    #[test]
    fn test_parity_is_not_counter_free() {
        assert!(matches!(
            CascadeDecomposition::new(&parity()),
            Err(DecompositionError::NotCounterFree { layer: 1 })
        ));
    }

    #[test]
    fn test_large_tree_is_not_counter_free() {
        let automaton = large_tree();
        assert!(automaton.validate().is_ok());

        assert!(matches!(
            CascadeDecomposition::new(&automaton),
            Err(DecompositionError::NotCounterFree { layer: 2 })
        ));
    }

    #[test]
    fn test_random_cascade() {
        for _ in 0..30 {
            let automaton = random_automaton(4, 1, true).minimize().complete();

            match CascadeDecomposition::new(&automaton) {
                Ok(cascade) => check_cascade(&automaton, &cascade),
                Err(error) => assert!(
                    matches!(error, DecompositionError::NotCounterFree { .. }),
                    "Unexpected error {error}"
                ),
            }
        }
    }
}
