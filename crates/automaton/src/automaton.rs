use std::fmt;

use thiserror::Error;

use crate::Alphabet;
use crate::Letter;

/// The index for a state.
pub type StateIndex = usize;

/// The label of a transition, either an exact propositional interpretation or
/// an epsilon move.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TransitionLabel {
    Letter(Letter),
    Epsilon,
}

/// A single outgoing edge of a state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Transition {
    pub label: TransitionLabel,
    pub target: StateIndex,
}

impl Transition {
    pub fn new(letter: Letter, target: StateIndex) -> Transition {
        Transition {
            label: TransitionLabel::Letter(letter),
            target,
        }
    }

    pub fn epsilon(target: StateIndex) -> Transition {
        Transition {
            label: TransitionLabel::Epsilon,
            target,
        }
    }

    pub fn is_epsilon(&self) -> bool {
        self.label == TransitionLabel::Epsilon
    }

    /// Returns the letter of a non epsilon transition.
    pub fn letter(&self) -> Option<Letter> {
        match self.label {
            TransitionLabel::Letter(letter) => Some(letter),
            TransitionLabel::Epsilon => None,
        }
    }
}

/// A single state in the automaton, containing a vector of outgoing edges.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct State {
    pub outgoing: Vec<Transition>,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AutomatonError {
    #[error("The automaton has no states")]
    NoStates,

    #[error("State {state} has more than one transition for letter {letter}")]
    Nondeterministic { state: StateIndex, letter: usize },

    #[error("State {state} has an epsilon transition")]
    EpsilonTransition { state: StateIndex },

    #[error("State {state} has no transition for letter {letter}")]
    Partial { state: StateIndex, letter: usize },
}

/// A finite automaton over the propositional interpretations of an alphabet.
/// The automaton can be nondeterministic and contain epsilon transitions.
///
/// Automata are immutable, all operations return a new automaton.
#[derive(Clone, PartialEq, Eq)]
pub struct Automaton {
    states: Vec<State>,
    accepting: Vec<bool>,
    alphabet: Alphabet,

    initial_state: StateIndex,

    num_of_transitions: usize,
}

impl Automaton {
    /// Creates a new automaton with the given number of states. Duplicate
    /// transitions are ignored, otherwise the order of the outgoing
    /// transitions is preserved.
    ///
    /// Panics when a state or letter is out of bounds.
    pub fn new<A, T>(
        num_of_states: usize,
        initial_state: StateIndex,
        accepting_states: A,
        alphabet: Alphabet,
        transitions: T,
    ) -> Automaton
    where
        A: IntoIterator<Item = StateIndex>,
        T: IntoIterator<Item = (StateIndex, Transition)>,
    {
        assert!(
            initial_state < num_of_states,
            "The initial state {initial_state} is not one of the {num_of_states} states"
        );

        let mut accepting = vec![false; num_of_states];
        for state in accepting_states {
            assert!(state < num_of_states, "Accepting state {state} is out of bounds");
            accepting[state] = true;
        }

        let mut states = vec![State::default(); num_of_states];
        let mut num_of_transitions = 0;
        for (from, transition) in transitions {
            assert!(from < num_of_states, "Source state {from} is out of bounds");
            assert!(
                transition.target < num_of_states,
                "Target state {} is out of bounds",
                transition.target
            );
            if let Some(letter) = transition.letter() {
                assert!(alphabet.contains(letter), "Letter {letter} is not part of the alphabet");
            }

            if !states[from].outgoing.contains(&transition) {
                states[from].outgoing.push(transition);
                num_of_transitions += 1;
            }
        }

        Automaton {
            states,
            accepting,
            alphabet,
            initial_state,
            num_of_transitions,
        }
    }

    /// Returns the index of the initial state
    pub fn initial_state(&self) -> StateIndex {
        self.initial_state
    }

    /// Returns the number of states.
    pub fn num_of_states(&self) -> usize {
        self.states.len()
    }

    /// Returns the number of transitions.
    pub fn num_of_transitions(&self) -> usize {
        self.num_of_transitions
    }

    pub fn alphabet(&self) -> &Alphabet {
        &self.alphabet
    }

    pub fn is_accepting(&self, state: StateIndex) -> bool {
        self.accepting[state]
    }

    /// Returns the accepting states in increasing order.
    pub fn accepting_states(&self) -> impl Iterator<Item = StateIndex> + '_ {
        self.accepting
            .iter()
            .enumerate()
            .filter_map(|(state, accepting)| accepting.then_some(state))
    }

    /// Iterate over all (state_index, state) in the automaton.
    pub fn iter_states(&self) -> impl Iterator<Item = (StateIndex, &State)> + '_ {
        self.states.iter().enumerate()
    }

    /// Returns the outgoing transitions of the given state.
    pub fn outgoing_transitions(&self, state: StateIndex) -> impl Iterator<Item = &Transition> + '_ {
        self.states[state].outgoing.iter()
    }

    /// Returns the target of the first transition of `state` labelled with
    /// `letter`, or None when the automaton has no such transition.
    pub fn successor(&self, state: StateIndex, letter: Letter) -> Option<StateIndex> {
        self.states[state]
            .outgoing
            .iter()
            .find(|transition| transition.label == TransitionLabel::Letter(letter))
            .map(|transition| transition.target)
    }

    /// Returns the sorted union of the targets of all transitions from the
    /// given states that are labelled exactly with `letter`.
    pub fn compute_set_transition(&self, states: &[StateIndex], letter: Letter) -> Vec<StateIndex> {
        assert!(self.alphabet.contains(letter), "Letter {letter} is not part of the alphabet");

        let mut result: Vec<StateIndex> = states
            .iter()
            .flat_map(|state| self.states[*state].outgoing.iter())
            .filter(|transition| transition.label == TransitionLabel::Letter(letter))
            .map(|transition| transition.target)
            .collect();

        result.sort_unstable();
        result.dedup();
        result
    }

    /// Returns the sorted set of states reachable from the given states using
    /// only epsilon transitions.
    pub fn epsilon_closure(&self, states: &[StateIndex]) -> Vec<StateIndex> {
        let mut visited = vec![false; self.num_of_states()];
        let mut stack: Vec<StateIndex> = Vec::new();

        for state in states {
            if !visited[*state] {
                visited[*state] = true;
                stack.push(*state);
            }
        }

        while let Some(state) = stack.pop() {
            for transition in self.outgoing_transitions(state).filter(|t| t.is_epsilon()) {
                if !visited[transition.target] {
                    visited[transition.target] = true;
                    stack.push(transition.target);
                }
            }
        }

        visited
            .into_iter()
            .enumerate()
            .filter_map(|(state, visited)| visited.then_some(state))
            .collect()
    }

    /// Returns true iff the automaton accepts the given word, using the
    /// nondeterministic semantics with epsilon closures.
    pub fn accepts(&self, word: &[Letter]) -> bool {
        let mut current = self.epsilon_closure(&[self.initial_state]);

        for letter in word {
            current = self.epsilon_closure(&self.compute_set_transition(&current, *letter));
            if current.is_empty() {
                return false;
            }
        }

        current.iter().any(|state| self.accepting[*state])
    }

    /// Returns true iff the automaton has no epsilon transitions and at most
    /// one transition per state and letter.
    pub fn is_deterministic(&self) -> bool {
        self.check_deterministic().is_ok()
    }

    /// Returns true iff every state has a transition for every letter.
    pub fn is_total(&self) -> bool {
        self.check_total().is_ok()
    }

    /// Checks that the automaton is a total deterministic automaton, which is
    /// required by the tree subset construction.
    pub fn validate(&self) -> Result<(), AutomatonError> {
        if self.states.is_empty() {
            return Err(AutomatonError::NoStates);
        }

        self.check_deterministic()?;
        self.check_total()
    }

    /// Returns the same automaton where every missing transition leads to a
    /// new rejecting sink state. Automata that are already total are returned
    /// unchanged.
    pub fn complete(&self) -> Automaton {
        if self.is_total() {
            return self.clone();
        }

        let sink = self.num_of_states();
        let mut transitions: Vec<(StateIndex, Transition)> = Vec::new();
        for (state_index, state) in self.iter_states() {
            transitions.extend(state.outgoing.iter().map(|transition| (state_index, *transition)));

            for letter in self.alphabet.letters() {
                if self.successor(state_index, letter).is_none() {
                    transitions.push((state_index, Transition::new(letter, sink)));
                }
            }
        }

        for letter in self.alphabet.letters() {
            transitions.push((sink, Transition::new(letter, sink)));
        }

        Automaton::new(
            self.num_of_states() + 1,
            self.initial_state,
            self.accepting_states(),
            self.alphabet.clone(),
            transitions,
        )
    }

    fn check_deterministic(&self) -> Result<(), AutomatonError> {
        for (state_index, state) in self.iter_states() {
            let mut seen = vec![false; self.alphabet.num_of_letters()];

            for transition in &state.outgoing {
                match transition.label {
                    TransitionLabel::Epsilon => {
                        return Err(AutomatonError::EpsilonTransition { state: state_index });
                    }
                    TransitionLabel::Letter(letter) => {
                        if seen[letter.index()] {
                            return Err(AutomatonError::Nondeterministic {
                                state: state_index,
                                letter: letter.index(),
                            });
                        }
                        seen[letter.index()] = true;
                    }
                }
            }
        }

        Ok(())
    }

    fn check_total(&self) -> Result<(), AutomatonError> {
        for (state_index, _) in self.iter_states() {
            for letter in self.alphabet.letters() {
                if self.successor(state_index, letter).is_none() {
                    return Err(AutomatonError::Partial {
                        state: state_index,
                        letter: letter.index(),
                    });
                }
            }
        }

        Ok(())
    }
}

impl fmt::Display for Automaton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Print some information about the automaton.
        writeln!(f, "Number of states: {}", self.states.len())?;
        writeln!(f, "Number of accepting states: {}", self.accepting_states().count())?;
        writeln!(f, "Atomic propositions: {}", self.alphabet)?;
        writeln!(f, "Number of transitions: {}", self.num_of_transitions)
    }
}

impl fmt::Debug for Automaton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Initial state: {}", self.initial_state)?;
        writeln!(f, "Accepting states: {:?}", self.accepting_states().collect::<Vec<_>>())?;

        for (from, state) in self.states.iter().enumerate() {
            for transition in &state.outgoing {
                match transition.label {
                    TransitionLabel::Letter(letter) => writeln!(
                        f,
                        "{from} --[{}]-> {}",
                        self.alphabet.format_letter(letter),
                        transition.target
                    )?,
                    TransitionLabel::Epsilon => writeln!(f, "{from} --[epsilon]-> {}", transition.target)?,
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    /// The automaton over {a} that accepts the words starting with two a's.
    fn aa_prefix() -> Automaton {
        let alphabet = Alphabet::new(["a"]);
        let a = alphabet.letter(["a"]);
        let not_a = alphabet.letter(Vec::<&str>::new());

        Automaton::new(
            4,
            0,
            [2],
            alphabet,
            [
                (0, Transition::new(a, 1)),
                (0, Transition::new(not_a, 3)),
                (1, Transition::new(a, 2)),
                (1, Transition::new(not_a, 3)),
                (2, Transition::new(a, 2)),
                (2, Transition::new(not_a, 2)),
                (3, Transition::new(a, 3)),
                (3, Transition::new(not_a, 3)),
            ],
        )
    }

    #[test]
    fn test_accepts() {
        let automaton = aa_prefix();
        let a = Letter::new(1);
        let not_a = Letter::new(0);

        assert!(automaton.accepts(&[a, a]));
        assert!(automaton.accepts(&[a, a, not_a]));
        assert!(!automaton.accepts(&[a, not_a, a]));
        assert!(!automaton.accepts(&[a]));
        assert!(!automaton.accepts(&[]));
    }

    #[test]
    fn test_validate() {
        let automaton = aa_prefix();
        assert_eq!(automaton.validate(), Ok(()));
        assert!(automaton.is_deterministic());
        assert!(automaton.is_total());

        let partial = Automaton::new(
            2,
            0,
            [1],
            Alphabet::new(["a"]),
            [(0, Transition::new(Letter::new(1), 1))],
        );
        assert_eq!(partial.validate(), Err(AutomatonError::Partial { state: 0, letter: 0 }));

        let nondeterministic = Automaton::new(
            2,
            0,
            [1],
            Alphabet::new(["a"]),
            [
                (0, Transition::new(Letter::new(1), 1)),
                (0, Transition::new(Letter::new(1), 0)),
            ],
        );
        assert_eq!(
            nondeterministic.validate(),
            Err(AutomatonError::Nondeterministic { state: 0, letter: 1 })
        );
    }

    #[test]
    fn test_complete_adds_sink() {
        let partial = Automaton::new(
            2,
            0,
            [1],
            Alphabet::new(["a"]),
            [(0, Transition::new(Letter::new(1), 1))],
        );

        let complete = partial.complete();
        assert_eq!(complete.num_of_states(), 3);
        assert!(complete.is_total());
        assert!(!complete.is_accepting(2));

        for word in [vec![], vec![Letter::new(1)], vec![Letter::new(0)], vec![Letter::new(1), Letter::new(1)]] {
            assert_eq!(partial.accepts(&word), complete.accepts(&word));
        }
    }

    #[test]
    fn test_epsilon_closure() {
        let automaton = Automaton::new(
            4,
            0,
            [3],
            Alphabet::new(["a"]),
            [
                (0, Transition::epsilon(1)),
                (1, Transition::epsilon(2)),
                (2, Transition::new(Letter::new(0), 3)),
            ],
        );

        assert_eq!(automaton.epsilon_closure(&[0]), vec![0, 1, 2]);
        assert_eq!(automaton.epsilon_closure(&[3]), vec![3]);
        assert!(automaton.accepts(&[Letter::new(0)]));
    }

    #[test]
    fn test_compute_set_transition() {
        let automaton = aa_prefix();

        assert_eq!(automaton.compute_set_transition(&[0, 1, 2, 3], Letter::new(1)), vec![1, 2, 3]);
        assert_eq!(automaton.compute_set_transition(&[0, 1], Letter::new(0)), vec![3]);
    }
}
