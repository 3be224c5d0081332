use std::collections::VecDeque;

use log::debug;
use log::trace;
use rustc_hash::FxHashMap;

use crate::Automaton;
use crate::StateIndex;
use crate::Transition;

/// The full powerset construction is exponential, so the number of states of
/// its input is bounded.
pub const MAX_POWERSET_STATES: usize = 24;

impl Automaton {
    /// Computes a deterministic automaton accepting the same language, using
    /// the subset construction. Every subset is closed under epsilon
    /// transitions before a letter is consumed, and a subset is accepting iff
    /// it contains an accepting state. Transitions to the empty subset are
    /// omitted, so the result can be partial.
    ///
    /// Without `reduce` every non-empty subset becomes a state, where subset
    /// `S` has index `mask(S) - 1`. With `reduce` only the subsets reachable
    /// from the initial subset are constructed, numbered in breadth first order.
    pub fn determinize(&self, reduce: bool) -> Automaton {
        let start = std::time::Instant::now();

        let result = if reduce {
            self.determinize_reachable()
        } else {
            self.determinize_powerset()
        };

        debug!(
            "Determinized {} states into {} states",
            self.num_of_states(),
            result.num_of_states()
        );
        debug!("Time determinize: {:.3}s", start.elapsed().as_secs_f64());
        result
    }

    /// Returns the epsilon closed subset reached by consuming every letter
    /// from the given closed subset.
    fn subset_successors<'a>(
        &'a self,
        subset: &'a [StateIndex],
    ) -> impl Iterator<Item = (crate::Letter, Vec<StateIndex>)> + 'a {
        self.alphabet().letters().filter_map(move |letter| {
            let target = self.epsilon_closure(&self.compute_set_transition(subset, letter));
            if target.is_empty() {
                None
            } else {
                Some((letter, target))
            }
        })
    }

    fn determinize_reachable(&self) -> Automaton {
        let initial = self.epsilon_closure(&[self.initial_state()]);

        let mut subsets: Vec<Vec<StateIndex>> = vec![initial.clone()];
        let mut indices: FxHashMap<Vec<StateIndex>, StateIndex> = FxHashMap::default();
        indices.insert(initial, 0);

        let mut queue = VecDeque::from([0]);
        let mut transitions = Vec::new();

        while let Some(index) = queue.pop_front() {
            let subset = subsets[index].clone();

            for (letter, target) in self.subset_successors(&subset) {
                let target_index = match indices.get(&target) {
                    Some(target_index) => *target_index,
                    None => {
                        let target_index = subsets.len();
                        trace!("New subset {target_index}: {:?}", target);
                        indices.insert(target.clone(), target_index);
                        subsets.push(target);
                        queue.push_back(target_index);
                        target_index
                    }
                };

                transitions.push((index, Transition::new(letter, target_index)));
            }
        }

        let accepting: Vec<StateIndex> = subsets
            .iter()
            .enumerate()
            .filter(|(_, subset)| subset.iter().any(|state| self.is_accepting(*state)))
            .map(|(index, _)| index)
            .collect();

        Automaton::new(subsets.len(), 0, accepting, self.alphabet().clone(), transitions)
    }

    fn determinize_powerset(&self) -> Automaton {
        let n = self.num_of_states();
        assert!(
            n <= MAX_POWERSET_STATES,
            "The full powerset of {n} states is too large, use a reduced determinization"
        );

        let subset_of = |mask: usize| -> Vec<StateIndex> { (0..n).filter(|state| mask & (1 << state) != 0).collect() };
        let index_of = |subset: &[StateIndex]| -> StateIndex {
            subset.iter().fold(0, |mask, state| mask | (1 << state)) - 1
        };

        let num_of_subsets = (1usize << n) - 1;
        let mut transitions = Vec::new();
        let mut accepting = Vec::new();

        for mask in 1..=num_of_subsets {
            let closed = self.epsilon_closure(&subset_of(mask));

            if closed.iter().any(|state| self.is_accepting(*state)) {
                accepting.push(mask - 1);
            }

            for (letter, target) in self.subset_successors(&closed) {
                transitions.push((mask - 1, Transition::new(letter, index_of(&target))));
            }
        }

        let initial = index_of(&self.epsilon_closure(&[self.initial_state()]));
        Automaton::new(num_of_subsets, initial, accepting, self.alphabet().clone(), transitions)
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use crate::all_words;
    use crate::random_automaton;
    use crate::Alphabet;
    use crate::Letter;

    use super::*;

    #[test]
    fn test_random_determinize_preserves_language() {
        for _ in 0..20 {
            let nfa = random_automaton(5, 2, false);
            let dfa = nfa.determinize(true);
            let powerset = nfa.determinize(false);

            assert!(dfa.is_deterministic());
            assert!(powerset.is_deterministic());
            assert_eq!(powerset.num_of_states(), (1 << nfa.num_of_states()) - 1);

            for word in all_words(nfa.alphabet(), 4) {
                assert_eq!(nfa.accepts(&word), dfa.accepts(&word), "Mismatch on {:?}", word);
                assert_eq!(nfa.accepts(&word), powerset.accepts(&word), "Mismatch on {:?}", word);
            }
        }
    }

    #[test]
    fn test_determinize_closes_initial_state() {
        let a = Letter::new(1);
        let nfa = Automaton::new(
            3,
            0,
            [2],
            Alphabet::new(["a"]),
            [(0, Transition::epsilon(1)), (1, Transition::new(a, 2)), (0, Transition::new(a, 0))],
        );

        let dfa = nfa.determinize(true);
        assert_eq!(dfa.num_of_states(), 2);
        assert!(dfa.accepts(&[a]));
        assert!(dfa.accepts(&[a, a]));
        assert!(!dfa.accepts(&[Letter::new(0)]));
    }
}
