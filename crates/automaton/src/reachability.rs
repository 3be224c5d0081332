use std::collections::VecDeque;

use log::debug;
use log::trace;

use crate::Automaton;
use crate::StateIndex;
use crate::Transition;

impl Automaton {
    /// Returns the automaton restricted to the states that are reachable from
    /// the initial state, using letters and epsilon transitions.
    ///
    /// The remaining states are renumbered contiguously in breadth first
    /// order, so the initial state becomes state zero.
    pub fn remove_unreachable_states(&self) -> Automaton {
        let start = std::time::Instant::now();

        let mut new_index: Vec<Option<StateIndex>> = vec![None; self.num_of_states()];
        let mut order: Vec<StateIndex> = Vec::new();
        let mut queue = VecDeque::new();

        new_index[self.initial_state()] = Some(0);
        order.push(self.initial_state());
        queue.push_back(self.initial_state());

        while let Some(state) = queue.pop_front() {
            for transition in self.outgoing_transitions(state) {
                if new_index[transition.target].is_none() {
                    trace!("Reached state {} from {state}", transition.target);
                    new_index[transition.target] = Some(order.len());
                    order.push(transition.target);
                    queue.push_back(transition.target);
                }
            }
        }

        let renumber = |state: StateIndex| new_index[state].expect("Only reachable states are renumbered");

        let mut transitions = Vec::new();
        for state in &order {
            for transition in self.outgoing_transitions(*state) {
                transitions.push((
                    renumber(*state),
                    Transition {
                        label: transition.label,
                        target: renumber(transition.target),
                    },
                ));
            }
        }

        let accepting: Vec<StateIndex> = order
            .iter()
            .filter(|state| self.is_accepting(**state))
            .map(|state| renumber(*state))
            .collect();

        debug!(
            "Removed {} unreachable states out of {}",
            self.num_of_states() - order.len(),
            self.num_of_states()
        );
        debug!("Time remove_unreachable_states: {:.3}s", start.elapsed().as_secs_f64());

        Automaton::new(order.len(), 0, accepting, self.alphabet().clone(), transitions)
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use crate::random_automaton;
    use crate::Alphabet;
    use crate::Letter;

    use super::*;

    #[test]
    fn test_remove_unreachable_renumbers() {
        let a = Letter::new(1);
        let automaton = Automaton::new(
            4,
            2,
            [3, 1],
            Alphabet::new(["a"]),
            [
                (2, Transition::new(a, 3)),
                (3, Transition::new(a, 2)),
                (1, Transition::new(a, 0)),
            ],
        );

        let reduced = automaton.remove_unreachable_states();
        assert_eq!(reduced.num_of_states(), 2);
        assert_eq!(reduced.initial_state(), 0);
        assert_eq!(reduced.accepting_states().collect::<Vec<_>>(), vec![1]);
        assert_eq!(reduced.successor(0, a), Some(1));
        assert_eq!(reduced.successor(1, a), Some(0));
    }

    #[test]
    fn test_random_remove_unreachable_preserves_language() {
        for _ in 0..20 {
            let automaton = random_automaton(8, 2, true);
            let reduced = automaton.remove_unreachable_states();

            assert!(reduced.num_of_states() <= automaton.num_of_states());
            for word in crate::random_automaton::all_words(automaton.alphabet(), 4) {
                assert_eq!(automaton.accepts(&word), reduced.accepts(&word), "Mismatch on {:?}", word);
            }
        }
    }
}
