use log::debug;

use crate::Automaton;
use crate::StateIndex;
use crate::Transition;

impl Automaton {
    /// Returns the nondeterministic automaton obtained by reversing every
    /// transition. The old initial state becomes the only accepting state and
    /// a fresh initial state has epsilon transitions to all old accepting
    /// states, so the result accepts exactly the reversed words.
    ///
    /// When `reduce` is set the states that are unreachable in the reversed
    /// automaton are removed.
    pub fn reverse_transitions(&self, reduce: bool) -> Automaton {
        let new_initial: StateIndex = self.num_of_states();

        let mut transitions: Vec<(StateIndex, Transition)> = Vec::with_capacity(self.num_of_transitions());
        for (state_index, state) in self.iter_states() {
            for transition in &state.outgoing {
                transitions.push((
                    transition.target,
                    Transition {
                        label: transition.label,
                        target: state_index,
                    },
                ));
            }
        }

        for accepting in self.accepting_states() {
            transitions.push((new_initial, Transition::epsilon(accepting)));
        }

        let reversed = Automaton::new(
            self.num_of_states() + 1,
            new_initial,
            [self.initial_state()],
            self.alphabet().clone(),
            transitions,
        );
        debug!("Reversed automaton with {} states", reversed.num_of_states());

        if reduce {
            reversed.remove_unreachable_states()
        } else {
            reversed
        }
    }
}
