use log::debug;

use crate::Automaton;

impl Automaton {
    /// Computes the minimal deterministic automaton accepting the same
    /// language with Brzozowski's double reversal. The result has no
    /// rejecting sink state, so it can be partial.
    pub fn minimize(&self) -> Automaton {
        let start = std::time::Instant::now();

        let result = self
            .reverse_transitions(false)
            .determinize(true)
            .remove_unreachable_states()
            .reverse_transitions(false)
            .determinize(true)
            .remove_unreachable_states();

        debug!("Minimized {} states into {} states", self.num_of_states(), result.num_of_states());
        debug!("Time minimize: {:.3}s", start.elapsed().as_secs_f64());
        result
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use crate::all_words;
    use crate::random_automaton;
    use crate::Alphabet;
    use crate::Letter;
    use crate::Transition;

    use super::*;

    #[test]
    fn test_random_minimize_preserves_language() {
        for _ in 0..20 {
            let automaton = random_automaton(7, 2, true).remove_unreachable_states();
            let minimal = automaton.minimize();

            assert!(minimal.is_deterministic());
            assert!(minimal.num_of_states() <= automaton.num_of_states());

            for word in all_words(automaton.alphabet(), 5) {
                assert_eq!(automaton.accepts(&word), minimal.accepts(&word), "Mismatch on {:?}", word);
            }

            // Minimisation is idempotent.
            assert_eq!(minimal.minimize().num_of_states(), minimal.num_of_states());
        }
    }

    #[test]
    fn test_minimize_merges_equivalent_states() {
        // States 1 and 2 both accept everything.
        let alphabet = Alphabet::new(["a"]);
        let a = Letter::new(1);
        let not_a = Letter::new(0);
        let automaton = Automaton::new(
            3,
            0,
            [1, 2],
            alphabet,
            [
                (0, Transition::new(a, 1)),
                (0, Transition::new(not_a, 2)),
                (1, Transition::new(a, 2)),
                (1, Transition::new(not_a, 1)),
                (2, Transition::new(a, 1)),
                (2, Transition::new(not_a, 2)),
            ],
        );

        let minimal = automaton.minimize();
        assert_eq!(minimal.num_of_states(), 2);
        assert!(!minimal.accepts(&[]));
        assert!(minimal.accepts(&[a, not_a, a]));
    }
}
